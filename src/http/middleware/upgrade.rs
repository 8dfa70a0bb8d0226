//! HTTPS upgrade stage for the plaintext listener.
//!
//! Active only when the plaintext listener runs next to a TLS listener.
//! Every request that reaches it is answered with a 301 to the HTTPS
//! equivalent of its URL; nothing behind it runs.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode, Uri},
    middleware::Next,
    response::Response,
};

/// Target of the redirect issued by [`https_upgrade_middleware`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpsUpgrade {
    pub tls_port: u16,
}

impl HttpsUpgrade {
    pub fn new(tls_port: u16) -> Self {
        Self { tls_port }
    }

    /// `https://{host}{:port}{path?query}`; the port is omitted when 443.
    pub fn location(&self, host: Option<&str>, uri: &Uri) -> String {
        let host = host
            .or_else(|| uri.host())
            .map(strip_port)
            .unwrap_or("localhost");
        let path = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        if self.tls_port == 443 {
            format!("https://{}{}", host, path)
        } else {
            format!("https://{}:{}{}", host, self.tls_port, path)
        }
    }
}

fn strip_port(host: &str) -> &str {
    // Bracketed IPv6 literals carry colons of their own.
    if let Some(end) = host.find(']') {
        return &host[..=end];
    }
    host.split(':').next().unwrap_or(host)
}

pub async fn https_upgrade_middleware(
    State(upgrade): State<HttpsUpgrade>,
    request: Request<Body>,
    _next: Next,
) -> Response {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok());
    let location = upgrade.location(host, request.uri());

    tracing::debug!(location = %location, "Redirecting plaintext request to HTTPS");

    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::MOVED_PERMANENTLY;
    match HeaderValue::from_str(&location) {
        Ok(value) => {
            response.headers_mut().insert(header::LOCATION, value);
        }
        Err(_) => {
            *response.status_mut() = StatusCode::BAD_REQUEST;
        }
    }
    response
}
