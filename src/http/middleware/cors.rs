//! CORS policy and the listener-level CORS stage.
//!
//! # Responsibilities
//! - Compute the `Access-Control-*` headers for every response
//! - Short-circuit `OPTIONS` with 200 and no body before any route lookup
//!
//! # Design Decisions
//! - A wildcard origin is echoed back as the request's `Origin` with
//!   `Vary: Origin`, so credentialed requests keep working
//! - Empty lists emit no header rather than an empty value

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::CorsConfig;

/// Cross-origin policy applied by every listener.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsPolicy {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub allow_credentials: bool,
}

impl CorsPolicy {
    pub fn from_config(config: &CorsConfig) -> Self {
        Self {
            allowed_origins: config.allowed_origins.clone(),
            allowed_methods: config.allowed_methods.clone(),
            allowed_headers: config.allowed_headers.clone(),
            allow_credentials: config.allow_credentials,
        }
    }

    /// Policy that allows nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    pub fn allowed_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_methods = methods.into_iter().map(Into::into).collect();
        self
    }

    pub fn allowed_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    pub fn allow_credentials(mut self) -> Self {
        self.allow_credentials = true;
        self
    }

    pub fn not_allow_credentials(mut self) -> Self {
        self.allow_credentials = false;
        self
    }

    fn is_wildcard(&self) -> bool {
        self.allowed_origins.len() == 1 && self.allowed_origins[0] == "*"
    }

    /// Headers to attach for a request carrying `origin`.
    pub fn response_headers(&self, origin: Option<&HeaderValue>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if self.is_wildcard() {
            if let Some(origin) = origin {
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
            }
            headers.insert(header::VARY, HeaderValue::from_static("Origin"));
        } else {
            insert_joined(&mut headers, header::ACCESS_CONTROL_ALLOW_ORIGIN, &self.allowed_origins);
        }

        insert_joined(&mut headers, header::ACCESS_CONTROL_ALLOW_METHODS, &self.allowed_methods);
        insert_joined(&mut headers, header::ACCESS_CONTROL_ALLOW_HEADERS, &self.allowed_headers);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static(if self.allow_credentials { "true" } else { "false" }),
        );

        headers
    }
}

fn insert_joined(headers: &mut HeaderMap, name: header::HeaderName, values: &[String]) {
    if values.is_empty() {
        return;
    }
    match HeaderValue::from_str(&values.join(", ")) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(e) => tracing::warn!(header = %name, error = %e, "Invalid CORS header value"),
    }
}

/// Listener-level CORS stage.
pub async fn cors_middleware(
    State(policy): State<Arc<CorsPolicy>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let cors_headers = policy.response_headers(request.headers().get(header::ORIGIN));

    let mut response = if request.method() == Method::OPTIONS {
        let mut preflight = Response::new(Body::empty());
        *preflight.status_mut() = StatusCode::OK;
        preflight
    } else {
        next.run(request).await
    };

    response.headers_mut().extend(cors_headers);
    response
}
