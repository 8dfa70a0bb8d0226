//! Shared utilities for integration tests.

#![allow(dead_code)]

use api_render::http::handler::from_fn;
use api_render::http::BoxHandler;
use api_render::{Exchange, HttpServer, Outcome, Router};
use axum::body::{to_bytes, Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceExt;

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Reply {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Drive one request through a frozen router.
pub async fn send(app: &axum::Router, request: Request<Body>) -> Reply {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    Reply { status, headers, body }
}

pub async fn get(app: &axum::Router, uri: &str) -> Reply {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

/// Handler that always answers `value` as text.
pub fn text(value: &'static str) -> BoxHandler {
    from_fn(move |_ex: &mut Exchange| Outcome::text(value))
}

/// Serve `router` on an ephemeral local port.
pub async fn start_server(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = HttpServer::new(router).listen_on(listener).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    addr
}

/// A port that was free a moment ago on 127.0.0.1.
pub async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Self-signed certificate and key for `localhost`, written as PEM files
/// into a fresh temporary directory.
pub fn self_signed(tag: &str) -> (std::path::PathBuf, std::path::PathBuf) {
    let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let dir = std::env::temp_dir().join(format!("api-render-{}-{}", std::process::id(), tag));
    std::fs::create_dir_all(&dir).unwrap();
    let cert = dir.join("cert.pem");
    let key = dir.join("key.pem");
    std::fs::write(&cert, certified.cert.pem()).unwrap();
    std::fs::write(&key, certified.key_pair.serialize_pem()).unwrap();
    (cert, key)
}

/// Client that trusts any certificate and never follows redirects.
pub fn insecure_client() -> reqwest::Client {
    reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// GET `url` until it answers or the attempts run out.
pub async fn get_eventually(client: &reqwest::Client, url: &str) -> reqwest::Response {
    let mut last_error = None;
    for _ in 0..50 {
        match client.get(url).send().await {
            Ok(response) => return response,
            Err(e) => last_error = Some(e),
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("{} never answered: {:?}", url, last_error);
}
