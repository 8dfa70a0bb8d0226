//! Listener behavior: live plaintext serving and the HTTPS upgrade.

use api_render::http::middleware::HttpsUpgrade;
use api_render::{HttpServer, Router};
use axum::http::{header, Method, Request, StatusCode};
use axum::body::Body;

mod common;
use common::{free_port, get_eventually, insecure_client, self_signed, send, start_server, text};

#[tokio::test]
async fn plaintext_listener_serves_requests() {
    let mut router = Router::new();
    router
        .base_path("/api")
        .route(Method::GET, "/hello", text("hello"));
    let addr = start_server(router).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/api/hello", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.text().await.unwrap(), "hello");

    let missing = client
        .get(format!("http://{}/hello", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upgrade_redirects_every_request() {
    let mut router = Router::new();
    router.route(Method::GET, "/page", text("page"));
    let app = router.freeze().service(Some(HttpsUpgrade::new(8443)));

    let reply = send(
        &app,
        Request::get("/page?x=1")
            .header(header::HOST, "example.com:8080")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(reply.status, StatusCode::MOVED_PERMANENTLY);
    assert_eq!(reply.header("location"), Some("https://example.com:8443/page?x=1"));

    let unknown = send(
        &app,
        Request::get("/nowhere")
            .header(header::HOST, "example.com")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(unknown.status, StatusCode::MOVED_PERMANENTLY);
}

fn hello_router() -> Router {
    let mut router = Router::new();
    router.route(Method::GET, "/hello", text("hello"));
    router
}

#[tokio::test]
async fn dual_listening_serves_tls_and_redirects_plaintext() {
    let (cert, key) = self_signed("dual");
    let plain = format!("127.0.0.1:{}", free_port().await);
    let secure_port = free_port().await;
    let secure = format!("127.0.0.1:{}", secure_port);

    let server = {
        let (plain, secure) = (plain.clone(), secure.clone());
        tokio::spawn(async move {
            HttpServer::new(hello_router())
                .listen_with_tls(&plain, &secure, &cert, &key)
                .await
        })
    };

    let client = insecure_client();
    let tls = get_eventually(&client, &format!("https://localhost:{}/hello", secure_port)).await;
    assert_eq!(tls.status(), reqwest::StatusCode::OK);
    assert_eq!(tls.text().await.unwrap(), "hello");

    let redirect = get_eventually(&client, &format!("http://{}/hello?x=1", plain)).await;
    assert_eq!(redirect.status(), reqwest::StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        redirect.headers()["location"],
        format!("https://127.0.0.1:{}/hello?x=1", secure_port).as_str()
    );

    assert!(!server.is_finished());
    server.abort();
}

#[tokio::test]
async fn plaintext_failure_leaves_tls_running() {
    let (cert, key) = self_signed("occupied");
    let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let plain = occupied.local_addr().unwrap().to_string();
    let secure_port = free_port().await;
    let secure = format!("127.0.0.1:{}", secure_port);

    let server = tokio::spawn(async move {
        HttpServer::new(hello_router())
            .listen_with_tls(&plain, &secure, &cert, &key)
            .await
    });

    let client = insecure_client();
    let tls = get_eventually(&client, &format!("https://localhost:{}/hello", secure_port)).await;
    assert_eq!(tls.status(), reqwest::StatusCode::OK);
    assert_eq!(tls.text().await.unwrap(), "hello");

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(!server.is_finished(), "TLS listener stopped with the plaintext one");
    server.abort();
    drop(occupied);
}
