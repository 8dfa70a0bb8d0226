//! HTTP listeners.
//!
//! # Responsibilities
//! - Bind plaintext and TLS listeners for a registered [`Router`]
//! - Record each listener in the documentation servers list before freezing
//! - Run plaintext and TLS side by side, plaintext redirecting to HTTPS
//! - Drain in-flight requests on shutdown signals
//!
//! # Design Decisions
//! - Every `listen*` call blocks until the listener stops and returns its
//!   terminal error to the caller
//! - Under dual listening the plaintext listener runs on its own task;
//!   its failure is logged and never stops the TLS listener

use axum_server::tls_rustls::RustlsConfig;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::config::ListenerConfig;
use crate::http::middleware::upgrade::HttpsUpgrade;
use crate::lifecycle::shutdown_signal;
use crate::net::tls::load_tls_config;
use crate::routing::Router;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid listen address '{0}'")]
    Address(String),
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to load TLS material: {0}")]
    Tls(#[source] std::io::Error),
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Listener front-end for a fully registered router.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    /// Listen in the mode `config` selects: plaintext, TLS only, or both.
    pub async fn run(self, config: &ListenerConfig) -> Result<(), ServerError> {
        match &config.tls {
            None => self.listen(&config.bind_address).await,
            Some(tls) if tls.only_tls => {
                self.listen_tls(&tls.bind_address, &tls.cert_path, &tls.key_path)
                    .await
            }
            Some(tls) => {
                self.listen_with_tls(
                    &config.bind_address,
                    &tls.bind_address,
                    &tls.cert_path,
                    &tls.key_path,
                )
                .await
            }
        }
    }

    /// Serve plaintext HTTP on `address`.
    pub async fn listen(self, address: &str) -> Result<(), ServerError> {
        let listener = bind(address).await?;
        self.listen_on(listener).await
    }

    /// Serve plaintext HTTP on an already bound listener.
    pub async fn listen_on(mut self, listener: TcpListener) -> Result<(), ServerError> {
        let local = listener.local_addr()?;
        self.router
            .register_server(format!("http://localhost:{}", local.port()), "HTTP server".into());

        let app = self.router.freeze().service(None);
        serve_plain(listener, app).await
    }

    /// Serve HTTPS only on `address`.
    pub async fn listen_tls(mut self, address: &str, cert: &Path, key: &Path) -> Result<(), ServerError> {
        let address = parse_address(address)?;
        let tls = load_tls_config(cert, key).await.map_err(ServerError::Tls)?;
        self.router
            .register_server(format!("https://localhost:{}", address.port()), "HTTPS server".into());

        let app = self.router.freeze().service(None);
        serve_tls(address, tls, app).await
    }

    /// Serve HTTPS on `tls_address` and redirect plaintext requests on
    /// `plain_address` to it.
    pub async fn listen_with_tls(
        mut self,
        plain_address: &str,
        tls_address: &str,
        cert: &Path,
        key: &Path,
    ) -> Result<(), ServerError> {
        let plain = parse_address(plain_address)?;
        let secure = parse_address(tls_address)?;
        let tls = load_tls_config(cert, key).await.map_err(ServerError::Tls)?;

        self.router
            .register_server(format!("http://localhost:{}", plain.port()), "HTTP server".into())
            .register_server(format!("https://localhost:{}", secure.port()), "HTTPS server".into());

        let frozen = self.router.freeze();
        let redirecting = frozen.service(Some(HttpsUpgrade::new(secure.port())));

        tokio::spawn(async move {
            let result = match TcpListener::bind(plain).await {
                Ok(listener) => serve_plain(listener, redirecting).await,
                Err(source) => Err(ServerError::Bind {
                    address: plain.to_string(),
                    source,
                }),
            };
            if let Err(e) = result {
                tracing::error!(address = %plain, error = %e, "Plaintext listener failed");
            }
        });

        serve_tls(secure, tls, frozen.service(None)).await
    }
}

impl std::fmt::Debug for HttpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpServer").field("router", &self.router).finish()
    }
}

fn parse_address(address: &str) -> Result<SocketAddr, ServerError> {
    address
        .parse()
        .map_err(|_| ServerError::Address(address.to_string()))
}

async fn bind(address: &str) -> Result<TcpListener, ServerError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| ServerError::Bind {
            address: address.to_string(),
            source,
        })
}

async fn serve_plain(listener: TcpListener, app: axum::Router) -> Result<(), ServerError> {
    let address = listener.local_addr()?;
    tracing::info!(address = %address, "The app is listening (HTTP)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!(address = %address, "HTTP listener stopped");
    Ok(())
}

async fn serve_tls(address: SocketAddr, tls: RustlsConfig, app: axum::Router) -> Result<(), ServerError> {
    let handle = axum_server::Handle::new();
    let shutdown = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.graceful_shutdown(Some(DRAIN_TIMEOUT));
    });

    tracing::info!(address = %address, "The app is listening (HTTPS)");
    axum_server::bind_rustls(address, tls)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;

    tracing::info!(address = %address, "HTTPS listener stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn address_must_be_socket_address() {
        assert!(parse_address("127.0.0.1:8080").is_ok());
        assert!(matches!(parse_address("localhost"), Err(ServerError::Address(_))));
    }

    #[tokio::test]
    async fn missing_tls_material_fails_before_serving() {
        let server = HttpServer::new(Router::new());
        let err = server
            .listen_tls(
                "127.0.0.1:0",
                &PathBuf::from("/nonexistent/cert.pem"),
                &PathBuf::from("/nonexistent/key.pem"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Tls(_)));
    }

    #[tokio::test]
    async fn bind_failure_names_the_address() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = taken.local_addr().unwrap().to_string();
        let err = bind(&address).await.unwrap_err();
        assert!(err.to_string().contains(&address));
    }
}
