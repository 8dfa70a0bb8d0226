//! Application assembly.
//!
//! # Responsibilities
//! - Build the session collaborators from configuration
//! - Configure limits, CORS and documentation on a fresh router
//! - Register the controllers
//!
//! # Design Decisions
//! - One explicit `Services` value holds every shared collaborator; the
//!   binary and the tests build the same application through it

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::controllers::{self, widgets::WidgetStore, Services};
use crate::docs::OpenApiViewer;
use crate::http::middleware::CorsPolicy;
use crate::routing::Router;
use crate::security::{AccessControl, JwtSessions, MemorySessionStore};

impl Services {
    /// Default collaborators: JWT sessions and in-memory stores.
    pub fn from_config(config: Arc<ServerConfig>, sessions: Arc<MemorySessionStore>) -> Self {
        let tokens = Arc::new(JwtSessions::from_config(&config.session));
        let access = Arc::new(AccessControl::new(tokens, sessions, &config.session));
        Self {
            config,
            access,
            widgets: Arc::new(WidgetStore::new()),
        }
    }
}

/// Documentation sink described by `config.docs`; the seed document is
/// used when it loads, otherwise a blank one.
pub fn doc_viewer(config: &ServerConfig) -> OpenApiViewer {
    let docs = &config.docs;
    let viewer = match &docs.seed_path {
        Some(path) => match OpenApiViewer::from_seed_file(path) {
            Ok(viewer) => viewer,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable documentation seed");
                OpenApiViewer::new(&docs.title, &docs.version)
            }
        },
        None => OpenApiViewer::new(&docs.title, &docs.version),
    };
    match &docs.description {
        Some(description) => viewer.description(description),
        None => viewer,
    }
}

/// Router with every controller registered, ready to listen.
pub fn build_router(services: &Services) -> Router {
    let config = &services.config;
    let mut router = Router::new();
    router.body_limit(config.limits.body_limit_bytes);

    if config.cors.enabled {
        router.cors(CorsPolicy::from_config(&config.cors));
    }
    if config.docs.enabled {
        router.doc_viewer(doc_viewer(config));
    }

    controllers::register(&mut router, services);
    tracing::info!(routes = router.route_count(), "Routes registered");
    router
}
