//! HTTP controllers of the API server.
//!
//! # Data Flow
//! ```text
//! main.rs
//!     → controllers::register (base path, CORS, access-control groups)
//!     → system.rs, login.rs, widgets.rs (routes + documentation)
//! ```
//!
//! # Design Decisions
//! - Soft-checked prefixes are registered before hard-checked ones; the
//!   group order is the precedence
//! - Collaborators arrive as `Arc` handles, never as globals

pub mod login;
pub mod system;
pub mod widgets;

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::docs::DocGroup;
use crate::routing::Router;
use crate::security::AccessControl;
use widgets::WidgetStore;

pub const BASE_PATH: &str = "/api/v1";

/// Collaborators shared by the controllers.
pub struct Services {
    pub config: Arc<ServerConfig>,
    pub access: Arc<AccessControl>,
    pub widgets: Arc<WidgetStore>,
}

/// Register every controller under [`BASE_PATH`].
pub fn register(router: &mut Router, services: &Services) {
    let session_doc = DocGroup::new().cookie(services.access.cookie_name(), "Session token");

    router
        .base_path(BASE_PATH)
        .group_document(services.access.soft(), session_doc.clone(), &["user"])
        .group_document(services.access.hard(), session_doc, &["system/status"]);

    system::register(router, services.config.clone());
    login::register(router, services.access.clone());
    widgets::register(router, services.widgets.clone());
}
