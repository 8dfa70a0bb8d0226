//! System metadata endpoints.

use axum::http::Method;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::config::ServerConfig;
use crate::docs::{DocItem, DocPayload};
use crate::http::handler::from_fn;
use crate::http::outcome::Outcome;
use crate::http::request::Exchange;
use crate::routing::Router;
use crate::security::session::unix_now;

#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub name: String,
    pub version: String,
    pub dev: bool,
    pub started_at: u64,
    pub uptime_secs: u64,
}

crate::describe_struct!(SystemStatus {
    name: String,
    version: String,
    dev: bool,
    #[description = "Start time, seconds since the Unix epoch"]
    started_at: u64,
    uptime_secs: u64,
});

pub fn register(router: &mut Router, config: Arc<ServerConfig>) {
    let started = Instant::now();
    let started_at = unix_now();

    router
        .route_document(
            Method::GET,
            "system/status",
            from_fn(move |_ex: &mut Exchange| {
                Outcome::ok(&SystemStatus {
                    name: config.project.name.clone(),
                    version: config.project.version.clone(),
                    dev: config.project.dev,
                    started_at,
                    uptime_secs: started.elapsed().as_secs(),
                })
            }),
            DocPayload::new()
                .description("Server metadata")
                .response(200, DocItem::of::<SystemStatus>("Current status")),
        )
        .route_document(
            Method::GET,
            "system/ping",
            from_fn(|_ex: &mut Exchange| Outcome::text("pong")),
            DocPayload::new()
                .description("Liveness probe")
                .response(200, DocItem::of::<String>("Always `pong`")),
        );
}
