//! API render server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ listener (HTTP / HTTPS, redirect when both)
//!                       │
//!                       ▼
//!                 panic boundary → request id → trace → CORS
//!                       │
//!                       ▼
//!                 routing (method + pattern)
//!                       │
//!                       ▼
//!                 contextualizer → group middleware → handler
//!                       │
//!                       ▼
//!     ◀────────────── Outcome materialized into the response
//!
//!     Cross-cutting: config, observability, security, docs (OpenAPI)
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use api_render::app::build_router;
use api_render::config::{load_config, ServerConfig};
use api_render::controllers::widgets::Widget;
use api_render::controllers::Services;
use api_render::observability::{logging, metrics};
use api_render::security::MemorySessionStore;
use api_render::HttpServer;

#[derive(Parser)]
#[command(name = "api-render")]
#[command(about = "API server with generated OpenAPI documentation", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the plaintext bind address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Development mode: seed demo users and widgets.
    #[arg(long)]
    dev: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    config.project.dev |= cli.dev;

    logging::init(&config.observability);
    tracing::info!(
        name = %config.project.name,
        version = %config.project.version,
        dev = config.project.dev,
        "Starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let config = Arc::new(config);
    let sessions = Arc::new(MemorySessionStore::new());
    let services = Services::from_config(config.clone(), sessions.clone());

    if config.project.dev {
        seed_demo(&sessions, &services);
    }

    let router = build_router(&services);
    match HttpServer::new(router).run(&config.listener).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Listener failed");
            ExitCode::FAILURE
        }
    }
}

fn seed_demo(sessions: &MemorySessionStore, services: &Services) {
    sessions.insert("admin", "admin", true);
    sessions.insert("guest", "guest", false);

    services.widgets.insert(Widget {
        id: "w1".into(),
        name: "Sprocket".into(),
        tags: vec!["metal".into()],
        parts: Vec::new(),
    });
    services.widgets.insert(Widget {
        id: "w2".into(),
        name: "Gearbox".into(),
        tags: Vec::new(),
        parts: vec![Widget {
            id: "w2a".into(),
            name: "Gear".into(),
            tags: Vec::new(),
            parts: Vec::new(),
        }],
    });

    tracing::info!(users = sessions.len(), "Demo data seeded (users admin/admin, guest/guest)");
}
