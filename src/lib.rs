//! API server core: pattern router with group middleware, request-scoped
//! context, an Ok/Err outcome contract, dual plaintext/TLS listening and
//! OpenAPI documentation generated from Rust types.

pub mod app;
pub mod config;
pub mod controllers;
pub mod docs;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::ServerConfig;
pub use http::{Context, Exchange, HttpServer, Outcome};
pub use routing::Router;
