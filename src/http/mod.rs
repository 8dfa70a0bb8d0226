//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (listeners, graceful shutdown)
//!     → middleware/ (panic boundary, CORS, HTTPS upgrade)
//!     → [routing resolves the route and runs the pipeline]
//!     → request.rs (RouteRequest, ResponseSink, Exchange)
//!     → handler.rs (contextualizer, group middleware, final handler)
//!     → response.rs (Outcome → Response)
//!     → Send to client
//! ```

pub mod context;
pub mod cookie;
pub mod handler;
pub mod middleware;
pub mod outcome;
pub mod request;
pub mod response;
pub mod server;

pub use context::Context;
pub use handler::{BoxHandler, Contextualizer, ErrorHandler, Handler};
pub use outcome::{Cause, Outcome, Payload};
pub use request::{Exchange, ResponseSink, RouteRequest};
pub use server::{HttpServer, ServerError};
