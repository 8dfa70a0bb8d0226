//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (at startup, single-threaded):
//!     route / route_options / group / resources
//!     → router.rs (route table, last write wins)
//!     → matcher.rs (ordered group table)
//!     → freeze: per-route group chain, axum::Router + listener layers
//!
//! Incoming Request:
//!     → axum match on method + pattern (404 / 405 before user code)
//!     → dispatch.rs (context, group chain, handler, materialize)
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex anywhere: patterns are axum's `{name}` syntax, groups are
//!   plain prefixes
//! - Deterministic: group middleware runs in registration order

pub mod dispatch;
pub mod matcher;
pub mod router;

pub use router::{FrozenRouter, RouteOptions, Router};
