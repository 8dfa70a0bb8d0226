//! Listener-level middleware, applied around the routing table.

pub mod cors;
pub mod panic;
pub mod upgrade;

pub use cors::CorsPolicy;
pub use upgrade::HttpsUpgrade;
