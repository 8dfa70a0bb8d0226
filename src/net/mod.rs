//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → plaintext: tokio TcpListener served by axum
//!     → TLS: tls.rs (rustls config) served by axum-server
//!     → Hand off to the frozen router
//! ```
//!
//! # Design Decisions
//! - TLS material is loaded once before the listener starts
//! - Certificate problems surface as errors before any traffic

pub mod tls;
