//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build router → Start listeners
//!
//! Shutdown (signals.rs):
//!     SIGTERM/SIGINT → listeners stop accepting → in-flight requests drain → Exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then logging, then listeners
//! - Every listener subscribes to the same signal future independently

pub mod signals;

pub use signals::shutdown_signal;
