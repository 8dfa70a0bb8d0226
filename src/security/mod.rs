//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (group prefix matched):
//!     → access_control.rs soft check (cookie → token → known user)
//!     → access_control.rs hard check (verified session, visit recorded)
//!     → Continue to the route handler, or reject with 401/404/406/419
//! ```
//!
//! # Design Decisions
//! - Fail closed: any token problem rejects the request
//! - Token handling and the user registry are collaborators behind traits

pub mod access_control;
pub mod session;

pub use access_control::{current_user, AccessControl, USER_KEY};
pub use session::{JwtSessions, MemorySessionStore, SessionStore, SessionTokens, TokenError};
