//! Session tokens and the session registry.
//!
//! # Responsibilities
//! - Issue and validate signed session tokens (HS256 JWT)
//! - Keep the set of known users, their verification state and visits
//!
//! # Design Decisions
//! - Both concerns sit behind traits so access control can be tested with
//!   any implementation
//! - Expired and otherwise invalid tokens are distinct errors; callers
//!   answer them with different statuses
//! - The in-memory store uses `DashMap` so request handlers never contend
//!   on a global lock

use dashmap::DashMap;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::config::SessionConfig;

/// Identity used when a request carries no session cookie.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Claims {
    /// Username.
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
}

impl Claims {
    /// Lifetime left at `now` (seconds since the epoch); zero once expired.
    pub fn remaining(&self, now: u64) -> Duration {
        Duration::from_secs(self.exp.saturating_sub(now))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("session token expired")]
    Expired,
    #[error("invalid session token")]
    Invalid,
    #[error("failed to sign session token: {0}")]
    Signing(String),
}

/// Issues and validates session tokens.
pub trait SessionTokens: Send + Sync {
    fn issue(&self, user: &str) -> Result<String, TokenError>;

    fn validate(&self, token: &str) -> Result<Claims, TokenError>;
}

/// HS256 JWT sessions.
pub struct JwtSessions {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtSessions {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.secret.as_bytes(), Duration::from_secs(config.ttl_secs))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign arbitrary claims.
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }
}

impl SessionTokens for JwtSessions {
    fn issue(&self, user: &str) -> Result<String, TokenError> {
        let now = unix_now();
        self.sign(&Claims {
            sub: user.to_string(),
            iat: now,
            exp: now + self.ttl.as_secs(),
        })
    }

    fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

impl std::fmt::Debug for JwtSessions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSessions").field("ttl", &self.ttl).finish()
    }
}

/// Seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// State of a known user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub username: String,
    /// Creation time, seconds since the epoch.
    pub timestamp: u64,
    /// False until the initial password has been replaced.
    pub verified: bool,
    pub visits: u64,
    pub last_visit: Option<u64>,
}

/// Registry of known users and their sessions.
pub trait SessionStore: Send + Sync {
    fn find(&self, username: &str) -> Option<Session>;

    /// Session for valid credentials, `None` otherwise.
    fn authorize(&self, username: &str, password: &str) -> Option<Session>;

    /// Record an authenticated visit.
    fn visited(&self, username: &str);
}

struct StoredUser {
    password: String,
    session: Session,
}

/// In-memory session registry.
#[derive(Default)]
pub struct MemorySessionStore {
    users: DashMap<String, StoredUser>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a user.
    pub fn insert(&self, username: &str, password: &str, verified: bool) {
        self.users.insert(
            username.to_string(),
            StoredUser {
                password: password.to_string(),
                session: Session {
                    username: username.to_string(),
                    timestamp: unix_now(),
                    verified,
                    visits: 0,
                    last_visit: None,
                },
            },
        );
    }

    pub fn remove(&self, username: &str) -> bool {
        self.users.remove(username).is_some()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn find(&self, username: &str) -> Option<Session> {
        self.users.get(username).map(|u| u.session.clone())
    }

    fn authorize(&self, username: &str, password: &str) -> Option<Session> {
        self.users
            .get(username)
            .filter(|u| u.password == password)
            .map(|u| u.session.clone())
    }

    fn visited(&self, username: &str) {
        if let Some(mut user) = self.users.get_mut(username) {
            user.session.visits += 1;
            user.session.last_visit = Some(unix_now());
        }
    }
}

impl std::fmt::Debug for MemorySessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySessionStore")
            .field("users", &self.users.len())
            .finish()
    }
}
