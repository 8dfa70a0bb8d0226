//! Session-based access control as group middleware.
//!
//! # Responsibilities
//! - Soft check: resolve the caller from the session cookie, anonymous
//!   when there is none
//! - Hard check: additionally require a known, verified session
//! - Issue and clear the session cookie
//!
//! # Design Decisions
//! - Both checks are ordinary group handlers; precedence comes from the
//!   order their prefixes are registered
//! - The resolved username is stored in the request Context under
//!   [`USER_KEY`]
//! - A token close to expiry is replaced on the way through

use axum::http::StatusCode;
use std::sync::Arc;
use std::time::Duration;

use crate::config::SessionConfig;
use crate::http::context::Context;
use crate::http::cookie::Cookie;
use crate::http::handler::{from_fn, BoxHandler};
use crate::http::outcome::Outcome;
use crate::http::request::{Exchange, ResponseSink};
use crate::security::session::{unix_now, SessionStore, SessionTokens, TokenError, ANONYMOUS_USER};

/// Context key of the resolved username.
pub const USER_KEY: &str = "user";

/// Non-standard status answered for an expired session.
pub const SESSION_EXPIRED: u16 = 419;

/// Username resolved by the soft check, anonymous otherwise.
pub fn current_user(context: &Context) -> &str {
    context
        .get::<String>(USER_KEY)
        .map(String::as_str)
        .unwrap_or(ANONYMOUS_USER)
}

pub struct AccessControl {
    tokens: Arc<dyn SessionTokens>,
    sessions: Arc<dyn SessionStore>,
    cookie_name: String,
    refresh_window: Duration,
}

impl AccessControl {
    pub fn new(
        tokens: Arc<dyn SessionTokens>,
        sessions: Arc<dyn SessionStore>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            tokens,
            sessions,
            cookie_name: config.cookie_name.clone(),
            refresh_window: Duration::from_secs(config.refresh_window_secs),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Group handler running the soft check.
    pub fn soft(self: &Arc<Self>) -> BoxHandler {
        let this = self.clone();
        from_fn(move |exchange: &mut Exchange| this.check_soft(exchange))
    }

    /// Group handler running the soft then the hard check.
    pub fn hard(self: &Arc<Self>) -> BoxHandler {
        let this = self.clone();
        from_fn(move |exchange: &mut Exchange| this.check_hard(exchange))
    }

    /// Set a fresh session cookie for `user`.
    pub fn open_session(&self, sink: &mut ResponseSink, user: &str) -> Result<(), TokenError> {
        let token = self.tokens.issue(user)?;
        sink.set_cookie(&Cookie::session(&self.cookie_name, token));
        Ok(())
    }

    pub fn close_session(&self, sink: &mut ResponseSink) {
        sink.clear_cookie(&self.cookie_name);
    }

    pub fn check_soft(&self, exchange: &mut Exchange) -> Outcome {
        let Some(token) = exchange.request.cookie(&self.cookie_name).map(str::to_string) else {
            exchange.context.insert(USER_KEY, ANONYMOUS_USER.to_string());
            return Outcome::empty();
        };

        let claims = match self.tokens.validate(&token) {
            Ok(claims) => claims,
            Err(TokenError::Expired) => {
                self.close_session(&mut exchange.sink);
                return Outcome::err(session_expired(), TokenError::Expired.to_string());
            }
            Err(e) => return Outcome::err(StatusCode::UNAUTHORIZED, e.to_string()),
        };

        if self.sessions.find(&claims.sub).is_none() {
            return Outcome::err(StatusCode::NOT_FOUND, "user not exists");
        }

        if claims.remaining(unix_now()) < self.refresh_window {
            if let Err(e) = self.open_session(&mut exchange.sink, &claims.sub) {
                return Outcome::err(StatusCode::UNAUTHORIZED, e.to_string());
            }
            tracing::debug!(user = %claims.sub, "Session token refreshed");
        }

        exchange.context.insert(USER_KEY, claims.sub);
        Outcome::empty()
    }

    pub fn check_hard(&self, exchange: &mut Exchange) -> Outcome {
        let soft = self.check_soft(exchange);
        if soft.is_err() {
            return soft;
        }

        let Some(user) = exchange.context.get::<String>(USER_KEY) else {
            return Outcome::reject(StatusCode::NOT_FOUND);
        };

        let Some(session) = self.sessions.find(user) else {
            return Outcome::reject(StatusCode::NOT_FOUND);
        };

        if !session.verified {
            return Outcome::err(StatusCode::NOT_ACCEPTABLE, "password update required");
        }

        self.sessions.visited(&session.username);
        Outcome::empty()
    }
}

impl std::fmt::Debug for AccessControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessControl")
            .field("cookie_name", &self.cookie_name)
            .field("refresh_window", &self.refresh_window)
            .finish()
    }
}

fn session_expired() -> StatusCode {
    StatusCode::from_u16(SESSION_EXPIRED).unwrap_or(StatusCode::UNAUTHORIZED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::RouteRequest;
    use crate::security::session::{Claims, JwtSessions, MemorySessionStore};
    use axum::http::{header, Request};

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    struct Fixture {
        jwt: Arc<JwtSessions>,
        store: Arc<MemorySessionStore>,
        access: Arc<AccessControl>,
    }

    fn fixture() -> Fixture {
        let jwt = Arc::new(JwtSessions::new(SECRET, Duration::from_secs(1800)));
        let store = Arc::new(MemorySessionStore::new());
        store.insert("alice", "pw", true);
        store.insert("pending", "pw", false);
        let access = Arc::new(AccessControl::new(
            jwt.clone(),
            store.clone(),
            &SessionConfig::default(),
        ));
        Fixture { jwt, store, access }
    }

    fn exchange(cookie: Option<String>) -> Exchange {
        let mut builder = Request::builder().uri("/api/v1/user");
        if let Some(token) = cookie {
            builder = builder.header(header::COOKIE, format!("Api-Client-Session={}", token));
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        let request = RouteRequest::new(parts, Arc::from("/api/v1/user"), Default::default(), Default::default());
        Exchange::new(request, ResponseSink::new(), Context::new())
    }

    fn token_with_remaining(jwt: &JwtSessions, user: &str, remaining: u64) -> String {
        let now = unix_now();
        jwt.sign(&Claims {
            sub: user.into(),
            iat: now,
            exp: now + remaining,
        })
        .unwrap()
    }

    #[test]
    fn soft_without_cookie_is_anonymous() {
        let f = fixture();
        let mut ex = exchange(None);
        assert!(f.access.check_soft(&mut ex).is_ok());
        assert_eq!(current_user(&ex.context), ANONYMOUS_USER);
    }

    #[test]
    fn soft_with_valid_token_stores_user() {
        let f = fixture();
        let mut ex = exchange(Some(f.jwt.issue("alice").unwrap()));
        assert!(f.access.check_soft(&mut ex).is_ok());
        assert_eq!(current_user(&ex.context), "alice");
        assert!(ex.sink.headers().get(header::SET_COOKIE).is_none());
    }

    #[test]
    fn soft_refreshes_token_near_expiry() {
        let f = fixture();
        let mut ex = exchange(Some(token_with_remaining(&f.jwt, "alice", 60)));
        assert!(f.access.check_soft(&mut ex).is_ok());
        let cookie = ex.sink.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("Api-Client-Session="));
        assert!(!cookie.contains("Max-Age=0"));
    }

    #[test]
    fn soft_rejects_invalid_token() {
        let f = fixture();
        let mut ex = exchange(Some("not-a-token".into()));
        let outcome = f.access.check_soft(&mut ex);
        assert_eq!(outcome.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn soft_clears_expired_token() {
        let f = fixture();
        let now = unix_now();
        let token = f
            .jwt
            .sign(&Claims {
                sub: "alice".into(),
                iat: now - 3600,
                exp: now - 10,
            })
            .unwrap();
        let mut ex = exchange(Some(token));
        let outcome = f.access.check_soft(&mut ex);
        assert_eq!(outcome.status().as_u16(), SESSION_EXPIRED);
        let cookie = ex.sink.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn soft_rejects_unknown_user() {
        let f = fixture();
        let mut ex = exchange(Some(f.jwt.issue("ghost").unwrap()));
        let outcome = f.access.check_soft(&mut ex);
        assert_eq!(outcome.status(), StatusCode::NOT_FOUND);
        assert_eq!(outcome.cause().unwrap().message(), "user not exists");
    }

    #[test]
    fn hard_requires_verified_session() {
        let f = fixture();
        let mut ex = exchange(Some(f.jwt.issue("pending").unwrap()));
        let outcome = f.access.check_hard(&mut ex);
        assert_eq!(outcome.status(), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(outcome.cause().unwrap().message(), "password update required");
    }

    #[test]
    fn hard_rejects_anonymous() {
        let f = fixture();
        let mut ex = exchange(None);
        let outcome = f.access.check_hard(&mut ex);
        assert_eq!(outcome.status(), StatusCode::NOT_FOUND);
        assert!(outcome.cause().is_none());
    }

    #[test]
    fn hard_marks_visit() {
        let f = fixture();
        let mut ex = exchange(Some(f.jwt.issue("alice").unwrap()));
        assert!(f.access.check_hard(&mut ex).is_ok());
        assert_eq!(f.store.find("alice").unwrap().visits, 1);
    }
}
