//! Login, logout and current-user endpoints.

use axum::http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::docs::{DocItem, DocPayload};
use crate::http::handler::from_fn;
use crate::http::outcome::Outcome;
use crate::http::request::Exchange;
use crate::routing::Router;
use crate::security::{current_user, AccessControl};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

crate::describe_struct!(LoginRequest {
    username: String,
    password: String,
});

#[derive(Debug, Clone, Serialize)]
pub struct UserData {
    pub username: String,
    pub timestamp: u64,
    pub verified: bool,
    pub visits: u64,
}

crate::describe_struct!(UserData {
    username: String,
    timestamp: u64,
    verified: bool,
    visits: u64,
});

pub fn register(router: &mut Router, access: Arc<AccessControl>) {
    let login = {
        let access = access.clone();
        from_fn(move |ex: &mut Exchange| {
            let credentials: LoginRequest = match ex.request.json() {
                Ok(credentials) => credentials,
                Err(e) => return Outcome::err(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            };

            if access
                .sessions()
                .authorize(&credentials.username, &credentials.password)
                .is_none()
            {
                tracing::debug!(user = %credentials.username, "Login refused");
                return Outcome::err(StatusCode::UNAUTHORIZED, "unauthorized");
            }

            if let Err(e) = access.open_session(&mut ex.sink, &credentials.username) {
                return Outcome::failure(e.to_string());
            }
            tracing::info!(user = %credentials.username, "Session opened");
            Outcome::empty()
        })
    };

    let logout = {
        let access = access.clone();
        from_fn(move |ex: &mut Exchange| {
            access.close_session(&mut ex.sink);
            Outcome::empty()
        })
    };

    let user = from_fn(move |ex: &mut Exchange| {
        let username = current_user(&ex.context);
        match access.sessions().find(username) {
            Some(session) => Outcome::ok(&UserData {
                username: session.username,
                timestamp: session.timestamp,
                verified: session.verified,
                visits: session.visits,
            }),
            None => Outcome::err(StatusCode::NOT_FOUND, "user not found"),
        }
    });

    router
        .route_document(
            Method::POST,
            "login",
            login,
            DocPayload::new()
                .description("Open a session; the token is set as a cookie")
                .request(DocItem::of::<LoginRequest>("Credentials"))
                .response(200, DocItem::described("Session cookie set"))
                .response(401, DocItem::described("Unknown user or wrong password"))
                .response(422, DocItem::described("Malformed body")),
        )
        .route_document(
            Method::DELETE,
            "login",
            logout,
            DocPayload::new()
                .description("Close the session")
                .response(200, DocItem::described("Session cookie cleared")),
        )
        .route_document(
            Method::GET,
            "user",
            user,
            DocPayload::new()
                .description("Data of the logged user")
                .response(200, DocItem::of::<UserData>("Logged user"))
                .response(404, DocItem::described("No session")),
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::factory::conformance::assert_documents;

    #[test]
    fn schemas_match_serialized_shape() {
        assert_documents(&LoginRequest {
            username: "admin".into(),
            password: "admin".into(),
        });
        assert_documents(&UserData {
            username: "admin".into(),
            timestamp: 1,
            verified: true,
            visits: 2,
        });
    }
}
