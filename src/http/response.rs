//! Outcome materialization.
//!
//! # Responsibilities
//! - Map every [`Outcome`] to exactly one HTTP response
//! - Merge headers accumulated in the [`ResponseSink`] into that response
//!
//! # Design Decisions
//! - Text and raw bytes are written verbatim without a content-type override
//! - Any JSON payload gets `Content-Type: application/json`
//! - A serialization failure or an error returned as success becomes a 500
//!   carrying the error's message as plain text

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;

use crate::http::outcome::{Outcome, Payload};
use crate::http::request::ResponseSink;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

/// Response with only a status line.
pub fn status_only(status: StatusCode) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

/// Response with a status and a plain-text message.
pub fn plain_text(status: StatusCode, message: String) -> Response {
    let mut response = Response::new(Body::from(message));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
    response
}

/// Turn an outcome into a response, without any custom error handler.
pub fn materialize(outcome: Outcome, sink: ResponseSink) -> Response {
    let response = match outcome {
        Outcome::Err {
            status,
            cause: Some(cause),
        } => plain_text(status, cause.message()),
        Outcome::Err { status, cause: None } => status_only(status),
        Outcome::Ok(payload) => materialize_payload(payload),
    };
    merge_headers(response, sink)
}

fn materialize_payload(payload: Payload) -> Response {
    match payload {
        Payload::Empty => status_only(StatusCode::OK),
        Payload::Text(text) => Response::new(Body::from(text)),
        Payload::Bytes(bytes) => Response::new(Body::from(bytes)),
        Payload::Failure(cause) => {
            tracing::warn!(error = %cause, "Handler returned an error as success");
            plain_text(StatusCode::INTERNAL_SERVER_ERROR, cause.message())
        }
        Payload::Json(Ok(body)) => {
            let mut response = Response::new(Body::from(body));
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
            response
        }
        Payload::Json(Err(e)) => {
            tracing::error!(error = %e, "Failed to serialize response payload");
            plain_text(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Append the sink's headers to `response`.
pub fn merge_headers(mut response: Response, sink: ResponseSink) -> Response {
    let headers = response.headers_mut();
    let mut last_name = None;
    for (name, value) in sink.into_headers() {
        // `None` names continue the previous header's value list.
        if let Some(name) = name {
            last_name = Some(name);
        }
        if let Some(name) = &last_name {
            headers.append(name.clone(), value);
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::outcome::Cause;
    use axum::body::to_bytes;
    use serde::Serialize;

    async fn body_of(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    #[tokio::test]
    async fn text_is_verbatim() {
        let response = materialize(Outcome::text("hello"), ResponseSink::new());
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
        assert_eq!(body_of(response).await, b"hello");
    }

    #[tokio::test]
    async fn reject_without_cause_is_empty() {
        let response = materialize(Outcome::reject(StatusCode::NOT_FOUND), ResponseSink::new());
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_of(response).await.is_empty());
    }

    #[tokio::test]
    async fn reject_with_cause_writes_message() {
        let response = materialize(
            Outcome::err(StatusCode::UNAUTHORIZED, "bad token"),
            ResponseSink::new(),
        );
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_of(response).await, b"bad token");
    }

    #[tokio::test]
    async fn failure_payload_is_500() {
        let outcome = Outcome::failure(Cause::new(std::io::Error::other("disk gone")));
        let response = materialize(outcome, ResponseSink::new());
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(response).await, b"disk gone");
    }

    #[tokio::test]
    async fn serialization_failure_is_500() {
        struct Broken;
        impl Serialize for Broken {
            fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
                Err(serde::ser::Error::custom("cannot encode"))
            }
        }
        let response = materialize(Outcome::ok(&Broken), ResponseSink::new());
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(response).await, b"cannot encode");
    }

    #[tokio::test]
    async fn json_sets_content_type() {
        let response = materialize(Outcome::ok(&vec![1, 2, 3]), ResponseSink::new());
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            APPLICATION_JSON
        );
        assert_eq!(body_of(response).await, b"[1,2,3]");
    }

    #[tokio::test]
    async fn sink_headers_survive_rejections() {
        let mut sink = ResponseSink::new();
        sink.clear_cookie("sid").append_header("x-trace", "a").append_header("x-trace", "b");
        let response = materialize(Outcome::reject(StatusCode::UNAUTHORIZED), sink);
        assert!(response.headers().get(header::SET_COOKIE).is_some());
        assert_eq!(response.headers().get_all("x-trace").iter().count(), 2);
    }
}
