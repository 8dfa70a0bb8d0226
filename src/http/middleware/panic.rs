//! Per-request panic boundary.
//!
//! Wraps `tower_http`'s `CatchPanicLayer` so a panic anywhere in the
//! pipeline is logged and answered with a bare 500 for that request only.

use axum::{body::Body, http::StatusCode, response::Response};
use std::any::Any;
use tower_http::catch_panic::CatchPanicLayer;

use crate::observability::metrics;

/// Panic handler type used by [`panic_boundary`].
pub type PanicHandler = fn(Box<dyn Any + Send + 'static>) -> Response;

/// Layer that converts panics into 500 responses.
pub fn panic_boundary() -> CatchPanicLayer<PanicHandler> {
    CatchPanicLayer::custom(handle_panic as PanicHandler)
}

fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };

    tracing::error!(panic = %detail, "Recovered from panic while handling request");
    metrics::record_panic();

    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_payload_becomes_500() {
        let response = handle_panic(Box::new("boom".to_string()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn opaque_payload_becomes_500() {
        let response = handle_panic(Box::new(42u8));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
