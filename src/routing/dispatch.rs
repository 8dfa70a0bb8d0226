//! Per-request pipeline for one resolved route.
//!
//! # Data Flow
//! ```text
//! axum route match (method + pattern)
//!     → buffer body (bounded, 413 past the limit)
//!     → capture {name} parameters
//!     → contextualizer (route, else router default, else empty Context)
//!     → group chain (first Err short-circuits, written as-is)
//!     → final handler
//!     → error handler (Err only, when registered) or materialize
//! ```
//!
//! # Design Decisions
//! - Everything here is resolved at freeze time; a request only walks
//!   pre-built vectors
//! - Middleware rejections are expected outcomes and logged at debug
//! - Contextualizer failures are fatal to the request and logged at error

use axum::body::{to_bytes, Body};
use axum::extract::{FromRequestParts, RawPathParams};
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::http::context::Context;
use crate::http::handler::{BoxHandler, Contextualizer, ErrorHandler};
use crate::http::outcome::Outcome;
use crate::http::request::{Exchange, ResponseSink, RouteRequest};
use crate::http::response::{materialize, merge_headers, status_only};
use crate::observability::metrics;

/// A route with everything it needs at request time.
pub struct RouteTarget {
    pub method: Method,
    pub pattern: Arc<str>,
    pub handler: BoxHandler,
    /// Group middleware covering `pattern`, in execution order.
    pub chain: Vec<BoxHandler>,
    pub contextualizer: Option<Contextualizer>,
    pub error_handler: Option<ErrorHandler>,
    pub body_limit: usize,
}

impl std::fmt::Debug for RouteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTarget")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("chain", &self.chain.len())
            .field("contextualizer", &self.contextualizer.is_some())
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}

/// Run the pipeline and record request metrics.
pub async fn dispatch(target: Arc<RouteTarget>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let response = run(&target, request).await;
    metrics::record_request(
        target.method.as_str(),
        &target.pattern,
        response.status().as_u16(),
        start,
    );
    response
}

async fn run(target: &RouteTarget, request: Request<Body>) -> Response {
    let (mut parts, body) = request.into_parts();

    let params: HashMap<String, String> = match RawPathParams::from_request_parts(&mut parts, &()).await {
        Ok(raw) => raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        Err(_) => HashMap::new(),
    };

    // Any read failure is reported as 413; the limit is the only error a
    // well-behaved client can trigger here.
    let body = match to_bytes(body, target.body_limit).await {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!(pattern = %target.pattern, error = %e, "Request body rejected");
            metrics::record_rejection("body", StatusCode::PAYLOAD_TOO_LARGE.as_u16());
            return status_only(StatusCode::PAYLOAD_TOO_LARGE);
        }
    };

    let request = RouteRequest::new(parts, target.pattern.clone(), params, body);
    let mut sink = ResponseSink::new();

    let context = match &target.contextualizer {
        Some(contextualize) => match contextualize(&request, &mut sink) {
            Ok(context) => context,
            Err(cause) => {
                tracing::error!(
                    method = %target.method,
                    pattern = %target.pattern,
                    error = %cause,
                    "Contextualizer failed"
                );
                metrics::record_rejection("context", StatusCode::INTERNAL_SERVER_ERROR.as_u16());
                return status_only(StatusCode::INTERNAL_SERVER_ERROR);
            }
        },
        None => Context::new(),
    };

    let mut exchange = Exchange::new(request, sink, context);

    for middleware in &target.chain {
        let outcome = middleware.call(&mut exchange).await;
        if outcome.is_err() {
            tracing::debug!(
                method = %target.method,
                pattern = %target.pattern,
                status = outcome.status().as_u16(),
                "Request rejected by group middleware"
            );
            metrics::record_rejection("group", outcome.status().as_u16());
            return materialize(outcome, exchange.sink);
        }
    }

    let outcome = target.handler.call(&mut exchange).await;
    finish(target, exchange, outcome)
}

fn finish(target: &RouteTarget, mut exchange: Exchange, outcome: Outcome) -> Response {
    if outcome.is_err() {
        metrics::record_rejection("handler", outcome.status().as_u16());
    }
    if let (true, Some(render)) = (outcome.is_err(), &target.error_handler) {
        let response = render(&mut exchange, outcome);
        return merge_headers(response, exchange.sink);
    }
    materialize(outcome, exchange.sink)
}
