//! Handler, contextualizer and error-handler contracts.
//!
//! Group middleware and final handlers share one signature: they receive the
//! request [`Exchange`] by `&mut` and return an [`Outcome`].

use axum::response::Response;
use futures_util::future::BoxFuture;
use std::sync::Arc;

use crate::http::context::Context;
use crate::http::outcome::{Cause, Outcome};
use crate::http::request::{Exchange, ResponseSink, RouteRequest};

/// A stage that turns an exchange into an outcome.
pub trait Handler: Send + Sync + 'static {
    fn call<'a>(&'a self, exchange: &'a mut Exchange) -> BoxFuture<'a, Outcome>;
}

/// Shared, type-erased handler.
pub type BoxHandler = Arc<dyn Handler>;

/// Produces the initial [`Context`] of a request.
pub type Contextualizer =
    Arc<dyn Fn(&RouteRequest, &mut ResponseSink) -> Result<Context, Cause> + Send + Sync>;

/// Renders a rejection. Owns the whole response once invoked.
pub type ErrorHandler = Arc<dyn Fn(&mut Exchange, Outcome) -> Response + Send + Sync>;

/// Handler backed by a synchronous closure.
pub struct FnHandler<F>(F);

impl<F> Handler for FnHandler<F>
where
    F: Fn(&mut Exchange) -> Outcome + Send + Sync + 'static,
{
    fn call<'a>(&'a self, exchange: &'a mut Exchange) -> BoxFuture<'a, Outcome> {
        let outcome = (self.0)(exchange);
        Box::pin(async move { outcome })
    }
}

/// Handler backed by a closure returning a boxed future.
pub struct AsyncHandler<F>(F);

impl<F> Handler for AsyncHandler<F>
where
    F: for<'a> Fn(&'a mut Exchange) -> BoxFuture<'a, Outcome> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, exchange: &'a mut Exchange) -> BoxFuture<'a, Outcome> {
        (self.0)(exchange)
    }
}

/// Wrap a synchronous closure.
pub fn from_fn<F>(f: F) -> BoxHandler
where
    F: Fn(&mut Exchange) -> Outcome + Send + Sync + 'static,
{
    Arc::new(FnHandler(f))
}

/// Wrap an async closure, e.g. `from_async(|ex| Box::pin(async move { ... }))`.
pub fn from_async<F>(f: F) -> BoxHandler
where
    F: for<'a> Fn(&'a mut Exchange) -> BoxFuture<'a, Outcome> + Send + Sync + 'static,
{
    Arc::new(AsyncHandler(f))
}

/// Wrap a contextualizer closure.
pub fn contextualizer<F>(f: F) -> Contextualizer
where
    F: Fn(&RouteRequest, &mut ResponseSink) -> Result<Context, Cause> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap an error-handler closure.
pub fn error_handler<F>(f: F) -> ErrorHandler
where
    F: Fn(&mut Exchange, Outcome) -> Response + Send + Sync + 'static,
{
    Arc::new(f)
}
