//! Route registration and freezing.
//!
//! # Responsibilities
//! - Collect routes, groups and cross-cutting policy during startup
//! - Forward documentation to the attached [`DocViewer`]
//! - Freeze into an immutable `axum::Router` with the listener layers
//!
//! # Design Decisions
//! - Registration is `&mut self` builder style and happens before traffic;
//!   the frozen router is never mutated again
//! - A duplicate method + full path replaces the earlier route (logged)
//! - Group chains and contextualizer/error-handler fallbacks are resolved
//!   per route at freeze time
//! - Layer order, outermost first: panic boundary, request id, trace,
//!   CORS, HTTPS upgrade (plaintext listener only), routes
//! - The CORS stage is always present; without a policy it answers every
//!   OPTIONS request with an empty 200 and adds no allow headers

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::routing::{on, MethodFilter, MethodRouter};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::docs::{DocGroup, DocPayload, DocRoute, DocViewer, NoDocViewer};
use crate::http::handler::{BoxHandler, Contextualizer, ErrorHandler};
use crate::http::middleware::cors::{cors_middleware, CorsPolicy};
use crate::http::middleware::panic::panic_boundary;
use crate::http::middleware::upgrade::{https_upgrade_middleware, HttpsUpgrade};
use crate::routing::dispatch::{dispatch, RouteTarget};
use crate::routing::matcher::{join_path, GroupTable};

pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Per-route overrides.
#[derive(Clone, Default)]
pub struct RouteOptions {
    pub contextualizer: Option<Contextualizer>,
    pub error_handler: Option<ErrorHandler>,
    pub doc: Option<DocPayload>,
}

impl RouteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contextualizer(mut self, contextualizer: Contextualizer) -> Self {
        self.contextualizer = Some(contextualizer);
        self
    }

    pub fn error_handler(mut self, error_handler: ErrorHandler) -> Self {
        self.error_handler = Some(error_handler);
        self
    }

    pub fn doc(mut self, doc: DocPayload) -> Self {
        self.doc = Some(doc);
        self
    }
}

struct RouteEntry {
    method: Method,
    filter: MethodFilter,
    pattern: String,
    handler: BoxHandler,
    contextualizer: Option<Contextualizer>,
    error_handler: Option<ErrorHandler>,
}

/// Route table under construction.
pub struct Router {
    base_path: String,
    routes: Vec<RouteEntry>,
    groups: GroupTable,
    cors: CorsPolicy,
    viewer: Box<dyn DocViewer>,
    contextualizer: Option<Contextualizer>,
    error_handler: Option<ErrorHandler>,
    resources: Vec<(String, PathBuf)>,
    body_limit: usize,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            base_path: String::new(),
            routes: Vec::new(),
            groups: GroupTable::new(),
            cors: CorsPolicy::empty(),
            viewer: Box::new(NoDocViewer),
            contextualizer: None,
            error_handler: None,
            resources: Vec::new(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Scope routes and groups registered from now on under `prefix`.
    pub fn base_path(&mut self, prefix: &str) -> &mut Self {
        self.base_path = join_path(prefix, "");
        if self.base_path == "/" {
            self.base_path.clear();
        }
        self
    }

    pub fn cors(&mut self, policy: CorsPolicy) -> &mut Self {
        self.cors = policy;
        self
    }

    /// Attach a documentation sink. Routes registered earlier are not
    /// replayed into it.
    pub fn doc_viewer(&mut self, viewer: impl DocViewer + 'static) -> &mut Self {
        self.viewer = Box::new(viewer);
        self
    }

    /// Router-wide default contextualizer.
    pub fn contextualizer(&mut self, contextualizer: Contextualizer) -> &mut Self {
        self.contextualizer = Some(contextualizer);
        self
    }

    /// Router-wide error handler for handler rejections.
    pub fn error_handler(&mut self, error_handler: ErrorHandler) -> &mut Self {
        self.error_handler = Some(error_handler);
        self
    }

    pub fn body_limit(&mut self, bytes: usize) -> &mut Self {
        self.body_limit = bytes;
        self
    }

    pub fn route(&mut self, method: Method, pattern: &str, handler: BoxHandler) -> &mut Self {
        self.route_options(method, pattern, handler, RouteOptions::default())
    }

    pub fn route_document(
        &mut self,
        method: Method,
        pattern: &str,
        handler: BoxHandler,
        doc: DocPayload,
    ) -> &mut Self {
        self.route_options(method, pattern, handler, RouteOptions::default().doc(doc))
    }

    pub fn route_options(
        &mut self,
        method: Method,
        pattern: &str,
        handler: BoxHandler,
        options: RouteOptions,
    ) -> &mut Self {
        let full_path = join_path(&self.base_path, pattern);

        let filter = match MethodFilter::try_from(method.clone()) {
            Ok(filter) => filter,
            Err(_) => {
                tracing::warn!(method = %method, path = %full_path, "Unsupported method, route ignored");
                return self;
            }
        };

        let mut doc = options.doc.unwrap_or_default();
        for name in placeholders(&full_path) {
            doc.parameters.entry(name).or_default();
        }
        self.viewer.register_route(DocRoute {
            method: method.clone(),
            base_path: self.base_path.clone(),
            path: pattern.to_string(),
            full_path: full_path.clone(),
            payload: doc,
        });

        if let Some(index) = self
            .routes
            .iter()
            .position(|r| r.method == method && r.pattern == full_path)
        {
            tracing::warn!(method = %method, path = %full_path, "Route registered twice, last registration wins");
            self.routes.remove(index);
        }

        tracing::debug!(method = %method, path = %full_path, "Route registered");
        self.routes.push(RouteEntry {
            method,
            filter,
            pattern: full_path,
            handler,
            contextualizer: options.contextualizer,
            error_handler: options.error_handler,
        });
        self
    }

    /// Append `handler` to the middleware of every prefix.
    pub fn group(&mut self, handler: BoxHandler, prefixes: &[&str]) -> &mut Self {
        self.group_document(handler, DocGroup::default(), prefixes)
    }

    pub fn group_document(&mut self, handler: BoxHandler, doc: DocGroup, prefixes: &[&str]) -> &mut Self {
        for prefix in prefixes {
            let full_prefix = join_path(&self.base_path, prefix);
            tracing::debug!(prefix = %full_prefix, "Group middleware registered");
            self.groups.add(&full_prefix, handler.clone());
            self.viewer.register_group(&full_prefix, doc.clone());
        }
        self
    }

    /// Serve the files under `dir` at `url_prefix`.
    pub fn resources(&mut self, url_prefix: &str, dir: impl Into<PathBuf>) -> &mut Self {
        let prefix = join_path(&self.base_path, url_prefix);
        self.resources.push((prefix, dir.into()));
        self
    }

    /// Record a listener address in the documentation's servers list.
    pub fn register_server(&mut self, url: String, description: String) -> &mut Self {
        self.viewer.register_server(url, description);
        self
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Resolve every route and build the routing table.
    pub fn freeze(self) -> FrozenRouter {
        let Router {
            routes,
            groups,
            cors,
            viewer,
            contextualizer,
            error_handler,
            resources,
            body_limit,
            ..
        } = self;

        let mut table: BTreeMap<String, MethodRouter> = BTreeMap::new();

        for entry in routes {
            let pattern: Arc<str> = Arc::from(entry.pattern.as_str());
            let target = Arc::new(RouteTarget {
                method: entry.method,
                chain: groups.chain_for(&entry.pattern),
                pattern,
                handler: entry.handler,
                contextualizer: entry.contextualizer.or_else(|| contextualizer.clone()),
                error_handler: entry.error_handler.or_else(|| error_handler.clone()),
                body_limit,
            });
            let handler = move |request: Request<Body>| dispatch(target.clone(), request);

            let method_router = match table.remove(&entry.pattern) {
                Some(existing) => existing.on(entry.filter, handler),
                None => on(entry.filter, handler),
            };
            table.insert(entry.pattern, method_router);
        }

        for endpoint in viewer.endpoints() {
            if table.contains_key(&endpoint.path) {
                tracing::warn!(path = %endpoint.path, "Documentation endpoint shadowed by a route");
                continue;
            }
            let Ok(filter) = MethodFilter::try_from(endpoint.method.clone()) else {
                continue;
            };
            let responder = endpoint.responder;
            let handler = move || {
                let responder = responder.clone();
                async move { responder() }
            };
            tracing::debug!(path = %endpoint.path, name = %endpoint.name, "Documentation endpoint registered");
            table.insert(endpoint.path, on(filter, handler));
        }

        let mut app = table
            .into_iter()
            .fold(axum::Router::new(), |app, (path, method_router)| app.route(&path, method_router));

        let mut root_resources = false;
        for (prefix, dir) in resources {
            let prefix = prefix.trim_end_matches('/');
            tracing::debug!(prefix = %prefix, dir = %dir.display(), "Static resources registered");
            if prefix.is_empty() {
                root_resources = true;
                app = app.fallback_service(ServeDir::new(dir));
            } else {
                app = app.nest_service(prefix, ServeDir::new(dir));
            }
        }
        if !root_resources {
            app = app.fallback(|| async { StatusCode::NOT_FOUND });
        }

        FrozenRouter {
            routes: app,
            cors: Arc::new(cors),
        }
    }

    /// Freeze and layer for a plaintext or TLS-only listener.
    pub fn into_service(self) -> axum::Router {
        self.freeze().service(None)
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("base_path", &self.base_path)
            .field("routes", &self.routes.len())
            .field("groups", &self.groups)
            .field("cors", &self.cors)
            .finish()
    }
}

/// Immutable routing table plus the policy its listeners share.
#[derive(Clone)]
pub struct FrozenRouter {
    routes: axum::Router,
    cors: Arc<CorsPolicy>,
}

impl FrozenRouter {
    /// Build a listener service; `upgrade` redirects every request to HTTPS.
    pub fn service(&self, upgrade: Option<HttpsUpgrade>) -> axum::Router {
        let mut app = self.routes.clone();

        if let Some(upgrade) = upgrade {
            app = app.layer(from_fn_with_state(upgrade, https_upgrade_middleware));
        }
        app = app.layer(from_fn_with_state(self.cors.clone(), cors_middleware));

        app.layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(panic_boundary())
    }
}

/// Names of the `{name}` / `{*name}` placeholders in `pattern`.
fn placeholders(pattern: &str) -> Vec<String> {
    pattern
        .split('/')
        .filter_map(|segment| segment.strip_prefix('{')?.strip_suffix('}'))
        .map(|name| name.trim_start_matches('*').to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::handler::from_fn;
    use crate::http::outcome::Outcome;
    use crate::http::request::Exchange;
    use axum::body::to_bytes;
    use tower::ServiceExt;

    fn text(value: &'static str) -> BoxHandler {
        from_fn(move |_ex: &mut Exchange| Outcome::text(value))
    }

    async fn get(app: axum::Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn placeholders_are_extracted() {
        assert_eq!(placeholders("/a/{id}/b/{*rest}"), vec!["id", "rest"]);
        assert!(placeholders("/a/b").is_empty());
    }

    #[test]
    fn base_path_is_normalized() {
        let mut router = Router::new();
        router.base_path("api/v1/");
        assert_eq!(router.base_path, "/api/v1");
        router.base_path("/");
        assert_eq!(router.base_path, "");
    }

    #[tokio::test]
    async fn duplicate_route_last_wins() {
        let mut router = Router::new();
        router
            .route(Method::GET, "/dup", text("first"))
            .route(Method::GET, "/dup", text("second"));
        assert_eq!(router.route_count(), 1);

        let (status, body) = get(router.into_service(), "/dup").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "second");
    }

    #[tokio::test]
    async fn base_path_scopes_routes() {
        let mut router = Router::new();
        router.base_path("/api").route(Method::GET, "/ping", text("pong"));
        let app = router.into_service();

        assert_eq!(get(app.clone(), "/api/ping").await.1, "pong");
        assert_eq!(get(app, "/ping").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn wrong_method_is_405() {
        let mut router = Router::new();
        router.route(Method::POST, "/only-post", text("ok"));
        let (status, _) = get(router.into_service(), "/only-post").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn unknown_path_is_empty_404() {
        let (status, body) = get(Router::new().into_service(), "/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let mut router = Router::new();
        router.route(Method::GET, "/id", text("ok"));
        let response = router
            .into_service()
            .oneshot(Request::get("/id").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }
}
