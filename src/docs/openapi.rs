//! OpenAPI 3.0 documentation sink.
//!
//! # Responsibilities
//! - Accumulate route and group documentation during registration
//! - Build the JSON document exactly once, on the first request for it
//! - Serve an interactive Swagger UI page and the raw document
//!
//! # Design Decisions
//! - The build is guarded by `OnceLock`; concurrent first requests wait on
//!   one build instead of racing
//! - Group headers/cookies/responses apply to every route whose full path
//!   the group prefix covers; group responses win over route responses
//! - Methods without an OpenAPI slot are logged and skipped

use axum::body::Body;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use crate::docs::schema::{
    Info, MediaType, OpenApi, Operation, Parameter, ParameterLocation, PathItem, RequestBody,
    ResponseDoc, Schema, Server,
};
use crate::docs::{DocEndpoint, DocGroup, DocItem, DocRoute, DocViewer, SchemaFactory};

pub const UI_PATH: &str = "/swagger/";
pub const DOCUMENT_PATH: &str = "/swagger/doc.json";

const APPLICATION_JSON: &str = "application/json";
const MULTIPART: &str = "multipart/form-data";

/// Error loading a seed document.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read seed document: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse seed document: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Documentation sink producing an OpenAPI 3.0 document.
#[derive(Debug, Clone)]
pub struct OpenApiViewer {
    base: OpenApi,
    routes: Vec<DocRoute>,
    groups: Vec<(String, DocGroup)>,
}

impl OpenApiViewer {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self::from_document(OpenApi {
            info: Info {
                title: title.into(),
                version: version.into(),
                description: None,
            },
            ..OpenApi::default()
        })
    }

    /// Start from an existing document; registered paths are added to it.
    pub fn from_document(mut base: OpenApi) -> Self {
        base.servers.clear();
        Self {
            base,
            routes: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Load a YAML (or JSON) seed document from disk.
    pub fn from_seed_file(path: &Path) -> Result<Self, SeedError> {
        let content = std::fs::read_to_string(path)?;
        let base: OpenApi = serde_yaml::from_str(&content)?;
        Ok(Self::from_document(base))
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.base.info.description = Some(description.into());
        self
    }

    /// Build the full document. Pure: the cache lives in the served endpoint.
    pub fn build(&self) -> OpenApi {
        let mut document = self.base.clone();
        let mut factory = SchemaFactory::new();

        for route in &self.routes {
            let operation = self.operation(route, &mut factory);
            let item = document.paths.entry(route.full_path.clone()).or_default();
            if let Some(slot) = operation_slot(item, &route.method) {
                *slot = Some(operation);
            }
        }

        document.components.schemas.extend(factory.into_components());
        document
    }

    fn matching_groups<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a DocGroup> + 'a {
        self.groups
            .iter()
            .filter(move |(prefix, _)| path.starts_with(prefix.as_str()))
            .map(|(_, group)| group)
    }

    fn operation(&self, route: &DocRoute, factory: &mut SchemaFactory) -> Operation {
        Operation {
            tags: make_tags(route),
            description: route.payload.description.clone(),
            parameters: self.parameters(route),
            request_body: make_request_body(route, factory),
            responses: self.responses(route, factory),
        }
    }

    fn parameters(&self, route: &DocRoute) -> Vec<Parameter> {
        let mut parameters = Vec::new();

        for group in self.matching_groups(&route.full_path) {
            for (name, description) in &group.headers {
                parameters.push(parameter(name, description, ParameterLocation::Header, true));
            }
            for (name, description) in &group.cookies {
                parameters.push(parameter(name, description, ParameterLocation::Cookie, true));
            }
        }

        let payload = &route.payload;
        for (name, description) in &payload.parameters {
            parameters.push(parameter(name, description, ParameterLocation::Path, true));
        }
        for (name, description) in &payload.query {
            parameters.push(parameter(name, description, ParameterLocation::Query, false));
        }
        for (name, description) in &payload.cookies {
            parameters.push(parameter(name, description, ParameterLocation::Cookie, true));
        }

        parameters
    }

    fn responses(&self, route: &DocRoute, factory: &mut SchemaFactory) -> BTreeMap<String, ResponseDoc> {
        let mut responses = make_responses(&route.payload.responses, factory);
        for group in self.matching_groups(&route.full_path) {
            responses.extend(make_responses(&group.responses, factory));
        }
        responses
    }
}

impl DocViewer for OpenApiViewer {
    fn register_route(&mut self, route: DocRoute) {
        if operation_slot(&mut PathItem::default(), &route.method).is_none() {
            tracing::warn!(method = %route.method, path = %route.full_path, "Unsupported HTTP method for documentation");
            return;
        }
        tracing::debug!(method = %route.method, path = %route.full_path, "Route documented");

        // Last registration of a method+path wins, as in dispatch.
        self.routes
            .retain(|r| !(r.method == route.method && r.full_path == route.full_path));
        self.routes.push(route);
    }

    fn register_group(&mut self, prefix: &str, group: DocGroup) {
        match self.groups.iter_mut().find(|(p, _)| p == prefix) {
            Some((_, existing)) => existing.merge(group),
            None => self.groups.push((prefix.to_string(), group)),
        }
    }

    fn register_server(&mut self, url: String, description: String) {
        if self.base.servers.iter().any(|s| s.url == url) {
            return;
        }
        self.base.servers.push(Server { url, description });
    }

    fn endpoints(self: Box<Self>) -> Vec<DocEndpoint> {
        let document = Arc::new(CachedDocument::new(*self));
        tracing::info!(path = UI_PATH, "API documentation available");

        vec![
            DocEndpoint {
                method: Method::GET,
                path: UI_PATH.to_string(),
                name: "OAS3".to_string(),
                description: "OpenAPI 3.0 view".to_string(),
                responder: Arc::new(swagger_ui),
            },
            DocEndpoint {
                method: Method::GET,
                path: DOCUMENT_PATH.to_string(),
                name: "OAS3 JSON".to_string(),
                description: "OpenAPI 3.0 definition".to_string(),
                responder: Arc::new(move || document.response()),
            },
        ]
    }
}

/// Frozen viewer plus its build-once serialized document.
#[derive(Debug)]
pub struct CachedDocument {
    viewer: OpenApiViewer,
    bytes: OnceLock<Bytes>,
}

impl CachedDocument {
    pub fn new(viewer: OpenApiViewer) -> Self {
        Self {
            viewer,
            bytes: OnceLock::new(),
        }
    }

    /// Serialized document; built on the first call only.
    pub fn bytes(&self) -> Bytes {
        self.bytes
            .get_or_init(|| {
                let document = self.viewer.build();
                tracing::debug!(paths = document.paths.len(), "OpenAPI document built");
                match serde_json::to_vec(&document) {
                    Ok(bytes) => Bytes::from(bytes),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to serialize OpenAPI document");
                        Bytes::new()
                    }
                }
            })
            .clone()
    }

    pub fn response(&self) -> Response {
        let mut response = Response::new(Body::from(self.bytes()));
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        response
    }
}

fn operation_slot<'a>(item: &'a mut PathItem, method: &Method) -> Option<&'a mut Option<Operation>> {
    match *method {
        Method::GET => Some(&mut item.get),
        Method::POST => Some(&mut item.post),
        Method::PUT => Some(&mut item.put),
        Method::DELETE => Some(&mut item.delete),
        Method::PATCH => Some(&mut item.patch),
        Method::HEAD => Some(&mut item.head),
        Method::OPTIONS => Some(&mut item.options),
        _ => None,
    }
}

fn parameter(name: &str, description: &str, location: ParameterLocation, required: bool) -> Parameter {
    Parameter {
        name: name.to_string(),
        location,
        description: description.to_string(),
        required,
        schema: Some(Schema::string()),
    }
}

/// Explicit tags, else the base path and the first static path segment.
fn make_tags(route: &DocRoute) -> Vec<String> {
    if let Some(tags) = &route.payload.tags {
        return tags.clone();
    }

    let mut tags = Vec::new();
    let base = route.base_path.trim_matches('/');
    if !base.is_empty() {
        tags.push(base.to_string());
    }

    let first = route.path.trim_start_matches('/').split('/').next().unwrap_or("");
    if !first.is_empty() && !first.starts_with('{') {
        tags.push(first.to_string());
    }
    tags
}

fn make_request_body(route: &DocRoute, factory: &mut SchemaFactory) -> Option<RequestBody> {
    let mut content = BTreeMap::new();
    let mut description = String::new();

    if let Some(item) = &route.payload.request {
        description = item.description.clone();
        if let Some(source) = item.schema {
            content.insert(
                APPLICATION_JSON.to_string(),
                MediaType {
                    schema: Some(source(factory)),
                },
            );
        }
    }

    if !route.payload.files.is_empty() {
        let properties = route
            .payload
            .files
            .iter()
            .map(|(name, d)| (name.clone(), Schema::binary().with_description(d.clone())))
            .collect();
        let multipart = Schema {
            properties,
            ..Schema::object()
        };
        content.insert(
            MULTIPART.to_string(),
            MediaType {
                schema: Some(multipart),
            },
        );
    }

    if content.is_empty() && description.is_empty() {
        return None;
    }
    Some(RequestBody { description, content })
}

fn make_responses(
    items: &BTreeMap<String, DocItem>,
    factory: &mut SchemaFactory,
) -> BTreeMap<String, ResponseDoc> {
    items
        .iter()
        .map(|(status, item)| {
            let content = item
                .schema
                .map(|source| {
                    BTreeMap::from([(
                        APPLICATION_JSON.to_string(),
                        MediaType {
                            schema: Some(source(factory)),
                        },
                    )])
                })
                .unwrap_or_default();
            (
                status.clone(),
                ResponseDoc {
                    description: item.description.clone(),
                    content,
                },
            )
        })
        .collect()
}

fn swagger_ui() -> Response {
    let mut response = Response::new(Body::from(SWAGGER_UI_HTML));
    *response.status_mut() = StatusCode::OK;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
    response
}

const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <title>API documentation</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js" crossorigin></script>
  <script>
    window.onload = () => {
      window.ui = SwaggerUIBundle({
        url: "/swagger/doc.json",
        dom_id: "#swagger-ui",
        deepLinking: true,
      });
    };
  </script>
</body>
</html>
"##;
