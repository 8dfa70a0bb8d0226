//! API documentation subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (single-threaded, before traffic):
//!     Router::route_document / group_document
//!     → DocViewer::register_route / register_group
//!     → DocViewer::register_server (one per bound listener)
//!
//! First request to the document endpoint:
//!     → openapi.rs builds the document once (SchemaFactory walks types)
//!     → cached bytes served for the rest of the process
//! ```
//!
//! # Design Decisions
//! - Documentation metadata never influences dispatch
//! - Schemas are described by types at registration and materialized lazily
//! - `NoDocViewer` is the default sink and serves nothing

pub mod factory;
pub mod openapi;
pub mod schema;

use axum::http::Method;
use axum::response::Response;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub use factory::{Describe, FieldSpec, ObjectBuilder, SchemaFactory};
pub use openapi::OpenApiViewer;
pub use schema::{OpenApi, ParameterLocation, Schema, SchemaType};

/// Deferred schema construction for one documented type.
pub type SchemaSource = fn(&mut SchemaFactory) -> Schema;

/// A documented body: description plus the type it carries.
#[derive(Clone, Default)]
pub struct DocItem {
    pub description: String,
    pub schema: Option<SchemaSource>,
}

impl DocItem {
    /// Body of type `T`.
    pub fn of<T: Describe + ?Sized>(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            schema: Some(SchemaFactory::make_schema::<T> as SchemaSource),
        }
    }

    /// Response or body without content.
    pub fn described(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            schema: None,
        }
    }
}

impl fmt::Debug for DocItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocItem")
            .field("description", &self.description)
            .field("has_schema", &self.schema.is_some())
            .finish()
    }
}

/// Per-route documentation supplied at registration.
#[derive(Debug, Clone, Default)]
pub struct DocPayload {
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub parameters: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    pub files: BTreeMap<String, String>,
    pub request: Option<DocItem>,
    pub responses: BTreeMap<String, DocItem>,
}

impl DocPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Path parameter captured by a `{name}` placeholder.
    pub fn parameter(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), description.into());
        self
    }

    pub fn query(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.query.insert(name.into(), description.into());
        self
    }

    pub fn cookie(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), description.into());
        self
    }

    /// Multipart file field.
    pub fn file(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.files.insert(name.into(), description.into());
        self
    }

    pub fn request(mut self, item: DocItem) -> Self {
        self.request = Some(item);
        self
    }

    pub fn response(mut self, status: u16, item: DocItem) -> Self {
        self.responses.insert(status.to_string(), item);
        self
    }
}

/// Documentation shared by every route under a group prefix.
#[derive(Debug, Clone, Default)]
pub struct DocGroup {
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    pub responses: BTreeMap<String, DocItem>,
}

impl DocGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.headers.insert(name.into(), description.into());
        self
    }

    pub fn cookie(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), description.into());
        self
    }

    pub fn response(mut self, status: u16, item: DocItem) -> Self {
        self.responses.insert(status.to_string(), item);
        self
    }

    /// Fold `other` into this group; entries of `other` win on conflict.
    pub fn merge(&mut self, other: DocGroup) {
        self.headers.extend(other.headers);
        self.cookies.extend(other.cookies);
        self.responses.extend(other.responses);
    }
}

/// A registered route as seen by the documentation sink.
#[derive(Debug, Clone)]
pub struct DocRoute {
    pub method: Method,
    pub base_path: String,
    /// Pattern as registered, relative to `base_path`.
    pub path: String,
    /// `base_path` and `path` joined.
    pub full_path: String,
    pub payload: DocPayload,
}

/// Callback serving one documentation endpoint.
pub type DocResponder = Arc<dyn Fn() -> Response + Send + Sync>;

/// An HTTP endpoint exposed by a documentation sink.
#[derive(Clone)]
pub struct DocEndpoint {
    pub method: Method,
    pub path: String,
    pub name: String,
    pub description: String,
    pub responder: DocResponder,
}

impl fmt::Debug for DocEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocEndpoint")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("name", &self.name)
            .finish()
    }
}

/// Sink for route and group documentation.
pub trait DocViewer: Send + Sync {
    fn register_route(&mut self, route: DocRoute);

    fn register_group(&mut self, prefix: &str, group: DocGroup);

    /// Record a listener address for the document's servers list.
    fn register_server(&mut self, url: String, description: String);

    /// Freeze the accumulated documentation into servable endpoints.
    fn endpoints(self: Box<Self>) -> Vec<DocEndpoint>;
}

/// Documentation sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDocViewer;

impl DocViewer for NoDocViewer {
    fn register_route(&mut self, _route: DocRoute) {}

    fn register_group(&mut self, _prefix: &str, _group: DocGroup) {}

    fn register_server(&mut self, _url: String, _description: String) {}

    fn endpoints(self: Box<Self>) -> Vec<DocEndpoint> {
        Vec::new()
    }
}
