//! Request view handed to contextualizers, middleware and handlers.
//!
//! # Responsibilities
//! - Expose the request head, captured path parameters and query pairs
//! - Hold the buffered body (bounded by the configured limit)
//! - Bundle request, response sink and context into an [`Exchange`]
//!
//! # Design Decisions
//! - The body is buffered once before any user code runs, so every stage
//!   sees the same bytes
//! - Response headers written by any stage survive into rejections

use axum::http::{header::HeaderName, HeaderMap, HeaderValue, Method, Uri, Version};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;

use crate::http::context::Context;
use crate::http::cookie::{self, Cookie};

/// Immutable view of an inbound request.
#[derive(Debug, Clone)]
pub struct RouteRequest {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    pattern: Arc<str>,
    params: HashMap<String, String>,
    query: HashMap<String, String>,
    body: Bytes,
}

impl RouteRequest {
    pub fn new(
        parts: axum::http::request::Parts,
        pattern: Arc<str>,
        params: HashMap<String, String>,
        body: Bytes,
    ) -> Self {
        let query = parse_query(&parts.uri);
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            pattern,
            params,
            query,
            body,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as text; `None` when absent or not visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The registered pattern this request matched, e.g. `/widgets/{id}`.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Value captured by the `{name}` placeholder.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        cookie::find_cookie(&self.headers, name)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

fn parse_query(uri: &Uri) -> HashMap<String, String> {
    axum::extract::Query::<HashMap<String, String>>::try_from_uri(uri)
        .map(|q| q.0)
        .unwrap_or_default()
}

/// Response headers accumulated by the stages of one request.
#[derive(Debug, Default, Clone)]
pub struct ResponseSink {
    headers: HeaderMap,
}

impl ResponseSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header, replacing earlier values. Invalid names or values are
    /// logged and dropped.
    pub fn insert_header(&mut self, name: &str, value: &str) -> &mut Self {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "Dropping invalid response header"),
        }
        self
    }

    /// Add a header value without removing earlier ones.
    pub fn append_header(&mut self, name: &str, value: &str) -> &mut Self {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => tracing::warn!(header = %name, "Dropping invalid response header"),
        }
        self
    }

    pub fn set_cookie(&mut self, cookie: &Cookie) -> &mut Self {
        self.append_header("set-cookie", &cookie.to_header_value())
    }

    /// Ask the client to drop cookie `name`.
    pub fn clear_cookie(&mut self, name: &str) -> &mut Self {
        self.set_cookie(&Cookie::removal(name))
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn into_headers(self) -> HeaderMap {
        self.headers
    }
}

/// Everything a stage may read or write while handling one request.
#[derive(Debug)]
pub struct Exchange {
    pub request: RouteRequest,
    pub sink: ResponseSink,
    pub context: Context,
}

impl Exchange {
    pub fn new(request: RouteRequest, sink: ResponseSink, context: Context) -> Self {
        Self {
            request,
            sink,
            context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn request(uri: &str) -> RouteRequest {
        let (parts, _) = Request::builder()
            .uri(uri)
            .header("cookie", "sid=abc")
            .body(())
            .unwrap()
            .into_parts();
        let mut params = HashMap::new();
        params.insert("id".to_string(), "w1".to_string());
        RouteRequest::new(parts, Arc::from("/widgets/{id}"), params, Bytes::from_static(b"{\"n\":1}"))
    }

    #[test]
    fn exposes_params_query_and_cookies() {
        let req = request("/widgets/w1?sort=asc&page=2");
        assert_eq!(req.param("id"), Some("w1"));
        assert_eq!(req.query("sort"), Some("asc"));
        assert_eq!(req.query("page"), Some("2"));
        assert_eq!(req.cookie("sid"), Some("abc"));
        assert_eq!(req.pattern(), "/widgets/{id}");
        assert_eq!(req.path(), "/widgets/w1");
    }

    #[test]
    fn decodes_json_body() {
        #[derive(serde::Deserialize)]
        struct Body {
            n: u32,
        }
        let req = request("/widgets/w1");
        assert_eq!(req.json::<Body>().unwrap().n, 1);
    }

    #[test]
    fn sink_appends_cookies() {
        let mut sink = ResponseSink::new();
        sink.set_cookie(&Cookie::session("sid", "a")).clear_cookie("old");
        assert_eq!(sink.headers().get_all("set-cookie").iter().count(), 2);
    }

    #[test]
    fn sink_drops_invalid_header() {
        let mut sink = ResponseSink::new();
        sink.insert_header("bad header", "x");
        assert!(sink.headers().is_empty());
    }
}
