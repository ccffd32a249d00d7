//! Request context threaded through the middleware chain.
//!
//! [`RequestParts`] is the immutable snapshot of the incoming request:
//! method, URI, headers, pre-read body bytes, and path parameters the
//! matcher extracted. It is shared behind an `Arc`, so parameter bindings
//! and handlers can hold it without copying.
//!
//! [`RequestContext`] wraps the parts with the per-request mutable state:
//! the response writer and a string-keyed extension map middleware can use
//! to pass values downstream.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};
use uuid::Uuid;

use crate::params::Params;
use crate::response::ResponseWriter;

/// Immutable snapshot of an incoming request.
///
/// # Example
///
/// ```rust
/// use trellis_core::{Params, RequestParts};
/// use http::{HeaderMap, Method, Uri};
/// use bytes::Bytes;
///
/// let mut params = Params::new();
/// params.push("id", "42");
///
/// let parts = RequestParts::new(
///     Method::GET,
///     Uri::from_static("/projects/42?full=true"),
///     HeaderMap::new(),
///     Bytes::new(),
///     params,
/// );
///
/// assert_eq!(parts.path(), "/projects/42");
/// assert_eq!(parts.query_string(), Some("full=true"));
/// assert_eq!(parts.param("id"), Some("42"));
/// ```
#[derive(Debug, Clone)]
pub struct RequestParts {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    path_params: Params,
}

impl RequestParts {
    /// Creates a new request snapshot.
    #[must_use]
    pub fn new(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
        path_params: Params,
    ) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            path_params,
        }
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the path portion of the URI.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Returns the query string if present.
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the Content-Type header value.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Returns the request body as bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Checks whether the request body is empty.
    #[must_use]
    pub fn is_body_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Returns the extracted path parameters.
    #[must_use]
    pub fn path_params(&self) -> &Params {
        &self.path_params
    }

    /// Returns one path parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name)
    }
}

/// Per-request mutable state passed through the middleware chain.
///
/// The context owns a shared [`RequestParts`] snapshot, the response
/// writer, a request ID for log correlation, and an extension map for
/// values middleware wants to hand to later stages (an authenticated user,
/// a parsed session, ...).
#[derive(Debug)]
pub struct RequestContext {
    request_id: Uuid,
    parts: Arc<RequestParts>,
    response: ResponseWriter,
    extensions: HashMap<String, serde_json::Value>,
}

impl RequestContext {
    /// Creates a context for the given request snapshot.
    #[must_use]
    pub fn new(parts: RequestParts) -> Self {
        Self {
            request_id: Uuid::now_v7(),
            parts: Arc::new(parts),
            response: ResponseWriter::new(),
            extensions: HashMap::new(),
        }
    }

    /// Returns the request ID assigned to this request.
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Returns the request snapshot.
    #[must_use]
    pub fn request(&self) -> &RequestParts {
        &self.parts
    }

    /// Returns a shareable handle to the request snapshot.
    #[must_use]
    pub fn shared_request(&self) -> Arc<RequestParts> {
        Arc::clone(&self.parts)
    }

    /// Returns the response writer for this request.
    #[must_use]
    pub fn response(&self) -> &ResponseWriter {
        &self.response
    }

    /// Stores an extension value under a string key.
    pub fn set_extension(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.extensions.insert(key.into(), value);
    }

    /// Reads an extension value by key.
    #[must_use]
    pub fn extension(&self, key: &str) -> Option<&serde_json::Value> {
        self.extensions.get(key)
    }
}

/// Builder for constructing a [`RequestContext`], mainly for tests.
#[derive(Debug, Default)]
pub struct RequestContextBuilder {
    method: Option<Method>,
    uri: Option<Uri>,
    headers: HeaderMap,
    body: Bytes,
    path_params: Params,
}

impl RequestContextBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Sets the URI.
    #[must_use]
    pub fn uri(mut self, uri: Uri) -> Self {
        self.uri = Some(uri);
        self
    }

    /// Adds a single header.
    #[must_use]
    pub fn header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = value.parse() {
            self.headers.insert(name, value);
        }
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Adds a single path parameter.
    #[must_use]
    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.push(name, value);
        self
    }

    /// Builds the request context.
    ///
    /// # Panics
    ///
    /// Panics if method or uri were not set.
    #[must_use]
    pub fn build(self) -> RequestContext {
        RequestContext::new(RequestParts {
            method: self.method.expect("method is required"),
            uri: self.uri.expect("uri is required"),
            headers: self.headers,
            body: self.body,
            path_params: self.path_params,
        })
    }
}
