//! Route declarations and handler classification.

use std::fmt;

use http::Method;

/// One (method, pattern) pair a handler is reachable under.
///
/// The pattern is relative to the controller's mount point and uses the
/// router's segment syntax: `/projects/{id}`, `/files/{id:[0-9]+}`,
/// `/assets/*path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    /// The HTTP method.
    pub method: Method,
    /// The path pattern, relative to the controller mount.
    pub pattern: String,
}

impl RouteEntry {
    /// Creates a route entry.
    #[must_use]
    pub fn new(method: Method, pattern: impl Into<String>) -> Self {
        Self {
            method,
            pattern: pattern.into(),
        }
    }
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.pattern)
    }
}

/// Explicit classification of a registered handler.
///
/// The kind is declared at registration time, never inferred from the
/// handler's signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// A normal request handler, invoked when one of its routes matches.
    Normal,
    /// An error handler, invoked only when a request on the same
    /// controller fails.
    ErrorHandler,
}

/// How a handler's returned payload becomes a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finalizer {
    /// The payload is ignored; the handler writes the response itself.
    None,
    /// The payload is serialized as a JSON response.
    Json,
    /// The payload is passed to the view renderer under this view name
    /// and the result is sent as HTML.
    View(String),
}
