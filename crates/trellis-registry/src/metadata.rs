//! Frozen controller metadata.
//!
//! A [`ControllerMetadata`] is the immutable product of running a
//! controller's [`configure`](crate::Controller::configure) once. It owns
//! the controller's mount point, class-level middleware, source-ordered
//! handler table, error handlers, and an optional link to the metadata of
//! the controller it inherits from. The registry hands these out behind
//! `Arc`s; router construction consumes them without ever touching the
//! controller type again.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use trellis_core::{BoxFuture, Middleware, TrellisError, TrellisResult};
use trellis_extract::{BindingSet, Invocation};

use crate::route::{Finalizer, HandlerKind, RouteEntry};

/// The boxed future a handler returns: an optional JSON payload for the
/// finalizer, or an error.
pub type HandlerFuture = BoxFuture<'static, TrellisResult<Option<Value>>>;

/// A registered request handler.
pub type HandlerFn = Arc<dyn Fn(Invocation) -> HandlerFuture + Send + Sync>;

/// A registered error handler. It receives the failure (shared, since
/// several handlers in a chain may inspect it) and a fresh invocation. It
/// marks the error handled by writing a response; returning without
/// writing forwards the error to the next handler in the chain.
pub type ErrorHandlerFn =
    Arc<dyn Fn(Arc<TrellisError>, Invocation) -> BoxFuture<'static, TrellisResult<()>> + Send + Sync>;

/// Everything recorded about one handler.
#[derive(Clone)]
pub struct HandlerMetadata {
    key: String,
    kind: HandlerKind,
    routes: Vec<RouteEntry>,
    before: Vec<Arc<dyn Middleware>>,
    after: Vec<Arc<dyn Middleware>>,
    bindings: BindingSet,
    finalizer: Finalizer,
    handler: HandlerFn,
}

impl HandlerMetadata {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        key: String,
        kind: HandlerKind,
        routes: Vec<RouteEntry>,
        before: Vec<Arc<dyn Middleware>>,
        after: Vec<Arc<dyn Middleware>>,
        bindings: BindingSet,
        finalizer: Finalizer,
        handler: HandlerFn,
    ) -> Self {
        Self {
            key,
            kind,
            routes,
            before,
            after,
            bindings,
            finalizer,
            handler,
        }
    }

    /// Returns the handler's key, unique within its controller.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the handler's declared kind.
    #[must_use]
    pub fn kind(&self) -> HandlerKind {
        self.kind
    }

    /// Returns the routes this handler is registered under, in
    /// declaration order.
    #[must_use]
    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }

    /// Returns the handler-level before middleware, in declaration order.
    #[must_use]
    pub fn before(&self) -> &[Arc<dyn Middleware>] {
        &self.before
    }

    /// Returns the handler-level after middleware, in declaration order.
    #[must_use]
    pub fn after(&self) -> &[Arc<dyn Middleware>] {
        &self.after
    }

    /// Returns the handler's parameter bindings.
    #[must_use]
    pub fn bindings(&self) -> &BindingSet {
        &self.bindings
    }

    /// Returns how the handler's payload is finalized.
    #[must_use]
    pub fn finalizer(&self) -> &Finalizer {
        &self.finalizer
    }

    /// Returns the handler function itself.
    #[must_use]
    pub fn handler(&self) -> &HandlerFn {
        &self.handler
    }
}

impl fmt::Debug for HandlerMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerMetadata")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("routes", &self.routes)
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .field("bindings", &self.bindings.len())
            .field("finalizer", &self.finalizer)
            .finish_non_exhaustive()
    }
}

/// A registered error handler plus its key.
#[derive(Clone)]
pub struct ErrorHandlerMetadata {
    key: String,
    handler: ErrorHandlerFn,
}

impl ErrorHandlerMetadata {
    pub(crate) fn new(key: String, handler: ErrorHandlerFn) -> Self {
        Self { key, handler }
    }

    /// Returns the error handler's key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the error handler function.
    #[must_use]
    pub fn handler(&self) -> &ErrorHandlerFn {
        &self.handler
    }
}

impl fmt::Debug for ErrorHandlerMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHandlerMetadata")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// The frozen metadata for one controller type.
pub struct ControllerMetadata {
    name: &'static str,
    mount: String,
    before: Vec<Arc<dyn Middleware>>,
    after: Vec<Arc<dyn Middleware>>,
    handlers: IndexMap<String, HandlerMetadata>,
    error_handlers: Vec<ErrorHandlerMetadata>,
    parent: Option<Arc<ControllerMetadata>>,
}

impl ControllerMetadata {
    pub(crate) fn new(
        name: &'static str,
        mount: String,
        before: Vec<Arc<dyn Middleware>>,
        after: Vec<Arc<dyn Middleware>>,
        handlers: IndexMap<String, HandlerMetadata>,
        error_handlers: Vec<ErrorHandlerMetadata>,
        parent: Option<Arc<ControllerMetadata>>,
    ) -> Self {
        Self {
            name,
            mount,
            before,
            after,
            handlers,
            error_handlers,
            parent,
        }
    }

    /// Returns the controller's name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the controller's mount point.
    #[must_use]
    pub fn mount(&self) -> &str {
        &self.mount
    }

    /// Returns the class-level before middleware, in declaration order.
    #[must_use]
    pub fn before(&self) -> &[Arc<dyn Middleware>] {
        &self.before
    }

    /// Returns the class-level after middleware, in declaration order.
    #[must_use]
    pub fn after(&self) -> &[Arc<dyn Middleware>] {
        &self.after
    }

    /// Returns the handler table, in declaration order.
    #[must_use]
    pub fn handlers(&self) -> &IndexMap<String, HandlerMetadata> {
        &self.handlers
    }

    /// Returns the error handlers, in declaration order.
    #[must_use]
    pub fn error_handlers(&self) -> &[ErrorHandlerMetadata] {
        &self.error_handlers
    }

    /// Returns the metadata of the inherited controller, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&Arc<ControllerMetadata>> {
        self.parent.as_ref()
    }

    /// Walks the inheritance chain starting at this controller and
    /// proceeding towards the root.
    pub fn chain(&self) -> impl Iterator<Item = &ControllerMetadata> {
        std::iter::successors(Some(self), |meta| meta.parent.as_ref().map(Arc::as_ref))
    }
}

impl fmt::Debug for ControllerMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerMetadata")
            .field("name", &self.name)
            .field("mount", &self.mount)
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("error_handlers", &self.error_handlers.len())
            .field("parent", &self.parent.as_ref().map(|p| p.name))
            .finish()
    }
}
