//! The fluent controller specification builder.
//!
//! [`ControllerSpec`] is what a controller's `configure` receives. Calls
//! are recorded in source order, so the order middleware and handlers
//! appear in `configure` is the order they take effect in, with no
//! registration-order compensation anywhere.
//!
//! ```rust
//! use trellis_extract::Bind;
//! use trellis_registry::{Controller, ControllerSpec};
//!
//! struct ProjectsController;
//!
//! impl Controller for ProjectsController {
//!     fn configure(spec: &mut ControllerSpec) {
//!         spec.mount("/api/v1/projects");
//!
//!         spec.handler("show")
//!             .get("/{id}")
//!             .bind(0, Bind::route_param("id"))
//!             .render_json()
//!             .call(|invocation| async move {
//!                 let id = invocation.args().text(0)?.to_owned();
//!                 Ok(Some(serde_json::json!({ "Id": id })))
//!             });
//!     }
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use http::Method;
use indexmap::IndexMap;
use serde_json::Value;
use trellis_core::{Middleware, TrellisError, TrellisResult};
use trellis_extract::{Binding, BindingSet, Invocation};

use crate::metadata::{
    ControllerMetadata, ErrorHandlerFn, ErrorHandlerMetadata, HandlerFn, HandlerMetadata,
};
use crate::registry::{Controller, Registry};
use crate::route::{Finalizer, HandlerKind, RouteEntry};

/// Records one controller's declarative configuration.
pub struct ControllerSpec {
    name: &'static str,
    mount: String,
    before: Vec<Arc<dyn Middleware>>,
    after: Vec<Arc<dyn Middleware>>,
    handlers: IndexMap<String, HandlerMetadata>,
    error_handlers: Vec<ErrorHandlerMetadata>,
    parent: Option<Arc<ControllerMetadata>>,
}

impl ControllerSpec {
    /// Creates an empty spec for the named controller, mounted at `/`.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            mount: "/".to_owned(),
            before: Vec::new(),
            after: Vec::new(),
            handlers: IndexMap::new(),
            error_handlers: Vec::new(),
            parent: None,
        }
    }

    /// Sets the controller's mount point. Every route of this controller,
    /// including inherited ones, is served under this prefix.
    pub fn mount(&mut self, path: impl Into<String>) -> &mut Self {
        self.mount = path.into();
        self
    }

    /// Appends a class-level before middleware. It runs ahead of every
    /// handler in this controller, in the order appended.
    pub fn use_before(&mut self, middleware: impl Middleware) -> &mut Self {
        self.before.push(Arc::new(middleware));
        self
    }

    /// Appends a class-level after middleware. It runs after every
    /// handler in this controller completes successfully, in the order
    /// appended.
    pub fn use_after(&mut self, middleware: impl Middleware) -> &mut Self {
        self.after.push(Arc::new(middleware));
        self
    }

    /// Declares that this controller inherits the routes of `P`.
    ///
    /// Inherited routes are served under this controller's own mount
    /// point, wrapped in this controller's class middleware. `P` keeps its
    /// own metadata; nothing registered here leaks back into it.
    pub fn inherit<P: Controller>(&mut self) -> &mut Self {
        self.parent = Some(Registry::metadata::<P>());
        self
    }

    /// Opens the declaration of a handler. The key must be unique within
    /// this controller; the declaration takes effect when
    /// [`HandlerSpec::call`] is reached.
    pub fn handler(&mut self, key: impl Into<String>) -> HandlerSpec<'_> {
        HandlerSpec {
            spec: self,
            key: key.into(),
            routes: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
            bindings: BindingSet::new(),
            finalizer: Finalizer::None,
        }
    }

    /// Registers an error handler. Error handlers run in declaration
    /// order when a request on this controller fails; one that writes a
    /// response marks the error handled, one that returns without writing
    /// forwards it.
    pub fn error_handler<F, Fut>(&mut self, key: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(Arc<TrellisError>, Invocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TrellisResult<()>> + Send + 'static,
    {
        let handler: ErrorHandlerFn = Arc::new(move |err, invocation| {
            Box::pin(handler(err, invocation))
        });
        self.error_handlers
            .push(ErrorHandlerMetadata::new(key.into(), handler));
        self
    }

    fn register(&mut self, key: String, handler: HandlerMetadata) {
        assert!(
            !self.handlers.contains_key(&key),
            "controller `{}` declares handler `{key}` twice",
            self.name
        );
        tracing::debug!(
            controller = self.name,
            handler = %key,
            routes = handler.routes().len(),
            "registered handler"
        );
        self.handlers.insert(key, handler);
    }

    /// Freezes the spec into immutable metadata.
    pub(crate) fn freeze(self) -> ControllerMetadata {
        ControllerMetadata::new(
            self.name,
            self.mount,
            self.before,
            self.after,
            self.handlers,
            self.error_handlers,
            self.parent,
        )
    }
}

/// The in-progress declaration of one handler.
///
/// Every method records in source order. The declaration is registered on
/// [`call`](Self::call); a `HandlerSpec` dropped without reaching `call`
/// registers nothing.
#[must_use = "a handler declaration does nothing until `.call(...)` is reached"]
pub struct HandlerSpec<'a> {
    spec: &'a mut ControllerSpec,
    key: String,
    routes: Vec<RouteEntry>,
    before: Vec<Arc<dyn Middleware>>,
    after: Vec<Arc<dyn Middleware>>,
    bindings: BindingSet,
    finalizer: Finalizer,
}

impl HandlerSpec<'_> {
    /// Adds a route under an explicit method.
    pub fn route(mut self, method: Method, pattern: impl Into<String>) -> Self {
        self.routes.push(RouteEntry::new(method, pattern));
        self
    }

    /// Adds a GET route.
    pub fn get(self, pattern: impl Into<String>) -> Self {
        self.route(Method::GET, pattern)
    }

    /// Adds a POST route.
    pub fn post(self, pattern: impl Into<String>) -> Self {
        self.route(Method::POST, pattern)
    }

    /// Adds a PUT route.
    pub fn put(self, pattern: impl Into<String>) -> Self {
        self.route(Method::PUT, pattern)
    }

    /// Adds a DELETE route.
    pub fn delete(self, pattern: impl Into<String>) -> Self {
        self.route(Method::DELETE, pattern)
    }

    /// Adds a PATCH route.
    pub fn patch(self, pattern: impl Into<String>) -> Self {
        self.route(Method::PATCH, pattern)
    }

    /// Adds a HEAD route.
    pub fn head(self, pattern: impl Into<String>) -> Self {
        self.route(Method::HEAD, pattern)
    }

    /// Adds an OPTIONS route.
    pub fn options(self, pattern: impl Into<String>) -> Self {
        self.route(Method::OPTIONS, pattern)
    }

    /// Appends a handler-level before middleware. It runs after the
    /// class-level before middleware, in the order appended.
    pub fn use_before(mut self, middleware: impl Middleware) -> Self {
        self.before.push(Arc::new(middleware));
        self
    }

    /// Appends a handler-level after middleware. It runs ahead of the
    /// class-level after middleware, in the order appended.
    pub fn use_after(mut self, middleware: impl Middleware) -> Self {
        self.after.push(Arc::new(middleware));
        self
    }

    /// Binds an argument position to a parameter source.
    pub fn bind(mut self, index: usize, binding: Binding) -> Self {
        self.bindings.bind(index, binding);
        self
    }

    /// Finalizes the handler's payload through the view renderer under
    /// the given view name.
    pub fn render(mut self, view: impl Into<String>) -> Self {
        self.finalizer = Finalizer::View(view.into());
        self
    }

    /// Finalizes the handler's payload as a JSON response.
    pub fn render_json(mut self) -> Self {
        self.finalizer = Finalizer::Json;
        self
    }

    /// Supplies the handler function and registers the declaration.
    ///
    /// # Panics
    ///
    /// Panics when the controller already declares a handler under the
    /// same key.
    pub fn call<F, Fut>(self, handler: F)
    where
        F: Fn(Invocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TrellisResult<Option<Value>>> + Send + 'static,
    {
        let handler: HandlerFn = Arc::new(move |invocation| Box::pin(handler(invocation)));
        let metadata = HandlerMetadata::new(
            self.key.clone(),
            HandlerKind::Normal,
            self.routes,
            self.before,
            self.after,
            self.bindings,
            self.finalizer,
            handler,
        );
        self.spec.register(self.key, metadata);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn handlers_keep_declaration_order() {
        let mut spec = ControllerSpec::new("OrderedController");
        spec.handler("zulu")
            .get("/z")
            .call(|_| async { Ok(None) });
        spec.handler("alpha")
            .get("/a")
            .call(|_| async { Ok(None) });

        let meta = spec.freeze();
        let keys: Vec<_> = meta.handlers().keys().cloned().collect();
        assert_eq!(keys, vec!["zulu", "alpha"]);
    }

    #[test]
    fn routes_record_in_source_order() {
        let mut spec = ControllerSpec::new("RoutesController");
        spec.handler("update")
            .put("/{id}")
            .patch("/{id}")
            .render_json()
            .call(|_| async { Ok(Some(json!({}))) });

        let meta = spec.freeze();
        let handler = &meta.handlers()["update"];
        assert_eq!(handler.routes().len(), 2);
        assert_eq!(handler.routes()[0].method, Method::PUT);
        assert_eq!(handler.routes()[1].method, Method::PATCH);
        assert_eq!(handler.finalizer(), &Finalizer::Json);
    }

    #[test]
    #[should_panic(expected = "declares handler `show` twice")]
    fn duplicate_handler_keys_are_rejected() {
        let mut spec = ControllerSpec::new("DupController");
        spec.handler("show").get("/a").call(|_| async { Ok(None) });
        spec.handler("show").get("/b").call(|_| async { Ok(None) });
    }

    #[test]
    fn dropped_declaration_registers_nothing() {
        let mut spec = ControllerSpec::new("DroppedController");
        let _ = spec.handler("never").get("/never");
        assert!(spec.freeze().handlers().is_empty());
    }
}
