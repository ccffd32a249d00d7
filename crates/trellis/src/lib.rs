//! Trellis: declarative controller routing over explicit metadata.
//!
//! Controllers are plain types. Each one declares its mount point,
//! middleware, handlers, parameter bindings, and inheritance in a single
//! `configure` function, recorded in source order into a process-wide
//! metadata registry keyed by type identity. A [`Router`] linearizes the
//! mounted controllers into a flat route table at build time and
//! dispatches requests through per-route middleware chains.
//!
//! ```rust,no_run
//! use trellis::prelude::*;
//!
//! struct ProjectsController;
//!
//! impl Controller for ProjectsController {
//!     fn name() -> &'static str {
//!         "ProjectsController"
//!     }
//!
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
//!
//! let router = Router::builder()
//!     .mount::<ProjectsController>()
//!     .build()
//!     .expect("route table is consistent");
//! ```

pub use trellis_core::{
    BoxFuture, Endpoint, FnMiddleware, Middleware, MiddlewareFn, Next, Params, RequestContext,
    RequestContextBuilder, RequestParts, ResponseWriter, TrellisError, TrellisResult,
    ViewRenderer,
};
pub use trellis_extract::{ArgValue, Args, Bind, Binding, BindingSet, Invocation};
pub use trellis_registry::{
    Controller, ControllerMetadata, ControllerSpec, Finalizer, HandlerKind, HandlerSpec, Registry,
    RouteEntry,
};
pub use trellis_router::{BuildError, Dispatch, Router, RouterBuilder, RouterConfig};

/// The common imports for declaring controllers and dispatching requests.
pub mod prelude {
    pub use crate::{
        Bind, Controller, ControllerSpec, Dispatch, Invocation, Middleware, Next, RequestContext,
        Router, RouterConfig, TrellisError, TrellisResult,
    };
}
