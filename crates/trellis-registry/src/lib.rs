//! Controller metadata: declarative specification, a process-wide
//! registry, and the frozen metadata the router consumes.
//!
//! Controllers in Trellis are plain types implementing [`Controller`].
//! They declare everything about themselves in `configure`, through the
//! fluent [`ControllerSpec`] builder: mount point, class middleware,
//! handlers with routes and parameter bindings, error handlers, and
//! inheritance. The [`Registry`] runs `configure` once per type and hands
//! out the resulting [`ControllerMetadata`] behind an `Arc`.
//!
//! Everything is recorded in source order and keyed by type identity.
//! Declaring middleware before a handler means it runs before that
//! handler; inheriting from a parent never mutates the parent's entry.

pub mod metadata;
pub mod registry;
pub mod route;
pub mod spec;

pub use metadata::{
    ControllerMetadata, ErrorHandlerFn, ErrorHandlerMetadata, HandlerFn, HandlerFuture,
    HandlerMetadata,
};
pub use registry::{Controller, Registry};
pub use route::{Finalizer, HandlerKind, RouteEntry};
pub use spec::{ControllerSpec, HandlerSpec};
