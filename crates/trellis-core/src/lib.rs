//! Core types for the Trellis controller framework.
//!
//! Trellis turns declaratively registered controller methods into a flat,
//! dispatchable route table. This crate holds the vocabulary shared by the
//! other Trellis crates:
//!
//! - [`RequestParts`] / [`RequestContext`]: the immutable request snapshot and
//!   the per-request mutable state threaded through the middleware chain
//! - [`ResponseWriter`]: a shared, send-once response buffer
//! - [`Params`]: extracted path parameters
//! - [`Middleware`] / [`Next`] / [`Endpoint`]: the request-processing chain
//! - [`TrellisError`]: the single error funnel for parameter resolution,
//!   handler, and middleware failures
//! - [`ViewRenderer`]: the call contract for an external template engine
//!
//! Route registration lives in `trellis-registry`, argument injection in
//! `trellis-extract`, and matching plus dispatch in `trellis-router`.

pub mod context;
pub mod error;
pub mod middleware;
pub mod params;
pub mod render;
pub mod response;

pub use context::{RequestContext, RequestContextBuilder, RequestParts};
pub use error::{TrellisError, TrellisResult};
pub use middleware::{BoxFuture, Endpoint, FnMiddleware, Middleware, MiddlewareFn, Next};
pub use params::Params;
pub use render::ViewRenderer;
pub use response::ResponseWriter;
