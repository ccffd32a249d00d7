//! Route table construction and request dispatch.
//!
//! The router consumes frozen controller metadata and compiles it into a
//! flat route table behind a radix tree. All inheritance, mounting, and
//! middleware composition happens once, at build time; dispatch walks the
//! tree, runs the matched route's chain, and normalizes every failure
//! through the route's error handlers.
//!
//! ```rust,no_run
//! use trellis_registry::{Controller, ControllerSpec};
//! use trellis_router::{Router, RouterConfig};
//!
//! struct HealthController;
//!
//! impl Controller for HealthController {
//!     fn configure(spec: &mut ControllerSpec) {
//!         spec.handler("health")
//!             .get("/health")
//!             .render_json()
//!             .call(|_| async { Ok(Some(serde_json::json!({ "ok": true }))) });
//!     }
//! }
//!
//! let router = Router::builder()
//!     .config(RouterConfig { handler_deadline_ms: Some(30_000) })
//!     .mount::<HealthController>()
//!     .build()
//!     .expect("route table is consistent");
//! ```

pub mod error;
pub mod pattern;
pub mod router;

mod endpoint;
mod tree;

pub use error::BuildError;
pub use pattern::{Segment, SegmentKind};
pub use router::{Dispatch, Router, RouterBuilder, RouterConfig};
pub use tree::MatchOutcome;
