//! The view-renderer call contract.
//!
//! Trellis does not ship a template engine. A handler marked to render a
//! view hands its resolved payload to whatever [`ViewRenderer`] the
//! application installed on the router; the framework only defines the call
//! shape and routes the resulting HTML (or render error) back through the
//! normal response path.

use serde_json::Value;

use crate::error::TrellisResult;

/// Renders a named view with a JSON-shaped data payload into HTML.
///
/// # Example
///
/// ```rust
/// use trellis_core::{TrellisResult, ViewRenderer};
/// use serde_json::Value;
///
/// struct EchoRenderer;
///
/// impl ViewRenderer for EchoRenderer {
///     fn render(&self, view: &str, data: &Value) -> TrellisResult<String> {
///         Ok(format!("<!-- {view} --> {data}"))
///     }
/// }
/// ```
pub trait ViewRenderer: Send + Sync {
    /// Renders `view` with `data`, returning the response body.
    fn render(&self, view: &str, data: &Value) -> TrellisResult<String>;
}
