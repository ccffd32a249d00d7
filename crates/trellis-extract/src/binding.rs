//! Declarative parameter bindings.
//!
//! A [`Binding`] is a named, synchronous, read-only extractor: it looks at
//! the request snapshot and produces one argument value, without touching
//! the response or any mutable state. The constructors on [`Bind`] cover
//! the built-in sources (route parameter, query parameter, body field,
//! whole body, request handle, response handle); [`Bind::with`] admits a
//! custom extractor under the same contract.
//!
//! Extraction failures carry a message only. The [`BindingSet`]
//! (crate::BindingSet) attaches the argument index when it surfaces the
//! failure as a [`TrellisError`](trellis_core::TrellisError).

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use trellis_core::{RequestParts, ResponseWriter};

use crate::args::ArgValue;

/// Outcome of one extraction: an argument value, or a message describing
/// why the source could not be read.
pub type ExtractResult = Result<ArgValue, String>;

type ExtractFn = Arc<dyn Fn(&Arc<RequestParts>, &ResponseWriter) -> ExtractResult + Send + Sync>;

/// A named extractor for one handler argument.
#[derive(Clone)]
pub struct Binding {
    name: String,
    extract: ExtractFn,
}

impl Binding {
    fn new(name: impl Into<String>, extract: ExtractFn) -> Self {
        Self {
            name: name.into(),
            extract,
        }
    }

    /// Returns the binding's descriptive name, e.g. `route_param(id)`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the extractor against a request.
    ///
    /// # Errors
    ///
    /// Returns the extractor's failure message.
    pub fn extract(&self, request: &Arc<RequestParts>, response: &ResponseWriter) -> ExtractResult {
        (self.extract)(request, response)
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding").field("name", &self.name).finish()
    }
}

/// Constructors for the built-in bindings.
#[derive(Debug)]
pub struct Bind;

impl Bind {
    /// Binds a path parameter by name. The parameter must be present in
    /// the matched route pattern; a missing one fails extraction.
    #[must_use]
    pub fn route_param(name: &str) -> Binding {
        let key = name.to_owned();
        Binding::new(
            format!("route_param({name})"),
            Arc::new(move |request, _| {
                request.param(&key).map_or_else(
                    || Err(format!("missing route parameter `{key}`")),
                    |value| Ok(ArgValue::Value(Value::String(value.to_owned()))),
                )
            }),
        )
    }

    /// Binds a query-string parameter by name. An absent parameter
    /// resolves to `Null` so handlers can apply their own default.
    #[must_use]
    pub fn query_param(name: &str) -> Binding {
        let key = name.to_owned();
        Binding::new(
            format!("query_param({name})"),
            Arc::new(move |request, _| {
                let Some(query) = request.query_string() else {
                    return Ok(ArgValue::Value(Value::Null));
                };
                let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
                    .map_err(|e| format!("malformed query string: {e}"))?;
                let value = pairs
                    .into_iter()
                    .find(|(k, _)| *k == key)
                    .map_or(Value::Null, |(_, v)| Value::String(v));
                Ok(ArgValue::Value(value))
            }),
        )
    }

    /// Binds one field of the JSON request body. An empty body or an
    /// absent field resolves to `Null`; a non-JSON body fails extraction.
    #[must_use]
    pub fn body_param(name: &str) -> Binding {
        let key = name.to_owned();
        Binding::new(
            format!("body_param({name})"),
            Arc::new(move |request, _| {
                if request.is_body_empty() {
                    return Ok(ArgValue::Value(Value::Null));
                }
                let body: Value = serde_json::from_slice(request.body())
                    .map_err(|e| format!("request body is not valid JSON: {e}"))?;
                let value = body.get(&key).cloned().unwrap_or(Value::Null);
                Ok(ArgValue::Value(value))
            }),
        )
    }

    /// Binds the whole JSON request body. An empty body resolves to
    /// `Null`; a non-JSON body fails extraction.
    #[must_use]
    pub fn body() -> Binding {
        Binding::new(
            "body",
            Arc::new(|request, _| {
                if request.is_body_empty() {
                    return Ok(ArgValue::Value(Value::Null));
                }
                let body: Value = serde_json::from_slice(request.body())
                    .map_err(|e| format!("request body is not valid JSON: {e}"))?;
                Ok(ArgValue::Value(body))
            }),
        )
    }

    /// Binds the request snapshot itself.
    #[must_use]
    pub fn request() -> Binding {
        Binding::new(
            "request",
            Arc::new(|request, _| Ok(ArgValue::Request(Arc::clone(request)))),
        )
    }

    /// Binds the response writer.
    #[must_use]
    pub fn response() -> Binding {
        Binding::new(
            "response",
            Arc::new(|_, response| Ok(ArgValue::Response(response.clone()))),
        )
    }

    /// Binds a custom extractor. The extractor reads the request snapshot
    /// and produces a JSON value, or a message describing the failure.
    #[must_use]
    pub fn with<F>(name: &str, extract: F) -> Binding
    where
        F: Fn(&RequestParts) -> Result<Value, String> + Send + Sync + 'static,
    {
        Binding::new(
            name,
            Arc::new(move |request, _| extract(request).map(ArgValue::Value)),
        )
    }
}
