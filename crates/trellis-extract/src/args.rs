//! Resolved handler arguments.
//!
//! A [`BindingSet`](crate::BindingSet) turns an incoming request into an
//! [`Args`] value: one [`ArgValue`] per declared argument position, in
//! order. The [`Invocation`] bundles the arguments with the request
//! snapshot and the response writer and is what handlers receive.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use trellis_core::{RequestParts, ResponseWriter, TrellisError, TrellisResult};

/// One resolved handler argument.
#[derive(Debug, Clone)]
pub enum ArgValue {
    /// The shared request snapshot.
    Request(Arc<RequestParts>),
    /// The response writer.
    Response(ResponseWriter),
    /// A plain JSON value produced by a binding.
    Value(Value),
}

impl ArgValue {
    /// Returns the inner JSON value, if this argument carries one.
    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }
}

/// The ordered, resolved arguments for one handler invocation.
#[derive(Debug, Clone, Default)]
pub struct Args {
    values: Vec<ArgValue>,
}

impl Args {
    /// Wraps a list of resolved argument values.
    #[must_use]
    pub fn new(values: Vec<ArgValue>) -> Self {
        Self { values }
    }

    /// Returns the number of argument positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Checks whether no arguments were resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the argument at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ArgValue> {
        self.values.get(index)
    }

    /// Returns the JSON value at `index`, or `Null` if the position is
    /// absent or holds the request or response handle.
    #[must_use]
    pub fn value(&self, index: usize) -> &Value {
        self.values
            .get(index)
            .and_then(ArgValue::as_value)
            .unwrap_or(&Value::Null)
    }

    /// Returns the argument at `index` as a string slice.
    ///
    /// # Errors
    ///
    /// Fails with a parameter-resolution error when the position does not
    /// hold a JSON string.
    pub fn text(&self, index: usize) -> TrellisResult<&str> {
        self.value(index)
            .as_str()
            .ok_or_else(|| TrellisError::parameter(index, "expected a string argument"))
    }

    /// Returns the argument at `index` as a string slice, or `None` when
    /// the position is null.
    #[must_use]
    pub fn opt_text(&self, index: usize) -> Option<&str> {
        self.value(index).as_str()
    }

    /// Deserializes the argument at `index` into `T`.
    ///
    /// # Errors
    ///
    /// Fails with a parameter-resolution error when the value does not
    /// deserialize into `T`.
    pub fn parse<T: DeserializeOwned>(&self, index: usize) -> TrellisResult<T> {
        serde_json::from_value(self.value(index).clone())
            .map_err(|e| TrellisError::parameter(index, e.to_string()))
    }
}

/// Everything a handler receives for one request.
#[derive(Debug, Clone)]
pub struct Invocation {
    request: Arc<RequestParts>,
    response: ResponseWriter,
    args: Args,
}

impl Invocation {
    /// Bundles the request snapshot, response writer, and resolved
    /// arguments.
    #[must_use]
    pub fn new(request: Arc<RequestParts>, response: ResponseWriter, args: Args) -> Self {
        Self {
            request,
            response,
            args,
        }
    }

    /// Returns the request snapshot.
    #[must_use]
    pub fn request(&self) -> &RequestParts {
        &self.request
    }

    /// Returns a shareable handle to the request snapshot.
    #[must_use]
    pub fn shared_request(&self) -> Arc<RequestParts> {
        Arc::clone(&self.request)
    }

    /// Returns the response writer.
    #[must_use]
    pub fn response(&self) -> &ResponseWriter {
        &self.response
    }

    /// Returns the resolved arguments.
    #[must_use]
    pub fn args(&self) -> &Args {
        &self.args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn value_returns_null_for_missing_positions() {
        let args = Args::new(vec![ArgValue::Value(json!("42"))]);
        assert_eq!(args.value(0), &json!("42"));
        assert_eq!(args.value(7), &Value::Null);
    }

    #[test]
    fn value_returns_null_for_handle_positions() {
        let args = Args::new(vec![ArgValue::Response(ResponseWriter::new())]);
        assert_eq!(args.value(0), &Value::Null);
    }

    #[test]
    fn text_rejects_non_strings() {
        let args = Args::new(vec![ArgValue::Value(json!(42))]);
        let err = args.text(0).unwrap_err();
        assert!(err.to_string().contains("argument 0"));
    }

    #[test]
    fn parse_deserializes_typed_values() {
        let args = Args::new(vec![ArgValue::Value(json!("17"))]);
        let id: String = args.parse(0).unwrap();
        assert_eq!(id, "17");

        let args = Args::new(vec![ArgValue::Value(json!({"Name": "Alpha"}))]);
        #[derive(serde::Deserialize)]
        struct Payload {
            #[serde(rename = "Name")]
            name: String,
        }
        let payload: Payload = args.parse(0).unwrap();
        assert_eq!(payload.name, "Alpha");
    }
}
