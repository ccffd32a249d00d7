//! Per-handler binding tables.
//!
//! A [`BindingSet`] maps argument positions to [`Binding`]s. Positions
//! left unbound fall back to the calling convention handlers rely on:
//! index 0 resolves to the request snapshot, index 1 to the response
//! writer, and anything beyond that to `Null`.

use std::sync::Arc;

use trellis_core::{RequestParts, ResponseWriter, TrellisError, TrellisResult};

use crate::args::{ArgValue, Args};
use crate::binding::Binding;

/// An indexed table of parameter bindings for one handler.
#[derive(Debug, Clone, Default)]
pub struct BindingSet {
    slots: Vec<Option<Binding>>,
}

impl BindingSet {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a binding at an argument position, growing the table as
    /// needed. Re-binding a position replaces the earlier binding.
    pub fn bind(&mut self, index: usize, binding: Binding) {
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        self.slots[index] = Some(binding);
    }

    /// Returns the number of argument positions, bound or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Checks whether no positions exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the binding registered at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Binding> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Resolves every position against a request, in index order.
    ///
    /// Resolution is all-or-nothing: the first failing binding aborts with
    /// a parameter-resolution error carrying its argument index, and the
    /// handler is never invoked.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::ParameterResolution`] for the first binding
    /// that fails.
    pub fn resolve(
        &self,
        request: &Arc<RequestParts>,
        response: &ResponseWriter,
    ) -> TrellisResult<Args> {
        let mut values = Vec::with_capacity(self.slots.len());
        for (index, slot) in self.slots.iter().enumerate() {
            let value = match slot {
                Some(binding) => binding
                    .extract(request, response)
                    .map_err(|message| TrellisError::parameter(index, message))?,
                None => Self::default_for(index, request, response),
            };
            values.push(value);
        }
        Ok(Args::new(values))
    }

    fn default_for(
        index: usize,
        request: &Arc<RequestParts>,
        response: &ResponseWriter,
    ) -> ArgValue {
        match index {
            0 => ArgValue::Request(Arc::clone(request)),
            1 => ArgValue::Response(response.clone()),
            _ => ArgValue::Value(serde_json::Value::Null),
        }
    }
}
