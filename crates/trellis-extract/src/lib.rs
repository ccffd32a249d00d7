//! Parameter bindings and argument resolution for Trellis handlers.
//!
//! Handlers in Trellis do not parse requests themselves. Each handler
//! carries a [`BindingSet`]: an indexed table that declares, per argument
//! position, where the value comes from. At dispatch time the set runs
//! every [`Binding`] against the immutable request snapshot, producing the
//! ordered [`Args`] the handler is invoked with.
//!
//! ```rust
//! use trellis_extract::{Bind, BindingSet};
//!
//! let mut bindings = BindingSet::new();
//! bindings.bind(0, Bind::route_param("id"));
//! bindings.bind(1, Bind::body_param("Name"));
//! bindings.bind(2, Bind::query_param("full"));
//! ```
//!
//! Bindings are synchronous and read-only: they see the request parts and
//! nothing else, so resolution cannot depend on ordering between bindings
//! and any of them may be evaluated without side effects. Failures are
//! all-or-nothing; the first failing position aborts resolution before
//! the handler runs.

pub mod args;
pub mod binding;
pub mod set;

pub use args::{ArgValue, Args, Invocation};
pub use binding::{Bind, Binding, ExtractResult};
pub use set::BindingSet;
