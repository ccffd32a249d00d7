//! The global controller metadata table.
//!
//! Metadata lives in an explicit side table keyed by the controller's
//! [`TypeId`], never on the controller value itself. Each controller type
//! gets exactly one metadata entry, built by running its `configure` once
//! on first request and cached for the life of the process. Two types
//! related by [`inherit`](crate::ControllerSpec::inherit) hold two
//! distinct entries; configuring the child cannot mutate the parent's.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::metadata::ControllerMetadata;
use crate::spec::ControllerSpec;

/// A declarative request controller.
///
/// Implementors carry no per-request state; the type is only a key into
/// the metadata table. `configure` runs once per process, the first time
/// the controller's metadata is needed.
pub trait Controller: 'static {
    /// The controller's name, used in route keys and build diagnostics.
    #[must_use]
    fn name() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }

    /// Declares the controller's mount point, middleware, handlers, and
    /// inheritance.
    fn configure(spec: &mut ControllerSpec);
}

type Table = RwLock<HashMap<TypeId, Arc<ControllerMetadata>>>;

fn table() -> &'static Table {
    static TABLE: OnceLock<Table> = OnceLock::new();
    TABLE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Handle to the process-wide metadata table.
#[derive(Debug)]
pub struct Registry;

impl Registry {
    /// Returns the metadata for `C`, building it on first use.
    ///
    /// Building runs outside the table lock, so `configure` is free to
    /// request ancestor metadata through `inherit`. If two threads race
    /// on the same cold controller both build, and the first insert wins.
    #[must_use]
    pub fn metadata<C: Controller>() -> Arc<ControllerMetadata> {
        let key = TypeId::of::<C>();
        if let Some(meta) = table().read().get(&key) {
            return Arc::clone(meta);
        }

        let mut spec = ControllerSpec::new(C::name());
        C::configure(&mut spec);
        let meta = Arc::new(spec.freeze());
        tracing::debug!(
            controller = meta.name(),
            mount = meta.mount(),
            handlers = meta.handlers().len(),
            "controller metadata built"
        );

        let mut table = table().write();
        Arc::clone(table.entry(key).or_insert(meta))
    }
}
