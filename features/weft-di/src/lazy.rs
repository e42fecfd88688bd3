use std::{fmt::Debug, ops::Deref, sync::Arc};

use once_cell::sync::OnceCell;

use crate::types::{Injectable, ServiceKey};

/// Keyed holder realizing its value at most once, on first access.
///
/// The claim to construct is a single atomic transition inside the cell:
/// under concurrent first access exactly one caller runs the factory while
/// the others block, and every caller then observes the same `Arc`. The
/// realized value lives as long as the owning container - it is never
/// reconstructed for that key.
pub struct LazyKeyed<T: Injectable> {
    key: ServiceKey,
    cell: OnceCell<Arc<T>>,
    factory: Box<dyn Fn() -> T + Send + Sync>,
}

impl<T: Injectable> LazyKeyed<T> {
    pub(crate) fn new(key: ServiceKey, factory: Box<dyn Fn() -> T + Send + Sync>) -> Self {
        LazyKeyed {
            key,
            cell: OnceCell::new(),
            factory,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Accesses the value, constructing it on the first call.
    pub fn value(&self) -> &Arc<T> {
        self.cell.get_or_init(|| Arc::new((self.factory)()))
    }

    /// Whether the factory has already run.
    pub fn is_realized(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T: Injectable> Deref for LazyKeyed<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.value()
    }
}

impl<T: Injectable + Debug> Debug for LazyKeyed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.cell.get() {
            Some(value) => f.debug_tuple("LazyKeyed").field(value).finish(),
            None => f.debug_tuple("LazyKeyed").field(&"<unrealized>").finish(),
        }
    }
}
