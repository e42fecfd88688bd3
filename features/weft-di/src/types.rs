use std::{
    any::{Any, TypeId},
    sync::Arc,
};

/// Boundary error type for factory and initialization failures.
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Discriminator for keyed registrations, alongside the service type.
pub type ServiceKey = String;

/// We assume a multithreaded async runtime,
/// so anything injectable needs to be Send + Sync + 'static.
pub trait Injectable: Send + Sync + 'static {}
impl<T: Send + Sync + 'static + ?Sized> Injectable for T {}

/// Type Name and Type Id
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}
impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}
impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }
}

/// How long a constructed instance lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// One instance per container.
    Singleton,
    /// One instance per scope.
    Scoped,
    /// A new instance per resolution.
    Transient,
}
impl Lifetime {
    /// Wider lifetimes rank higher; captivity analysis compares ranks.
    pub(crate) fn rank(self) -> u8 {
        match self {
            Lifetime::Singleton => 2,
            Lifetime::Scoped => 1,
            Lifetime::Transient => 0,
        }
    }
}
impl std::fmt::Display for Lifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Lifetime::Singleton => "Singleton",
            Lifetime::Scoped => "Scoped",
            Lifetime::Transient => "Transient",
        })
    }
}

/// Shared, type-erased instance of a service.
///
/// The erased payload is always an `Arc<T>` so that trait-object services
/// (`T = dyn Trait`) stay downcastable: the `Arc<T>` itself is a sized value
/// the `dyn Any` can give back by reference.
#[derive(Clone)]
pub struct Instance {
    pub info: TypeInfo,
    value: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    pub fn new<T: Injectable + ?Sized>(value: Arc<T>) -> Self {
        Instance {
            info: TypeInfo::of::<T>(),
            value: Arc::new(value),
        }
    }

    /// Returns the held `Arc<T>`, or the actual type name on mismatch.
    pub fn downcast<T: Injectable + ?Sized>(&self) -> Result<Arc<T>, &'static str> {
        self.value
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or(self.info.type_name)
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Instance").field(&self.info.type_name).finish()
    }
}
