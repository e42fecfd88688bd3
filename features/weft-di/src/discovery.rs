//! Marker-driven registration discovery.
//!
//! The source of registrations is an explicit registry: each concrete type is
//! declared once through [`Registers`], carrying its lifetime, constructor,
//! declared dependency types and implemented interfaces. A [`TypeCollection`]
//! is the ordered set of such declarations, and [`Registry::discover`] turns
//! collections into service descriptors - collection order first, declaration
//! order within each collection.

use std::{marker::PhantomData, sync::Arc};

use crate::{
    container::Ctx,
    descriptor::{
        DescriptorStore, InitCast, ServiceDescriptor, ServiceSource, SharedCast, SharedCtor,
    },
    dependency_graph::DependencyGraph,
    diagnostics::{self, DiagnosticsReport},
    errors::{ConfigError, CycleError, RequireError},
    initiator::Initializable,
    types::{DynError, Injectable, Instance, Lifetime, ServiceKey, TypeInfo},
};

/// A directly implemented interface, with its unsizing cast.
#[derive(Clone)]
pub(crate) struct InterfaceBinding {
    pub(crate) service: TypeInfo,
    pub(crate) cast: SharedCast,
}

/// One marked type: the metadata the discovery phase consumes.
pub struct Registration {
    pub(crate) concrete: TypeInfo,
    pub(crate) simple_name: &'static str,
    pub(crate) generic_arity: usize,
    pub(crate) lifetime: Lifetime,
    pub(crate) key: Option<ServiceKey>,
    pub(crate) construct: SharedCtor,
    pub(crate) params: Vec<TypeInfo>,
    pub(crate) interfaces: Vec<InterfaceBinding>,
    /// Explicit service list; empty means "self plus every declared interface".
    pub(crate) exposed: Vec<TypeInfo>,
    pub(crate) init: Option<InitCast>,
}

/// Typed registration builder for one concrete type.
pub struct Registers<T: Injectable> {
    registration: Registration,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Injectable> Registers<T> {
    pub fn new<F>(lifetime: Lifetime, construct: F) -> Self
    where
        F: Fn(&Ctx<'_>) -> Result<T, DynError> + Send + Sync + 'static,
    {
        let concrete = TypeInfo::of::<T>();
        let construct: SharedCtor = Arc::new(move |ctx| {
            construct(ctx)
                .map(|value| Instance::new(Arc::new(value)))
                .map_err(|error| RequireError::FactoryFailed {
                    product: concrete.type_name,
                    error: Arc::new(error),
                })
        });

        Registers {
            registration: Registration {
                concrete,
                simple_name: simple_name(concrete.type_name),
                generic_arity: 0,
                lifetime,
                key: None,
                construct,
                params: Vec::new(),
                interfaces: Vec::new(),
                exposed: Vec::new(),
                init: None,
            },
            _marker: PhantomData,
        }
    }

    pub fn singleton<F>(construct: F) -> Self
    where
        F: Fn(&Ctx<'_>) -> Result<T, DynError> + Send + Sync + 'static,
    {
        Self::new(Lifetime::Singleton, construct)
    }

    pub fn scoped<F>(construct: F) -> Self
    where
        F: Fn(&Ctx<'_>) -> Result<T, DynError> + Send + Sync + 'static,
    {
        Self::new(Lifetime::Scoped, construct)
    }

    pub fn transient<F>(construct: F) -> Self
    where
        F: Fn(&Ctx<'_>) -> Result<T, DynError> + Send + Sync + 'static,
    {
        Self::new(Lifetime::Transient, construct)
    }

    /// Declares a constructor parameter that resolves through the container.
    ///
    /// Parameter types with no registration are ignored by the graph builder,
    /// assumed externally supplied.
    pub fn requires<D: Injectable + ?Sized>(mut self) -> Self {
        self.registration.params.push(TypeInfo::of::<D>());
        self
    }

    /// Declares a directly implemented interface.
    ///
    /// The cast performs the unsizing coercion, e.g.
    /// `|concrete| concrete as Arc<dyn Greeter>`.
    pub fn implements<I: Injectable + ?Sized>(mut self, cast: fn(Arc<T>) -> Arc<I>) -> Self {
        let concrete = self.registration.concrete;
        let erased: SharedCast = Arc::new(move |instance: &Instance| {
            let value = instance.downcast::<T>().map_err(|actual_type| {
                RequireError::DowncastFailed {
                    required_type: concrete.type_name,
                    actual_type,
                }
            })?;
            Ok(Instance::new(cast(value)))
        });
        self.registration.interfaces.push(InterfaceBinding {
            service: TypeInfo::of::<I>(),
            cast: erased,
        });
        self
    }

    /// Restricts registration to an explicit service list.
    ///
    /// Every exposed service must also be declared via [`Registers::implements`];
    /// discovery rejects the registration otherwise.
    pub fn exposes<I: Injectable + ?Sized>(mut self) -> Self {
        self.registration.exposed.push(TypeInfo::of::<I>());
        self
    }

    pub fn keyed(mut self, key: impl Into<ServiceKey>) -> Self {
        self.registration.key = Some(key.into());
        self
    }

    /// Overrides the simple name and generic arity used by the open-generic
    /// naming convention.
    pub fn named(mut self, simple_name: &'static str, generic_arity: usize) -> Self {
        self.registration.simple_name = simple_name;
        self.registration.generic_arity = generic_arity;
        self
    }

    /// Marks the type as exposing the async-init capability.
    pub fn initializable(mut self) -> Self
    where
        T: Initializable,
    {
        let concrete = self.registration.concrete;
        let cast: InitCast = Arc::new(move |instance: &Instance| {
            let value = instance.downcast::<T>().map_err(|actual_type| {
                RequireError::DowncastFailed {
                    required_type: concrete.type_name,
                    actual_type,
                }
            })?;
            Ok(value as Arc<dyn Initializable>)
        });
        self.registration.init = Some(cast);
        self
    }

    fn into_registration(self) -> Registration {
        self.registration
    }
}

/// Last path segment of a type name, generics stripped.
fn simple_name(type_name: &'static str) -> &'static str {
    let base = type_name.split('<').next().unwrap_or(type_name);
    base.rsplit("::").next().unwrap_or(base)
}

/// Declaration of an open generic interface to bind by naming convention.
pub struct InterfaceDecl {
    pub simple_name: &'static str,
    pub generic_arity: usize,
}

/// A named, declaration-ordered set of marked types.
///
/// The analog of scanning one assembly: discovery walks collections in the
/// order given and registrations in the order they were added.
pub struct TypeCollection {
    pub name: &'static str,
    registrations: Vec<Registration>,
}

impl TypeCollection {
    pub fn new(name: &'static str) -> Self {
        TypeCollection {
            name,
            registrations: Vec::new(),
        }
    }

    pub fn add<T: Injectable>(mut self, registration: Registers<T>) -> Self {
        self.registrations.push(registration.into_registration());
        self
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Derives the implementation for an open generic interface by stripping
    /// the leading `I` from its simple name and searching this collection.
    pub fn implementation_for(
        &self,
        interface: &InterfaceDecl,
    ) -> Result<&Registration, ConfigError> {
        let derived = interface
            .simple_name
            .strip_prefix('I')
            .unwrap_or(interface.simple_name);

        let found = self
            .registrations
            .iter()
            .find(|r| r.simple_name == derived)
            .ok_or_else(|| ConfigError::ImplementationNotFound {
                interface: interface.simple_name,
                derived: derived.to_string(),
                collection: self.name,
            })?;

        if found.generic_arity != interface.generic_arity {
            return Err(ConfigError::GenericArityMismatch {
                interface: interface.simple_name,
                implementation: found.simple_name,
                interface_arity: interface.generic_arity,
                implementation_arity: found.generic_arity,
            });
        }

        Ok(found)
    }
}

/// Converts marked registrations into service descriptors.
///
/// The registry owns the descriptor store until [`crate::Container::build`]
/// consumes it; diagnostics can run against it at any point in between.
#[derive(Default)]
pub struct Registry {
    store: DescriptorStore,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans the given collections and appends their descriptors in
    /// collection order, then declaration order.
    pub fn discover(&mut self, collections: &[TypeCollection]) -> Result<(), ConfigError> {
        for collection in collections {
            tracing::debug!(
                "discovering {} registration(s) from collection '{}'",
                collection.registrations.len(),
                collection.name
            );
            for registration in &collection.registrations {
                self.register(registration)?;
            }
        }
        Ok(())
    }

    /// Registers a single marked type without a surrounding collection.
    pub fn add<T: Injectable>(&mut self, registration: Registers<T>) -> Result<(), ConfigError> {
        self.register(&registration.into_registration())
    }

    /// Registers a pre-built instance as a singleton under its own type.
    pub fn add_instance<T: Injectable>(&mut self, value: T) {
        let service = TypeInfo::of::<T>();
        self.store.push(ServiceDescriptor {
            service,
            key: None,
            lifetime: Lifetime::Singleton,
            source: ServiceSource::Instance(Instance::new(Arc::new(value))),
            init: None,
            index: 0,
        });
    }

    /// Registers an opaque factory under the given lifetime.
    pub fn add_factory<T, F>(&mut self, lifetime: Lifetime, factory: F)
    where
        T: Injectable,
        F: Fn(&Ctx<'_>) -> Result<T, DynError> + Send + Sync + 'static,
    {
        let service = TypeInfo::of::<T>();
        let construct: SharedCtor = Arc::new(move |ctx| {
            factory(ctx)
                .map(|value| Instance::new(Arc::new(value)))
                .map_err(|error| RequireError::FactoryFailed {
                    product: service.type_name,
                    error: Arc::new(error),
                })
        });
        self.store.push(ServiceDescriptor {
            service,
            key: None,
            lifetime,
            source: ServiceSource::Factory { construct },
            init: None,
            index: 0,
        });
    }

    /// Binds an open generic interface to its convention-derived
    /// implementation within `collection`.
    ///
    /// The derived implementation must declare the interface via
    /// [`Registers::implements`] so the alias has a cast to reuse.
    pub fn bind_open_generic<I: Injectable + ?Sized>(
        &mut self,
        collection: &TypeCollection,
        interface: &InterfaceDecl,
    ) -> Result<(), ConfigError> {
        let registration = collection.implementation_for(interface)?;
        let service = TypeInfo::of::<I>();
        let binding = registration
            .interfaces
            .iter()
            .find(|b| b.service == service)
            .ok_or(ConfigError::ServiceNotImplemented {
                concrete: registration.concrete,
                service,
            })?;

        self.push_alias(registration, binding);
        Ok(())
    }

    fn register(&mut self, registration: &Registration) -> Result<(), ConfigError> {
        // Resolve the service list up front so a bad explicit list fails
        // before anything is appended.
        let bindings: Vec<&InterfaceBinding> = if registration.exposed.is_empty() {
            registration.interfaces.iter().collect()
        } else {
            registration
                .exposed
                .iter()
                .map(|service| {
                    registration
                        .interfaces
                        .iter()
                        .find(|b| b.service == *service)
                        .ok_or(ConfigError::ServiceNotImplemented {
                            concrete: registration.concrete,
                            service: *service,
                        })
                })
                .collect::<Result<_, _>>()?
        };

        // Canonical slot: the concrete type constructs here, exactly once per
        // its lifetime. Every service view aliases onto it.
        self.store.push(ServiceDescriptor {
            service: registration.concrete,
            key: registration.key.clone(),
            lifetime: registration.lifetime,
            source: ServiceSource::Constructor {
                implementation: registration.concrete,
                params: registration.params.clone(),
                construct: registration.construct.clone(),
            },
            init: registration.init.clone(),
            index: 0,
        });

        for binding in bindings {
            self.push_alias(registration, binding);
        }
        Ok(())
    }

    fn push_alias(&mut self, registration: &Registration, binding: &InterfaceBinding) {
        tracing::debug!(
            "registering '{}' as service '{}'",
            registration.concrete.type_name,
            binding.service.type_name
        );
        self.store.push(ServiceDescriptor {
            service: binding.service,
            key: registration.key.clone(),
            lifetime: registration.lifetime,
            source: ServiceSource::Alias {
                target: registration.concrete,
                cast: binding.cast.clone(),
            },
            init: None,
            index: 0,
        });
    }

    pub fn store(&self) -> &DescriptorStore {
        &self.store
    }

    pub(crate) fn into_store(self) -> DescriptorStore {
        self.store
    }

    /// Structural report over the current registrations; never mutates them.
    pub fn diagnostics(&self) -> DiagnosticsReport {
        diagnostics::run(&self.store)
    }

    /// Fails with the full cycle if the construction graph is cyclic.
    /// Advisory findings (captivity, duplicates) never fail this check.
    pub fn ensure_acyclic(&self) -> Result<(), CycleError> {
        DependencyGraph::construction(&self.store).ensure_acyclic()
    }
}
