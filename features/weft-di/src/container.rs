use std::{
    any::{type_name, TypeId},
    collections::HashMap,
    fmt::Debug,
    sync::{Arc, Mutex},
};

use dashmap::DashMap;
use once_cell::sync::OnceCell;

use crate::{
    dependency_graph::DependencyGraph,
    descriptor::{DescriptorStore, ServiceDescriptor, ServiceSource},
    diagnostics::{self, DiagnosticsReport},
    discovery::Registry,
    errors::{CycleError, InitError, RequireError},
    initiator::{self, InitPlan},
    types::{Injectable, Instance, Lifetime, ServiceKey, TypeInfo},
};

/// Container holding all registrations and realized singletons.
///
/// Built once from a [`Registry`] at the composition root; the construction
/// graph is validated for cycles before the container is handed out.
/// Resolution is safe under concurrent access: each singleton constructs
/// exactly once through its own cell, and unrelated singletons may construct
/// concurrently.
#[derive(Clone)]
pub struct Container {
    pub(crate) inner: Arc<ContainerInner>,
}

pub(crate) struct ContainerInner {
    store: DescriptorStore,
    /// One cell per descriptor, index-aligned; only singleton descriptors
    /// ever populate theirs.
    slots: Vec<OnceCell<Instance>>,
    graph: DependencyGraph,
    init_plan: OnceCell<InitPlan>,
    pub(crate) lazy: DashMap<(TypeId, ServiceKey), Arc<dyn std::any::Any + Send + Sync>>,
}

impl Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_struct("Container");
        for descriptor in self.inner.store.iter() {
            map.field(descriptor.service.type_name, &descriptor.lifetime);
        }
        map.finish()
    }
}

impl Container {
    /// Consumes the registry, validates the construction graph and exposes
    /// the container for resolution.
    pub fn build(registry: Registry) -> Result<Container, CycleError> {
        let store = registry.into_store();
        let graph = DependencyGraph::construction(&store);
        graph.ensure_acyclic()?;

        let slots = (0..store.len()).map(|_| OnceCell::new()).collect();
        tracing::debug!("container built with {} descriptor(s)", store.len());

        Ok(Container {
            inner: Arc::new(ContainerInner {
                store,
                slots,
                graph,
                init_plan: OnceCell::new(),
                lazy: DashMap::new(),
            }),
        })
    }

    /// Resolves the last-registered service of type `T`.
    pub fn resolve<T: Injectable + ?Sized>(&self) -> Result<Arc<T>, RequireError> {
        self.ctx().get::<T>()
    }

    /// Resolves the last-registered service of type `T` under `key`.
    pub fn resolve_with_key<T: Injectable + ?Sized>(
        &self,
        key: &str,
    ) -> Result<Arc<T>, RequireError> {
        self.ctx().get_keyed::<T>(Some(key))
    }

    /// Resolves every registration of `T`, in registration order.
    pub fn resolve_all<T: Injectable + ?Sized>(&self) -> Result<Vec<Arc<T>>, RequireError> {
        let ctx = self.ctx();
        let info = TypeInfo::of::<T>();
        self.inner
            .store
            .all_for(info)
            .map(|descriptor| {
                ctx.realize(descriptor)?
                    .downcast::<T>()
                    .map_err(|actual_type| RequireError::DowncastFailed {
                        required_type: info.type_name,
                        actual_type,
                    })
            })
            .collect()
    }

    /// Opens an explicit scope. Scoped services constructed through it are
    /// cached per scope and torn down together when the scope drops.
    pub fn scope(&self) -> Scope {
        Scope {
            container: self.clone(),
            state: ScopeState::default(),
        }
    }

    /// Structural report over the registrations; recomputed on demand.
    pub fn diagnostics(&self) -> DiagnosticsReport {
        diagnostics::run(&self.inner.store)
    }

    /// Fails with the full cycle if the construction graph is cyclic.
    pub fn ensure_acyclic(&self) -> Result<(), CycleError> {
        self.inner.graph.ensure_acyclic()
    }

    pub fn store(&self) -> &DescriptorStore {
        &self.inner.store
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.inner.graph
    }

    /// The initialization plan, computed once and cached. Available for
    /// display before [`Container::initialize_all`] runs any side effect.
    pub fn initialization_order(&self) -> Result<&InitPlan, InitError> {
        self.inner.init_plan.get_or_try_init(|| {
            let nodes = initiator::collect(self)?;
            Ok(initiator::plan(&nodes)?)
        })
    }

    /// Executes the initialization plan sequentially and fail-fast.
    pub async fn initialize_all(&self) -> Result<(), InitError> {
        let nodes = initiator::collect(self)?;
        let plan = self.initialization_order()?.clone();
        initiator::execute(self, &nodes, &plan).await
    }

    pub(crate) fn realize(
        &self,
        descriptor: &ServiceDescriptor,
    ) -> Result<Instance, RequireError> {
        self.ctx().realize(descriptor)
    }

    fn ctx(&self) -> Ctx<'_> {
        Ctx {
            container: &self.inner,
            scope: None,
        }
    }
}

/// Resolution context handed to constructor closures.
///
/// Resolves declared dependencies against the container, or against the
/// active scope when construction happens inside one.
pub struct Ctx<'a> {
    container: &'a ContainerInner,
    scope: Option<&'a ScopeState>,
}

impl Ctx<'_> {
    pub fn get<T: Injectable + ?Sized>(&self) -> Result<Arc<T>, RequireError> {
        self.get_keyed::<T>(None)
    }

    pub fn get_keyed<T: Injectable + ?Sized>(
        &self,
        key: Option<&str>,
    ) -> Result<Arc<T>, RequireError> {
        let info = TypeInfo::of::<T>();
        let descriptor = self
            .container
            .store
            .last_for(info, key)
            .ok_or(RequireError::TypeMissing(info.type_name))?;
        self.realize(descriptor)?
            .downcast::<T>()
            .map_err(|actual_type| RequireError::DowncastFailed {
                required_type: info.type_name,
                actual_type,
            })
    }

    pub(crate) fn realize(
        &self,
        descriptor: &ServiceDescriptor,
    ) -> Result<Instance, RequireError> {
        match &descriptor.source {
            ServiceSource::Alias { target, cast } => {
                let canonical = self
                    .container
                    .store
                    .last_for(*target, descriptor.key.as_deref())
                    .ok_or(RequireError::TypeMissing(target.type_name))?;
                let instance = self.realize(canonical)?;
                cast(&instance)
            }
            ServiceSource::Instance(instance) => Ok(instance.clone()),
            ServiceSource::Constructor { .. } | ServiceSource::Factory { .. } => {
                match descriptor.lifetime {
                    Lifetime::Singleton => self.container.slots[descriptor.index()]
                        .get_or_try_init(|| self.construct(descriptor))
                        .cloned(),
                    Lifetime::Transient => self.construct(descriptor),
                    Lifetime::Scoped => match self.scope {
                        Some(scope) => scope.get_or_construct(descriptor, self),
                        None => Err(RequireError::ScopedFromRoot(descriptor.service.type_name)),
                    },
                }
            }
        }
    }

    fn construct(&self, descriptor: &ServiceDescriptor) -> Result<Instance, RequireError> {
        match &descriptor.source {
            ServiceSource::Constructor { construct, .. }
            | ServiceSource::Factory { construct } => {
                tracing::debug!("constructing '{}'", descriptor.service.type_name);
                construct(self)
            }
            // Instances and aliases are realized above, never constructed here.
            _ => Err(RequireError::TypeMissing(descriptor.service.type_name)),
        }
    }
}

#[derive(Default)]
pub(crate) struct ScopeState {
    cells: Mutex<ScopeCells>,
}

#[derive(Default)]
struct ScopeCells {
    by_index: HashMap<usize, Instance>,
    /// Construction order, for reverse teardown.
    order: Vec<usize>,
}

impl ScopeState {
    fn get_or_construct(
        &self,
        descriptor: &ServiceDescriptor,
        ctx: &Ctx<'_>,
    ) -> Result<Instance, RequireError> {
        {
            let cells = self.cells.lock().unwrap();
            if let Some(existing) = cells.by_index.get(&descriptor.index()) {
                return Ok(existing.clone());
            }
        }

        // Construct outside the lock so nested scoped dependencies can recurse.
        let instance = ctx.construct(descriptor)?;

        let mut cells = self.cells.lock().unwrap();
        if let Some(existing) = cells.by_index.get(&descriptor.index()) {
            return Ok(existing.clone());
        }
        cells.order.push(descriptor.index());
        cells.by_index.insert(descriptor.index(), instance.clone());
        Ok(instance)
    }
}

/// An explicit resolution scope.
///
/// Everything scoped constructed through it lives exactly as long as the
/// scope; dropping the scope releases the instances in reverse construction
/// order.
pub struct Scope {
    container: Container,
    state: ScopeState,
}

impl Scope {
    pub fn resolve<T: Injectable + ?Sized>(&self) -> Result<Arc<T>, RequireError> {
        self.ctx().get::<T>()
    }

    pub fn resolve_with_key<T: Injectable + ?Sized>(
        &self,
        key: &str,
    ) -> Result<Arc<T>, RequireError> {
        self.ctx().get_keyed::<T>(Some(key))
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    fn ctx(&self) -> Ctx<'_> {
        Ctx {
            container: &self.container.inner,
            scope: Some(&self.state),
        }
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        let mut cells = self.state.cells.lock().unwrap();
        while let Some(index) = cells.order.pop() {
            cells.by_index.remove(&index);
        }
    }
}

impl Container {
    /// Registers a keyed lazy factory; construction happens at most once, on
    /// first access, shared by every resolver of that key.
    pub fn register_lazy_keyed<T, F>(&self, key: impl Into<ServiceKey>, factory: F)
    where
        T: Injectable,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let key = key.into();
        let holder = Arc::new(crate::lazy::LazyKeyed::new(key.clone(), Box::new(factory)));
        self.inner
            .lazy
            .insert((TypeId::of::<T>(), key), holder as Arc<dyn std::any::Any + Send + Sync>);
    }

    /// Returns the shared lazy holder registered under `key`.
    pub fn resolve_keyed<T: Injectable>(
        &self,
        key: &str,
    ) -> Result<Arc<crate::lazy::LazyKeyed<T>>, RequireError> {
        let entry = self
            .inner
            .lazy
            .get(&(TypeId::of::<T>(), key.to_string()))
            .ok_or_else(|| RequireError::KeyMissing {
                type_name: type_name::<T>(),
                key: key.to_string(),
            })?;
        entry
            .value()
            .clone()
            .downcast::<crate::lazy::LazyKeyed<T>>()
            .map_err(|_| RequireError::KeyMissing {
                type_name: type_name::<T>(),
                key: key.to_string(),
            })
    }
}
