use std::sync::Arc;

use crate::{
    container::Ctx,
    errors::RequireError,
    initiator::Initializable,
    types::{Instance, Lifetime, ServiceKey, TypeInfo},
};

/// Erased constructor: builds one instance against the active resolution context.
pub(crate) type SharedCtor =
    Arc<dyn Fn(&Ctx<'_>) -> Result<Instance, RequireError> + Send + Sync>;

/// Erased alias cast: converts a canonical instance into one of its service views.
pub(crate) type SharedCast =
    Arc<dyn Fn(&Instance) -> Result<Instance, RequireError> + Send + Sync>;

/// Erased accessor for the async-init capability of a realized instance.
pub(crate) type InitCast =
    Arc<dyn Fn(&Instance) -> Result<Arc<dyn Initializable>, RequireError> + Send + Sync>;

/// How one service is produced.
///
/// The variants make "exactly one of implementation, factory or instance"
/// structural rather than a runtime invariant.
pub enum ServiceSource {
    /// A concrete type built through its registered constructor, with the
    /// constructor's declared parameter service types.
    Constructor {
        implementation: TypeInfo,
        params: Vec<TypeInfo>,
        construct: SharedCtor,
    },
    /// An opaque factory closure.
    Factory { construct: SharedCtor },
    /// A pre-built instance handed in at registration.
    Instance(Instance),
    /// A secondary lookup key onto another descriptor's canonical slot.
    /// Aliases never construct; they realize the target and cast the result.
    Alias { target: TypeInfo, cast: SharedCast },
}

/// Metadata record describing how to produce one service.
///
/// Immutable after registration; owned exclusively by the [`DescriptorStore`].
pub struct ServiceDescriptor {
    pub service: TypeInfo,
    pub key: Option<ServiceKey>,
    pub lifetime: Lifetime,
    pub source: ServiceSource,
    pub(crate) init: Option<InitCast>,
    /// Discovery order; stable tie-break for planning and diagnostics.
    pub(crate) index: usize,
}

impl ServiceDescriptor {
    /// Human-readable name of what actually backs this registration.
    pub fn implementation_name(&self) -> &'static str {
        match &self.source {
            ServiceSource::Constructor { implementation, .. } => implementation.type_name,
            ServiceSource::Factory { .. } => "<factory>",
            ServiceSource::Instance(instance) => instance.info.type_name,
            ServiceSource::Alias { target, .. } => target.type_name,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// Insertion-ordered collection of service descriptors.
///
/// Order is significant: the last registration wins for single-service
/// resolution, enumerable resolution returns all in order, and discovery
/// order breaks planning ties.
#[derive(Default)]
pub struct DescriptorStore {
    descriptors: Vec<ServiceDescriptor>,
}

impl DescriptorStore {
    pub(crate) fn push(&mut self, mut descriptor: ServiceDescriptor) -> usize {
        let index = self.descriptors.len();
        descriptor.index = index;
        self.descriptors.push(descriptor);
        index
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Last matching registration for `(service, key)` - "last wins".
    pub fn last_for(
        &self,
        service: TypeInfo,
        key: Option<&str>,
    ) -> Option<&ServiceDescriptor> {
        self.descriptors
            .iter()
            .rev()
            .find(|d| d.service.type_id == service.type_id && d.key.as_deref() == key)
    }

    /// Every registration for `service`, in insertion order.
    pub fn all_for(&self, service: TypeInfo) -> impl Iterator<Item = &ServiceDescriptor> {
        self.descriptors
            .iter()
            .filter(move |d| d.service.type_id == service.type_id)
    }

    /// Whether any registration exists for `service`, under any key.
    pub fn has_service(&self, service: TypeInfo) -> bool {
        self.descriptors
            .iter()
            .any(|d| d.service.type_id == service.type_id)
    }
}
