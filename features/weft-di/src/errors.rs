use std::sync::Arc;

use thiserror::Error;

use crate::types::{DynError, TypeInfo};

/// Errors raised while declaring registrations.
///
/// These fail fast at registration time, before the graph is ever validated.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    /// A registration exposed a service type it never declared as implemented.
    #[error("'{concrete}' was exposed as '{service}' but does not declare it")]
    ServiceNotImplemented { concrete: TypeInfo, service: TypeInfo },

    /// The naming convention produced no matching implementation.
    #[error("no implementation named '{derived}' found in collection '{collection}' for interface '{interface}'")]
    ImplementationNotFound {
        interface: &'static str,
        derived: String,
        collection: &'static str,
    },

    /// Interface and derived implementation disagree on generic arity.
    #[error(
        "interface '{interface}' has {interface_arity} generic parameter(s) \
         but implementation '{implementation}' has {implementation_arity}"
    )]
    GenericArityMismatch {
        interface: &'static str,
        implementation: &'static str,
        interface_arity: usize,
        implementation_arity: usize,
    },
}

/// A cycle in the construction or initialization graph.
///
/// The chain runs from the repeated node back to itself.
#[derive(Error, Debug, Clone)]
#[error("circular dependency: {}", render_chain(.chain))]
pub struct CycleError {
    pub chain: Vec<TypeInfo>,
}

fn render_chain(chain: &[TypeInfo]) -> String {
    chain
        .iter()
        .map(|info| info.type_name)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Errors when trying to resolve a service.
#[derive(Error, Debug, Clone)]
pub enum RequireError {
    /// The required type is not registered.
    #[error("the required type '{0}' is not registered")]
    TypeMissing(&'static str),

    /// A scoped service was requested outside of any scope.
    #[error("'{0}' is scoped and cannot be resolved from the root container")]
    ScopedFromRoot(&'static str),

    #[error("failed to downcast, required: '{required_type}' actual: '{actual_type}'")]
    DowncastFailed {
        required_type: &'static str,
        actual_type: &'static str,
    },

    /// No lazy registration exists under the given key.
    #[error("no lazy registration under key '{key}' for type '{type_name}'")]
    KeyMissing {
        type_name: &'static str,
        key: String,
    },

    /// A constructor or factory failed while producing its service.
    #[error("factory for '{product}' failed: {error}")]
    FactoryFailed {
        product: &'static str,
        error: Arc<DynError>,
    },
}

/// Errors during the asynchronous startup sequence.
#[derive(Error, Debug)]
pub enum InitError {
    /// The initialization graph contains a cycle.
    #[error(transparent)]
    Cycle(#[from] CycleError),

    /// An initializable service could not be realized.
    #[error(transparent)]
    Require(#[from] RequireError),

    /// A step's startup work failed; remaining steps were not executed.
    #[error("initialization of '{service}' failed: {source}")]
    StepFailed {
        service: &'static str,
        #[source]
        source: DynError,
    },
}
