//! Ordered, fail-fast asynchronous startup.
//!
//! After the container is built, services exposing the [`Initializable`]
//! capability are planned into a dependency-safe, priority-biased order and
//! executed strictly one after another. The plan is computed once and can be
//! inspected before any side effect runs.

use std::{any::TypeId, collections::HashSet, sync::Arc};

use futures::future::BoxFuture;

use crate::{
    container::Container,
    dependency_graph::DependencyGraph,
    errors::{CycleError, InitError, RequireError},
    types::{DynError, TypeInfo},
};

/// Capability for services that run startup work after the graph is built.
///
/// Registered through [`crate::Registers::initializable`]; a service aliased
/// under several interfaces is still initialized exactly once, through its
/// canonical registration.
pub trait Initializable: Send + Sync {
    /// Higher priority runs earlier among steps whose dependencies are
    /// already ordered.
    fn priority(&self) -> i32 {
        0
    }

    /// Service types that must be initialized before this one.
    fn depends_on(&self) -> Vec<TypeInfo> {
        Vec::new()
    }

    /// The startup work itself. Steps never overlap; whatever concurrency
    /// happens inside one step's body is that service's own concern.
    fn initialize<'a>(&'a self, container: &'a Container) -> BoxFuture<'a, Result<(), DynError>>;
}

/// One entry of the initialization plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitStep {
    pub service: TypeInfo,
    pub priority: i32,
    /// 1-based execution position.
    pub order: usize,
}

/// The ordered list of startup steps, computed before execution begins.
#[derive(Debug, Clone, Default)]
pub struct InitPlan {
    pub steps: Vec<InitStep>,
}

impl InitPlan {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InitStep> {
        self.steps.iter()
    }
}

/// A realized initializable service plus its declared ordering inputs.
pub(crate) struct InitNode {
    pub(crate) info: TypeInfo,
    /// Discovery order; the stable tie-break for equal priorities.
    pub(crate) index: usize,
    pub(crate) priority: i32,
    pub(crate) depends_on: Vec<TypeInfo>,
    pub(crate) instance: Arc<dyn Initializable>,
}

/// Realizes every canonically registered initializable service.
///
/// Aliases carry no init capability of their own, so a type exposed under
/// several service types contributes a single node.
pub(crate) fn collect(container: &Container) -> Result<Vec<InitNode>, RequireError> {
    let mut nodes = Vec::new();
    for descriptor in container.store().iter() {
        let Some(cast) = descriptor.init.as_ref() else {
            continue;
        };
        let instance = container.realize(descriptor)?;
        let init = cast(&instance)?;
        nodes.push(InitNode {
            info: descriptor.service,
            index: descriptor.index(),
            priority: init.priority(),
            depends_on: init.depends_on(),
            instance: init,
        });
    }
    Ok(nodes)
}

/// Topological sort with priority tie-break.
///
/// Repeatedly selects, among nodes whose whole in-set `depends_on` is already
/// ordered, the one with the numerically highest priority; equal priorities
/// break by discovery order. Dependencies outside the initializable set are
/// treated as satisfied - they can produce no step of their own.
pub(crate) fn plan(nodes: &[InitNode]) -> Result<InitPlan, CycleError> {
    let in_set: HashSet<TypeId> = nodes.iter().map(|n| n.info.type_id).collect();
    let mut done: HashSet<TypeId> = HashSet::new();
    let mut remaining: Vec<&InitNode> = nodes.iter().collect();
    let mut steps = Vec::with_capacity(nodes.len());

    while !remaining.is_empty() {
        let selected = remaining
            .iter()
            .enumerate()
            .filter(|(_, node)| {
                node.depends_on
                    .iter()
                    .all(|dep| !in_set.contains(&dep.type_id) || done.contains(&dep.type_id))
            })
            .max_by(|(_, a), (_, b)| {
                a.priority
                    .cmp(&b.priority)
                    .then(b.index.cmp(&a.index))
            })
            .map(|(position, _)| position);

        let Some(position) = selected else {
            // Nothing selectable but nodes remain: the init graph is cyclic.
            let edges: Vec<(TypeInfo, Vec<TypeInfo>)> = remaining
                .iter()
                .map(|node| (node.info, node.depends_on.clone()))
                .collect();
            let chain = DependencyGraph::initialization(&edges)
                .find_cycle()
                .unwrap_or_else(|| remaining.iter().map(|node| node.info).collect());
            return Err(CycleError { chain });
        };

        let node = remaining.remove(position);
        done.insert(node.info.type_id);
        steps.push(InitStep {
            service: node.info,
            priority: node.priority,
            order: steps.len() + 1,
        });
    }

    Ok(InitPlan { steps })
}

/// Runs the plan strictly in order, awaiting each step to completion before
/// the next starts. A failing step halts the sequence; services already
/// initialized stay initialized.
pub(crate) async fn execute(
    container: &Container,
    nodes: &[InitNode],
    plan: &InitPlan,
) -> Result<(), InitError> {
    for step in &plan.steps {
        let Some(node) = nodes
            .iter()
            .find(|node| node.info.type_id == step.service.type_id)
        else {
            debug_assert!(false, "plan step without a matching node");
            continue;
        };

        tracing::debug!(
            "initializing '{}' (step {} of {})",
            step.service.type_name,
            step.order,
            plan.steps.len()
        );

        node.instance
            .initialize(container)
            .await
            .map_err(|source| {
                tracing::error!(
                    "initialization of '{}' failed, halting startup",
                    step.service.type_name
                );
                InitError::StepFailed {
                    service: step.service.type_name,
                    source,
                }
            })?;
    }

    tracing::debug!("all {} initialization step(s) completed", plan.steps.len());
    Ok(())
}
