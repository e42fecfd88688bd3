use std::{any::TypeId, collections::HashMap};

use thiserror::Error;

use crate::{
    descriptor::{DescriptorStore, ServiceSource},
    types::{Lifetime, ServiceKey, TypeInfo},
};

/// One implementation inside a duplicate-registration group.
#[derive(Debug, Clone)]
pub struct DuplicateEntry {
    pub implementation: &'static str,
    pub lifetime: Lifetime,
}

/// Advisory findings. Never fatal, never thrown - surfaced only through
/// [`DiagnosticsReport::warnings`].
#[derive(Error, Debug, Clone)]
pub enum Warning {
    /// A longer-lived service holds a shorter-lived dependency, pinning its
    /// lifetime for as long as the owner exists.
    #[error("service '{owner}' ({owner_lifetime}) captures '{dependency}' ({dependency_lifetime})")]
    LifetimeCaptivity {
        owner: TypeInfo,
        owner_lifetime: Lifetime,
        dependency: TypeInfo,
        dependency_lifetime: Lifetime,
    },

    /// The same `(service, key)` pair is registered more than once. Legal for
    /// enumerable resolution, but a common source of "wrong implementation
    /// resolved" bugs, so it is surfaced here.
    #[error("'{service}' is registered {} times: {}", .entries.len(), render_entries(.entries))]
    DuplicateRegistration {
        service: TypeInfo,
        key: Option<ServiceKey>,
        entries: Vec<DuplicateEntry>,
    },
}

fn render_entries(entries: &[DuplicateEntry]) -> String {
    entries
        .iter()
        .map(|entry| format!("{} ({})", entry.implementation, entry.lifetime))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Aggregate structural report over a descriptor store.
///
/// Derived on demand; recomputing never mutates the store.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsReport {
    pub total: usize,
    pub singletons: usize,
    pub scoped: usize,
    pub transients: usize,
    pub warnings: Vec<Warning>,
}

pub(crate) fn run(store: &DescriptorStore) -> DiagnosticsReport {
    let mut report = DiagnosticsReport {
        total: store.len(),
        ..Default::default()
    };

    for descriptor in store.iter() {
        match descriptor.lifetime {
            Lifetime::Singleton => report.singletons += 1,
            Lifetime::Scoped => report.scoped += 1,
            Lifetime::Transient => report.transients += 1,
        }
    }

    captivity(store, &mut report.warnings);
    duplicates(store, &mut report.warnings);

    if !report.warnings.is_empty() {
        tracing::warn!("diagnostics found {} warning(s)", report.warnings.len());
    }

    report
}

/// One warning per construction edge whose owner outlives its dependency.
fn captivity(store: &DescriptorStore, warnings: &mut Vec<Warning>) {
    for descriptor in store.iter() {
        let ServiceSource::Constructor { params, .. } = &descriptor.source else {
            continue;
        };
        for param in params {
            let Some(dependency) = store.last_for(*param, None) else {
                continue;
            };
            if descriptor.lifetime.rank() > dependency.lifetime.rank() {
                warnings.push(Warning::LifetimeCaptivity {
                    owner: descriptor.service,
                    owner_lifetime: descriptor.lifetime,
                    dependency: dependency.service,
                    dependency_lifetime: dependency.lifetime,
                });
            }
        }
    }
}

/// Groups descriptors by `(service, key)`; groups larger than one become a
/// warning listing every implementation and lifetime, in registration order.
fn duplicates(store: &DescriptorStore, warnings: &mut Vec<Warning>) {
    let mut groups: HashMap<(TypeId, Option<ServiceKey>), Vec<usize>> = HashMap::new();
    let mut group_order: Vec<(TypeId, Option<ServiceKey>)> = Vec::new();

    for descriptor in store.iter() {
        let group_key = (descriptor.service.type_id, descriptor.key.clone());
        let members = groups.entry(group_key.clone()).or_default();
        if members.is_empty() {
            group_order.push(group_key);
        }
        members.push(descriptor.index());
    }

    let descriptors: Vec<_> = store.iter().collect();
    for group_key in group_order {
        let members = &groups[&group_key];
        if members.len() < 2 {
            continue;
        }
        let first = descriptors[members[0]];
        warnings.push(Warning::DuplicateRegistration {
            service: first.service,
            key: first.key.clone(),
            entries: members
                .iter()
                .map(|&index| DuplicateEntry {
                    implementation: descriptors[index].implementation_name(),
                    lifetime: descriptors[index].lifetime,
                })
                .collect(),
        });
    }
}
