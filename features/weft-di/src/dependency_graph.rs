use std::{
    any::TypeId,
    collections::{BTreeMap, HashSet},
};

use crate::{
    descriptor::{DescriptorStore, ServiceSource},
    errors::CycleError,
    types::TypeInfo,
};

/// Directed "constructed before" graph over registered service types.
///
/// The same adjacency shape is built from two different sources: the
/// construction graph (constructor parameter types) and the initialization
/// graph (declared depends_on sets). Keyed by `TypeId` for deterministic
/// iteration order.
pub struct DependencyGraph {
    map: BTreeMap<TypeId, Node>,
}

struct Node {
    info: TypeInfo,
    edges: Vec<TypeInfo>,
}

impl DependencyGraph {
    /// Edges from each constructor-backed descriptor to every declared
    /// parameter type that has a registration; unmatched parameters are
    /// assumed externally supplied and ignored. Alias descriptors contribute
    /// an edge onto their target so cycles through interfaces stay visible.
    pub(crate) fn construction(store: &DescriptorStore) -> Self {
        let mut graph = DependencyGraph {
            map: BTreeMap::new(),
        };

        for descriptor in store.iter() {
            match &descriptor.source {
                ServiceSource::Constructor { params, .. } => {
                    let edges = params
                        .iter()
                        .copied()
                        .filter(|param| store.has_service(*param))
                        .collect();
                    graph.insert(descriptor.service, edges);
                }
                ServiceSource::Alias { target, .. } => {
                    graph.insert(descriptor.service, vec![*target]);
                }
                ServiceSource::Factory { .. } | ServiceSource::Instance(_) => {
                    graph.insert(descriptor.service, Vec::new());
                }
            }
        }

        graph
    }

    /// Edges from each async-initializable node to its declared dependencies.
    pub(crate) fn initialization(nodes: &[(TypeInfo, Vec<TypeInfo>)]) -> Self {
        let mut graph = DependencyGraph {
            map: BTreeMap::new(),
        };
        for (info, depends_on) in nodes {
            graph.insert(*info, depends_on.clone());
        }
        graph
    }

    fn insert(&mut self, info: TypeInfo, edges: Vec<TypeInfo>) {
        let node = self.map.entry(info.type_id).or_insert(Node {
            info,
            edges: Vec::new(),
        });
        for edge in edges {
            if !node.edges.contains(&edge) {
                node.edges.push(edge);
            }
        }
    }

    /// Outgoing edges of `service`; empty when unknown.
    pub fn edges(&self, service: TypeInfo) -> &[TypeInfo] {
        self.map
            .get(&service.type_id)
            .map(|node| node.edges.as_slice())
            .unwrap_or(&[])
    }

    /// Depth-first search with an explicit recursion stack; the first node
    /// revisited while still on the stack yields the full cycle, ordered from
    /// the repeated node back to itself.
    pub fn find_cycle(&self) -> Option<Vec<TypeInfo>> {
        let mut visited = HashSet::new();
        for node in self.map.values() {
            let mut stack = Vec::new();
            if let Some(chain) = self.search(node, &mut visited, &mut stack) {
                return Some(chain);
            }
        }
        None
    }

    fn search(
        &self,
        node: &Node,
        visited: &mut HashSet<TypeId>,
        stack: &mut Vec<TypeInfo>,
    ) -> Option<Vec<TypeInfo>> {
        if let Some(position) = stack
            .iter()
            .position(|info| info.type_id == node.info.type_id)
        {
            let mut chain = stack[position..].to_vec();
            chain.push(node.info);
            return Some(chain);
        }

        // Already cleared through another path.
        if !visited.insert(node.info.type_id) {
            return None;
        }

        stack.push(node.info);
        for edge in &node.edges {
            if let Some(next) = self.map.get(&edge.type_id) {
                if let Some(chain) = self.search(next, visited, stack) {
                    return Some(chain);
                }
            }
        }
        stack.pop();
        None
    }

    pub fn ensure_acyclic(&self) -> Result<(), CycleError> {
        match self.find_cycle() {
            Some(chain) => {
                tracing::error!("circular dependency detected: {:?}", chain);
                Err(CycleError { chain })
            }
            None => Ok(()),
        }
    }
}
