//! Capability resolution: requested ids to a deterministic execution order.
//!
//! 1. Every requested id must be registered.
//! 2. The set is expanded through `depends_on` until closed.
//! 3. A graph with an edge `a -> b` for "a depends on b" is built over the
//!    expanded set and checked for cycles.
//! 4. Kahn's algorithm emits dependencies first. Among ready capabilities the
//!    lowest `(priority, declaration index)` goes next.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use super::{
    entities::{CapabilityId, CapabilityMetadata},
    error::DomainError,
    registry::CapabilityRegistry,
};

/// Outcome of resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Every capability to run, dependencies before dependents.
    pub order: Vec<CapabilityId>,
    /// Ids present only because something depends on them, in resolved order.
    pub auto_enabled: Vec<CapabilityId>,
}

impl Resolution {
    pub fn position(&self, id: &CapabilityId) -> Option<usize> {
        self.order.iter().position(|o| o == id)
    }
}

pub struct CapabilityResolver<'a> {
    registry: &'a CapabilityRegistry,
}

impl<'a> CapabilityResolver<'a> {
    pub fn new(registry: &'a CapabilityRegistry) -> Self {
        Self { registry }
    }

    /// # Errors
    ///
    /// - [`DomainError::UnknownCapability`] for an unregistered requested id
    ///   or dependency.
    /// - [`DomainError::CycleDetected`] naming the cycle.
    pub fn resolve(&self, requested: &[CapabilityId]) -> Result<Resolution, DomainError> {
        for id in requested {
            if !self.registry.contains(id) {
                return Err(DomainError::UnknownCapability {
                    id: id.to_string(),
                    required_by: None,
                });
            }
        }

        let expanded = self.expand(requested)?;

        let mut graph: DiGraph<CapabilityId, ()> = DiGraph::new();
        let mut nodes: HashMap<CapabilityId, NodeIndex> = HashMap::new();
        for meta in expanded.values() {
            nodes.insert(meta.id().clone(), graph.add_node(meta.id().clone()));
        }
        for meta in expanded.values() {
            let from = nodes[meta.id()];
            for dep in meta.depends_on() {
                graph.update_edge(from, nodes[dep], ());
            }
        }

        if let Some(cycle) = self.find_cycle(&graph) {
            return Err(DomainError::CycleDetected { cycle });
        }

        let order = self.kahn(&graph, &expanded);
        let explicit: HashSet<&CapabilityId> = requested.iter().collect();
        let auto_enabled = order
            .iter()
            .filter(|id| !explicit.contains(id))
            .cloned()
            .collect();

        Ok(Resolution {
            order,
            auto_enabled,
        })
    }

    /// Breadth-first closure over `depends_on`.
    fn expand(
        &self,
        requested: &[CapabilityId],
    ) -> Result<HashMap<CapabilityId, CapabilityMetadata>, DomainError> {
        let mut expanded: HashMap<CapabilityId, CapabilityMetadata> = HashMap::new();
        let mut queue: VecDeque<CapabilityId> = requested.iter().cloned().collect();

        while let Some(id) = queue.pop_front() {
            if expanded.contains_key(&id) {
                continue;
            }
            let meta = self
                .registry
                .metadata(&id)
                .ok_or_else(|| DomainError::UnknownCapability {
                    id: id.to_string(),
                    required_by: None,
                })?;
            for dep in meta.depends_on() {
                if !self.registry.contains(dep) {
                    return Err(DomainError::UnknownCapability {
                        id: dep.to_string(),
                        required_by: Some(id.to_string()),
                    });
                }
                if !expanded.contains_key(dep) {
                    queue.push_back(dep.clone());
                }
            }
            expanded.insert(id, meta);
        }

        Ok(expanded)
    }

    fn decl(&self, id: &CapabilityId) -> usize {
        self.registry.position(id).unwrap_or(usize::MAX)
    }

    /// The cycle through the earliest-declared capability of the first
    /// strongly connected component that has one, as `[a, b, a]`.
    fn find_cycle(&self, graph: &DiGraph<CapabilityId, ()>) -> Option<Vec<String>> {
        let mut cyclic: Vec<Vec<NodeIndex>> = tarjan_scc(graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .collect();
        for scc in &mut cyclic {
            scc.sort_by_key(|&n| self.decl(&graph[n]));
        }
        cyclic.sort_by_key(|scc| self.decl(&graph[scc[0]]));

        let scc = cyclic.first()?;
        let members: HashSet<NodeIndex> = scc.iter().copied().collect();
        let start = scc[0];

        let mut path = vec![start];
        let mut visited = HashSet::from([start]);
        if self.walk_back(graph, &members, start, start, &mut path, &mut visited) {
            Some(path.iter().map(|&n| graph[n].to_string()).collect())
        } else {
            None
        }
    }

    /// Depth-first search from `current` back to `start` inside one
    /// component. Pushes the closing `start` onto `path` on success.
    fn walk_back(
        &self,
        graph: &DiGraph<CapabilityId, ()>,
        members: &HashSet<NodeIndex>,
        start: NodeIndex,
        current: NodeIndex,
        path: &mut Vec<NodeIndex>,
        visited: &mut HashSet<NodeIndex>,
    ) -> bool {
        let mut next: Vec<NodeIndex> = graph
            .neighbors_directed(current, Direction::Outgoing)
            .filter(|n| members.contains(n))
            .collect();
        next.sort_by_key(|&n| self.decl(&graph[n]));

        for n in next {
            if n == start {
                path.push(start);
                return true;
            }
            if visited.insert(n) {
                path.push(n);
                if self.walk_back(graph, members, start, n, path, visited) {
                    return true;
                }
                path.pop();
            }
        }
        false
    }

    fn kahn(
        &self,
        graph: &DiGraph<CapabilityId, ()>,
        expanded: &HashMap<CapabilityId, CapabilityMetadata>,
    ) -> Vec<CapabilityId> {
        // Remaining unmet dependencies per node.
        let mut pending: HashMap<NodeIndex, usize> = graph
            .node_indices()
            .map(|n| (n, graph.neighbors_directed(n, Direction::Outgoing).count()))
            .collect();

        let key = |n: NodeIndex| {
            let id = &graph[n];
            let priority = expanded.get(id).map_or(0, CapabilityMetadata::priority);
            Reverse((priority, self.decl(id), n.index()))
        };

        let mut ready: BinaryHeap<_> = pending
            .iter()
            .filter(|&(_, &count)| count == 0)
            .map(|(&n, _)| key(n))
            .collect();

        let mut order = Vec::with_capacity(graph.node_count());
        while let Some(Reverse((_, _, index))) = ready.pop() {
            let n = NodeIndex::new(index);
            order.push(graph[n].clone());
            for dependent in graph.neighbors_directed(n, Direction::Incoming) {
                if let Some(count) = pending.get_mut(&dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(key(dependent));
                    }
                }
            }
        }
        order
    }
}
