//! Dependency graph construction and ordering.
//!
//! ```text
//! Vec<NodeCommand>
//!   ↓
//! build_graph()            → resolve after/before names, chain order tiers
//!   ↓
//! DependencyGraph { node → nodes it waits for }
//!   ↓
//! topological_sort()       → Vec<NodeCommand> (dependencies first) | CycleError
//! ```

mod builder;
mod sort;

use std::hash::Hash;

use indexmap::{IndexMap, IndexSet};

pub use builder::{build_graph, DuplicateNamePolicy, GraphBuilder};
pub use sort::topological_sort;

/// Mapping from each node to the set of nodes it depends on.
///
/// Iteration follows insertion order, which keeps plans reproducible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraph<N: Eq + Hash> {
    edges: IndexMap<N, IndexSet<N>>,
}

impl<N: Eq + Hash> Default for DependencyGraph<N> {
    fn default() -> Self {
        Self {
            edges: IndexMap::new(),
        }
    }
}

impl<N: Eq + Hash + Clone> DependencyGraph<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `node` with no dependencies unless it is already present.
    pub fn insert_node(&mut self, node: N) {
        self.edges.entry(node).or_default();
    }

    /// Record that `node` waits for `dependency`. `node` becomes a key if it
    /// was not one; `dependency` is not added as a key.
    pub fn add_dependency(&mut self, node: N, dependency: N) {
        self.edges.entry(node).or_default().insert(dependency);
    }

    pub fn dependencies(&self, node: &N) -> Option<&IndexSet<N>> {
        self.edges.get(node)
    }

    pub fn depends_on(&self, node: &N, dependency: &N) -> bool {
        self.edges
            .get(node)
            .is_some_and(|deps| deps.contains(dependency))
    }

    pub fn contains(&self, node: &N) -> bool {
        self.edges.contains_key(node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.edges.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&N, &IndexSet<N>)> {
        self.edges.iter()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(IndexSet::len).sum()
    }

    /// Reverse adjacency (dependency → dependents) over every node that
    /// appears anywhere in the graph, keys first, then dependency-only
    /// targets in the order they are met.
    pub fn dependents(&self) -> IndexMap<&N, IndexSet<&N>> {
        let mut reversed: IndexMap<&N, IndexSet<&N>> = IndexMap::with_capacity(self.edges.len());
        for node in self.edges.keys() {
            reversed.entry(node).or_default();
        }
        for (node, deps) in &self.edges {
            for dep in deps {
                reversed.entry(dep).or_default().insert(node);
            }
        }
        reversed
    }
}

impl<N, D> FromIterator<(N, D)> for DependencyGraph<N>
where
    N: Eq + Hash + Clone,
    D: IntoIterator<Item = N>,
{
    fn from_iter<T: IntoIterator<Item = (N, D)>>(iter: T) -> Self {
        let mut graph = Self::new();
        for (node, deps) in iter {
            graph.insert_node(node.clone());
            for dep in deps {
                graph.add_dependency(node.clone(), dep);
            }
        }
        graph
    }
}
