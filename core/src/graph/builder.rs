use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::node::DependencyNode;

use super::DependencyGraph;

/// What to do when two different nodes declare the same name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateNamePolicy {
    /// Fail the build with [`GraphError::DuplicateName`].
    #[default]
    Reject,
    /// The node met last owns the name.
    LastWins,
}

/// Turns nodes carrying ordering hints into a [`DependencyGraph`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphBuilder {
    duplicate_names: DuplicateNamePolicy,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn duplicate_names(mut self, policy: DuplicateNamePolicy) -> Self {
        self.duplicate_names = policy;
        self
    }

    /// Build the graph.
    ///
    /// # Algorithm
    ///
    /// 1. Seed every node with an empty dependency set
    /// 2. Index named nodes by name
    /// 3. `after = [X]` makes the node depend on X
    /// 4. `before = [Y]` makes Y depend on the node
    /// 5. Sort distinct `order` tiers; every node of a tier depends on every
    ///    node of the tier just below it
    ///
    /// Unknown names abort the build; no partial graph is returned.
    pub fn build<N, I>(&self, nodes: I) -> Result<DependencyGraph<N>, GraphError>
    where
        N: DependencyNode + Eq + Hash + Clone,
        I: IntoIterator<Item = N>,
    {
        let mut graph = DependencyGraph::new();
        for node in nodes {
            graph.insert_node(node);
        }

        let by_name = self.index_names(&graph)?;
        let resolve = |name: &String, holder: &N| {
            by_name
                .get(name.as_str())
                .map(|node| (*node).clone())
                .ok_or_else(|| GraphError::NodeNotFound {
                    name: name.clone(),
                    referenced_by: holder.name().map(str::to_string),
                })
        };

        let mut edges: Vec<(N, N)> = Vec::new();
        for node in graph.nodes() {
            for name in node.after() {
                edges.push((node.clone(), resolve(name, node)?));
            }
        }
        for node in graph.nodes() {
            for name in node.before() {
                edges.push((resolve(name, node)?, node.clone()));
            }
        }

        let mut tiers: BTreeMap<i64, Vec<&N>> = BTreeMap::new();
        for node in graph.nodes() {
            if let Some(order) = node.order() {
                tiers.entry(order).or_default().push(node);
            }
        }
        let tiers: Vec<&Vec<&N>> = tiers.values().collect();
        for pair in tiers.windows(2) {
            let (lower, higher) = (pair[0], pair[1]);
            for next in higher {
                for prev in lower {
                    edges.push(((*next).clone(), (*prev).clone()));
                }
            }
        }

        for (node, dependency) in edges {
            graph.add_dependency(node, dependency);
        }

        tracing::debug!(
            nodes = graph.len(),
            edges = graph.edge_count(),
            "dependency graph built"
        );
        Ok(graph)
    }

    fn index_names<'g, N>(
        &self,
        graph: &'g DependencyGraph<N>,
    ) -> Result<HashMap<&'g str, &'g N>, GraphError>
    where
        N: DependencyNode + Eq + Hash + Clone,
    {
        let mut by_name: HashMap<&str, &N> = HashMap::new();
        for node in graph.nodes() {
            let Some(name) = node.name() else {
                continue;
            };
            if let Some(previous) = by_name.insert(name, node) {
                if previous != node && self.duplicate_names == DuplicateNamePolicy::Reject {
                    return Err(GraphError::DuplicateName(name.to_string()));
                }
                if previous != node {
                    tracing::warn!(name, "duplicate node name, the later node wins");
                }
            }
        }
        Ok(by_name)
    }
}

/// Build a dependency graph with the default options (duplicate names are
/// rejected).
pub fn build_graph<N, I>(nodes: I) -> Result<DependencyGraph<N>, GraphError>
where
    N: DependencyNode + Eq + Hash + Clone,
    I: IntoIterator<Item = N>,
{
    GraphBuilder::new().build(nodes)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::command::FunctionCommand;
    use crate::node::{NodeCommand, NodeDescriptor};

    fn node(descriptor: NodeDescriptor) -> NodeCommand {
        NodeCommand::new(descriptor, FunctionCommand::new("noop", || Ok(())))
    }

    fn graph_of(entries: Vec<(&NodeCommand, Vec<&NodeCommand>)>) -> DependencyGraph<NodeCommand> {
        entries
            .into_iter()
            .map(|(n, deps)| (n.clone(), deps.into_iter().cloned().collect::<Vec<_>>()))
            .collect()
    }

    #[test]
    fn empty_collection() {
        let graph = build_graph(Vec::<NodeCommand>::new()).unwrap();
        assert!(graph.is_empty());
    }

    #[test]
    fn single_node() {
        let a = node(NodeDescriptor::new());
        let graph = build_graph([a.clone()]).unwrap();
        assert_eq!(graph, graph_of(vec![(&a, vec![])]));
    }

    #[test]
    fn independent_nodes() {
        let a = node(NodeDescriptor::new());
        let b = node(NodeDescriptor::new());
        let graph = build_graph([a.clone(), b.clone()]).unwrap();
        assert_eq!(graph, graph_of(vec![(&a, vec![]), (&b, vec![])]));
    }

    #[test]
    fn after_adds_dependency() {
        let first = node(NodeDescriptor::named("command1"));
        let second = node(NodeDescriptor::new().after(["command1"]));
        let graph = build_graph([first.clone(), second.clone()]).unwrap();
        assert_eq!(
            graph,
            graph_of(vec![(&first, vec![]), (&second, vec![&first])])
        );
    }

    #[test]
    fn before_adds_reverse_dependency() {
        let first = node(NodeDescriptor::new().before(["command2"]));
        let second = node(NodeDescriptor::named("command2"));
        let graph = build_graph([first.clone(), second.clone()]).unwrap();
        assert_eq!(
            graph,
            graph_of(vec![(&first, vec![]), (&second, vec![&first])])
        );
    }

    #[test]
    fn lower_order_comes_first() {
        let first = node(NodeDescriptor::new().order(1));
        let second = node(NodeDescriptor::new().order(2));
        let graph = build_graph([second.clone(), first.clone()]).unwrap();
        assert_eq!(
            graph,
            graph_of(vec![(&first, vec![]), (&second, vec![&first])])
        );
    }

    #[test]
    fn order_tiers_chain_through_adjacent_pairs() {
        let low_a = node(NodeDescriptor::new().order(-5));
        let low_b = node(NodeDescriptor::new().order(-5));
        let mid = node(NodeDescriptor::new().order(0));
        let high = node(NodeDescriptor::new().order(10));
        let free = node(NodeDescriptor::new());

        let graph = build_graph([
            high.clone(),
            free.clone(),
            low_a.clone(),
            mid.clone(),
            low_b.clone(),
        ])
        .unwrap();

        assert_eq!(
            graph,
            graph_of(vec![
                (&high, vec![&mid]),
                (&free, vec![]),
                (&low_a, vec![]),
                (&mid, vec![&low_a, &low_b]),
                (&low_b, vec![]),
            ])
        );
    }

    #[test]
    fn same_order_adds_no_edge() {
        let a = node(NodeDescriptor::new().order(3));
        let b = node(NodeDescriptor::new().order(3));
        let graph = build_graph([a, b]).unwrap();
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn after_unknown_name_fails() {
        let a = node(NodeDescriptor::named("api").after(["non_existent_command"]));
        let err = build_graph([a]).unwrap_err();
        assert_eq!(
            err,
            GraphError::NodeNotFound {
                name: "non_existent_command".into(),
                referenced_by: Some("api".into()),
            }
        );
    }

    #[test]
    fn before_unknown_name_fails() {
        let a = node(NodeDescriptor::new().before(["non_existent_command"]));
        let err = build_graph([a]).unwrap_err();
        assert!(matches!(
            err,
            GraphError::NodeNotFound { ref name, referenced_by: None } if name == "non_existent_command"
        ));
    }

    #[test]
    fn duplicate_names_rejected_by_default() {
        let a = node(NodeDescriptor::named("db"));
        let b = node(NodeDescriptor::named("db"));
        let err = build_graph([a, b]).unwrap_err();
        assert_eq!(err, GraphError::DuplicateName("db".into()));
    }

    #[test]
    fn duplicate_names_last_wins_when_allowed() {
        let a = node(NodeDescriptor::named("db"));
        let b = node(NodeDescriptor::named("db"));
        let c = node(NodeDescriptor::new().after(["db"]));

        let graph = GraphBuilder::new()
            .duplicate_names(DuplicateNamePolicy::LastWins)
            .build([a.clone(), b.clone(), c.clone()])
            .unwrap();

        assert!(graph.depends_on(&c, &b));
        assert!(!graph.depends_on(&c, &a));
    }

    #[test]
    fn same_node_twice_is_one_key() {
        let a = node(NodeDescriptor::named("db"));
        let graph = build_graph([a.clone(), a]).unwrap();
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn self_reference_becomes_self_loop() {
        let a = node(NodeDescriptor::named("loop").after(["loop"]));
        let graph = build_graph([a.clone()]).unwrap();
        assert!(graph.depends_on(&a, &a));
    }
}
