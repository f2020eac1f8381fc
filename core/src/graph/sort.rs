use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::CycleError;

use super::DependencyGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Order every node of `graph` so that each node comes after all of its
/// dependencies.
///
/// Nodes that only appear as dependency targets are included. Mutually
/// independent nodes keep the order in which the graph first saw them.
///
/// # Errors
///
/// Returns the first cycle met. `cycle[i]` depends on `cycle[i + 1]` and the
/// last node depends on the first.
pub fn topological_sort<N>(graph: &DependencyGraph<N>) -> Result<Vec<N>, CycleError<N>>
where
    N: Eq + Hash + Clone + Debug,
{
    let dependents = graph.dependents();
    let mut marks: HashMap<&N, Mark> = HashMap::with_capacity(dependents.len());
    let mut finished: Vec<&N> = Vec::with_capacity(dependents.len());

    // Explicit DFS stack over dependency -> dependents edges. Each frame
    // keeps the iterator of children still to visit.
    for &root in dependents.keys().rev() {
        if marks.contains_key(root) {
            continue;
        }
        marks.insert(root, Mark::InProgress);
        let mut path = vec![(root, dependents[root].iter().rev())];

        while let Some((node, next)) = path
            .last_mut()
            .map(|(node, children)| (*node, children.next().copied()))
        {
            let Some(next) = next else {
                marks.insert(node, Mark::Done);
                finished.push(node);
                path.pop();
                continue;
            };

            match marks.get(next) {
                Some(Mark::Done) => {}
                Some(Mark::InProgress) => {
                    let start = path.iter().position(|(n, _)| *n == next).unwrap_or(0);
                    // path[i + 1] depends on path[i]; flip it so each node
                    // points at the one it waits for.
                    let mut cycle: Vec<N> =
                        path[start..].iter().map(|(n, _)| (*n).clone()).collect();
                    cycle.reverse();
                    tracing::debug!(len = cycle.len(), "dependency cycle found");
                    return Err(CycleError::new(cycle));
                }
                None => {
                    marks.insert(next, Mark::InProgress);
                    path.push((next, dependents[next].iter().rev()));
                }
            }
        }
    }

    tracing::debug!(nodes = finished.len(), "topological order resolved");
    Ok(finished.into_iter().rev().cloned().collect())
}
