use thiserror::Error;

use super::ErrorCode;

/// Errors raised while turning node descriptors into a dependency graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("dependency graph node not found: name={name}")]
    NodeNotFound {
        name: String,
        /// Name of the node holding the dangling reference, when it has one.
        referenced_by: Option<String>,
    },

    #[error("duplicate dependency graph node name: name={0}")]
    DuplicateName(String),
}

impl GraphError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::NodeNotFound { .. } => ErrorCode::DependencyError,
            Self::DuplicateName(_) => ErrorCode::ValidationError,
        }
    }
}

/// A dependency cycle found by the topological sort.
///
/// `cycle[i]` depends on `cycle[i + 1]`, and the last node depends on the
/// first. A self-dependent node is reported as a one-element cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("dependency cycle detected across {} node(s)", .cycle.len())]
pub struct CycleError<N: std::fmt::Debug> {
    pub cycle: Vec<N>,
}

impl<N: std::fmt::Debug> CycleError<N> {
    pub fn new(cycle: Vec<N>) -> Self {
        Self { cycle }
    }

    pub fn into_cycle(self) -> Vec<N> {
        self.cycle
    }

    /// Re-key the cycle, e.g. from node handles to their display labels.
    pub fn map<M: std::fmt::Debug>(self, f: impl FnMut(N) -> M) -> CycleError<M> {
        CycleError {
            cycle: self.cycle.into_iter().map(f).collect(),
        }
    }
}

/// Errors raised while resolving registered commands into an ordered plan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("circular dependency detected: {}", format_cycle_path(.0))]
    Cycle(Vec<String>),
}

impl PlanError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Graph(e) => e.error_code(),
            Self::Cycle(_) => ErrorCode::CircularDependency,
        }
    }
}

impl From<CycleError<String>> for PlanError {
    fn from(err: CycleError<String>) -> Self {
        Self::Cycle(err.into_cycle())
    }
}

/// Render a cycle as `a -> b -> a`, closing the loop back to its first node.
pub fn format_cycle_path(cycle: &[String]) -> String {
    let mut parts: Vec<&str> = cycle.iter().map(String::as_str).collect();
    if let Some(first) = cycle.first() {
        parts.push(first);
    }
    parts.join(" -> ")
}
