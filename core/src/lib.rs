//! liftoff-core: dependency-ordered startup and symmetric shutdown of
//! application lifecycle commands.
//!
//! ```text
//! CommandRegistry ──plan()──▶ StartupPlan ──into_sequence()──▶ SequenceCommand
//!   (NodeCommand + hints)      (graph + topological sort)        (start / stop)
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod graph;
pub mod node;
pub mod plan;
pub mod registry;
pub mod sequence;

pub use command::{
    async_teardown, teardown, AsyncFunctionCommand, AsyncResourceCommand, Command,
    FunctionCommand, ResourceCommand, ResourceState,
};
pub use error::{CommandError, ConfigError, CycleError, ErrorCode, GraphError, PlanError};
pub use graph::{build_graph, topological_sort, DependencyGraph, DuplicateNamePolicy, GraphBuilder};
pub use node::{DependencyNode, NodeCommand, NodeDescriptor};
pub use plan::{new_run_id, render_plan, LifecycleEvent, PlanEntry, StartupPlan};
pub use registry::{startup_command, CommandModule, CommandRegistry, Procedure};
pub use sequence::SequenceCommand;
