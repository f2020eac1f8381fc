//! Registration of startup commands.
//!
//! Callers classify each procedure once, as a [`Procedure`], and attach
//! ordering hints with [`startup_command`]. Groups of commands can be bundled
//! in a [`CommandModule`] tree and installed into a [`CommandRegistry`] in one
//! call.

use std::fmt;
use std::future::Future;

use crate::command::{
    AsyncFunctionCommand, AsyncResourceCommand, AsyncTeardown, Command, FunctionCommand,
    ResourceCommand, Teardown,
};
use crate::error::PlanError;
use crate::graph::DuplicateNamePolicy;
use crate::node::{DependencyNode, NodeCommand, NodeDescriptor};
use crate::plan::StartupPlan;

/// A procedure already classified into one of the command shapes.
pub enum Procedure {
    Function(FunctionCommand),
    AsyncFunction(AsyncFunctionCommand),
    Resource(ResourceCommand),
    AsyncResource(AsyncResourceCommand),
}

impl Procedure {
    pub fn function<F>(name: impl Into<String>, procedure: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::Function(FunctionCommand::new(name, procedure))
    }

    pub fn async_function<F, Fut>(name: impl Into<String>, procedure: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::AsyncFunction(AsyncFunctionCommand::new(name, procedure))
    }

    pub fn resource<F>(name: impl Into<String>, setup: F) -> Self
    where
        F: Fn() -> anyhow::Result<Teardown> + Send + Sync + 'static,
    {
        Self::Resource(ResourceCommand::new(name, setup))
    }

    pub fn async_resource<F, Fut>(name: impl Into<String>, setup: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<AsyncTeardown>> + Send + 'static,
    {
        Self::AsyncResource(AsyncResourceCommand::new(name, setup))
    }

    /// Short label for plans and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Function(_) => "function",
            Self::AsyncFunction(_) => "async_function",
            Self::Resource(_) => "resource",
            Self::AsyncResource(_) => "async_resource",
        }
    }

    pub fn into_command(self) -> Box<dyn Command> {
        match self {
            Self::Function(c) => Box::new(c),
            Self::AsyncFunction(c) => Box::new(c),
            Self::Resource(c) => Box::new(c),
            Self::AsyncResource(c) => Box::new(c),
        }
    }
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(c) => f.debug_tuple("Function").field(c).finish(),
            Self::AsyncFunction(c) => f.debug_tuple("AsyncFunction").field(c).finish(),
            Self::Resource(c) => f.debug_tuple("Resource").field(c).finish(),
            Self::AsyncResource(c) => f.debug_tuple("AsyncResource").field(c).finish(),
        }
    }
}

impl From<FunctionCommand> for Procedure {
    fn from(command: FunctionCommand) -> Self {
        Self::Function(command)
    }
}

impl From<AsyncFunctionCommand> for Procedure {
    fn from(command: AsyncFunctionCommand) -> Self {
        Self::AsyncFunction(command)
    }
}

impl From<ResourceCommand> for Procedure {
    fn from(command: ResourceCommand) -> Self {
        Self::Resource(command)
    }
}

impl From<AsyncResourceCommand> for Procedure {
    fn from(command: AsyncResourceCommand) -> Self {
        Self::AsyncResource(command)
    }
}

/// Wrap a classified procedure in a graph node carrying `descriptor`.
pub fn startup_command(descriptor: NodeDescriptor, procedure: impl Into<Procedure>) -> NodeCommand {
    NodeCommand::from_boxed(descriptor, procedure.into().into_command())
}

/// A named bundle of startup commands, possibly with nested bundles.
pub trait CommandModule {
    fn name(&self) -> &str;

    fn register(&self, registry: &mut CommandRegistry);

    fn submodules(&self) -> Vec<&dyn CommandModule> {
        Vec::new()
    }
}

/// Ordered collection of startup commands waiting to be planned.
#[derive(Debug, Default, Clone)]
pub struct CommandRegistry {
    commands: Vec<NodeCommand>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `procedure` under `descriptor` and return the node handle.
    pub fn register(
        &mut self,
        descriptor: NodeDescriptor,
        procedure: impl Into<Procedure>,
    ) -> NodeCommand {
        let node = startup_command(descriptor, procedure);
        self.add(node.clone());
        node
    }

    /// Add an already built node. Adding the same node twice keeps one entry.
    pub fn add(&mut self, node: NodeCommand) {
        if self.commands.contains(&node) {
            return;
        }
        tracing::debug!(command = node.label(), "command registered");
        self.commands.push(node);
    }

    /// Install `module` and then, depth first, every nested module.
    pub fn install(&mut self, module: &dyn CommandModule) {
        let mut pending = vec![module];
        while let Some(module) = pending.pop() {
            let before = self.commands.len();
            module.register(self);
            tracing::debug!(
                module = module.name(),
                commands = self.commands.len() - before,
                "module installed"
            );
            let mut children = module.submodules();
            children.reverse();
            pending.extend(children);
        }
    }

    /// First command registered under `name`.
    pub fn get(&self, name: &str) -> Option<&NodeCommand> {
        self.commands
            .iter()
            .find(|node| DependencyNode::name(*node) == Some(name))
    }

    pub fn commands(&self) -> &[NodeCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn into_commands(self) -> Vec<NodeCommand> {
        self.commands
    }

    /// Resolve the registered commands into start order.
    pub fn plan(&self, duplicate_names: DuplicateNamePolicy) -> Result<StartupPlan, PlanError> {
        StartupPlan::resolve(self.commands.iter().cloned(), duplicate_names)
    }
}

impl Extend<NodeCommand> for CommandRegistry {
    fn extend<T: IntoIterator<Item = NodeCommand>>(&mut self, iter: T) {
        for node in iter {
            self.add(node);
        }
    }
}
