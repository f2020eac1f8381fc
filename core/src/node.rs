//! Dependency metadata attached to commands.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::error::CommandError;

/// Read-only view of the ordering hints a graph node carries.
pub trait DependencyNode {
    fn name(&self) -> Option<&str>;

    /// Names of nodes that must start before this one.
    fn after(&self) -> &[String];

    /// Names of nodes that must start after this one.
    fn before(&self) -> &[String];

    /// Optional tier; lower tiers start first.
    fn order(&self) -> Option<i64>;
}

/// Ordering hints for one command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub before: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl NodeDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn after<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.after.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn before<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.before.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }
}

impl DependencyNode for NodeDescriptor {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn after(&self) -> &[String] {
        &self.after
    }

    fn before(&self) -> &[String] {
        &self.before
    }

    fn order(&self) -> Option<i64> {
        self.order
    }
}

struct NodeInner {
    descriptor: NodeDescriptor,
    command: Box<dyn Command>,
}

/// A command decorated with ordering hints.
///
/// Cloning yields another handle to the same node. Equality and hashing use
/// the identity of the wrapper, so two nodes wrapping equal commands (or the
/// same command) are still distinct graph nodes.
#[derive(Clone)]
pub struct NodeCommand {
    inner: Arc<NodeInner>,
}

impl NodeCommand {
    pub fn new(descriptor: NodeDescriptor, command: impl Command + 'static) -> Self {
        Self::from_boxed(descriptor, Box::new(command))
    }

    pub fn from_boxed(descriptor: NodeDescriptor, command: Box<dyn Command>) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                descriptor,
                command,
            }),
        }
    }

    pub fn descriptor(&self) -> &NodeDescriptor {
        &self.inner.descriptor
    }

    pub fn command(&self) -> &dyn Command {
        self.inner.command.as_ref()
    }

    /// Label for plans and cycle reports: the node name, else the wrapped
    /// command's name.
    pub fn label(&self) -> &str {
        self.inner
            .descriptor
            .name
            .as_deref()
            .unwrap_or_else(|| self.inner.command.name())
    }
}

impl PartialEq for NodeCommand {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for NodeCommand {}

impl Hash for NodeCommand {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.inner), state)
    }
}

impl fmt::Debug for NodeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeCommand")
            .field("label", &self.label())
            .field("descriptor", &self.inner.descriptor)
            .finish()
    }
}

impl DependencyNode for NodeCommand {
    fn name(&self) -> Option<&str> {
        self.inner.descriptor.name.as_deref()
    }

    fn after(&self) -> &[String] {
        &self.inner.descriptor.after
    }

    fn before(&self) -> &[String] {
        &self.inner.descriptor.before
    }

    fn order(&self) -> Option<i64> {
        self.inner.descriptor.order
    }
}

#[async_trait]
impl Command for NodeCommand {
    fn name(&self) -> &str {
        self.label()
    }

    fn start(&self) -> Result<(), CommandError> {
        self.inner.command.start()
    }

    fn stop(&self, failure: Option<&CommandError>) -> Result<(), CommandError> {
        self.inner.command.stop(failure)
    }

    async fn start_async(&self) -> Result<(), CommandError> {
        self.inner.command.start_async().await
    }

    async fn stop_async(&self, failure: Option<&CommandError>) -> Result<(), CommandError> {
        self.inner.command.stop_async(failure).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::command::FunctionCommand;

    fn noop(name: &str) -> FunctionCommand {
        FunctionCommand::new(name, || Ok(()))
    }

    #[test]
    fn identity_is_the_wrapper() {
        let a = NodeCommand::new(NodeDescriptor::named("same"), noop("x"));
        let b = NodeCommand::new(NodeDescriptor::named("same"), noop("x"));

        assert_ne!(a, b);
        assert_eq!(a, a.clone());

        let set: HashSet<NodeCommand> = [a.clone(), b, a].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn label_falls_back_to_command_name() {
        let named = NodeCommand::new(NodeDescriptor::named("db"), noop("open_db"));
        let anonymous = NodeCommand::new(NodeDescriptor::new(), noop("open_db"));

        assert_eq!(named.label(), "db");
        assert_eq!(anonymous.label(), "open_db");
        assert_eq!(DependencyNode::name(&anonymous), None);
    }

    #[test]
    fn descriptor_builder_collects_hints() {
        let descriptor = NodeDescriptor::named("api")
            .after(["db", "cache"])
            .before(["ingress"])
            .order(2);

        assert_eq!(descriptor.after, vec!["db", "cache"]);
        assert_eq!(descriptor.before, vec!["ingress"]);
        assert_eq!(descriptor.order, Some(2));
    }

    #[test]
    fn descriptor_defaults_are_empty() {
        let descriptor = NodeDescriptor::new();
        assert_eq!(DependencyNode::name(&descriptor), None);
        assert!(DependencyNode::after(&descriptor).is_empty());
        assert!(DependencyNode::before(&descriptor).is_empty());
        assert_eq!(DependencyNode::order(&descriptor), None);
    }

    #[tokio::test]
    async fn delegates_lifecycle_calls() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let node = NodeCommand::new(
            NodeDescriptor::named("count"),
            FunctionCommand::new("count", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );

        node.start().unwrap();
        node.start_async().await.unwrap();
        node.stop(None).unwrap();
        node.stop_async(None).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
