//! Resolution of registered commands into start order, and its rendering.

use chrono::Local;
use serde::Serialize;

use crate::config::StreamFormat;
use crate::error::PlanError;
use crate::graph::{topological_sort, DuplicateNamePolicy, GraphBuilder};
use crate::node::NodeCommand;
use crate::sequence::SequenceCommand;

/// Commands in the order they will start. They stop in reverse.
#[derive(Debug, Clone)]
pub struct StartupPlan {
    commands: Vec<NodeCommand>,
}

impl StartupPlan {
    /// Build the dependency graph of `commands` and sort it.
    ///
    /// A cycle is reported by node labels so it can be shown to a person.
    pub fn resolve<I>(commands: I, duplicate_names: DuplicateNamePolicy) -> Result<Self, PlanError>
    where
        I: IntoIterator<Item = NodeCommand>,
    {
        let graph = GraphBuilder::new()
            .duplicate_names(duplicate_names)
            .build(commands)?;
        let commands = topological_sort(&graph)
            .map_err(|cycle| PlanError::from(cycle.map(|node| node.label().to_string())))?;

        tracing::info!(commands = commands.len(), "startup plan resolved");
        Ok(Self { commands })
    }

    pub fn commands(&self) -> &[NodeCommand] {
        &self.commands
    }

    pub fn labels(&self) -> Vec<&str> {
        self.commands.iter().map(NodeCommand::label).collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn entries(&self) -> Vec<PlanEntry> {
        self.commands
            .iter()
            .enumerate()
            .map(|(position, node)| {
                let descriptor = node.descriptor();
                PlanEntry {
                    position,
                    label: node.label().to_string(),
                    after: descriptor.after.clone(),
                    before: descriptor.before.clone(),
                    order: descriptor.order,
                }
            })
            .collect()
    }

    pub fn into_sequence(self) -> SequenceCommand<NodeCommand> {
        SequenceCommand::new(self.commands).with_name("startup")
    }
}

/// One row of a rendered plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    pub position: usize,
    pub label: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub before: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

/// One JSONL line of the event stream.
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleEvent {
    pub v: i32,
    #[serde(rename = "type")]
    pub event_type: String,
    pub ts: String,
    pub run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl LifecycleEvent {
    pub fn new(event_type: impl Into<String>, run_id: &str) -> Self {
        Self {
            v: 1,
            event_type: event_type.into(),
            ts: Local::now().to_rfc3339(),
            run_id: run_id.to_string(),
            command: None,
            error: None,
            code: None,
            metadata: None,
        }
    }

    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn error(mut self, error: impl ToString, code: u16) -> Self {
        self.error = Some(error.to_string());
        self.code = Some(code);
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"v":1,"type":"event.encode_error","error":"{e}"}}"#)
        })
    }
}

/// Fresh identifier tying together the events of one run.
pub fn new_run_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Render `plan` for display: a numbered list, or a single `plan` event.
pub fn render_plan(plan: &StartupPlan, format: StreamFormat, run_id: &str) -> String {
    match format {
        StreamFormat::Jsonl => LifecycleEvent::new("plan", run_id)
            .metadata(serde_json::json!({
                "commands": plan.entries(),
                "total": plan.len(),
            }))
            .to_line(),
        StreamFormat::Text => {
            let mut out = format!("Startup plan ({} commands):\n", plan.len());
            for entry in plan.entries() {
                out.push_str(&format!("  {:>2}. {}", entry.position + 1, entry.label));
                if !entry.after.is_empty() {
                    out.push_str(&format!("  after: {}", entry.after.join(", ")));
                }
                if !entry.before.is_empty() {
                    out.push_str(&format!("  before: {}", entry.before.join(", ")));
                }
                if let Some(order) = entry.order {
                    out.push_str(&format!("  order: {order}"));
                }
                out.push('\n');
            }
            out
        }
    }
}
