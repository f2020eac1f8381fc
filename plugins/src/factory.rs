use liftoff_core::config::{ActionConfig, AppConfig, CommandConfig, ExecutionMode};
use liftoff_core::{startup_command, CommandModule, CommandRegistry, NodeCommand, Procedure};

use crate::service::service_procedure;
use crate::shell::exec_procedure;

pub fn build_procedure(cfg: &CommandConfig, mode: ExecutionMode) -> Procedure {
    let label = cfg.label();
    match &cfg.action {
        ActionConfig::Exec { run, teardown } => {
            exec_procedure(&label, run, teardown.as_deref(), mode)
        }
        ActionConfig::Service { program, args } => service_procedure(&label, program, args, mode),
    }
}

pub fn build_command(cfg: &CommandConfig, mode: ExecutionMode) -> NodeCommand {
    startup_command(cfg.node.clone(), build_procedure(cfg, mode))
}

/// The `[[commands]]` of a manifest, installable into a registry.
pub struct ManifestModule<'a> {
    commands: &'a [CommandConfig],
    mode: ExecutionMode,
}

impl<'a> ManifestModule<'a> {
    pub fn new(commands: &'a [CommandConfig], mode: ExecutionMode) -> Self {
        Self { commands, mode }
    }
}

impl CommandModule for ManifestModule<'_> {
    fn name(&self) -> &str {
        "manifest"
    }

    fn register(&self, registry: &mut CommandRegistry) {
        for cfg in self.commands {
            registry.add(build_command(cfg, self.mode));
        }
    }
}

/// Registry holding every manifest command, built for `mode`.
pub fn build_registry(cfg: &AppConfig, mode: ExecutionMode) -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry.install(&ManifestModule::new(&cfg.commands, mode));
    registry
}
