use std::io::Write;

use liftoff_core::config::AppConfig;
use liftoff_core::{new_run_id, render_plan, StartupPlan};
use liftoff_plugins::factory::build_registry;

use crate::commands::cli::PlanArgs;
use crate::error::CliError;

/// Resolve the manifest into a plan without running anything.
pub fn resolve_plan(cfg: &AppConfig) -> Result<StartupPlan, CliError> {
    let registry = build_registry(cfg, cfg.execution.mode);
    Ok(registry.plan(cfg.graph.duplicate_names)?)
}

pub fn plan_cmd<W: Write>(cfg: &AppConfig, args: &PlanArgs, out: &mut W) -> Result<i32, CliError> {
    let plan = resolve_plan(cfg)?;
    let format = args
        .format
        .map(Into::into)
        .unwrap_or(cfg.execution.stream_format);
    writeln!(out, "{}", render_plan(&plan, format, &new_run_id()).trim_end())?;
    Ok(0)
}

pub fn check_cmd<W: Write>(cfg: &AppConfig, out: &mut W) -> Result<i32, CliError> {
    let plan = resolve_plan(cfg)?;
    writeln!(out, "ok: {} commands, no dependency cycles", plan.len())?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use liftoff_core::config::{ActionConfig, CommandConfig, StreamFormat};
    use liftoff_core::NodeDescriptor;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::commands::cli::FormatArg;
    use crate::error::exit_code_for_error;

    fn exec(node: NodeDescriptor) -> CommandConfig {
        CommandConfig {
            node,
            action: ActionConfig::Exec {
                run: "true".into(),
                teardown: None,
            },
        }
    }

    fn manifest(commands: Vec<CommandConfig>) -> AppConfig {
        AppConfig {
            commands,
            ..AppConfig::default()
        }
    }

    #[test]
    fn plan_prints_start_order() {
        let cfg = manifest(vec![
            exec(NodeDescriptor::named("api").after(["db"])),
            exec(NodeDescriptor::named("db")),
        ]);
        let mut out = Vec::new();

        let code = plan_cmd(&cfg, &PlanArgs::default(), &mut out).unwrap();

        assert_eq!(code, 0);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Startup plan (2 commands):\n   1. db\n   2. api  after: db\n"
        );
    }

    #[test]
    fn plan_format_flag_overrides_config() {
        let mut cfg = manifest(vec![exec(NodeDescriptor::named("db"))]);
        cfg.execution.stream_format = StreamFormat::Text;
        let mut out = Vec::new();

        plan_cmd(
            &cfg,
            &PlanArgs {
                format: Some(FormatArg::Jsonl),
            },
            &mut out,
        )
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with('{'), "{text}");
        assert!(text.contains(r#""type":"plan""#), "{text}");
    }

    #[test]
    fn check_reports_cycles_with_graph_exit_code() {
        let cfg = manifest(vec![
            exec(NodeDescriptor::named("a").after(["b"])),
            exec(NodeDescriptor::named("b").after(["a"])),
        ]);
        let mut out = Vec::new();

        let err = check_cmd(&cfg, &mut out).unwrap_err();

        assert_eq!(exit_code_for_error(&err), 12);
        assert!(out.is_empty());
    }

    #[test]
    fn check_counts_commands() {
        let cfg = manifest(vec![exec(NodeDescriptor::named("a")), exec(NodeDescriptor::new())]);
        let mut out = Vec::new();

        check_cmd(&cfg, &mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "ok: 2 commands, no dependency cycles\n"
        );
    }
}
