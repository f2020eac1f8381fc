use std::io::Write;
use std::sync::Arc;

use liftoff_core::config::{AppConfig, ExecutionMode, StreamFormat};
use liftoff_core::{
    new_run_id, render_plan, Command, CommandError, LifecycleEvent, NodeCommand, SequenceCommand,
};
use liftoff_plugins::factory::build_registry;
use serde_json::json;

use crate::commands::cli::RunArgs;
use crate::error::CliError;

type Startup = Arc<SequenceCommand<NodeCommand>>;

/// Prints lifecycle progress as text lines or JSONL events.
struct Reporter<'w, W: Write> {
    out: &'w mut W,
    format: StreamFormat,
    run_id: String,
}

impl<W: Write> Reporter<'_, W> {
    fn emit(&mut self, event: LifecycleEvent, text: impl FnOnce() -> String) -> std::io::Result<()> {
        match self.format {
            StreamFormat::Jsonl => writeln!(self.out, "{}", event.to_line()),
            StreamFormat::Text => writeln!(self.out, "{}", text()),
        }
    }

    fn event(&self, event_type: &str) -> LifecycleEvent {
        LifecycleEvent::new(event_type, &self.run_id)
    }

    fn failed(&mut self, phase: &str, err: &CommandError) -> std::io::Result<()> {
        let event = self
            .event("run.failed")
            .error(err, err.error_code().as_u16())
            .metadata(json!({ "phase": phase }));
        self.emit(event, || format!("✗ {phase} failed: {err}"))
    }
}

pub async fn run_cmd(cfg: &AppConfig, args: &RunArgs) -> Result<i32, CliError> {
    run_with(cfg, args, &mut std::io::stdout()).await
}

/// Start every manifest command in plan order, optionally wait for ctrl-c,
/// then stop them in reverse. Progress goes to `out`.
pub async fn run_with<W: Write + Send>(
    cfg: &AppConfig,
    args: &RunArgs,
    out: &mut W,
) -> Result<i32, CliError> {
    let mode = if args.sync {
        ExecutionMode::Sync
    } else {
        args.mode.map(Into::into).unwrap_or(cfg.execution.mode)
    };
    let format = args
        .format
        .map(Into::into)
        .unwrap_or(cfg.execution.stream_format);
    let hold = args.hold || cfg.execution.hold;

    let plan = build_registry(cfg, mode).plan(cfg.graph.duplicate_names)?;
    let mut reporter = Reporter {
        out,
        format,
        run_id: new_run_id(),
    };
    let rendered = render_plan(&plan, format, &reporter.run_id);
    writeln!(reporter.out, "{}", rendered.trim_end())?;

    let total = plan.len();
    let sequence: Startup = Arc::new(plan.into_sequence());
    tracing::info!(run_id = %reporter.run_id, %mode, total, "starting commands");

    let event = reporter
        .event("run.start")
        .metadata(json!({ "mode": mode.as_str(), "total": total }));
    reporter.emit(event, || format!("▶ starting {total} commands ({mode})"))?;

    if let Err(err) = start(&sequence, mode).await? {
        reporter.failed("start", &err)?;
        return Err(err.into());
    }

    // Once started, commands are stopped no matter how the run is cut short.
    let held = hold_started(&mut reporter, hold, total).await;
    let failure = held
        .as_ref()
        .err()
        .map(|err| CommandError::failed(anyhow::anyhow!("run interrupted: {err}")));
    let stopped = stop(&sequence, mode, failure).await;

    if let Err(err) = held {
        let stop_error = match stopped {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(e) => Some(e.to_string()),
        };
        if let Some(error) = stop_error {
            tracing::warn!(run_id = %reporter.run_id, %error, "stop failed after interrupted run");
        }
        return Err(err);
    }
    if let Err(err) = stopped? {
        reporter.failed("stop", &err)?;
        return Err(err.into());
    }

    let event = reporter.event("run.end");
    reporter.emit(event, || "✓ done".to_string())?;
    tracing::info!(run_id = %reporter.run_id, "all commands stopped");
    Ok(0)
}

/// Everything between a successful start and the stop.
async fn hold_started<W: Write>(
    reporter: &mut Reporter<'_, W>,
    hold: bool,
    total: usize,
) -> Result<(), CliError> {
    let event = reporter.event("run.started");
    reporter.emit(event, || "✓ all commands started".to_string())?;

    if hold {
        tracing::info!(run_id = %reporter.run_id, "holding until ctrl-c");
        reporter.out.flush()?;
        tokio::signal::ctrl_c().await?;
    }

    let event = reporter.event("run.stop");
    reporter.emit(event, || format!("■ stopping {total} commands"))?;
    Ok(())
}

// The outer error means the blocking task could not be joined.
async fn start(sequence: &Startup, mode: ExecutionMode) -> Result<Result<(), CommandError>, CliError> {
    match mode {
        ExecutionMode::Async => Ok(sequence.start_async().await),
        ExecutionMode::Sync => {
            let sequence = sequence.clone();
            tokio::task::spawn_blocking(move || sequence.start())
                .await
                .map_err(|e| CliError::Internal(e.to_string()))
        }
    }
}

async fn stop(
    sequence: &Startup,
    mode: ExecutionMode,
    failure: Option<CommandError>,
) -> Result<Result<(), CommandError>, CliError> {
    match mode {
        ExecutionMode::Async => Ok(sequence.stop_async(failure.as_ref()).await),
        ExecutionMode::Sync => {
            let sequence = sequence.clone();
            tokio::task::spawn_blocking(move || sequence.stop(failure.as_ref()))
                .await
                .map_err(|e| CliError::Internal(e.to_string()))
        }
    }
}
