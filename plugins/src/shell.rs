//! Commands that run a shell line to completion.

use std::process::{ExitStatus, Stdio};

use anyhow::{bail, Context, Result};
use liftoff_core::config::ExecutionMode;
use liftoff_core::{async_teardown, teardown, CommandError, Procedure};

/// Set for teardown lines run because of a failure; holds its message.
pub const FAILURE_ENV: &str = "LIFTOFF_FAILURE";

fn shell_program() -> (&'static str, &'static str) {
    if cfg!(windows) {
        ("cmd", "/C")
    } else {
        ("sh", "-c")
    }
}

fn check_status(line: &str, status: ExitStatus) -> Result<()> {
    if status.success() {
        Ok(())
    } else {
        bail!("`{line}` exited with {status}")
    }
}

/// Run `line` through the platform shell and wait for it, blocking.
pub fn run_line(line: &str, failure: Option<&CommandError>) -> Result<()> {
    let (shell, flag) = shell_program();
    let mut command = std::process::Command::new(shell);
    command.arg(flag).arg(line).stdin(Stdio::null());
    if let Some(err) = failure {
        command.env(FAILURE_ENV, err.to_string());
    }

    tracing::debug!(line, "running shell line");
    let status = command
        .status()
        .with_context(|| format!("failed to spawn `{line}`"))?;
    check_status(line, status)
}

/// Async counterpart of [`run_line`].
pub async fn run_line_async(line: &str, failure: Option<&CommandError>) -> Result<()> {
    let (shell, flag) = shell_program();
    let mut command = tokio::process::Command::new(shell);
    command.arg(flag).arg(line).stdin(Stdio::null());
    if let Some(err) = failure {
        command.env(FAILURE_ENV, err.to_string());
    }

    tracing::debug!(line, "running shell line");
    let status = command
        .status()
        .await
        .with_context(|| format!("failed to spawn `{line}`"))?;
    check_status(line, status)
}

fn log_injected(name: &str, failure: Option<&CommandError>) {
    if let Some(err) = failure {
        tracing::warn!(command = name, error = %err, "running teardown after failure");
    }
}

/// Build an `exec` procedure.
///
/// Without `teardown_line` the command only runs on start. With it, the
/// command becomes a two-phase resource whose stop runs `teardown_line`.
pub fn exec_procedure(
    name: &str,
    run: &str,
    teardown_line: Option<&str>,
    mode: ExecutionMode,
) -> Procedure {
    let name = name.to_string();
    let run = run.to_string();

    match (mode, teardown_line.map(str::to_string)) {
        (ExecutionMode::Sync, None) => Procedure::function(name, move || run_line(&run, None)),
        (ExecutionMode::Async, None) => Procedure::async_function(name, move || {
            let run = run.clone();
            async move { run_line_async(&run, None).await }
        }),
        (ExecutionMode::Sync, Some(down)) => {
            let label = name.clone();
            Procedure::resource(name, move || {
                run_line(&run, None)?;
                let (label, down) = (label.clone(), down.clone());
                Ok(teardown(move |failure| {
                    log_injected(&label, failure.as_ref());
                    run_line(&down, failure.as_ref())
                }))
            })
        }
        (ExecutionMode::Async, Some(down)) => {
            let label = name.clone();
            Procedure::async_resource(name, move || {
                let (run, label, down) = (run.clone(), label.clone(), down.clone());
                async move {
                    run_line_async(&run, None).await?;
                    Ok(async_teardown(move |failure| async move {
                        log_injected(&label, failure.as_ref());
                        run_line_async(&down, failure.as_ref()).await
                    }))
                }
            })
        }
    }
}
