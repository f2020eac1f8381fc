//! Long-running processes kept alive between start and stop.

use std::process::Stdio;

use anyhow::{bail, Context, Result};
use liftoff_core::config::ExecutionMode;
use liftoff_core::{async_teardown, teardown, Procedure};

fn spawn_blocking_child(program: &str, args: &[String]) -> Result<std::process::Child> {
    std::process::Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to spawn service `{program}`"))
}

fn spawn_child(program: &str, args: &[String]) -> Result<tokio::process::Child> {
    tokio::process::Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to spawn service `{program}`"))
}

/// Build a `service` procedure: start spawns `program`, stop terminates it.
///
/// A service that exited on its own before stop is reported as a failure of
/// stop, since whatever depended on it ran without it.
pub fn service_procedure(
    name: &str,
    program: &str,
    args: &[String],
    mode: ExecutionMode,
) -> Procedure {
    let label = name.to_string();
    let program = program.to_string();
    let args = args.to_vec();

    match mode {
        ExecutionMode::Sync => Procedure::resource(name, move || {
            let mut child = spawn_blocking_child(&program, &args)?;
            let pid = child.id();
            tracing::info!(service = %label, pid, "service started");

            let label = label.clone();
            Ok(teardown(move |_failure| {
                if let Some(status) = child.try_wait()? {
                    bail!("service `{label}` exited before stop with {status}");
                }
                child.kill().context("failed to terminate service")?;
                child.wait()?;
                tracing::info!(service = %label, pid, "service stopped");
                Ok(())
            }))
        }),
        ExecutionMode::Async => Procedure::async_resource(name, move || {
            let (label, program, args) = (label.clone(), program.clone(), args.clone());
            async move {
                let mut child = spawn_child(&program, &args)?;
                let pid = child.id();
                tracing::info!(service = %label, pid, "service started");

                Ok(async_teardown(move |_failure| async move {
                    if let Some(status) = child.try_wait()? {
                        bail!("service `{label}` exited before stop with {status}");
                    }
                    child.kill().await.context("failed to terminate service")?;
                    tracing::info!(service = %label, pid, "service stopped");
                    Ok(())
                }))
            }
        }),
    }
}
