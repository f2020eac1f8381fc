//! Ordered execution with symmetric, failure-aware unwinding.

use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::command::Command;
use crate::error::CommandError;

/// Runs its commands in order and stops the started ones in reverse.
///
/// If a command fails to start, every command started before it is stopped
/// with that failure and the failure is returned. The failing command itself
/// is never stopped. A failure while stopping does not interrupt the unwind;
/// the last one seen is returned once every started command has been stopped.
///
/// A `SequenceCommand` is itself a [`Command`], so sequences nest.
pub struct SequenceCommand<C> {
    name: String,
    commands: Vec<C>,
    /// Indices into `commands` that completed `start`, in start order.
    started: Mutex<Vec<usize>>,
}

impl<C: Command> SequenceCommand<C> {
    pub fn new(commands: Vec<C>) -> Self {
        Self {
            name: "sequence".to_string(),
            commands,
            started: Mutex::new(Vec::new()),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn commands(&self) -> &[C] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Number of commands currently started and not yet stopped.
    pub fn started_len(&self) -> usize {
        self.started().len()
    }

    /// Start the sequence, run `body`, then stop the sequence with the body's
    /// failure, if any.
    ///
    /// When both the body and the teardown fail, the body's failure is
    /// returned and the teardown failure is logged.
    pub fn scope<T, F>(&self, body: F) -> Result<T, CommandError>
    where
        F: FnOnce() -> anyhow::Result<T>,
    {
        self.start()?;
        let outcome = body().map_err(CommandError::from);
        let stopped = self.stop(outcome.as_ref().err());
        self.settle(outcome, stopped)
    }

    /// Async counterpart of [`scope`](Self::scope).
    pub async fn scope_async<T, F, Fut>(&self, body: F) -> Result<T, CommandError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        self.start_async().await?;
        let outcome = body().await.map_err(CommandError::from);
        let stopped = self.stop_async(outcome.as_ref().err()).await;
        self.settle(outcome, stopped)
    }

    fn settle<T>(
        &self,
        outcome: Result<T, CommandError>,
        stopped: Result<(), CommandError>,
    ) -> Result<T, CommandError> {
        match (outcome, stopped) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(teardown)) => Err(teardown),
            (Err(failure), Ok(())) => Err(failure),
            (Err(failure), Err(teardown)) => {
                tracing::warn!(
                    sequence = %self.name,
                    error = %teardown,
                    "teardown failed after scope body failure"
                );
                Err(failure)
            }
        }
    }

    fn started(&self) -> MutexGuard<'_, Vec<usize>> {
        self.started.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pop_started(&self) -> Option<usize> {
        self.started().pop()
    }

    fn rollback_failed(&self, err: &CommandError) {
        tracing::warn!(
            sequence = %self.name,
            error = %err,
            "rollback after start failure did not complete cleanly"
        );
    }
}

impl<C> fmt::Debug for SequenceCommand<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceCommand")
            .field("name", &self.name)
            .field("commands", &self.commands.len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<C: Command> Command for SequenceCommand<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self) -> Result<(), CommandError> {
        for (index, command) in self.commands.iter().enumerate() {
            if let Err(failure) = command.start() {
                tracing::error!(
                    sequence = %self.name,
                    command = command.name(),
                    error = %failure,
                    "start failed, rolling back"
                );
                if let Err(err) = self.stop(Some(&failure)) {
                    self.rollback_failed(&err);
                }
                return Err(failure);
            }
            tracing::debug!(sequence = %self.name, command = command.name(), "started");
            self.started().push(index);
        }
        Ok(())
    }

    fn stop(&self, failure: Option<&CommandError>) -> Result<(), CommandError> {
        let mut last_error = None;
        while let Some(index) = self.pop_started() {
            let command = &self.commands[index];
            match command.stop(failure) {
                Ok(()) => tracing::debug!(sequence = %self.name, command = command.name(), "stopped"),
                Err(err) => {
                    tracing::error!(
                        sequence = %self.name,
                        command = command.name(),
                        error = %err,
                        "stop failed, continuing unwind"
                    );
                    last_error = Some(err);
                }
            }
        }
        last_error.map_or(Ok(()), Err)
    }

    async fn start_async(&self) -> Result<(), CommandError> {
        for (index, command) in self.commands.iter().enumerate() {
            if let Err(failure) = command.start_async().await {
                tracing::error!(
                    sequence = %self.name,
                    command = command.name(),
                    error = %failure,
                    "start failed, rolling back"
                );
                if let Err(err) = self.stop_async(Some(&failure)).await {
                    self.rollback_failed(&err);
                }
                return Err(failure);
            }
            tracing::debug!(sequence = %self.name, command = command.name(), "started");
            self.started().push(index);
        }
        Ok(())
    }

    async fn stop_async(&self, failure: Option<&CommandError>) -> Result<(), CommandError> {
        let mut last_error = None;
        while let Some(index) = self.pop_started() {
            let command = &self.commands[index];
            match command.stop_async(failure).await {
                Ok(()) => tracing::debug!(sequence = %self.name, command = command.name(), "stopped"),
                Err(err) => {
                    tracing::error!(
                        sequence = %self.name,
                        command = command.name(),
                        error = %err,
                        "stop failed, continuing unwind"
                    );
                    last_error = Some(err);
                }
            }
        }
        last_error.map_or(Ok(()), Err)
    }
}
