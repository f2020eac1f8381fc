use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::{CommandError, ProcedureKind};

use super::Command;

type Procedure = Box<dyn Fn() -> anyhow::Result<()> + Send + Sync>;
type AsyncProcedure = Box<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Runs a plain procedure on every `start`; stopping does nothing.
pub struct FunctionCommand {
    name: String,
    procedure: Procedure,
}

impl FunctionCommand {
    pub fn new<F>(name: impl Into<String>, procedure: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            procedure: Box::new(procedure),
        }
    }
}

impl fmt::Debug for FunctionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionCommand")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Command for FunctionCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self) -> Result<(), CommandError> {
        (self.procedure)().map_err(CommandError::from)
    }

    fn stop(&self, _failure: Option<&CommandError>) -> Result<(), CommandError> {
        Ok(())
    }

    async fn start_async(&self) -> Result<(), CommandError> {
        self.start()
    }

    async fn stop_async(&self, _failure: Option<&CommandError>) -> Result<(), CommandError> {
        Ok(())
    }
}

/// Awaits an asynchronous procedure on `start_async`.
///
/// The synchronous `start` refuses to run it.
pub struct AsyncFunctionCommand {
    name: String,
    procedure: AsyncProcedure,
}

impl AsyncFunctionCommand {
    pub fn new<F, Fut>(name: impl Into<String>, procedure: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            procedure: Box::new(move || Box::pin(procedure())),
        }
    }
}

impl fmt::Debug for AsyncFunctionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncFunctionCommand")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Command for AsyncFunctionCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self) -> Result<(), CommandError> {
        Err(CommandError::invalid_call_mode(
            &self.name,
            ProcedureKind::AsyncFunction,
        ))
    }

    fn stop(&self, _failure: Option<&CommandError>) -> Result<(), CommandError> {
        Ok(())
    }

    async fn start_async(&self) -> Result<(), CommandError> {
        (self.procedure)().await.map_err(CommandError::from)
    }

    async fn stop_async(&self, _failure: Option<&CommandError>) -> Result<(), CommandError> {
        Ok(())
    }
}
