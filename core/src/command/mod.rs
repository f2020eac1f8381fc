//! Lifecycle commands.
//!
//! Every command exposes the same four operations so that a sequence can drive
//! plain calls, awaited calls and two-phase resources without knowing which
//! one it holds:
//!
//! ```text
//! start()            stop(failure)
//! start_async()      stop_async(failure)
//! ```
//!
//! Combinations a primitive cannot honour fail with
//! [`CommandError::InvalidCallMode`] instead of silently doing nothing.

mod function;
mod resource;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CommandError;

pub use function::{AsyncFunctionCommand, FunctionCommand};
pub use resource::{
    async_teardown, teardown, AsyncResourceCommand, AsyncTeardown, ResourceCommand,
    ResourceState, Teardown,
};

/// Uniform start/stop contract shared by every lifecycle primitive.
#[async_trait]
pub trait Command: Send + Sync {
    /// Label used in errors and logs.
    fn name(&self) -> &str;

    fn start(&self) -> Result<(), CommandError>;

    /// `failure` is the error that caused the shutdown, if any.
    fn stop(&self, failure: Option<&CommandError>) -> Result<(), CommandError>;

    async fn start_async(&self) -> Result<(), CommandError>;

    async fn stop_async(&self, failure: Option<&CommandError>) -> Result<(), CommandError>;
}

#[async_trait]
impl<C: Command + ?Sized> Command for Box<C> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn start(&self) -> Result<(), CommandError> {
        (**self).start()
    }

    fn stop(&self, failure: Option<&CommandError>) -> Result<(), CommandError> {
        (**self).stop(failure)
    }

    async fn start_async(&self) -> Result<(), CommandError> {
        (**self).start_async().await
    }

    async fn stop_async(&self, failure: Option<&CommandError>) -> Result<(), CommandError> {
        (**self).stop_async(failure).await
    }
}

#[async_trait]
impl<C: Command + ?Sized> Command for Arc<C> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn start(&self) -> Result<(), CommandError> {
        (**self).start()
    }

    fn stop(&self, failure: Option<&CommandError>) -> Result<(), CommandError> {
        (**self).stop(failure)
    }

    async fn start_async(&self) -> Result<(), CommandError> {
        (**self).start_async().await
    }

    async fn stop_async(&self, failure: Option<&CommandError>) -> Result<(), CommandError> {
        (**self).stop_async(failure).await
    }
}
