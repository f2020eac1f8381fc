use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::ErrorCode;

/// Which flavour of procedure refused a call in the wrong mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureKind {
    AsyncFunction,
    AsyncResource,
}

impl fmt::Display for ProcedureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AsyncFunction => f.write_str("asynchronous procedure"),
            Self::AsyncResource => f.write_str("asynchronous resource procedure"),
        }
    }
}

/// Errors surfaced by lifecycle commands.
///
/// Cloning is cheap: the same failure is handed to every command stopped
/// during an unwind and then returned to the caller.
#[derive(Error, Debug, Clone)]
pub enum CommandError {
    #[error("cannot run an {kind} synchronously: procedure={procedure}")]
    InvalidCallMode {
        procedure: String,
        kind: ProcedureKind,
    },

    #[error(transparent)]
    Failed(Failure),
}

impl CommandError {
    pub fn invalid_call_mode(procedure: impl Into<String>, kind: ProcedureKind) -> Self {
        Self::InvalidCallMode {
            procedure: procedure.into(),
            kind,
        }
    }

    /// Wrap a user failure. A bare `CommandError` converted into `anyhow`
    /// (e.g. an injected failure re-raised by a teardown) is unwrapped so that
    /// it keeps its identity. One under added context stays wrapped, so the
    /// context message is not lost.
    pub fn failed(err: impl Into<anyhow::Error>) -> Self {
        let err = err.into();
        // Deref reaches the outermost error only; `anyhow::Error::is` would
        // also look through context layers.
        let outermost: &(dyn std::error::Error + Send + Sync + 'static) = &*err;
        if !outermost.is::<CommandError>() {
            return Self::Failed(Failure::new(err));
        }
        match err.downcast::<CommandError>() {
            Ok(inner) => inner,
            Err(err) => Self::Failed(Failure::new(err)),
        }
    }

    pub fn is_invalid_call_mode(&self) -> bool {
        matches!(self, Self::InvalidCallMode { .. })
    }

    /// True when both values carry the very same failure instance.
    pub fn same_failure(&self, other: &CommandError) -> bool {
        match (self, other) {
            (Self::Failed(a), Self::Failed(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidCallMode { .. } => ErrorCode::InvalidCallMode,
            Self::Failed(_) => ErrorCode::CommandFailed,
        }
    }
}

impl From<anyhow::Error> for CommandError {
    fn from(err: anyhow::Error) -> Self {
        Self::failed(err)
    }
}

/// A failure raised by user start/stop code, shared behind an `Arc`.
#[derive(Clone)]
pub struct Failure(Arc<anyhow::Error>);

impl Failure {
    pub fn new(err: anyhow::Error) -> Self {
        Self(Arc::new(err))
    }

    pub fn ptr_eq(&self, other: &Failure) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }

    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.0.downcast_ref::<E>()
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}
