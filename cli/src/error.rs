use liftoff_core::{CommandError, ConfigError, ErrorCode, PlanError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("plan error: {0}")]
    Plan(#[from] PlanError),

    #[error("command failed: {0}")]
    Command(#[from] CommandError),

    #[error("logging setup failed: {0}")]
    Logging(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CliError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Plan(e) => e.error_code(),
            Self::Command(e) => e.error_code(),
            Self::Logging(_) => ErrorCode::ConfigError,
            Self::Io(_) | Self::Internal(_) => ErrorCode::GeneralError,
        }
    }
}

/// Process exit code for `e`.
///
/// 0: success
/// 11: config error
/// 12: dependency graph error (unknown name, duplicate name, cycle)
/// 20: a command failed to start or stop
/// 50: internal/uncategorized
pub fn exit_code_for_error(e: &CliError) -> i32 {
    match e {
        CliError::Config(_) | CliError::Logging(_) => 11,
        CliError::Plan(_) => 12,
        CliError::Command(_) => 20,
        CliError::Io(_) | CliError::Internal(_) => 50,
    }
}
