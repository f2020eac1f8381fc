pub mod command;
pub mod config;
pub mod graph;

pub use command::{CommandError, Failure, ProcedureKind};
pub use config::ConfigError;
pub use graph::{format_cycle_path, CycleError, GraphError, PlanError};

/// Stable numeric codes for error categories, used for process exit codes and
/// JSONL events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    Success = 0,
    GeneralError = 1,
    ConfigError = 2,
    ValidationError = 3,
    DependencyError = 11,
    CircularDependency = 12,
    InvalidCallMode = 20,
    CommandFailed = 21,
}

impl ErrorCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}
