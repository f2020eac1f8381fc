use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use liftoff_core::config::{ExecutionMode, StreamFormat};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    Text,
    Jsonl,
}

impl From<FormatArg> for StreamFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Text => StreamFormat::Text,
            FormatArg::Jsonl => StreamFormat::Jsonl,
        }
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Sync,
    Async,
}

impl From<ModeArg> for ExecutionMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Sync => ExecutionMode::Sync,
            ModeArg::Async => ExecutionMode::Async,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "liftoff", version, about = "Start and stop commands in dependency order")]
pub struct Args {
    /// Manifest to load instead of ./liftoff.toml or ~/.liftoff/config.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the resolved start order.
    Plan(PlanArgs),
    /// Validate the manifest and its dependency graph without running anything.
    Check,
    /// Start every command in order, then stop them in reverse.
    Run(RunArgs),
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct PlanArgs {
    /// Output format; defaults to `execution.stream_format`.
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct RunArgs {
    /// Execution mode; defaults to `execution.mode`.
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Shorthand for `--mode sync`.
    #[arg(long, conflicts_with = "mode")]
    pub sync: bool,

    /// Wait for ctrl-c between start and stop.
    #[arg(long)]
    pub hold: bool,

    /// Output format; defaults to `execution.stream_format`.
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,
}
