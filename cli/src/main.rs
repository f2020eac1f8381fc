use clap::Parser;
use liftoff_cli::commands::{cli, plan, run};
use liftoff_cli::error::{exit_code_for_error, CliError};
use liftoff_cli::logging::init_tracing;

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            exit_code_for_error(&e)
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, CliError> {
    let args = cli::Args::parse();
    let cfg = liftoff_core::config::load(args.config.as_deref())?;
    init_tracing(&cfg.logging)?;

    tracing::debug!(
        commands = cfg.commands.len(),
        mode = %cfg.execution.mode,
        "configuration ready"
    );

    dispatch(args.command, &cfg).await
}

async fn dispatch(
    cmd: cli::Commands,
    cfg: &liftoff_core::config::AppConfig,
) -> Result<i32, CliError> {
    let mut stdout = std::io::stdout();
    match cmd {
        cli::Commands::Plan(plan_args) => plan::plan_cmd(cfg, &plan_args, &mut stdout),
        cli::Commands::Check => plan::check_cmd(cfg, &mut stdout),
        cli::Commands::Run(run_args) => run::run_cmd(cfg, &run_args).await,
    }
}
