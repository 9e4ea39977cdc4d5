use anyhow::Context;
use clap::Parser;
use dorg::cli::{self, Cli, load_organizer, run_cli};
use dorg::logging;
use dorg::output::OutputFormatter;
use std::path::Path;
use std::process::ExitCode;
use tracing::error;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let app_dir = cli::app_dir();
    logging::init(&app_dir.join("logs"));

    match run(&cli, &app_dir) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            OutputFormatter::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, app_dir: &Path) -> anyhow::Result<()> {
    // An absolute --config replaces app_dir entirely.
    let config_path = app_dir.join(&cli.config);
    let organizer = load_organizer(&config_path)
        .with_context(|| format!("Cannot load configuration {}", config_path.display()))?;

    run_cli(cli.command(), &organizer)?;
    Ok(())
}
