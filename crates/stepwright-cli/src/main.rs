//! Stepwright CLI: run Gherkin end-to-end suites
//!
//! ## Usage
//!
//! ```bash
//! stepwright run features/                 # Run every feature under a directory
//! stepwright run features/ --tags @smoke   # Only scenarios tagged @smoke
//! stepwright run todo.feature --headed     # Watch the browser
//! stepwright steps --filter click          # List step expressions
//! stepwright data USER                     # Print a data fixture
//! ```

use clap::Parser;
use std::process::ExitCode;
use stepwright_cli::{runner, Cli, CliConfig, CliError, CliResult, ColorChoice, Commands, Verbosity};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::ScenariosFailed { .. }) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    config.init_logging();

    match cli.command {
        Commands::Run(args) => {
            let summary = runner::run_suite(&config, &args).await?;
            runner::check_summary(&summary)
        }
        Commands::Steps(args) => {
            let shown = runner::list_steps(&config, &args)?;
            tracing::debug!(shown, "listed steps");
            Ok(())
        }
        Commands::Data(args) => runner::print_data(&args).map(|_| ()),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.verbose, cli.quiet))
        .with_color(ColorChoice::from(cli.color))
}
