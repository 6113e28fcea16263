//! Subcommand execution

use crate::commands::{DataArgs, RunArgs, StepsArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use std::sync::Arc;
use std::time::Duration;
use stepwright::config::DATA_DIR;
use stepwright::runner::{load_features, plan};
use stepwright::{
    default_registry, BrowserWorldFactory, DataLoader, DriverSource, EnvConfig, RunOptions,
    RunSummary, Runner,
};

/// Run options from the command line
pub fn run_options(args: &RunArgs) -> RunOptions {
    let mut options = RunOptions::default().with_tags(&args.tags);
    if args.workers > 0 {
        options = options.with_workers(args.workers);
    }
    if let Some(secs) = args.scenario_timeout {
        options = options.with_scenario_timeout(Duration::from_secs(secs));
    }
    options
}

/// Execute feature files and report the outcome
pub async fn run_suite(config: &CliConfig, args: &RunArgs) -> CliResult<RunSummary> {
    let env = Arc::new(EnvConfig::from_env());
    let options = run_options(args);
    let mut reporter = ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());

    let files = load_features(&args.paths)?;
    let scenarios = plan(&files, &options.include_tags);
    if scenarios.is_empty() {
        reporter.warning("no scenarios matched");
        return Ok(RunSummary::new(Vec::new(), Duration::ZERO));
    }
    tracing::info!(
        scenarios = scenarios.len(),
        workers = options.workers,
        tags = ?options.include_tags,
        base_url = env.base_url(),
        "starting run"
    );

    let (source, browser) = open_driver_source(args, &env).await?;
    let factory = BrowserWorldFactory::new(source, env).with_project_root(&args.root);
    let runner = Runner::new(default_registry()?, factory).with_options(options);

    reporter.start_spinner("running scenarios");
    let summary = runner.run(scenarios).await;
    reporter.finish();
    close_browser(browser).await;

    reporter.report(&summary);
    if let Some(path) = &args.junit {
        summary.write_junit(path)?;
        reporter.line(&format!("JUnit report written to {}", path.display()));
    }
    Ok(summary)
}

#[cfg(feature = "browser")]
type LaunchedBrowser = Option<Arc<stepwright::ChromiumBrowser>>;
#[cfg(not(feature = "browser"))]
type LaunchedBrowser = Option<()>;

#[cfg(feature = "browser")]
async fn open_driver_source(
    args: &RunArgs,
    env: &EnvConfig,
) -> CliResult<(Arc<dyn DriverSource>, LaunchedBrowser)> {
    let mut driver_config = stepwright::DriverConfig::from_env(env);
    if args.headed {
        driver_config = driver_config.headless(false);
    }
    if let Some(path) = &args.chrome {
        driver_config = driver_config.executable_path(path.to_string_lossy());
    }
    let browser = Arc::new(stepwright::ChromiumBrowser::launch(driver_config).await?);
    let source: Arc<dyn DriverSource> = browser.clone();
    Ok((source, Some(browser)))
}

#[cfg(not(feature = "browser"))]
async fn open_driver_source(
    args: &RunArgs,
    _env: &EnvConfig,
) -> CliResult<(Arc<dyn DriverSource>, LaunchedBrowser)> {
    if args.headed || args.chrome.is_some() {
        return Err(CliError::config(
            "built without the `browser` feature; rebuild with --features browser",
        ));
    }
    tracing::warn!("built without the `browser` feature; browser steps run against an empty page");
    let source: Arc<dyn DriverSource> =
        Arc::new(stepwright::MockDriverSource::new(stepwright::mock::MockDriver::new));
    Ok((source, None))
}

#[cfg(feature = "browser")]
async fn close_browser(browser: LaunchedBrowser) {
    if let Some(browser) = browser {
        if let Err(e) = browser.close().await {
            tracing::debug!(error = %e, "browser already closed");
        }
    }
}

#[cfg(not(feature = "browser"))]
async fn close_browser(_browser: LaunchedBrowser) {}

/// Print every registered step expression
pub fn list_steps(config: &CliConfig, args: &StepsArgs) -> CliResult<usize> {
    let registry = default_registry()?;
    let reporter = ProgressReporter::new(config.color.should_color(), false);
    let mut shown = 0;
    for definition in registry.definitions() {
        let source = definition.expression().source();
        if args.filter.as_deref().is_some_and(|f| !source.contains(f)) {
            continue;
        }
        reporter.line(&format!("{:<5} {source}", definition.kind()));
        shown += 1;
    }
    Ok(shown)
}

/// Load a named fixture and pretty-print it
pub fn print_data(args: &DataArgs) -> CliResult<String> {
    let env = EnvConfig::from_env();
    let loader = DataLoader::new(args.dir.clone().unwrap_or_else(|| DATA_DIR.into()));
    let value = loader.load(&args.name.to_uppercase(), &env)?;
    let rendered = serde_json::to_string_pretty(&value)?;
    println!("{rendered}");
    Ok(rendered)
}

/// Map a finished run to the process result
pub fn check_summary(summary: &RunSummary) -> CliResult<()> {
    if summary.has_failures() {
        Err(CliError::ScenariosFailed {
            failed: summary.failed_count(),
        })
    } else {
        Ok(())
    }
}
