//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Stepwright: run Gherkin end-to-end suites against a browser and REST APIs
#[derive(Parser, Debug)]
#[command(name = "stepwright")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run feature files
    Run(RunArgs),

    /// List registered step expressions
    Steps(StepsArgs),

    /// Print a named test data fixture
    Data(DataArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Feature files or directories (searched for *.feature)
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Scenarios executing at once (0 = one per CPU)
    #[arg(short, long, default_value = "0")]
    pub workers: usize,

    /// Only run scenarios carrying one of these tags
    #[arg(short, long = "tags")]
    pub tags: Vec<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Chromium executable
    #[arg(long, env = "CHROME_PATH")]
    pub chrome: Option<PathBuf>,

    /// Upper bound for one scenario in seconds
    #[arg(long)]
    pub scenario_timeout: Option<u64>,

    /// Write a JUnit XML report here
    #[arg(long)]
    pub junit: Option<PathBuf>,

    /// Project root holding src/secrets.json and src/common.json
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
}

/// Arguments for the steps command
#[derive(Parser, Debug)]
pub struct StepsArgs {
    /// Only show expressions containing this text
    #[arg(short, long)]
    pub filter: Option<String>,
}

/// Arguments for the data command
#[derive(Parser, Debug)]
pub struct DataArgs {
    /// Data name (e.g. USER)
    pub name: String,

    /// Directory holding the data files
    #[arg(long)]
    pub dir: Option<PathBuf>,
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
