//! Stepwright CLI Library
//!
//! Command-line interface for running Gherkin suites with Stepwright.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
mod output;
pub mod runner;

pub use commands::{Cli, ColorArg, Commands, DataArgs, RunArgs, StepsArgs};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::ProgressReporter;
