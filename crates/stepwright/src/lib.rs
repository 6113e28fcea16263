//! Stepwright: Gherkin steps, page objects and fixtures for browser end-to-end suites
//!
//! Feature files are parsed, expanded into scenarios and executed against a
//! registry of step definitions. Every scenario gets its own
//! [`FixtureContext`] (page, page objects, data providers and API client),
//! created by a [`WorldFactory`] and torn down when the scenario ends.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ .feature     │───►│ Runner       │───►│ StepRegistry │───►│ Fixture      │
//! │ files        │    │ (plan, tags, │    │ (cucumber    │    │ Context      │
//! │              │    │  workers)    │    │  expressions)│    │ (page, data, │
//! └──────────────┘    └──────────────┘    └──────────────┘    │  api)        │
//!                                                             └──────┬───────┘
//!                                               ┌────────────────────┴───┐
//!                                               │ Driver: Mock | Chromium │
//!                                               └────────────────────────┘
//! ```
//!
//! The default build drives the in-memory [`mock::MockDriver`]; enable the
//! `browser` feature for a Chromium driver over the DevTools protocol.

// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(test, allow(clippy::large_stack_frames))]

/// REST client, response validation and test data builders
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod api;

/// Chromium driver over CDP
#[cfg(feature = "browser")]
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::needless_raw_string_hashes
)]
pub mod browser;

/// Environment snapshot, URL resolution and timeouts
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn
)]
pub mod config;

/// Named data files and data providers
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod data;

/// Browser driver abstraction
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod driver;

/// Per-scenario fixtures and world factories
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn
)]
pub mod fixture;

/// Small utilities used by steps
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod helpers;

#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn
)]
pub mod locator;

/// In-memory DOM and driver for tests
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::missing_panics_doc
)]
pub mod mock;

/// Page facade with auto-waiting actions and assertions
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn
)]
pub mod page;

#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod page_object;

/// Page objects for the demo applications
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod pages;

/// Scenario results and report rendering
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::cast_precision_loss,
    clippy::format_push_string
)]
pub mod reporter;

mod result;

/// Feature discovery, scenario planning and parallel execution
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn
)]
pub mod runner;

/// Step expressions, arguments and the registry
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod step;

/// Built-in step library
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod steps;

pub use api::{ApiClient, ApiResponse, ApiValidator};
#[cfg(feature = "browser")]
pub use browser::{ChromiumBrowser, ChromiumDriver};
pub use config::{EnvConfig, EnvKey, Timeout, Timeouts};
pub use data::{CommonDataProvider, DataLoader, SecretsDataProvider};
pub use driver::{ClickOptions, Driver, DriverConfig, ResponseEvent};
pub use fixture::{
    ApiFixture, BrowserWorldFactory, DriverSource, FixtureContext, MockDriverSource, PageFixtures,
    WorldFactory,
};
pub use locator::{Frame, Locator, Selector};
pub use page::{Expect, Page, WaitState};
pub use page_object::{BasePage, PageObject};
pub use reporter::{RunSummary, ScenarioReport, Status, StepOutcome};
pub use result::{StepwrightError, StepwrightResult};
pub use runner::{discover_features, RunOptions, Runner};
pub use step::{StepArgs, StepFuture, StepRegistry};
pub use steps::default_registry;

/// Everything a step library needs
pub mod prelude {
    pub use super::api::*;
    #[cfg(feature = "browser")]
    pub use super::browser::*;
    pub use super::config::*;
    pub use super::data::*;
    pub use super::driver::*;
    pub use super::fixture::*;
    pub use super::locator::*;
    pub use super::page::*;
    pub use super::page_object::*;
    pub use super::reporter::*;
    pub use super::result::*;
    pub use super::runner::*;
    pub use super::step::*;
}
