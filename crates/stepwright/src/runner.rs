//! Feature-file runner.
//!
//! Parses `.feature` files with the `gherkin` crate, plans one job per
//! scenario (background steps first, rules flattened, tag filters applied)
//! and executes the jobs concurrently. Each scenario gets its own world from
//! a [`WorldFactory`] and runs its steps strictly in order; the first step
//! that fails, is undefined, is ambiguous or panics fails that scenario only
//! and the remaining steps are reported as skipped.

use crate::config::Timeouts;
use crate::fixture::WorldFactory;
use crate::reporter::{RunSummary, ScenarioReport, Status, StepOutcome};
use crate::result::{StepwrightError, StepwrightResult};
use crate::step::StepRegistry;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use gherkin::{Feature, GherkinEnv};
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Tag that excludes a scenario from the run
pub const SKIP_TAG: &str = "skip";

// =============================================================================
// OPTIONS
// =============================================================================

/// Runner settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Scenarios executing at once
    pub workers: usize,
    /// When non-empty, only scenarios carrying one of these tags run
    pub include_tags: Vec<String>,
    /// Upper bound for one scenario, steps included
    pub scenario_timeout: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get),
            include_tags: Vec::new(),
            scenario_timeout: Timeouts::default().scenario,
        }
    }
}

impl RunOptions {
    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = if workers == 0 { 1 } else { workers };
        self
    }

    /// Restrict the run to scenarios tagged with any of `tags` (`@` optional)
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.include_tags = tags.into_iter().map(|t| normalize_tag(t.as_ref())).collect();
        self
    }

    #[must_use]
    pub const fn with_scenario_timeout(mut self, timeout: Duration) -> Self {
        self.scenario_timeout = timeout;
        self
    }
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().trim_start_matches('@').to_string()
}

// =============================================================================
// PLANNING
// =============================================================================

/// A parsed feature file
#[derive(Debug, Clone)]
pub struct FeatureFile {
    pub path: PathBuf,
    pub feature: Feature,
}

impl FeatureFile {
    /// Parse `source` as if read from `path`
    pub fn parse(path: impl Into<PathBuf>, source: &str) -> StepwrightResult<Self> {
        let path = path.into();
        let feature = Feature::parse(source, GherkinEnv::default()).map_err(|e| {
            StepwrightError::FeatureParse {
                path: path.display().to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(Self { path, feature })
    }

    /// Read and parse one file
    pub fn load(path: &Path) -> StepwrightResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::parse(path, &source)
    }
}

/// Expand files and directories into a sorted list of `.feature` files
pub fn discover_features(paths: &[PathBuf]) -> StepwrightResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    for path in paths {
        if path.is_dir() {
            let pattern = format!("{}/**/*.feature", path.display());
            let entries = glob::glob(&pattern).map_err(|e| StepwrightError::FeatureParse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            let mut files: Vec<PathBuf> = entries.filter_map(Result::ok).collect();
            files.sort();
            found.extend(files);
        } else if path.exists() {
            found.push(path.clone());
        } else {
            return Err(StepwrightError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("feature path {} does not exist", path.display()),
            )));
        }
    }
    Ok(found)
}

/// Discover and parse every feature under `paths`
pub fn load_features(paths: &[PathBuf]) -> StepwrightResult<Vec<FeatureFile>> {
    let files = discover_features(paths)?
        .iter()
        .map(|p| FeatureFile::load(p))
        .collect::<StepwrightResult<Vec<_>>>()?;
    tracing::info!(files = files.len(), "loaded feature files");
    Ok(files)
}

/// One step line of a planned scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub keyword: String,
    pub text: String,
}

/// A scenario ready to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedScenario {
    pub feature: String,
    pub name: String,
    pub location: String,
    /// Feature, rule and scenario tags, without `@`
    pub tags: Vec<String>,
    /// Background steps followed by the scenario's own
    pub steps: Vec<PlannedStep>,
    /// Set when the scenario cannot run and must be reported failed
    pub unsupported: Option<String>,
}

impl PlannedScenario {
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    fn report(&self) -> ScenarioReport {
        ScenarioReport::new(&self.feature, &self.name, &self.location).with_tags(self.tags.clone())
    }
}

fn plan_steps(steps: &[gherkin::Step]) -> impl Iterator<Item = PlannedStep> + '_ {
    steps.iter().map(|s| PlannedStep {
        keyword: s.keyword.trim().to_string(),
        text: s.value.trim().to_string(),
    })
}

fn plan_scenario(
    file: &FeatureFile,
    outer_tags: &[String],
    backgrounds: &[&gherkin::Background],
    scenario: &gherkin::Scenario,
) -> PlannedScenario {
    let mut tags: Vec<String> = outer_tags.to_vec();
    tags.extend(scenario.tags.iter().map(|t| normalize_tag(t)));

    let mut steps: Vec<PlannedStep> = backgrounds.iter().flat_map(|b| plan_steps(&b.steps)).collect();
    steps.extend(plan_steps(&scenario.steps));

    PlannedScenario {
        feature: file.feature.name.clone(),
        name: scenario.name.clone(),
        location: format!("{}:{}", file.path.display(), scenario.position.line),
        tags,
        steps,
        unsupported: (!scenario.examples.is_empty())
            .then(|| "scenario outlines are not supported".to_string()),
    }
}

/// Flatten features into scenarios, keeping file order. Scenarios not
/// matching `include_tags` (when given) are dropped.
#[must_use]
pub fn plan(files: &[FeatureFile], include_tags: &[String]) -> Vec<PlannedScenario> {
    let mut planned = Vec::new();
    for file in files {
        let feature = &file.feature;
        let feature_tags: Vec<String> = feature.tags.iter().map(|t| normalize_tag(t)).collect();
        let feature_background: Vec<&gherkin::Background> = feature.background.iter().collect();

        for scenario in &feature.scenarios {
            planned.push(plan_scenario(file, &feature_tags, &feature_background, scenario));
        }
        for rule in &feature.rules {
            let mut rule_tags = feature_tags.clone();
            rule_tags.extend(rule.tags.iter().map(|t| normalize_tag(t)));
            let mut backgrounds = feature_background.clone();
            backgrounds.extend(rule.background.iter());
            for scenario in &rule.scenarios {
                planned.push(plan_scenario(file, &rule_tags, &backgrounds, scenario));
            }
        }
    }
    if !include_tags.is_empty() {
        planned.retain(|s| include_tags.iter().any(|t| s.has_tag(t)));
    }
    planned
}

// =============================================================================
// EXECUTION
// =============================================================================

/// Runs planned scenarios against a step registry
pub struct Runner<F: WorldFactory> {
    registry: Arc<StepRegistry<F::World>>,
    factory: Arc<F>,
    options: RunOptions,
}

impl<F: WorldFactory> fmt::Debug for Runner<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("registry", &self.registry)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<F: WorldFactory> Runner<F> {
    #[must_use]
    pub fn new(registry: StepRegistry<F::World>, factory: F) -> Self {
        Self {
            registry: Arc::new(registry),
            factory: Arc::new(factory),
            options: RunOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub const fn options(&self) -> &RunOptions {
        &self.options
    }

    #[must_use]
    pub fn registry(&self) -> &StepRegistry<F::World> {
        &self.registry
    }

    /// Discover, parse and run every feature under `paths`
    pub async fn run_paths(&self, paths: &[PathBuf]) -> StepwrightResult<RunSummary> {
        let files = load_features(paths)?;
        Ok(self.run_features(&files).await)
    }

    /// Run parsed features
    pub async fn run_features(&self, files: &[FeatureFile]) -> RunSummary {
        self.run(plan(files, &self.options.include_tags)).await
    }

    /// Run planned scenarios with at most `workers` in flight
    pub async fn run(&self, scenarios: Vec<PlannedScenario>) -> RunSummary {
        let start = Instant::now();
        let workers = self.options.workers.max(1);
        tracing::info!(scenarios = scenarios.len(), workers, "starting run");

        let mut reports: Vec<(usize, ScenarioReport)> = stream::iter(scenarios.into_iter().enumerate())
            .map(|(index, scenario)| {
                let registry = self.registry.clone();
                let factory = self.factory.clone();
                let timeout = self.options.scenario_timeout;
                async move {
                    let fallback = scenario.report();
                    let report = match tokio::spawn(run_scenario(registry, factory, scenario, timeout)).await {
                        Ok(report) => report,
                        Err(e) => fallback.fail(format!("scenario task failed: {e}")),
                    };
                    (index, report)
                }
            })
            .buffer_unordered(workers)
            .collect()
            .await;
        reports.sort_by_key(|(index, _)| *index);

        let summary = RunSummary::new(reports.into_iter().map(|(_, r)| r).collect(), start.elapsed());
        tracing::info!(
            passed = summary.passed_count(),
            failed = summary.failed_count(),
            skipped = summary.skipped_count(),
            "run finished"
        );
        summary
    }
}

async fn run_scenario<F: WorldFactory>(
    registry: Arc<StepRegistry<F::World>>,
    factory: Arc<F>,
    scenario: PlannedScenario,
    timeout: Duration,
) -> ScenarioReport {
    let start = Instant::now();
    let mut report = scenario.report();
    let skip_all = |report: &mut ScenarioReport, from: usize| {
        report.steps.extend(
            scenario.steps[from..]
                .iter()
                .map(|s| StepOutcome::skipped(&s.keyword, &s.text)),
        );
    };

    if scenario.has_tag(SKIP_TAG) {
        skip_all(&mut report, 0);
        tracing::info!(scenario = %scenario.name, "skipped by tag");
        return report.skip(format!("tagged @{SKIP_TAG}"));
    }
    if let Some(reason) = &scenario.unsupported {
        skip_all(&mut report, 0);
        return report.fail(reason.clone());
    }

    let mut world = match factory.create().await {
        Ok(world) => world,
        Err(e) => {
            skip_all(&mut report, 0);
            tracing::error!(scenario = %scenario.name, error = %e, "world creation failed");
            return report.fail(format!("fixture setup failed: {e}"));
        }
    };

    tracing::info!(scenario = %scenario.name, location = %scenario.location, "scenario started");
    let outcome = tokio::time::timeout(
        timeout,
        run_steps(&registry, &mut world, &scenario.steps, &mut report.steps),
    )
    .await;

    match outcome {
        Ok(StepsOutcome::Passed) => {}
        Ok(StepsOutcome::Failed) => {
            report.status = Status::Failed;
        }
        Ok(StepsOutcome::Skipped(reason)) => {
            report = report.skip(reason);
        }
        Err(_) => {
            let done = report.steps.len();
            let finished: Duration = report.steps.iter().map(|s| s.duration).sum();
            if let Some(step) = scenario.steps.get(done) {
                report.steps.push(StepOutcome::failed(
                    &step.keyword,
                    &step.text,
                    start.elapsed().saturating_sub(finished),
                    StepwrightError::Timeout {
                        ms: timeout.as_millis() as u64,
                        waited_for: "scenario to finish".to_string(),
                    }
                    .to_string(),
                ));
            }
            skip_all(&mut report, (done + 1).min(scenario.steps.len()));
            report = report.fail(format!("scenario exceeded {}ms", timeout.as_millis()));
        }
    }
    if let Some(failed) = report.failed_step() {
        if report.status.is_failed() && report.error.is_none() {
            report.error = failed.error.clone();
        }
    }

    if let Err(e) = factory.teardown(world).await {
        tracing::warn!(scenario = %scenario.name, error = %e, "teardown failed");
    }
    report.duration = start.elapsed();
    tracing::info!(scenario = %scenario.name, status = ?report.status, "scenario finished");
    report
}

enum StepsOutcome {
    Passed,
    Failed,
    Skipped(String),
}

async fn run_steps<W: Send>(
    registry: &StepRegistry<W>,
    world: &mut W,
    steps: &[PlannedStep],
    outcomes: &mut Vec<StepOutcome>,
) -> StepsOutcome {
    for (index, step) in steps.iter().enumerate() {
        let start = Instant::now();
        let result = match registry.find(&step.text) {
            Ok(matched) => AssertUnwindSafe(matched.run(world))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(StepwrightError::driver(format!(
                        "step panicked: {}",
                        panic_message(&*panic)
                    )))
                }),
            Err(e) => Err(e),
        };
        let elapsed = start.elapsed();

        let stop = match result {
            Ok(()) => {
                outcomes.push(StepOutcome::passed(&step.keyword, &step.text, elapsed));
                None
            }
            Err(e) if e.is_skip() => {
                tracing::info!(step = %step.text, reason = %e, "scenario skipped");
                outcomes.push(StepOutcome::skipped(&step.keyword, &step.text));
                Some(StepsOutcome::Skipped(e.to_string()))
            }
            Err(e) => {
                tracing::warn!(step = %step.text, error = %e, "step failed");
                let outcome = StepOutcome::failed(&step.keyword, &step.text, elapsed, e.to_string());
                outcomes.push(match e {
                    StepwrightError::UndefinedStep { .. } => outcome.undefined(),
                    _ => outcome,
                });
                Some(StepsOutcome::Failed)
            }
        };
        if let Some(stop) = stop {
            outcomes.extend(
                steps[index + 1..]
                    .iter()
                    .map(|s| StepOutcome::skipped(&s.keyword, &s.text)),
            );
            return stop;
        }
    }
    StepsOutcome::Passed
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
