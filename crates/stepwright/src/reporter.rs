//! Scenario results and run summaries.
//!
//! A [`RunSummary`] collects one [`ScenarioReport`] per executed scenario.
//! It renders a plain-text summary for terminals and JUnit XML for CI.

use crate::result::StepwrightResult;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

/// Outcome of one step or scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Passed,
    Failed,
    Skipped,
    /// No definition matched the step text
    Undefined,
}

impl Status {
    #[must_use]
    pub const fn is_passed(self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Undefined steps count as failures
    #[must_use]
    pub const fn is_failed(self) -> bool {
        matches!(self, Self::Failed | Self::Undefined)
    }

    const fn symbol(self) -> &'static str {
        match self {
            Self::Passed => "✓",
            Self::Failed => "✗",
            Self::Skipped => "-",
            Self::Undefined => "?",
        }
    }
}

/// Result of one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Gherkin keyword as written (`Given`, `And`, ...)
    pub keyword: String,
    pub text: String,
    pub status: Status,
    pub error: Option<String>,
    pub duration: Duration,
}

impl StepOutcome {
    #[must_use]
    pub fn passed(keyword: impl Into<String>, text: impl Into<String>, duration: Duration) -> Self {
        Self {
            keyword: keyword.into(),
            text: text.into(),
            status: Status::Passed,
            error: None,
            duration,
        }
    }

    #[must_use]
    pub fn failed(
        keyword: impl Into<String>,
        text: impl Into<String>,
        duration: Duration,
        error: impl Into<String>,
    ) -> Self {
        Self {
            keyword: keyword.into(),
            text: text.into(),
            status: Status::Failed,
            error: Some(error.into()),
            duration,
        }
    }

    #[must_use]
    pub fn skipped(keyword: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            text: text.into(),
            status: Status::Skipped,
            error: None,
            duration: Duration::ZERO,
        }
    }

    /// Mark as undefined rather than failed
    #[must_use]
    pub const fn undefined(mut self) -> Self {
        self.status = Status::Undefined;
        self
    }
}

/// Result of one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Feature title
    pub feature: String,
    /// Scenario title
    pub name: String,
    /// `path:line` of the scenario
    pub location: String,
    pub tags: Vec<String>,
    pub status: Status,
    pub steps: Vec<StepOutcome>,
    /// Why the scenario failed or was skipped, when not tied to one step
    pub error: Option<String>,
    pub duration: Duration,
}

impl ScenarioReport {
    /// Empty report for a scenario about to run
    #[must_use]
    pub fn new(feature: impl Into<String>, name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            feature: feature.into(),
            name: name.into(),
            location: location.into(),
            tags: Vec::new(),
            status: Status::Passed,
            steps: Vec::new(),
            error: None,
            duration: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Fail the whole scenario with `error`
    #[must_use]
    pub fn fail(mut self, error: impl Into<String>) -> Self {
        self.status = Status::Failed;
        self.error = Some(error.into());
        self
    }

    /// Skip the whole scenario for `reason`
    #[must_use]
    pub fn skip(mut self, reason: impl Into<String>) -> Self {
        self.status = Status::Skipped;
        self.error = Some(reason.into());
        self
    }

    /// First failing step, if any
    #[must_use]
    pub fn failed_step(&self) -> Option<&StepOutcome> {
        self.steps.iter().find(|s| s.status.is_failed())
    }

    /// Scenario title prefixed by its feature
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} > {}", self.feature, self.name)
    }
}

/// Aggregated results of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub scenarios: Vec<ScenarioReport>,
    pub duration: Duration,
}

impl RunSummary {
    #[must_use]
    pub fn new(scenarios: Vec<ScenarioReport>, duration: Duration) -> Self {
        Self { scenarios, duration }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.scenarios.len()
    }

    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.count(Status::is_passed)
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count(Status::is_failed)
    }

    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.count(|s| s == Status::Skipped)
    }

    fn count(&self, pred: impl Fn(Status) -> bool) -> usize {
        self.scenarios.iter().filter(|s| pred(s.status)).count()
    }

    /// Whether any scenario failed
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }

    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioReport> {
        self.scenarios.iter().filter(|s| s.status.is_failed()).collect()
    }

    /// Step counts as `(passed, failed, skipped)`; undefined steps count as failed
    #[must_use]
    pub fn step_counts(&self) -> (usize, usize, usize) {
        self.scenarios
            .iter()
            .flat_map(|s| &s.steps)
            .fold((0, 0, 0), |(p, f, k), step| match step.status {
                Status::Passed => (p + 1, f, k),
                Status::Failed | Status::Undefined => (p, f + 1, k),
                Status::Skipped => (p, f, k + 1),
            })
    }

    /// One-line summary
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} scenarios ({} passed, {} failed, {} skipped) in {:.2}s",
            self.total(),
            self.passed_count(),
            self.failed_count(),
            self.skipped_count(),
            self.duration.as_secs_f64()
        )
    }

    /// Render every scenario with its steps, then the summary line
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let mut current_feature: Option<&str> = None;
        for scenario in &self.scenarios {
            if current_feature != Some(scenario.feature.as_str()) {
                let _ = writeln!(out, "Feature: {}", scenario.feature);
                current_feature = Some(&scenario.feature);
            }
            let _ = writeln!(
                out,
                "  {} Scenario: {} ({}ms)",
                scenario.status.symbol(),
                scenario.name,
                scenario.duration.as_millis()
            );
            if scenario.status.is_passed() {
                continue;
            }
            for step in &scenario.steps {
                let _ = writeln!(out, "      {} {} {}", step.status.symbol(), step.keyword, step.text);
                if let Some(error) = &step.error {
                    for line in error.lines() {
                        let _ = writeln!(out, "          {line}");
                    }
                }
            }
            if let Some(error) = &scenario.error {
                let _ = writeln!(out, "      {error}");
            }
        }
        let (passed, failed, skipped) = self.step_counts();
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", self.summary());
        let _ = writeln!(
            out,
            "{} steps ({passed} passed, {failed} failed, {skipped} skipped)",
            passed + failed + skipped
        );
        out
    }

    /// Render JUnit XML, one test case per scenario
    #[must_use]
    pub fn render_junit(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        let _ = writeln!(
            xml,
            r#"<testsuite name="stepwright" tests="{}" failures="{}" skipped="{}" time="{:.3}">"#,
            self.total(),
            self.failed_count(),
            self.skipped_count(),
            self.duration.as_secs_f64()
        );
        for scenario in &self.scenarios {
            let _ = writeln!(
                xml,
                r#"  <testcase classname="{}" name="{}" time="{:.3}">"#,
                escape_xml(&scenario.feature),
                escape_xml(&scenario.name),
                scenario.duration.as_secs_f64()
            );
            match scenario.status {
                Status::Failed | Status::Undefined => {
                    let message = scenario
                        .failed_step()
                        .and_then(|s| s.error.as_deref())
                        .or(scenario.error.as_deref())
                        .unwrap_or("failed");
                    let _ = writeln!(
                        xml,
                        r#"    <failure message="{}">{}</failure>"#,
                        escape_xml(message),
                        escape_xml(message)
                    );
                }
                Status::Skipped => xml.push_str("    <skipped/>\n"),
                Status::Passed => {}
            }
            xml.push_str("  </testcase>\n");
        }
        xml.push_str("</testsuite>\n");
        xml
    }

    /// Write JUnit XML to `path`
    pub fn write_junit(&self, path: &Path) -> StepwrightResult<()> {
        std::fs::write(path, self.render_junit())?;
        Ok(())
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn sample() -> RunSummary {
        let mut passed = ScenarioReport::new("Todo", "Add items", "todo.feature:3");
        passed.steps.push(StepOutcome::passed("Given", "I am on the Todo page", Duration::from_millis(5)));

        let mut failed = ScenarioReport::new("Todo", "Complete <item>", "todo.feature:9").fail("step failed");
        failed.steps.push(StepOutcome::passed("Given", "I am on the Todo page", Duration::ZERO));
        failed.steps.push(StepOutcome::failed(
            "Then",
            "the todo at index 0 should be marked as completed",
            Duration::from_millis(3),
            "Assertion failed: class \"completed\"",
        ));
        failed.steps.push(StepOutcome::skipped("And", "I go back"));

        let skipped = ScenarioReport::new("API", "Users", "api.feature:2").skip("tagged @skip");
        RunSummary::new(vec![passed, failed, skipped], Duration::from_millis(1500))
    }

    mod status_tests {
        use super::*;

        #[test]
        fn test_undefined_counts_as_failure() {
            assert!(Status::Undefined.is_failed());
            assert!(!Status::Skipped.is_failed());
            let step = StepOutcome::failed("When", "I fly", Duration::ZERO, "Undefined step").undefined();
            assert_eq!(step.status, Status::Undefined);
        }
    }

    mod summary_tests {
        use super::*;

        #[test]
        fn test_counts() {
            let s = sample();
            assert_eq!(s.total(), 3);
            assert_eq!(s.passed_count(), 1);
            assert_eq!(s.failed_count(), 1);
            assert_eq!(s.skipped_count(), 1);
            assert!(s.has_failures());
            assert_eq!(s.step_counts(), (2, 1, 1));
            assert_eq!(s.failures()[0].name, "Complete <item>");
        }

        #[test]
        fn test_empty_run_has_no_failures() {
            assert!(!RunSummary::default().has_failures());
        }

        #[test]
        fn test_summary_line() {
            assert_eq!(
                sample().summary(),
                "3 scenarios (1 passed, 1 failed, 1 skipped) in 1.50s"
            );
        }

        #[test]
        fn test_text_shows_failing_steps_only() {
            let text = sample().render_text();
            assert!(text.contains("Feature: Todo"));
            assert!(text.contains("Feature: API"));
            assert!(text.contains("✗ Then the todo at index 0"));
            assert!(text.contains("- And I go back"));
            assert!(text.contains("tagged @skip"));
            assert!(text.contains("4 steps (2 passed, 1 failed, 1 skipped)"));
            assert_eq!(text.matches("I am on the Todo page").count(), 1);
        }
    }

    mod junit_tests {
        use super::*;
        use tempfile::TempDir;

        #[test]
        fn test_junit_escapes_and_marks() {
            let xml = sample().render_junit();
            assert!(xml.contains(r#"tests="3" failures="1" skipped="1""#));
            assert!(xml.contains("Complete &lt;item&gt;"));
            assert!(xml.contains("class &quot;completed&quot;"));
            assert!(xml.contains("<skipped/>"));
        }

        #[test]
        fn test_write_junit() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("report.xml");
            sample().write_junit(&path).unwrap();
            assert!(std::fs::read_to_string(path).unwrap().starts_with("<?xml"));
        }
    }
}
