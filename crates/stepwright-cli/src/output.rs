//! Output formatting and progress reporting

use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use stepwright::{RunSummary, ScenarioReport, Status};

/// Progress reporter for suite execution
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    spinner: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stdout(),
            spinner: None,
            use_color,
            quiet,
        }
    }

    /// Show a spinner while scenarios run
    pub fn start_spinner(&mut self, message: &str) {
        if self.quiet || !self.term.is_term() {
            return;
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    /// Remove the spinner
    pub fn finish(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "PASS".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Failures print even in quiet mode
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a skip message
    pub fn skipped(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("-").yellow().bold().to_string()
        } else {
            "SKIP".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a plain line
    pub fn line(&self, message: &str) {
        if self.quiet {
            return;
        }
        let _ = self.term.write_line(message);
    }

    /// One line per scenario, step detail for failures
    pub fn scenario(&self, report: &ScenarioReport) {
        let title = format!("{} ({})", report.full_name(), report.location);
        match report.status {
            Status::Passed => self.success(&title),
            Status::Skipped => self.skipped(&title),
            Status::Failed | Status::Undefined => {
                self.failure(&title);
                if let Some(step) = report.failed_step() {
                    let _ = self.term.write_line(&format!("    {} {}", step.keyword, step.text));
                    for line in step.error.iter().flat_map(|e| e.lines()) {
                        let _ = self.term.write_line(&format!("      {line}"));
                    }
                } else if let Some(error) = &report.error {
                    let _ = self.term.write_line(&format!("    {error}"));
                }
            }
        }
    }

    /// Print every scenario and the summary line
    pub fn report(&self, summary: &RunSummary) {
        for scenario in &summary.scenarios {
            self.scenario(scenario);
        }
        self.summary(
            summary.passed_count(),
            summary.failed_count(),
            summary.skipped_count(),
            summary.duration,
        );
    }

    /// Print run summary
    pub fn summary(&self, passed: usize, failed: usize, skipped: usize, duration: Duration) {
        if self.quiet && failed == 0 {
            return;
        }
        let _ = self.term.write_line("");

        let total = passed + failed + skipped;
        let duration_secs = duration.as_secs_f64();

        if self.use_color {
            let passed_style = Style::new().green().bold();
            let failed_style = Style::new().red().bold();
            let skipped_style = Style::new().yellow();

            let status = if failed > 0 {
                failed_style.apply_to("FAILED")
            } else {
                passed_style.apply_to("PASSED")
            };
            let _ = self.term.write_line(&format!(
                "{} {} scenarios in {:.2}s ({} passed, {} failed, {} skipped)",
                status,
                total,
                duration_secs,
                passed_style.apply_to(passed),
                if failed > 0 {
                    failed_style.apply_to(failed).to_string()
                } else {
                    failed.to_string()
                },
                skipped_style.apply_to(skipped)
            ));
        } else {
            let status = if failed > 0 { "FAILED" } else { "PASSED" };
            let _ = self.term.write_line(&format!(
                "{status} {total} scenarios in {duration_secs:.2}s ({passed} passed, {failed} failed, {skipped} skipped)"
            ));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use stepwright::StepOutcome;

    fn summary() -> RunSummary {
        let passed = ScenarioReport::new("Todo", "adds", "todo.feature:3");
        let mut failed = ScenarioReport::new("Todo", "completes", "todo.feature:8");
        failed.steps.push(StepOutcome::failed(
            "Then",
            "the todo at index 0 should be marked as completed",
            Duration::from_millis(5),
            "timed out",
        ));
        let failed = failed.fail("step failed");
        let skipped = ScenarioReport::new("Api", "rate limited", "api.feature:4").skip("429");
        RunSummary::new(vec![passed, failed, skipped], Duration::from_secs(1))
    }

    mod progress_reporter_tests {
        use super::*;

        #[test]
        fn test_new_reporter() {
            let reporter = ProgressReporter::new(true, false);
            assert!(reporter.use_color);
            assert!(!reporter.quiet);
        }

        #[test]
        fn test_default_reporter() {
            let reporter = ProgressReporter::default();
            assert!(reporter.use_color);
            assert!(!reporter.quiet);
        }

        #[test]
        fn test_report_renders_each_status() {
            let reporter = ProgressReporter::new(false, false);
            reporter.report(&summary());
        }

        #[test]
        fn test_spinner_lifecycle() {
            let mut reporter = ProgressReporter::new(false, false);
            reporter.start_spinner("running");
            reporter.finish();
            assert!(reporter.spinner.is_none());
        }

        #[test]
        fn test_quiet_mode_suppresses_output() {
            let mut reporter = ProgressReporter::new(false, true);
            reporter.start_spinner("running");
            assert!(reporter.spinner.is_none());
            reporter.success("hidden");
            reporter.warning("hidden");
            reporter.line("hidden");
            reporter.failure("shown");
        }
    }
}
