//! TodoMVC scenarios driven end to end through the runner.
//!
//! Every scenario gets a fresh in-memory TodoMVC app, so the scenarios can run
//! in parallel without seeing each other's items.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;
use stepwright::mock::{todomvc_document, todomvc_handler, MockDriver};
use stepwright::runner::FeatureFile;
use stepwright::{
    default_registry, BrowserWorldFactory, EnvConfig, MockDriverSource, RunOptions, RunSummary,
    Runner, Status, Timeouts,
};

const BASE: &str = "https://demo.test";

const TODO_FEATURE: &str = r#"
Feature: Todo list

  Background:
    Given I am on the Todo page

  Scenario: Add items
    When I add a todo "Buy milk"
    And I add a todo "Walk the dog"
    Then I should see 2 todos in the list
    And I should see "Walk the dog" in the list

  Scenario: Complete an item
    When I add a todo "Buy milk"
    And I complete the todo at index 0
    Then the todo at index 0 should be marked as completed

  Scenario: Every scenario starts empty
    Then I should see 0 todos in the list

  Scenario: Completing nothing fails
    Then the todo at index 0 should be marked as completed
    And I should see 0 todos in the list

  @skip
  Scenario: Not ready
    Then I should see 99 todos in the list
"#;

const NAVIGATION_FEATURE: &str = r#"
Feature: Navigation

  Scenario: Open the todo page by fixture key
    Given I am on the page "todoPage"
    Then I should be in page "todoPage"
    And I expect that the title contains "TodoMVC"

  Scenario: Unknown fixture key
    Given I am on the page "loginPage"

  Scenario: Phrase nobody registered
    Given I am on the page "todoPage"
    When I juggle three todos
"#;

fn runner(workers: usize) -> Runner<BrowserWorldFactory> {
    let url = format!("{BASE}/todomvc");
    let source = MockDriverSource::new(move || {
        MockDriver::new()
            .with_route(url.clone(), todomvc_document(&url))
            .with_handler(todomvc_handler)
    });
    let config = Arc::new(EnvConfig::from_vars([("E2E_BASE_URL", BASE)]));
    let factory = BrowserWorldFactory::new(Arc::new(source), config).with_timeouts(Timeouts::fast());
    Runner::new(default_registry().unwrap(), factory).with_options(
        RunOptions::default()
            .with_workers(workers)
            .with_scenario_timeout(Duration::from_secs(10)),
    )
}

async fn run(source: &str, workers: usize) -> RunSummary {
    let file = FeatureFile::parse("todo.feature", source).unwrap();
    runner(workers).run_features(&[file]).await
}

fn status_of(summary: &RunSummary, name: &str) -> Status {
    summary
        .scenarios
        .iter()
        .find(|s| s.name == name)
        .unwrap_or_else(|| panic!("no scenario {name}"))
        .status
}

#[tokio::test]
async fn test_todo_feature_statuses() {
    let summary = run(TODO_FEATURE, 4).await;

    assert_eq!(summary.total(), 5);
    assert_eq!(status_of(&summary, "Add items"), Status::Passed);
    assert_eq!(status_of(&summary, "Complete an item"), Status::Passed);
    assert_eq!(status_of(&summary, "Every scenario starts empty"), Status::Passed);
    assert_eq!(status_of(&summary, "Completing nothing fails"), Status::Failed);
    assert_eq!(status_of(&summary, "Not ready"), Status::Skipped);
    assert_eq!(summary.passed_count(), 3);
    assert!(summary.has_failures());
}

#[tokio::test]
async fn test_background_runs_before_each_scenario() {
    let summary = run(TODO_FEATURE, 1).await;
    let add = summary.scenarios.iter().find(|s| s.name == "Add items").unwrap();
    assert_eq!(add.steps[0].text, "I am on the Todo page");
    assert_eq!(add.steps.len(), 5);
}

#[tokio::test]
async fn test_failed_step_skips_the_rest() {
    let summary = run(TODO_FEATURE, 2).await;
    let failed = summary
        .scenarios
        .iter()
        .find(|s| s.name == "Completing nothing fails")
        .unwrap();
    let statuses: Vec<Status> = failed.steps.iter().map(|s| s.status).collect();
    assert_eq!(statuses, vec![Status::Passed, Status::Failed, Status::Skipped]);
    assert!(failed.failed_step().unwrap().error.is_some());
}

#[tokio::test]
async fn test_reports_follow_file_order_with_many_workers() {
    let summary = run(TODO_FEATURE, 8).await;
    let names: Vec<&str> = summary.scenarios.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Add items",
            "Complete an item",
            "Every scenario starts empty",
            "Completing nothing fails",
            "Not ready",
        ]
    );
}

const LIST_FEATURE: &str = r#"
Feature: Todo list from a list

  Scenario: Add several items at once
    Given I am on the Todo page
    When I add a todo "Buy milk"
    And I add the todos [Feed cat, Read book]
    Then I should see 3 todos in the list
    And I should see "Feed cat" in the list
    And I should see "Read book" in the list

  Scenario: Empty list adds nothing
    Given I am on the Todo page
    When I add the todos []
    Then I should see 0 todos in the list
"#;

#[tokio::test]
async fn test_add_todos_from_list() {
    let summary = run(LIST_FEATURE, 2).await;
    assert_eq!(status_of(&summary, "Add several items at once"), Status::Passed);
    assert_eq!(status_of(&summary, "Empty list adds nothing"), Status::Passed);
}

#[tokio::test]
async fn test_navigation_feature() {
    let summary = run(NAVIGATION_FEATURE, 2).await;
    assert_eq!(status_of(&summary, "Open the todo page by fixture key"), Status::Passed);

    let unknown = summary
        .scenarios
        .iter()
        .find(|s| s.name == "Unknown fixture key")
        .unwrap();
    assert_eq!(unknown.status, Status::Failed);
    let error = unknown.failed_step().unwrap().error.clone().unwrap();
    assert!(error.contains("loginPage"));
    assert!(error.contains("todoPage"));

    let undefined = summary
        .scenarios
        .iter()
        .find(|s| s.name == "Phrase nobody registered")
        .unwrap();
    assert!(undefined.status.is_failed());
    assert!(undefined.steps.iter().any(|s| s.status == Status::Undefined));
}

#[tokio::test]
async fn test_tag_filter_restricts_run() {
    let file = FeatureFile::parse("todo.feature", TODO_FEATURE).unwrap();
    let runner = runner(2);
    let options = runner.options().clone().with_tags(["skip"]);
    let summary = runner.with_options(options).run_features(&[file]).await;
    assert_eq!(summary.total(), 1);
    assert_eq!(summary.skipped_count(), 1);
    assert!(!summary.has_failures());
}

#[tokio::test]
async fn test_junit_report_lists_every_scenario() {
    let summary = run(TODO_FEATURE, 4).await;
    let xml = summary.render_junit();
    assert!(xml.contains(r#"tests="5""#));
    assert!(xml.contains(r#"failures="1""#));
    assert!(xml.contains("Completing nothing fails"));
}
