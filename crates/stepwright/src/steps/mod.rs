//! Built-in step library.
//!
//! [`register_all`] installs every phrase the suite's feature files use into a
//! [`StepRegistry`] over [`FixtureContext`]. Phrases are grouped by area:
//! [`common`] for generic browser interaction, [`todo`] for the TodoMVC demo
//! and [`api`] for REST scenarios.

pub mod api;
pub mod common;
pub mod todo;

use crate::fixture::FixtureContext;
use crate::result::StepwrightResult;
use crate::step::StepRegistry;

/// Install every built-in step
pub fn register_all(registry: &mut StepRegistry<FixtureContext>) -> StepwrightResult<()> {
    common::register(registry)?;
    todo::register(registry)?;
    api::register(registry)?;
    tracing::debug!(steps = registry.len(), "registered built-in steps");
    Ok(())
}

/// Registry holding every built-in step
pub fn default_registry() -> StepwrightResult<StepRegistry<FixtureContext>> {
    let mut registry = StepRegistry::new();
    register_all(&mut registry)?;
    Ok(registry)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::{EnvConfig, Timeouts};
    use crate::data::CommonDataProvider;
    use crate::mock::{todomvc_document, todomvc_handler, MockDocument, MockDriver, MockElement};
    use crate::page::Page;
    use crate::result::StepwrightError;
    use serde_json::json;
    use std::sync::Arc;

    const BASE: &str = "https://demo.test";

    fn world(driver: MockDriver) -> (FixtureContext, Arc<MockDriver>) {
        let driver = Arc::new(driver);
        let config = Arc::new(EnvConfig::from_vars([("E2E_BASE_URL", BASE)]));
        let page = Page::new(driver.clone(), Timeouts::fast());
        let ctx = FixtureContext::new(page, config).with_common_data(CommonDataProvider::from_value(
            json!({"greeting": "Hello", "usersApi": "https://api.demo.test/users"}),
        ));
        (ctx, driver)
    }

    fn table_document() -> MockDocument {
        let mut doc = MockDocument::new(format!("{BASE}/"), "Users");
        let table = doc.append(None, MockElement::new("table"));
        let thead = doc.append(Some(table), MockElement::new("thead"));
        let header = doc.append(Some(thead), MockElement::new("tr"));
        for title in ["Name", "Role"] {
            let _ = doc.append(Some(header), MockElement::new("th").text(title));
        }
        let tbody = doc.append(Some(table), MockElement::new("tbody"));
        for (name, role) in [("Alice", "Admin"), ("Bob", "Admin")] {
            let row = doc.append(Some(tbody), MockElement::new("tr"));
            let _ = doc.append(Some(row), MockElement::new("td").text(name));
            let _ = doc.append(Some(row), MockElement::new("td").text(role));
        }
        let _ = doc.append(None, MockElement::new("button").text("Save"));
        let _ = doc.append(None, MockElement::new("button").text("Save"));
        let _ = doc.append(None, MockElement::new("p").text("Hello"));
        doc
    }

    mod registration_tests {
        use super::*;

        #[test]
        fn test_register_all_has_no_duplicates() {
            let registry = default_registry().unwrap();
            assert!(registry.len() > 60);
        }

        #[test]
        fn test_phrases_resolve_to_one_definition() {
            let registry = default_registry().unwrap();
            let texts = [
                "I am on the page \"todoPage\"",
                "I go to home page",
                "I wait for 2 seconds",
                "I type \"Bob\" to input with role \"Name\"",
                "I type \"Bob\" to input with role \"Name\" at index 1",
                "I type data with key \"greeting\" to input with locator \"#msg\"",
                "I fill all the inputs with placeholder \"Code\" with values: [1, 2, 3]",
                "I click button \"Save\"",
                "I click button \"Save\" at index 1",
                "I click button with locator \".save\"",
                "I expect that the text \"Hello\" is visible",
                "I expect that the text contains \"Hel\" is visible",
                "I expect that \"heading\" with text \"Users\" is visible",
                "I expect that button with text \"Save\" is visible",
                "I expect that the table contains 2 record",
                "I should see \"Buy milk\" in the list",
                "I should see 2 todos in the list",
                "the response status should be 200",
                "the response status should be one of [400, 401, 429]",
            ];
            for text in texts {
                let matched = registry.find(text);
                assert!(matched.is_ok(), "{text}: {:?}", matched.err());
            }
        }

        #[test]
        fn test_unknown_phrase_is_undefined() {
            let registry = default_registry().unwrap();
            assert!(matches!(
                registry.find("I dance the tango"),
                Err(StepwrightError::UndefinedStep { .. })
            ));
        }
    }

    mod browser_step_tests {
        use super::*;

        #[tokio::test]
        async fn test_table_steps() {
            let driver = MockDriver::new();
            driver.set_document(table_document()).unwrap();
            let (mut ctx, _) = world(driver);
            let registry = default_registry().unwrap();
            for text in [
                "I expect that row number 1 in table contains these values: [Alice, Admin]",
                "I expect that all rows at column 2 in table contains the same value: \"Admin\"",
                "I expect that the table contains 2 record",
            ] {
                registry.execute(&mut ctx, text).await.unwrap();
            }
            let err = registry
                .execute(&mut ctx, "I expect that the table contains 5 record")
                .await
                .unwrap_err();
            assert!(matches!(err, StepwrightError::AssertionFailed { .. }));
        }

        #[tokio::test]
        async fn test_column_check_passes_on_empty_table() {
            let mut doc = MockDocument::new(format!("{BASE}/"), "");
            let table = doc.append(None, MockElement::new("table"));
            let tbody = doc.append(Some(table), MockElement::new("tbody"));
            let row = doc.append(Some(tbody), MockElement::new("tr"));
            let _ = doc.append(Some(row), MockElement::new("td").text("No results."));
            let driver = MockDriver::new();
            driver.set_document(doc).unwrap();
            let (mut ctx, _) = world(driver);
            default_registry()
                .unwrap()
                .execute(
                    &mut ctx,
                    "I expect that all rows at column 1 in table contains the same value: \"x\"",
                )
                .await
                .unwrap();
        }

        #[tokio::test]
        async fn test_click_and_visibility_steps() {
            let driver = MockDriver::new();
            driver.set_document(table_document()).unwrap();
            let (mut ctx, driver) = world(driver);
            let registry = default_registry().unwrap();
            registry.execute(&mut ctx, "I click button \"Save\" at index 1").await.unwrap();
            assert!(driver.was_called("Click:"));
            registry
                .execute(&mut ctx, "I expect that element with role \"button\" and name \"Save\" is displayed 2 times")
                .await
                .unwrap();
            registry
                .execute(&mut ctx, "I expect that the text of data with key \"greeting\" is visible")
                .await
                .unwrap();
            registry
                .execute(&mut ctx, "I expect that the text \"Goodbye\" is invisible")
                .await
                .unwrap();
            assert!(registry
                .execute(&mut ctx, "I expect that the text \"Hello\" is invisible")
                .await
                .is_err());
        }

        #[tokio::test]
        async fn test_navigation_and_title() {
            let url = format!("{BASE}/todomvc");
            let driver = MockDriver::new()
                .with_route(url.clone(), todomvc_document(&url))
                .with_handler(todomvc_handler);
            let (mut ctx, _) = world(driver);
            let registry = default_registry().unwrap();
            registry.execute(&mut ctx, "I am on the page \"todoPage\"").await.unwrap();
            registry.execute(&mut ctx, "I should be in page \"todoPage\"").await.unwrap();
            registry
                .execute(&mut ctx, "I expect that the title contains \"TodoMVC\"")
                .await
                .unwrap();
            let err = registry
                .execute(&mut ctx, "I am on the page \"loginPage\"")
                .await
                .unwrap_err();
            assert!(matches!(err, StepwrightError::PageNotFound { .. }));
        }

        #[tokio::test]
        async fn test_todo_steps() {
            let url = format!("{BASE}/todomvc");
            let driver = MockDriver::new()
                .with_route(url.clone(), todomvc_document(&url))
                .with_handler(todomvc_handler);
            let (mut ctx, _) = world(driver);
            let registry = default_registry().unwrap();
            for text in [
                "I am on the Todo page",
                "I add a todo \"Buy milk\"",
                "I add a todo \"Walk the dog\"",
                "I should see \"Walk the dog\" in the list",
                "I should see 2 todos in the list",
                "I complete the todo at index 0",
                "the todo at index 0 should be marked as completed",
            ] {
                registry.execute(&mut ctx, text).await.unwrap();
            }
            assert!(registry
                .execute(&mut ctx, "the todo at index 1 should be marked as completed")
                .await
                .is_err());
        }

        #[tokio::test]
        async fn test_missing_data_key_fails_without_fallback() {
            let (mut ctx, _) = world(MockDriver::new());
            let err = default_registry()
                .unwrap()
                .execute(&mut ctx, "I type data with key \"nope\" to input with role \"Name\"")
                .await
                .unwrap_err();
            assert!(matches!(err, StepwrightError::StepArgument { .. }));
        }
    }
}
