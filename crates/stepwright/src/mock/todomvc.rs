//! A fake TodoMVC application for scenario tests.
//!
//! [`todomvc_document`] renders the empty app and [`todomvc_handler`] reacts
//! to user input: pressing Enter in the new-todo box appends an item, and
//! checking an item's toggle marks it completed.

use super::dom::{ElementId, MockDocument, MockElement};
use super::driver::MockEvent;

/// Placeholder of the new-todo input
pub const NEW_TODO_PLACEHOLDER: &str = "What needs to be done?";

/// Empty TodoMVC page served at `url`
#[must_use]
pub fn todomvc_document(url: &str) -> MockDocument {
    let mut doc = MockDocument::new(url, "React • TodoMVC");
    let header = doc.append(None, MockElement::new("header").class("header"));
    let _ = doc.append(Some(header), MockElement::new("h1").text("todos"));
    let _ = doc.append(
        Some(header),
        MockElement::new("input")
            .class("new-todo")
            .placeholder(NEW_TODO_PLACEHOLDER),
    );
    let _ = doc.append(None, MockElement::new("ul").class("todo-list"));
    doc
}

/// Application behaviour for [`crate::mock::MockDriver::with_handler`]
pub fn todomvc_handler(doc: &mut MockDocument, id: ElementId, event: &MockEvent) {
    let Some(element) = doc.get(id) else {
        return;
    };
    let is_new_todo = element.classes().any(|c| c == "new-todo");
    let is_toggle = element.classes().any(|c| c == "toggle");
    match event {
        MockEvent::Press(key) if is_new_todo && key == "Enter" => {
            let title = element.value.trim().to_string();
            if title.is_empty() {
                return;
            }
            add_item(doc, &title);
            if let Some(input) = doc.get_mut(id) {
                input.value.clear();
            }
        }
        MockEvent::Check | MockEvent::Click if is_toggle => {
            let item = doc.parent(id).and_then(|view| doc.parent(view));
            let checked = doc.get(id).is_some_and(|e| e.checked);
            if let (Some(item), true) = (item, checked) {
                if let Some(li) = doc.get_mut(item) {
                    li.add_class("completed");
                }
            }
        }
        _ => {}
    }
}

fn add_item(doc: &mut MockDocument, title: &str) {
    let list = doc.ids().find(|id| {
        doc.get(*id)
            .is_some_and(|e| e.tag == "ul" && e.classes().any(|c| c == "todo-list"))
    });
    let li = doc.append(list, MockElement::new("li").test_id("todo-item"));
    let view = doc.append(Some(li), MockElement::new("div").class("view"));
    let _ = doc.append(
        Some(view),
        MockElement::new("input")
            .class("toggle")
            .attr("type", "checkbox")
            .attr("aria-label", "Toggle Todo"),
    );
    let _ = doc.append(
        Some(view),
        MockElement::new("label").test_id("todo-title").text(title),
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::Driver;
    use crate::locator::Locator;
    use crate::mock::MockDriver;

    fn app() -> MockDriver {
        MockDriver::new()
            .with_route("https://demo.test/todomvc", todomvc_document("https://demo.test/todomvc"))
            .with_handler(todomvc_handler)
    }

    #[tokio::test]
    async fn test_enter_adds_item_and_clears_input() {
        let driver = app();
        driver.goto("https://demo.test/todomvc").await.unwrap();
        let input = Locator::placeholder(NEW_TODO_PLACEHOLDER, true);
        driver.fill(&input, "Buy milk").await.unwrap();
        driver.press(&input, "Enter").await.unwrap();
        assert_eq!(
            driver.text_contents(&Locator::test_id("todo-title")).await.unwrap(),
            vec!["Buy milk"]
        );
        assert_eq!(driver.input_value(&input).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_blank_input_adds_nothing() {
        let driver = app();
        driver.goto("https://demo.test/todomvc").await.unwrap();
        let input = Locator::placeholder(NEW_TODO_PLACEHOLDER, true);
        driver.press(&input, "Enter").await.unwrap();
        assert_eq!(driver.count(&Locator::test_id("todo-item")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_check_marks_completed() {
        let driver = app();
        driver.goto("https://demo.test/todomvc").await.unwrap();
        let input = Locator::placeholder(NEW_TODO_PLACEHOLDER, true);
        driver.fill(&input, "Walk the dog").await.unwrap();
        driver.press(&input, "Enter").await.unwrap();
        let toggle = Locator::test_id("todo-item").nth(0).locator(Locator::role("checkbox"));
        driver.check(&toggle).await.unwrap();
        let class = driver
            .attribute(&Locator::test_id("todo-item").nth(0), "class")
            .await
            .unwrap();
        assert_eq!(class.as_deref(), Some("completed"));
    }
}
