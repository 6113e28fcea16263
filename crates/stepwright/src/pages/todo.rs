//! TodoMVC page object.

use crate::config::{EnvConfig, PagePath};
use crate::locator::Locator;
use crate::page::Page;
use crate::page_object::{BasePage, PageObject};
use crate::result::StepwrightResult;
use std::sync::Arc;

/// The TodoMVC demo at [`PagePath::TODO`]
#[derive(Debug, Clone)]
pub struct TodoPage {
    base: BasePage,
    new_todo: Locator,
    todo_items: Locator,
}

impl PageObject for TodoPage {
    fn base(&self) -> &BasePage {
        &self.base
    }

    fn name(&self) -> &str {
        "todoPage"
    }
}

impl TodoPage {
    #[must_use]
    pub fn new(page: Page, config: Arc<EnvConfig>) -> Self {
        Self {
            base: BasePage::new(page, config, PagePath::TODO),
            new_todo: Locator::placeholder("What needs to be done?", true),
            todo_items: Locator::test_id("todo-title"),
        }
    }

    /// Type `item` into the new-todo box and press Enter
    pub async fn add_todo(&self, item: &str) -> StepwrightResult<()> {
        let page = self.base.page();
        page.fill(&self.new_todo, item).await?;
        page.press(&self.new_todo, "Enter").await
    }

    /// Titles of every item, in order
    pub async fn get_todos(&self) -> StepwrightResult<Vec<String>> {
        self.base.page().all_text_contents(&self.todo_items).await
    }

    /// The `index`-th todo row
    #[must_use]
    pub fn todo_item(&self, index: usize) -> Locator {
        Locator::test_id("todo-item").nth(index)
    }

    /// Check the `index`-th item's toggle
    pub async fn complete_todo(&self, index: usize) -> StepwrightResult<()> {
        let toggle = self.todo_item(index).locator(Locator::role("checkbox"));
        self.base.page().check(&toggle).await
    }
}

/// Canned inputs for todo scenarios
#[derive(Debug, Clone, Copy)]
pub struct TodoTestData;

impl TodoTestData {
    pub const VALID_ITEMS: [&'static str; 5] = [
        "Buy groceries",
        "Walk the dog",
        "Read a book",
        "Write documentation",
        "Complete project",
    ];
    pub const SPECIAL_CHARACTER_ITEMS: [&'static str; 3] =
        ["Item with @#$%", "Item with émojis 🎉", "Item with 日本語"];
    pub const LONG_ITEM: &'static str = "This is a very long todo item that contains a lot of text to test how the application handles lengthy inputs and whether it truncates or displays the full text properly";
    pub const EMPTY_ITEM: &'static str = "";
    pub const DUPLICATE_ITEMS: [&'static str; 2] = ["Duplicate task", "Duplicate task"];
}
