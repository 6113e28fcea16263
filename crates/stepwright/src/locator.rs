//! Semantic locators.
//!
//! A [`Locator`] is a plain value describing how to find elements: by CSS,
//! accessible role and name, label, placeholder, visible text or test id,
//! optionally scoped to a parent locator or an iframe, filtered by contained
//! text, and narrowed to the n-th match. Drivers resolve it against the live
//! page each time it is used; nothing is cached.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How elements are matched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selector {
    /// CSS selector (e.g., "table tbody tr")
    Css {
        /// Selector source
        css: String,
    },
    /// ARIA role with optional accessible name
    Role {
        /// Role name (button, link, textbox, ...)
        role: String,
        /// Accessible name
        name: Option<String>,
        /// Whole-string, case-sensitive name match
        exact: bool,
    },
    /// Associated `<label>` text or `aria-label`
    Label {
        /// Label text
        text: String,
        /// Whole-string match
        exact: bool,
    },
    /// `placeholder` attribute
    Placeholder {
        /// Placeholder text
        text: String,
        /// Whole-string match
        exact: bool,
    },
    /// Visible text content
    Text {
        /// Text to find
        text: String,
        /// Whole-string match
        exact: bool,
    },
    /// `data-testid` attribute
    TestId {
        /// Test id
        id: String,
    },
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css { css } => write!(f, "locator({css:?})"),
            Self::Role { role, name, exact } => match name {
                Some(name) => write!(f, "getByRole({role:?}, name={name:?}, exact={exact})"),
                None => write!(f, "getByRole({role:?})"),
            },
            Self::Label { text, exact } => write!(f, "getByLabel({text:?}, exact={exact})"),
            Self::Placeholder { text, exact } => {
                write!(f, "getByPlaceholder({text:?}, exact={exact})")
            }
            Self::Text { text, exact } => write!(f, "getByText({text:?}, exact={exact})"),
            Self::TestId { id } => write!(f, "getByTestId({id:?})"),
        }
    }
}

/// A resolvable element description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    /// Primary selector
    pub selector: Selector,
    /// Keep only matches whose text contains this (case-insensitive)
    pub has_text: Option<String>,
    /// Zero-based match index; `None` means every match
    pub index: Option<usize>,
    /// Scope: only descendants of the parent's matches
    pub parent: Option<Box<Locator>>,
    /// CSS of the iframe whose document is searched
    pub frame: Option<String>,
}

impl Locator {
    /// Create a locator from a selector
    #[must_use]
    pub const fn from_selector(selector: Selector) -> Self {
        Self {
            selector,
            has_text: None,
            index: None,
            parent: None,
            frame: None,
        }
    }

    /// CSS locator
    #[must_use]
    pub fn css(css: impl Into<String>) -> Self {
        Self::from_selector(Selector::Css { css: css.into() })
    }

    /// Role locator without a name constraint
    #[must_use]
    pub fn role(role: impl Into<String>) -> Self {
        Self::from_selector(Selector::Role {
            role: role.into(),
            name: None,
            exact: false,
        })
    }

    /// Role locator with an accessible name
    #[must_use]
    pub fn role_named(role: impl Into<String>, name: impl Into<String>, exact: bool) -> Self {
        Self::from_selector(Selector::Role {
            role: role.into(),
            name: Some(name.into()),
            exact,
        })
    }

    /// Label locator
    #[must_use]
    pub fn label(text: impl Into<String>, exact: bool) -> Self {
        Self::from_selector(Selector::Label {
            text: text.into(),
            exact,
        })
    }

    /// Placeholder locator
    #[must_use]
    pub fn placeholder(text: impl Into<String>, exact: bool) -> Self {
        Self::from_selector(Selector::Placeholder {
            text: text.into(),
            exact,
        })
    }

    /// Text locator
    #[must_use]
    pub fn text(text: impl Into<String>, exact: bool) -> Self {
        Self::from_selector(Selector::Text {
            text: text.into(),
            exact,
        })
    }

    /// Test id locator
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::from_selector(Selector::TestId { id: id.into() })
    }

    /// Narrow to the n-th match
    #[must_use]
    pub const fn nth(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Narrow to the first match
    #[must_use]
    pub const fn first(self) -> Self {
        self.nth(0)
    }

    /// Keep matches containing `text`
    #[must_use]
    pub fn filter_has_text(mut self, text: impl Into<String>) -> Self {
        self.has_text = Some(text.into());
        self
    }

    /// Search for `child` inside this locator's matches
    #[must_use]
    pub fn locator(self, mut child: Locator) -> Self {
        if child.frame.is_none() {
            child.frame.clone_from(&self.frame);
        }
        child.parent = Some(Box::new(self));
        child
    }

    /// Search inside the iframe matched by `frame_css`
    #[must_use]
    pub fn in_frame(mut self, frame_css: impl Into<String>) -> Self {
        self.frame = Some(frame_css.into());
        self
    }

    /// Human-readable chain for error messages
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = String::new();
        if let Some(frame) = &self.frame {
            if self.parent.is_none() {
                out.push_str(&format!("frameLocator({frame:?})."));
            }
        }
        if let Some(parent) = &self.parent {
            out.push_str(&parent.describe());
            out.push('.');
        }
        out.push_str(&self.selector.to_string());
        if let Some(text) = &self.has_text {
            out.push_str(&format!(".filter(hasText={text:?})"));
        }
        if let Some(index) = self.index {
            out.push_str(&format!(".nth({index})"));
        }
        out
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// An iframe scope, produced by `BasePage::frame_by_index`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    css: String,
}

impl Frame {
    /// Frame identified by the CSS of its `<iframe>` element
    #[must_use]
    pub fn new(css: impl Into<String>) -> Self {
        Self { css: css.into() }
    }

    /// CSS of the iframe element
    #[must_use]
    pub fn css(&self) -> &str {
        &self.css
    }

    /// Scope `locator` to this frame
    #[must_use]
    pub fn locator(&self, locator: Locator) -> Locator {
        locator.in_frame(self.css.clone())
    }
}

/// Collapse runs of whitespace and trim
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text comparison used by role names, labels, placeholders and text.
///
/// Exact matching compares whitespace-normalized strings case-sensitively;
/// otherwise a case-insensitive substring match is used.
#[must_use]
pub fn text_matches(actual: &str, expected: &str, exact: bool) -> bool {
    let actual = normalize_whitespace(actual);
    let expected = normalize_whitespace(expected);
    if exact {
        actual == expected
    } else {
        actual.to_lowercase().contains(&expected.to_lowercase())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod builder_tests {
        use super::*;

        #[test]
        fn test_nth_and_first() {
            assert_eq!(Locator::css("li").nth(2).index, Some(2));
            assert_eq!(Locator::css("li").first().index, Some(0));
            assert_eq!(Locator::css("li").index, None);
        }

        #[test]
        fn test_chaining_sets_parent_and_inherits_frame() {
            let child = Locator::css("form")
                .in_frame("iframe[name=\"pay\"]")
                .filter_has_text("Country")
                .locator(Locator::role("combobox"));
            let parent = child.parent.as_ref().unwrap();
            assert_eq!(parent.has_text.as_deref(), Some("Country"));
            assert_eq!(child.frame.as_deref(), Some("iframe[name=\"pay\"]"));
        }

        #[test]
        fn test_frame_scope() {
            let frame = Frame::new("iframe[name=\"a\"]");
            let loc = frame.locator(Locator::text("Pay", true));
            assert_eq!(loc.frame.as_deref(), Some("iframe[name=\"a\"]"));
        }

        #[test]
        fn test_locators_compare_by_value() {
            let a = Locator::role_named("button", "Save", true).nth(1);
            let b = Locator::role_named("button", "Save", true).nth(1);
            assert_eq!(a, b);
        }
    }

    mod describe_tests {
        use super::*;

        #[test]
        fn test_describe_chain() {
            let loc = Locator::test_id("todo-item")
                .nth(0)
                .locator(Locator::role("checkbox"));
            assert_eq!(
                loc.describe(),
                "getByTestId(\"todo-item\").nth(0).getByRole(\"checkbox\")"
            );
        }

        #[test]
        fn test_describe_role_name() {
            let loc = Locator::role_named("button", "Go", true);
            assert_eq!(loc.to_string(), "getByRole(\"button\", name=\"Go\", exact=true)");
        }
    }

    mod text_match_tests {
        use super::*;

        #[test]
        fn test_exact_normalizes_whitespace() {
            assert!(text_matches("  Buy\n milk ", "Buy milk", true));
            assert!(!text_matches("Buy milk now", "Buy milk", true));
            assert!(!text_matches("buy milk", "Buy milk", true));
        }

        #[test]
        fn test_substring_is_case_insensitive() {
            assert!(text_matches("Buy Milk now", "milk", false));
            assert!(!text_matches("Bread", "milk", false));
        }
    }

    mod serde_tests {
        use super::*;

        #[test]
        fn test_selector_tagged_json() {
            let json = serde_json::to_value(Selector::TestId {
                id: "x".to_string(),
            })
            .unwrap();
            assert_eq!(json["kind"], "test_id");
            assert_eq!(json["id"], "x");
        }
    }
}
