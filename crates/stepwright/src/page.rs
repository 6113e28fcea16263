//! Auto-waiting page facade.
//!
//! [`Page`] wraps a driver with the waiting rules page objects rely on:
//! actions wait for their target to attach (and become visible, unless
//! forced) within [`Timeouts::action`]; expectations re-poll until
//! [`Timeouts::expect`]; response waits subscribe to the driver's network
//! events for the duration of one call only.

use crate::config::Timeouts;
use crate::driver::{ClickOptions, Driver, ResponseEvent};
use crate::locator::{normalize_whitespace, text_matches, Locator};
use crate::result::{StepwrightError, StepwrightResult};
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;

// =============================================================================
// WAIT STATE
// =============================================================================

/// Element state awaited by [`Page::wait_for`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    /// At least one match exists
    Attached,
    /// First match is visible
    Visible,
    /// No match, or first match hidden
    Hidden,
}

impl std::fmt::Display for WaitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Attached => "attached",
            Self::Visible => "visible",
            Self::Hidden => "hidden",
        };
        f.write_str(name)
    }
}

// =============================================================================
// PAGE
// =============================================================================

/// A browser page with auto-waiting actions
#[derive(Debug, Clone)]
pub struct Page {
    driver: Arc<dyn Driver>,
    timeouts: Timeouts,
}

impl Page {
    /// Wrap a driver
    #[must_use]
    pub fn new(driver: Arc<dyn Driver>, timeouts: Timeouts) -> Self {
        Self { driver, timeouts }
    }

    /// Underlying driver
    #[must_use]
    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    /// Active timeouts
    #[must_use]
    pub const fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Navigate, bounded by the navigation timeout
    pub async fn goto(&self, url: &str) -> StepwrightResult<()> {
        tracing::debug!(url, "goto");
        match tokio::time::timeout(self.timeouts.navigation, self.driver.goto(url)).await {
            Ok(result) => result,
            Err(_) => Err(StepwrightError::Navigation {
                url: url.to_string(),
                message: format!("timed out after {}ms", self.timeouts.navigation.as_millis()),
            }),
        }
    }

    /// Go back in history
    pub async fn go_back(&self) -> StepwrightResult<()> {
        self.driver.go_back().await
    }

    /// Go forward in history
    pub async fn go_forward(&self) -> StepwrightResult<()> {
        self.driver.go_forward().await
    }

    /// Close the active tab
    pub async fn close(&self) -> StepwrightResult<()> {
        self.driver.close().await
    }

    /// Close the tab at `index`
    pub async fn close_tab(&self, index: usize) -> StepwrightResult<()> {
        self.driver.close_tab(index).await
    }

    /// Current URL
    pub async fn url(&self) -> StepwrightResult<String> {
        self.driver.current_url().await
    }

    /// Current title
    pub async fn title(&self) -> StepwrightResult<String> {
        self.driver.title().await
    }

    /// Sleep on the scenario's task
    pub async fn wait_for_timeout(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Wait until `locator` reaches `state`
    pub async fn wait_for(
        &self,
        locator: &Locator,
        state: WaitState,
        timeout: Duration,
    ) -> StepwrightResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            let reached = match state {
                WaitState::Attached => self.driver.count(locator).await? > 0,
                WaitState::Visible => self.driver.is_visible(locator).await?,
                WaitState::Hidden => !self.driver.is_visible(locator).await?,
            };
            if reached {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(StepwrightError::Timeout {
                    ms: timeout.as_millis() as u64,
                    waited_for: format!("{locator} to be {state}"),
                });
            }
            tokio::time::sleep(self.timeouts.poll_interval).await;
        }
    }

    async fn actionable(&self, locator: &Locator, force: bool) -> StepwrightResult<()> {
        let state = if force {
            WaitState::Attached
        } else {
            WaitState::Visible
        };
        self.wait_for(locator, state, self.timeouts.action).await
    }

    /// Click after the target becomes actionable
    pub async fn click(&self, locator: &Locator, options: ClickOptions) -> StepwrightResult<()> {
        self.actionable(locator, options.force).await?;
        tracing::debug!(locator = %locator, "click");
        self.driver.click(locator, options).await
    }

    /// Hover after the target becomes visible
    pub async fn hover(&self, locator: &Locator) -> StepwrightResult<()> {
        self.actionable(locator, false).await?;
        self.driver.hover(locator).await
    }

    /// Fill after the target becomes visible
    pub async fn fill(&self, locator: &Locator, value: &str) -> StepwrightResult<()> {
        self.actionable(locator, false).await?;
        tracing::debug!(locator = %locator, "fill");
        self.driver.fill(locator, value).await
    }

    /// Press a key on the target
    pub async fn press(&self, locator: &Locator, key: &str) -> StepwrightResult<()> {
        self.actionable(locator, false).await?;
        self.driver.press(locator, key).await
    }

    /// Check a checkbox
    pub async fn check(&self, locator: &Locator) -> StepwrightResult<()> {
        self.actionable(locator, false).await?;
        self.driver.check(locator).await
    }

    /// Select an option by value or label
    pub async fn select_option(&self, locator: &Locator, option: &str) -> StepwrightResult<()> {
        self.actionable(locator, false).await?;
        self.driver.select_option(locator, option).await
    }

    /// Text of the first match, waiting for it to attach
    pub async fn text_content(&self, locator: &Locator) -> StepwrightResult<String> {
        self.actionable(locator, true).await?;
        Ok(self
            .driver
            .text_contents(locator)
            .await?
            .into_iter()
            .next()
            .unwrap_or_default())
    }

    /// Text of every current match, without waiting
    pub async fn all_text_contents(&self, locator: &Locator) -> StepwrightResult<Vec<String>> {
        self.driver.text_contents(locator).await
    }

    /// Number of current matches
    pub async fn count(&self, locator: &Locator) -> StepwrightResult<usize> {
        self.driver.count(locator).await
    }

    /// Attribute of the first match, waiting for it to attach
    pub async fn attribute(&self, locator: &Locator, name: &str) -> StepwrightResult<Option<String>> {
        self.actionable(locator, true).await?;
        self.driver.attribute(locator, name).await
    }

    /// Clipboard contents
    pub async fn read_clipboard(&self) -> StepwrightResult<String> {
        self.driver.read_clipboard().await
    }

    /// Replace clipboard contents
    pub async fn write_clipboard(&self, text: &str) -> StepwrightResult<()> {
        self.driver.write_clipboard(text).await
    }

    /// Wait for the next response accepted by `predicate`.
    ///
    /// The subscription lives only for this call and is bounded by the
    /// action timeout.
    pub async fn wait_for_response<F>(&self, description: &str, predicate: F) -> StepwrightResult<ResponseEvent>
    where
        F: Fn(&ResponseEvent) -> bool + Send,
    {
        let mut rx = self.driver.responses();
        let timeout = self.timeouts.action;
        let waiting = async {
            loop {
                match rx.recv().await {
                    Ok(event) if predicate(&event) => return Ok(event),
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => {
                        return Err(StepwrightError::driver("response stream closed"));
                    }
                }
            }
        };
        tokio::time::timeout(timeout, waiting)
            .await
            .unwrap_or_else(|_| {
                Err(StepwrightError::Timeout {
                    ms: timeout.as_millis() as u64,
                    waited_for: format!("response {description}"),
                })
            })
    }

    /// Start an expectation on `locator`
    #[must_use]
    pub fn expect(&self, locator: Locator) -> Expect<'_> {
        Expect {
            page: self,
            locator,
            timeout: self.timeouts.expect,
        }
    }

    /// Poll until the URL equals `expected`
    pub async fn expect_url(&self, expected: &str) -> StepwrightResult<()> {
        let page = self;
        self.poll("toHaveURL", self.timeouts.expect, move || async move {
            let actual = page.url().await?;
            Ok((actual == expected)
                .then_some(())
                .ok_or_else(|| format!("expected URL {expected:?}, got {actual:?}")))
        })
        .await
    }

    /// Poll until the title matches `pattern`
    pub async fn expect_title_matches(&self, pattern: &str) -> StepwrightResult<()> {
        let regex = Regex::new(pattern).map_err(|e| StepwrightError::InvalidExpression {
            expression: pattern.to_string(),
            message: e.to_string(),
        })?;
        let (page, regex) = (self, &regex);
        self.poll("toHaveTitle", self.timeouts.expect, move || async move {
            let title = page.title().await?;
            Ok(regex
                .is_match(&title)
                .then_some(())
                .ok_or_else(|| format!("title {title:?} does not match /{pattern}/")))
        })
        .await
    }

    /// Re-run `check` until it reports success or `timeout` passes.
    ///
    /// `check` returns `Ok(Err(message))` for a mismatch worth retrying and
    /// `Err(_)` for a hard failure.
    async fn poll<F, Fut>(&self, what: &str, timeout: Duration, mut check: F) -> StepwrightResult<()>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = StepwrightResult<Result<(), String>>>,
    {
        let deadline = Instant::now() + timeout;
        loop {
            let last = match check().await? {
                Ok(()) => return Ok(()),
                Err(message) => message,
            };
            if Instant::now() >= deadline {
                return Err(StepwrightError::assertion(format!(
                    "{what} timed out after {}ms: {last}",
                    timeout.as_millis()
                )));
            }
            tokio::time::sleep(self.timeouts.poll_interval).await;
        }
    }
}

// =============================================================================
// EXPECT
// =============================================================================

/// Assertion kinds for [`Expect`]
#[derive(Debug, Clone, PartialEq)]
pub enum ExpectAssertion {
    /// First match visible
    IsVisible,
    /// No match or first match hidden
    IsHidden,
    /// First match text equals (whitespace-normalized)
    HasText(String),
    /// Match texts equal the list, in order
    HasTexts(Vec<String>),
    /// First match text contains (case-sensitive)
    ContainsText(String),
    /// First match input value equals
    HasValue(String),
    /// First match attribute equals
    HasAttribute {
        /// Attribute name
        name: String,
        /// Expected value
        value: String,
    },
    /// First match `class` attribute matches the pattern
    HasClass(String),
    /// Match count equals
    HasCount(usize),
}

impl ExpectAssertion {
    /// Playwright-style matcher name for messages
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::IsVisible => "toBeVisible",
            Self::IsHidden => "toBeHidden",
            Self::HasText(_) | Self::HasTexts(_) => "toHaveText",
            Self::ContainsText(_) => "toContainText",
            Self::HasValue(_) => "toHaveValue",
            Self::HasAttribute { .. } => "toHaveAttribute",
            Self::HasClass(_) => "toHaveClass",
            Self::HasCount(_) => "toHaveCount",
        }
    }

    /// Evaluate once against the current page
    async fn evaluate(&self, driver: &dyn Driver, locator: &Locator) -> StepwrightResult<Result<(), String>> {
        let first = match locator.index {
            Some(_) => locator.clone(),
            None => locator.clone().first(),
        };
        let outcome = match self {
            Self::IsVisible => {
                let visible = driver.is_visible(locator).await?;
                visible.then_some(()).ok_or_else(|| "element is not visible".to_string())
            }
            Self::IsHidden => {
                let visible = driver.is_visible(locator).await?;
                (!visible).then_some(()).ok_or_else(|| "element is visible".to_string())
            }
            Self::HasText(expected) => match driver.text_contents(&first).await?.first() {
                Some(actual) if text_matches(actual, expected, true) => Ok(()),
                Some(actual) => Err(format!("expected text {expected:?}, got {:?}", normalize_whitespace(actual))),
                None => Err("element not found".to_string()),
            },
            Self::HasTexts(expected) => {
                let actual: Vec<String> = driver
                    .text_contents(locator)
                    .await?
                    .iter()
                    .map(|t| normalize_whitespace(t))
                    .collect();
                let wanted: Vec<String> = expected.iter().map(|t| normalize_whitespace(t)).collect();
                (actual == wanted)
                    .then_some(())
                    .ok_or_else(|| format!("expected texts {wanted:?}, got {actual:?}"))
            }
            Self::ContainsText(expected) => match driver.text_contents(&first).await?.first() {
                Some(actual) if normalize_whitespace(actual).contains(&normalize_whitespace(expected)) => Ok(()),
                Some(actual) => Err(format!("expected text containing {expected:?}, got {actual:?}")),
                None => Err("element not found".to_string()),
            },
            Self::HasValue(expected) => {
                if driver.count(&first).await? == 0 {
                    Err("element not found".to_string())
                } else {
                    let actual = driver.input_value(&first).await?;
                    (actual == *expected)
                        .then_some(())
                        .ok_or_else(|| format!("expected value {expected:?}, got {actual:?}"))
                }
            }
            Self::HasAttribute { name, value } => {
                if driver.count(&first).await? == 0 {
                    Err("element not found".to_string())
                } else {
                    let actual = driver.attribute(&first, name).await?;
                    (actual.as_deref() == Some(value.as_str()))
                        .then_some(())
                        .ok_or_else(|| format!("expected {name}={value:?}, got {actual:?}"))
                }
            }
            Self::HasClass(pattern) => {
                let regex = Regex::new(pattern).map_err(|e| StepwrightError::InvalidExpression {
                    expression: pattern.clone(),
                    message: e.to_string(),
                })?;
                if driver.count(&first).await? == 0 {
                    Err("element not found".to_string())
                } else {
                    let class = driver.attribute(&first, "class").await?.unwrap_or_default();
                    regex
                        .is_match(&class)
                        .then_some(())
                        .ok_or_else(|| format!("class {class:?} does not match /{pattern}/"))
                }
            }
            Self::HasCount(expected) => {
                let actual = driver.count(locator).await?;
                (actual == *expected)
                    .then_some(())
                    .ok_or_else(|| format!("expected count {expected}, got {actual}"))
            }
        };
        Ok(outcome)
    }
}

/// Re-polling assertion builder (Playwright's `expect()`)
#[derive(Debug, Clone)]
pub struct Expect<'p> {
    page: &'p Page,
    locator: Locator,
    timeout: Duration,
}

impl Expect<'_> {
    /// Override the expectation window
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Poll `assertion` until it holds
    pub async fn satisfies(&self, assertion: ExpectAssertion) -> StepwrightResult<()> {
        let what = format!("expect({}).{}()", self.locator, assertion.name());
        let (driver, locator, assertion) = (self.page.driver.as_ref(), &self.locator, &assertion);
        self.page
            .poll(&what, self.timeout, move || assertion.evaluate(driver, locator))
            .await
    }

    /// Assert the element is visible
    pub async fn to_be_visible(&self) -> StepwrightResult<()> {
        self.satisfies(ExpectAssertion::IsVisible).await
    }

    /// Assert the element is hidden or absent
    pub async fn to_be_hidden(&self) -> StepwrightResult<()> {
        self.satisfies(ExpectAssertion::IsHidden).await
    }

    /// Assert the element has exactly this text
    pub async fn to_have_text(&self, expected: impl Into<String>) -> StepwrightResult<()> {
        self.satisfies(ExpectAssertion::HasText(expected.into())).await
    }

    /// Assert every match's text, in order
    pub async fn to_have_texts(&self, expected: &[String]) -> StepwrightResult<()> {
        self.satisfies(ExpectAssertion::HasTexts(expected.to_vec())).await
    }

    /// Assert the element contains text
    pub async fn to_contain_text(&self, expected: impl Into<String>) -> StepwrightResult<()> {
        self.satisfies(ExpectAssertion::ContainsText(expected.into())).await
    }

    /// Assert the input value
    pub async fn to_have_value(&self, expected: impl Into<String>) -> StepwrightResult<()> {
        self.satisfies(ExpectAssertion::HasValue(expected.into())).await
    }

    /// Assert an attribute value
    pub async fn to_have_attribute(
        &self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> StepwrightResult<()> {
        self.satisfies(ExpectAssertion::HasAttribute {
            name: name.into(),
            value: value.into(),
        })
        .await
    }

    /// Assert the class attribute matches a regex
    pub async fn to_have_class(&self, pattern: impl Into<String>) -> StepwrightResult<()> {
        self.satisfies(ExpectAssertion::HasClass(pattern.into())).await
    }

    /// Assert the element count
    pub async fn to_have_count(&self, count: usize) -> StepwrightResult<()> {
        self.satisfies(ExpectAssertion::HasCount(count)).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mock::{MockDocument, MockDriver, MockElement};

    fn page_with(doc: MockDocument) -> (Arc<MockDriver>, Page) {
        let driver = Arc::new(MockDriver::new());
        driver.set_document(doc).unwrap();
        let page = Page::new(driver.clone(), Timeouts::fast());
        (driver, page)
    }

    fn list_doc() -> MockDocument {
        let mut doc = MockDocument::new("https://app.test/", "Shopping list");
        let ul = doc.append(None, MockElement::new("ul"));
        let _ = doc.append(Some(ul), MockElement::new("li").text("Milk"));
        let _ = doc.append(Some(ul), MockElement::new("li").text("Eggs").class("done"));
        let _ = doc.append(None, MockElement::new("p").text("Secret").hidden());
        doc
    }

    mod action_tests {
        use super::*;

        #[tokio::test]
        async fn test_click_waits_for_element() {
            let (driver, page) = page_with(MockDocument::new("u", "t"));
            let late = driver.clone();
            let handle = tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                late.set_document(MockDocument::new("u", "t").with(MockElement::new("button").text("Go")))
                    .unwrap();
            });
            page.click(&Locator::role_named("button", "Go", true), ClickOptions::default())
                .await
                .unwrap();
            handle.await.unwrap();
            assert!(driver.was_called("Click"));
        }

        #[tokio::test]
        async fn test_click_times_out_on_missing() {
            let (_, page) = page_with(MockDocument::new("u", "t"));
            let err = page
                .click(&Locator::css("#missing"), ClickOptions::default())
                .await
                .unwrap_err();
            assert!(matches!(err, StepwrightError::Timeout { .. }));
        }

        #[tokio::test]
        async fn test_hidden_needs_force() {
            let (_, page) = page_with(list_doc());
            let secret = Locator::text("Secret", true);
            assert!(page.click(&secret, ClickOptions::default()).await.is_err());
            page.click(&secret, ClickOptions::forced()).await.unwrap();
        }
    }

    mod expect_tests {
        use super::*;

        #[tokio::test]
        async fn test_visibility() {
            let (_, page) = page_with(list_doc());
            page.expect(Locator::text("Milk", true)).to_be_visible().await.unwrap();
            page.expect(Locator::text("Secret", true)).to_be_hidden().await.unwrap();
            page.expect(Locator::text("Absent", true)).to_be_hidden().await.unwrap();
        }

        #[tokio::test]
        async fn test_failure_reports_last_mismatch() {
            let (_, page) = page_with(list_doc());
            let err = page
                .expect(Locator::role("listitem"))
                .to_have_text("Bread")
                .await
                .unwrap_err();
            let message = err.to_string();
            assert!(message.contains("toHaveText"));
            assert!(message.contains("\"Milk\""));
        }

        #[tokio::test]
        async fn test_texts_and_count() {
            let (_, page) = page_with(list_doc());
            let items = Locator::role("listitem");
            page.expect(items.clone())
                .to_have_texts(&["Milk".to_string(), "Eggs".to_string()])
                .await
                .unwrap();
            page.expect(items).to_have_count(2).await.unwrap();
        }

        #[tokio::test]
        async fn test_class_regex() {
            let (_, page) = page_with(list_doc());
            page.expect(Locator::role("listitem").nth(1))
                .to_have_class("done")
                .await
                .unwrap();
            assert!(page
                .expect(Locator::role("listitem").nth(0))
                .to_have_class("done")
                .await
                .is_err());
        }

        #[tokio::test]
        async fn test_title_and_url() {
            let (driver, page) = page_with(list_doc());
            driver.goto("https://app.test/list").await.unwrap();
            driver.set_document(list_doc()).unwrap();
            page.expect_url("https://app.test/list").await.unwrap();
            page.expect_title_matches("Shopping").await.unwrap();
            assert!(page.expect_title_matches("Checkout").await.is_err());
        }
    }

    mod response_tests {
        use super::*;

        #[tokio::test]
        async fn test_wait_for_matching_response() {
            let (driver, page) = page_with(MockDocument::default());
            let emitter = driver.clone();
            let handle = tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                emitter.emit_response(ResponseEvent::new("https://x/other", 200, ""));
                emitter.emit_response(ResponseEvent::new("https://x/api/users", 500, ""));
                emitter.emit_response(ResponseEvent::new("https://x/api/users", 200, "[]"));
            });
            let event = page
                .wait_for_response("users", |e| e.url.contains("/users") && e.status == 200)
                .await
                .unwrap();
            handle.await.unwrap();
            assert_eq!(event.body, "[]");
        }

        #[tokio::test]
        async fn test_wait_for_response_times_out() {
            let (_, page) = page_with(MockDocument::default());
            let err = page.wait_for_response("never", |_| true).await.unwrap_err();
            assert!(matches!(err, StepwrightError::Timeout { .. }));
        }
    }
}
