//! Page Object Model.
//!
//! Every page object composes a [`BasePage`], which owns the page's path and
//! optional subdomain, derives its absolute URL from the shared
//! [`EnvConfig`], and exposes the generic interaction surface used by the
//! common step library. Page-specific types such as
//! [`crate::pages::TodoPage`] add domain actions on top.

use crate::config::EnvConfig;
use crate::driver::{ClickOptions, ResponseEvent};
use crate::helpers::extract_keys;
use crate::locator::{Frame, Locator};
use crate::page::{Page, WaitState};
use crate::result::{StepwrightError, StepwrightResult};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// A page or component that steps can navigate to by name
pub trait PageObject: Send + Sync {
    /// Shared base capabilities
    fn base(&self) -> &BasePage;

    /// Fixture key of this page object (e.g. "todoPage")
    fn name(&self) -> &str;

    /// Absolute URL of this page
    fn url(&self) -> StepwrightResult<String> {
        self.base().url()
    }
}

/// Generic capabilities shared by every page object
#[derive(Debug, Clone)]
pub struct BasePage {
    page: Page,
    config: Arc<EnvConfig>,
    path: String,
    subdomain: Option<String>,
}

impl PageObject for BasePage {
    fn base(&self) -> &BasePage {
        self
    }

    fn name(&self) -> &str {
        "basePage"
    }
}

impl BasePage {
    /// Page object for `path` under the base URL
    #[must_use]
    pub fn new(page: Page, config: Arc<EnvConfig>, path: impl Into<String>) -> Self {
        Self {
            page,
            config,
            path: path.into(),
            subdomain: None,
        }
    }

    /// Route this page through a portal subdomain
    #[must_use]
    pub fn with_subdomain(mut self, subdomain: impl Into<String>) -> Self {
        self.subdomain = Some(subdomain.into());
        self
    }

    /// Browser page, for assertions
    #[must_use]
    pub const fn page(&self) -> &Page {
        &self.page
    }

    /// Environment snapshot
    #[must_use]
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    /// Relative path
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Change the relative path
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    /// Absolute URL derived from the path, subdomain and environment
    pub fn url(&self) -> StepwrightResult<String> {
        self.config.resolve_url(&self.path, self.subdomain.as_deref())
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    /// Open this page
    pub async fn goto(&self) -> StepwrightResult<()> {
        let url = self.url()?;
        tracing::info!(%url, "navigating");
        self.page.goto(&url).await
    }

    /// Go back
    pub async fn go_back(&self) -> StepwrightResult<()> {
        self.page.go_back().await
    }

    /// Go forward
    pub async fn go_forward(&self) -> StepwrightResult<()> {
        self.page.go_forward().await
    }

    /// Close the current tab
    pub async fn close(&self) -> StepwrightResult<()> {
        self.page.close().await
    }

    /// Close the tab at `index`
    pub async fn close_by_index(&self, index: usize) -> StepwrightResult<()> {
        self.page.close_tab(index).await
    }

    /// CSS locator on this page
    #[must_use]
    pub fn get_by_locator(&self, css: &str) -> Locator {
        Locator::css(css)
    }

    // -------------------------------------------------------------------------
    // Waits
    // -------------------------------------------------------------------------

    /// Sleep. For debugging only.
    pub async fn wait_for_timeout(&self, ms: u64) {
        self.page.wait_for_timeout(Duration::from_millis(ms)).await;
    }

    /// Wait for a response whose URL contains `url` with status `code`
    pub async fn wait_for_response(&self, url: &str, code: u16) -> StepwrightResult<ResponseEvent> {
        self.page
            .wait_for_response(&format!("{url} ({code})"), |event| {
                event.url.contains(url) && event.status == code
            })
            .await
    }

    /// Wait until an element with `role` (and `name`) is visible
    pub async fn wait_for_role_visible(
        &self,
        role: &str,
        name: Option<&str>,
        exact: bool,
    ) -> StepwrightResult<()> {
        let locator = match name {
            Some(name) => Locator::role_named(role, name, exact),
            None => Locator::role(role),
        };
        self.wait_visible(&locator).await
    }

    /// Wait until the CSS locator is visible
    pub async fn wait_for_locator_visible(&self, css: &str) -> StepwrightResult<()> {
        self.wait_visible(&Locator::css(css)).await
    }

    /// Wait until the `index`-th element with `role` and `name` is visible
    pub async fn wait_for_role_with_index_visible(
        &self,
        role: &str,
        name: Option<&str>,
        index: usize,
    ) -> StepwrightResult<()> {
        let locator = match name {
            Some(name) => Locator::role_named(role, name, true),
            None => Locator::role(role),
        };
        self.wait_visible(&locator.nth(index)).await
    }

    async fn wait_visible(&self, locator: &Locator) -> StepwrightResult<()> {
        self.page
            .wait_for(locator, WaitState::Visible, self.page.timeouts().action)
            .await
    }

    // -------------------------------------------------------------------------
    // Hover
    // -------------------------------------------------------------------------

    /// Hover an element by label
    pub async fn hover_by_label(&self, label: &str) -> StepwrightResult<()> {
        self.page.hover(&Locator::label(label, false)).await
    }

    /// Hover an element by role and exact name
    pub async fn hover_by_role(&self, role: &str, name: &str) -> StepwrightResult<()> {
        self.page.hover(&Locator::role_named(role, name, true)).await
    }

    /// Hover an element by CSS
    pub async fn hover_by_locator(&self, css: &str) -> StepwrightResult<()> {
        self.page.hover(&Locator::css(css)).await
    }

    // -------------------------------------------------------------------------
    // Clipboard
    // -------------------------------------------------------------------------

    /// Copy the text of an element found by label
    pub async fn copy_by_label(&self, label: &str) -> StepwrightResult<()> {
        self.copy(&Locator::label(label, false)).await
    }

    /// Copy the text of an element found by CSS
    pub async fn copy_by_locator(&self, css: &str) -> StepwrightResult<()> {
        self.copy(&Locator::css(css)).await
    }

    async fn copy(&self, locator: &Locator) -> StepwrightResult<()> {
        let text = self.page.text_content(locator).await?;
        self.page.write_clipboard(&text).await
    }

    /// Paste the clipboard into an input found by label
    pub async fn paste_by_label(&self, label: &str) -> StepwrightResult<()> {
        self.paste(&Locator::label(label, false)).await
    }

    /// Paste the clipboard into a textbox found by name
    pub async fn paste_by_role_textbox(&self, name: &str) -> StepwrightResult<()> {
        self.paste(&Locator::role_named("textbox", name, false)).await
    }

    /// Paste the clipboard into an input found by exact placeholder
    pub async fn paste_by_placeholder(&self, placeholder: &str) -> StepwrightResult<()> {
        self.paste(&Locator::placeholder(placeholder, true)).await
    }

    /// Paste the clipboard into the `index`-th CSS match
    pub async fn paste_by_locator(&self, css: &str, index: usize) -> StepwrightResult<()> {
        self.paste(&Locator::css(css).nth(index)).await
    }

    async fn paste(&self, locator: &Locator) -> StepwrightResult<()> {
        let text = self.page.read_clipboard().await?;
        self.page.fill(locator, &text).await
    }

    // -------------------------------------------------------------------------
    // Click
    // -------------------------------------------------------------------------

    /// Click the `index`-th element with exactly this text
    pub async fn click_by_text(&self, text: &str, index: Option<usize>) -> StepwrightResult<()> {
        self.click(Locator::text(text, true).nth(index.unwrap_or(0)))
            .await
    }

    /// [`Self::click_by_text`] inside a frame
    pub async fn click_by_text_in_frame(
        &self,
        frame: &Frame,
        text: &str,
        index: Option<usize>,
    ) -> StepwrightResult<()> {
        self.click(frame.locator(Locator::text(text, true).nth(index.unwrap_or(0))))
            .await
    }

    /// Click the `index`-th element with `role` and `name`
    pub async fn click_by_role(
        &self,
        role: &str,
        name: &str,
        exact: bool,
        index: Option<usize>,
    ) -> StepwrightResult<()> {
        self.click(Locator::role_named(role, name, exact).nth(index.unwrap_or(0)))
            .await
    }

    /// [`Self::click_by_role`] inside a frame (substring name match)
    pub async fn click_by_role_in_frame(
        &self,
        frame: &Frame,
        role: &str,
        name: &str,
        index: Option<usize>,
    ) -> StepwrightResult<()> {
        let locator = Locator::role_named(role, name, false).nth(index.unwrap_or(0));
        self.click(frame.locator(locator)).await
    }

    /// Click the `index`-th CSS match
    pub async fn click_by_locator(
        &self,
        css: &str,
        index: Option<usize>,
        options: ClickOptions,
    ) -> StepwrightResult<()> {
        let locator = Locator::css(css).nth(index.unwrap_or(0));
        self.page.click(&locator, options).await
    }

    /// [`Self::click_by_locator`] inside a frame
    pub async fn click_by_locator_in_frame(
        &self,
        frame: &Frame,
        css: &str,
        index: Option<usize>,
    ) -> StepwrightResult<()> {
        self.click(frame.locator(Locator::css(css).nth(index.unwrap_or(0))))
            .await
    }

    /// Click the element with exactly this label
    pub async fn click_by_label(&self, label: &str, force: bool) -> StepwrightResult<()> {
        let locator = Locator::label(label, true);
        self.page.click(&locator, ClickOptions { force }).await
    }

    async fn click(&self, locator: Locator) -> StepwrightResult<()> {
        self.page.click(&locator, ClickOptions::default()).await
    }

    // -------------------------------------------------------------------------
    // Fill
    // -------------------------------------------------------------------------

    /// Fill the `index`-th element with `role` and exact `name`
    pub async fn fill_by_role(
        &self,
        role: &str,
        name: &str,
        value: &str,
        index: Option<usize>,
    ) -> StepwrightResult<()> {
        let locator = Locator::role_named(role, name, true).nth(index.unwrap_or(0));
        self.page.fill(&locator, value).await
    }

    /// Fill the textbox whose name contains `name`
    pub async fn fill_by_role_textbox(&self, name: &str, value: &str) -> StepwrightResult<()> {
        self.page
            .fill(&Locator::role_named("textbox", name, false), value)
            .await
    }

    /// Fill the input with exactly this placeholder
    pub async fn fill_by_placeholder(&self, placeholder: &str, value: &str) -> StepwrightResult<()> {
        self.fill_by_exact_placeholder(placeholder, value, true).await
    }

    /// Fill the input by placeholder with explicit exactness
    pub async fn fill_by_exact_placeholder(
        &self,
        placeholder: &str,
        value: &str,
        exact: bool,
    ) -> StepwrightResult<()> {
        self.page
            .fill(&Locator::placeholder(placeholder, exact), value)
            .await
    }

    /// Fill the `index`-th CSS match
    pub async fn fill_by_locator(
        &self,
        css: &str,
        value: &str,
        index: Option<usize>,
    ) -> StepwrightResult<()> {
        let locator = Locator::css(css).nth(index.unwrap_or(0));
        self.page.fill(&locator, value).await
    }

    /// [`Self::fill_by_locator`] inside a frame
    pub async fn fill_by_locator_in_frame(
        &self,
        frame: &Frame,
        css: &str,
        value: &str,
        index: Option<usize>,
    ) -> StepwrightResult<()> {
        let locator = frame.locator(Locator::css(css).nth(index.unwrap_or(0)));
        self.page.fill(&locator, value).await
    }

    // -------------------------------------------------------------------------
    // Select
    // -------------------------------------------------------------------------

    /// Select `option` in the select with exactly this label
    pub async fn select_option_by_label(&self, label: &str, option: &str) -> StepwrightResult<()> {
        self.page
            .select_option(&Locator::label(label, true), option)
            .await
    }

    /// Select `option` in the select with exactly this text
    pub async fn select_option_by_text(&self, text: &str, option: &str) -> StepwrightResult<()> {
        self.page
            .select_option(&Locator::text(text, true), option)
            .await
    }

    /// Select `option` in the first CSS match
    pub async fn select_option_by_locator(&self, css: &str, option: &str) -> StepwrightResult<()> {
        self.page
            .select_option(&Locator::css(css).first(), option)
            .await
    }

    /// Open a custom dropdown, then click the option label
    pub async fn select_option(
        &self,
        css: &str,
        option: &str,
        index: Option<usize>,
    ) -> StepwrightResult<()> {
        self.click_by_locator(css, index, ClickOptions::default())
            .await?;
        self.click_by_label(option, false).await
    }

    /// For each option, open the i-th combobox and click the option
    pub async fn select_combobox_options(&self, options: &[String]) -> StepwrightResult<()> {
        for (i, option) in options.iter().enumerate() {
            self.click(Locator::role("combobox").nth(i)).await?;
            self.click_by_role("option", option, true, None).await?;
        }
        Ok(())
    }

    /// Count elements with exactly this text
    pub async fn count_by_text(&self, text: &str) -> StepwrightResult<usize> {
        self.page.count(&Locator::text(text, true)).await
    }

    // -------------------------------------------------------------------------
    // Assertions
    // -------------------------------------------------------------------------

    /// Assert the input value of the `index`-th CSS match
    pub async fn to_have_value(&self, css: &str, value: &str, index: Option<usize>) -> StepwrightResult<()> {
        self.page
            .expect(Locator::css(css).nth(index.unwrap_or(0)))
            .to_have_value(value)
            .await
    }

    /// Assert an attribute of the first CSS match
    pub async fn to_have_attribute(&self, css: &str, attribute: &str, value: &str) -> StepwrightResult<()> {
        self.page
            .expect(Locator::css(css))
            .to_have_attribute(attribute, value)
            .await
    }

    /// Assert the exact text of the `index`-th CSS match
    pub async fn to_have_text_from_selection(
        &self,
        css: &str,
        text: &str,
        index: Option<usize>,
    ) -> StepwrightResult<()> {
        self.page
            .expect(Locator::css(css).nth(index.unwrap_or(0)))
            .to_have_text(text)
            .await
    }

    /// Assert the `index`-th CSS match contains text
    pub async fn to_contain_text(&self, css: &str, text: &str, index: Option<usize>) -> StepwrightResult<()> {
        self.page
            .expect(Locator::css(css).nth(index.unwrap_or(0)))
            .to_contain_text(text)
            .await
    }

    /// For each question, the combobox in the form section containing it
    /// must show the matching option.
    pub async fn assert_form_selected_options(
        &self,
        css: &str,
        questions: &[String],
        options: &[String],
    ) -> StepwrightResult<()> {
        if questions.len() != options.len() {
            return Err(StepwrightError::assertion(format!(
                "{} questions but {} options",
                questions.len(),
                options.len()
            )));
        }
        let checks = questions.iter().zip(options).map(|(question, option)| {
            let combobox = Locator::css(css)
                .filter_has_text(question.clone())
                .locator(Locator::role("combobox"));
            async move { self.page.expect(combobox).to_contain_text(option.clone()).await }
        });
        futures::future::try_join_all(checks).await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Network
    // -------------------------------------------------------------------------

    /// Read a feature flag from the next response whose URL contains
    /// `endpoint`. The body is either `{ "data": [flags] }` or `[flags]`;
    /// returns `None` when no flag has `key`.
    pub async fn check_feature_flag_is_enabled(
        &self,
        endpoint: &str,
        key: &str,
    ) -> StepwrightResult<Option<bool>> {
        let event = self
            .page
            .wait_for_response(endpoint, |e| e.url.contains(endpoint))
            .await?;
        let body = event.json().map_err(|e| StepwrightError::ResponseBody {
            url: event.url.clone(),
            message: format!("Failed to parse response body: {e}"),
        })?;
        let flags = body.get("data").unwrap_or(&body);
        let flag = flags
            .as_array()
            .and_then(|flags| flags.iter().find(|f| f.get("key").and_then(Value::as_str) == Some(key)));
        match flag {
            Some(flag) => {
                let enabled = flag.get("enabled").is_some_and(is_truthy);
                tracing::info!(key, enabled, "feature flag");
                Ok(Some(enabled))
            }
            None => {
                tracing::warn!(key, "feature flag not found");
                Ok(None)
            }
        }
    }

    /// Extract dotted `keys` from the next JSON response whose URL contains
    /// `endpoint`. Fails when none of the keys are present.
    pub async fn get_keys_from_api_response(
        &self,
        endpoint: &str,
        keys: &[String],
    ) -> StepwrightResult<Map<String, Value>> {
        let event = self
            .page
            .wait_for_response(endpoint, |e| e.url.contains(endpoint))
            .await?;
        let body = event.json().map_err(|e| StepwrightError::ResponseBody {
            url: event.url.clone(),
            message: format!("Failed to parse response: {e}"),
        })?;
        let extracted = extract_keys(&body, keys);
        if extracted.is_empty() {
            return Err(StepwrightError::ResponseBody {
                url: event.url,
                message: "No specified keys found in the response".to_string(),
            });
        }
        Ok(extracted)
    }

    // -------------------------------------------------------------------------
    // Frames
    // -------------------------------------------------------------------------

    /// Frame of the `index`-th iframe matched by `css`, addressed through
    /// `attribute` (usually "name")
    pub async fn frame_by_index(&self, css: &str, index: usize, attribute: &str) -> StepwrightResult<Frame> {
        let iframe = Locator::css(css).nth(index);
        let value = self.page.attribute(&iframe, attribute).await?.unwrap_or_default();
        Ok(Frame::new(format!("iframe[{attribute}=\"{value}\"]")))
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::{EnvKey, Timeouts};
    use crate::driver::Driver;
    use crate::mock::{MockDocument, MockDriver, MockElement};

    fn setup(doc: MockDocument) -> (Arc<MockDriver>, BasePage) {
        let driver = Arc::new(MockDriver::new());
        driver.set_document(doc).unwrap();
        let config = Arc::new(EnvConfig::from_vars([
            ("E2E_BASE_URL", "https://app.test"),
            ("E2E_PORTAL_URL", "https://portal.test"),
        ]));
        let page = Page::new(driver.clone(), Timeouts::fast());
        (driver, BasePage::new(page, config, "/settings"))
    }

    fn form_doc() -> MockDocument {
        let mut doc = MockDocument::new("https://app.test/settings", "Settings");
        let _ = doc.append(None, MockElement::new("input").label("Name").placeholder("Full name"));
        let _ = doc.append(None, MockElement::new("input").label("Nickname").placeholder("Nick"));
        let _ = doc.append(None, MockElement::new("span").attr("id", "token").text("abc-123"));
        let _ = doc.append(None, MockElement::new("button").text("Save"));
        let _ = doc.append(None, MockElement::new("button").text("Save"));
        let section = doc.append(None, MockElement::new("div").class("question").text("Favourite colour?"));
        let _ = doc.append(Some(section), MockElement::new("div").attr("role", "combobox").text("Blue"));
        let _ = doc.append(
            None,
            MockElement::new("iframe").attr("name", "widget").frame_document(
                MockDocument::new("about:srcdoc", "").with(MockElement::new("button").text("Pay")),
            ),
        );
        doc
    }

    mod url_tests {
        use super::*;

        #[test]
        fn test_url_from_base() {
            let (_, base) = setup(MockDocument::default());
            assert_eq!(base.url().unwrap(), "https://app.test/settings");
        }

        #[test]
        fn test_url_with_subdomain_and_set_path() {
            let (_, base) = setup(MockDocument::default());
            let mut base = base.with_subdomain("acme");
            base.set_path("/billing");
            assert_eq!(base.url().unwrap(), "https://acme.portal.test/billing");
        }

        #[test]
        fn test_page_object_defaults() {
            let (_, base) = setup(MockDocument::default());
            assert_eq!(base.name(), "basePage");
            assert_eq!(PageObject::url(&base).unwrap(), base.url().unwrap());
        }

        #[test]
        fn test_missing_env_is_error() {
            let driver = Arc::new(MockDriver::new());
            let config = Arc::new(EnvConfig::default().with_value(EnvKey::Local, "true"));
            let base = BasePage::new(Page::new(driver, Timeouts::fast()), config, "/");
            assert!(base.url().is_err());
        }
    }

    mod interaction_tests {
        use super::*;

        #[tokio::test]
        async fn test_goto_uses_resolved_url() {
            let (driver, base) = setup(MockDocument::default());
            base.goto().await.unwrap();
            assert_eq!(driver.current_url().await.unwrap(), "https://app.test/settings");
        }

        #[tokio::test]
        async fn test_copy_and_paste() {
            let (driver, base) = setup(form_doc());
            base.copy_by_locator("#token").await.unwrap();
            base.paste_by_placeholder("Nick").await.unwrap();
            let value = driver.input_value(&Locator::label("Nickname", true)).await.unwrap();
            assert_eq!(value, "abc-123");
        }

        #[tokio::test]
        async fn test_fill_by_role_textbox_substring() {
            let (driver, base) = setup(form_doc());
            base.fill_by_role_textbox("Nick", "Bo").await.unwrap();
            assert_eq!(
                driver.input_value(&Locator::placeholder("Nick", true)).await.unwrap(),
                "Bo"
            );
        }

        #[tokio::test]
        async fn test_click_by_role_index() {
            let (driver, base) = setup(form_doc());
            base.click_by_role("button", "Save", true, Some(1)).await.unwrap();
            assert!(driver.was_called("Click:getByRole(\"button\", name=\"Save\", exact=true).nth(1)"));
        }

        #[tokio::test]
        async fn test_count_by_text() {
            let (_, base) = setup(form_doc());
            assert_eq!(base.count_by_text("Save").await.unwrap(), 2);
        }

        #[tokio::test]
        async fn test_frame_by_index_and_click() {
            let (driver, base) = setup(form_doc());
            let frame = base.frame_by_index("iframe", 0, "name").await.unwrap();
            assert_eq!(frame.css(), "iframe[name=\"widget\"]");
            base.click_by_role_in_frame(&frame, "button", "pay", None).await.unwrap();
            assert!(driver.was_called("Click:frameLocator"));
        }

        #[tokio::test]
        async fn test_form_selected_options() {
            let (_, base) = setup(form_doc());
            base.assert_form_selected_options(
                "div.question",
                &["Favourite colour?".to_string()],
                &["Blue".to_string()],
            )
            .await
            .unwrap();
            assert!(base
                .assert_form_selected_options("div.question", &["Favourite colour?".to_string()], &[])
                .await
                .is_err());
        }

        #[tokio::test]
        async fn test_text_assertions() {
            let (_, base) = setup(form_doc());
            base.to_have_text_from_selection("#token", "abc-123", None).await.unwrap();
            base.to_contain_text("#token", "abc", None).await.unwrap();
            base.to_have_attribute("#token", "id", "token").await.unwrap();
            base.to_have_value("input", "", Some(1)).await.unwrap();
        }
    }

    mod network_tests {
        use super::*;

        async fn emit_later(driver: Arc<MockDriver>, event: ResponseEvent) {
            tokio::time::sleep(Duration::from_millis(20)).await;
            driver.emit_response(event);
        }

        #[tokio::test]
        async fn test_feature_flag_enabled() {
            let (driver, base) = setup(MockDocument::default());
            let body = r#"{"data":[{"key":"new-nav","enabled":true},{"key":"beta","enabled":0}]}"#;
            let emitter = tokio::spawn(emit_later(driver.clone(), ResponseEvent::new("https://api/flags", 200, body)));
            let enabled = base.check_feature_flag_is_enabled("/flags", "new-nav").await.unwrap();
            emitter.await.unwrap();
            assert_eq!(enabled, Some(true));
        }

        #[tokio::test]
        async fn test_feature_flag_missing_key() {
            let (driver, base) = setup(MockDocument::default());
            let body = r#"[{"key":"beta","enabled":true}]"#;
            let emitter = tokio::spawn(emit_later(driver.clone(), ResponseEvent::new("https://api/flags", 200, body)));
            let enabled = base.check_feature_flag_is_enabled("/flags", "other").await.unwrap();
            emitter.await.unwrap();
            assert_eq!(enabled, None);
        }

        #[tokio::test]
        async fn test_keys_from_response() {
            let (driver, base) = setup(MockDocument::default());
            let body = r#"{"user":{"id":7,"email":"a@b.c"},"token":"t"}"#;
            let emitter = tokio::spawn(emit_later(driver.clone(), ResponseEvent::new("https://api/me", 200, body)));
            let keys = vec!["user.id".to_string(), "token".to_string(), "nope".to_string()];
            let data = base.get_keys_from_api_response("/me", &keys).await.unwrap();
            emitter.await.unwrap();
            assert_eq!(data["user.id"], 7);
            assert_eq!(data["token"], "t");
            assert!(!data.contains_key("nope"));
        }

        #[tokio::test]
        async fn test_keys_missing_is_error() {
            let (driver, base) = setup(MockDocument::default());
            let emitter = tokio::spawn(emit_later(driver.clone(), ResponseEvent::new("https://api/me", 200, "{}")));
            let err = base
                .get_keys_from_api_response("/me", &["id".to_string()])
                .await
                .unwrap_err();
            emitter.await.unwrap();
            assert!(err.to_string().contains("No specified keys found in the response"));
        }

        #[tokio::test]
        async fn test_response_wait_is_bounded() {
            let (_, base) = setup(MockDocument::default());
            let err = base.get_keys_from_api_response("/never", &[]).await.unwrap_err();
            assert!(matches!(err, StepwrightError::Timeout { .. }));
        }
    }
}
