//! Driver - abstract browser automation trait.
//!
//! Page objects never talk to a browser directly. They hold a
//! [`crate::page::Page`] that forwards to an `Arc<dyn Driver>`, so the same
//! step library runs against Chromium (`browser` feature) or the in-memory
//! [`crate::mock::MockDriver`].
//!
//! Element operations act on the first element the locator resolves to at
//! call time. Waiting is the caller's job; a driver reports what is on the
//! page right now.

use crate::config::EnvConfig;
use crate::locator::Locator;
use crate::result::StepwrightResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tokio::sync::broadcast;

/// Capacity of the per-driver response broadcast channel
pub const RESPONSE_CHANNEL_CAPACITY: usize = 256;

/// A network response observed by the browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEvent {
    /// Response URL
    pub url: String,
    /// HTTP status
    pub status: u16,
    /// Response body, empty when unavailable
    pub body: String,
}

impl ResponseEvent {
    /// Create a response event
    #[must_use]
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    /// Parse the body as JSON
    pub fn json(&self) -> StepwrightResult<serde_json::Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Options for clicks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickOptions {
    /// Skip the visibility wait
    pub force: bool,
}

impl ClickOptions {
    /// Forced click
    #[must_use]
    pub const fn forced() -> Self {
        Self { force: true }
    }
}

/// Browser launch configuration
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Executable path override
    pub executable_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            executable_path: None,
            sandbox: true,
        }
    }
}

impl DriverConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive headless mode from the environment snapshot
    #[must_use]
    pub fn from_env(config: &EnvConfig) -> Self {
        Self::default().headless(config.headless())
    }

    /// Set headless mode
    #[must_use]
    pub const fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set executable path
    #[must_use]
    pub fn executable_path(mut self, path: impl Into<String>) -> Self {
        self.executable_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

/// Abstract browser driver.
///
/// One driver instance backs one page (tab group) and is never shared
/// between scenarios.
#[async_trait]
pub trait Driver: Send + Sync + Debug {
    /// Navigate the active tab
    async fn goto(&self, url: &str) -> StepwrightResult<()>;

    /// Go back in history
    async fn go_back(&self) -> StepwrightResult<()>;

    /// Go forward in history
    async fn go_forward(&self) -> StepwrightResult<()>;

    /// Close the active tab
    async fn close(&self) -> StepwrightResult<()>;

    /// Close the tab at `index`
    async fn close_tab(&self, index: usize) -> StepwrightResult<()>;

    /// URL of the active tab
    async fn current_url(&self) -> StepwrightResult<String>;

    /// Document title of the active tab
    async fn title(&self) -> StepwrightResult<String>;

    /// Number of elements the locator resolves to
    async fn count(&self, locator: &Locator) -> StepwrightResult<usize>;

    /// Whether the first match exists and is visible
    async fn is_visible(&self, locator: &Locator) -> StepwrightResult<bool>;

    /// Text content of every match, in document order
    async fn text_contents(&self, locator: &Locator) -> StepwrightResult<Vec<String>>;

    /// Attribute of the first match
    async fn attribute(&self, locator: &Locator, name: &str) -> StepwrightResult<Option<String>>;

    /// Input value of the first match
    async fn input_value(&self, locator: &Locator) -> StepwrightResult<String>;

    /// Click the first match
    async fn click(&self, locator: &Locator, options: ClickOptions) -> StepwrightResult<()>;

    /// Move the pointer over the first match
    async fn hover(&self, locator: &Locator) -> StepwrightResult<()>;

    /// Replace the value of the first match
    async fn fill(&self, locator: &Locator, value: &str) -> StepwrightResult<()>;

    /// Press a key while the first match is focused
    async fn press(&self, locator: &Locator, key: &str) -> StepwrightResult<()>;

    /// Check the first match (checkbox or radio)
    async fn check(&self, locator: &Locator) -> StepwrightResult<()>;

    /// Select an option of the first match by value or label
    async fn select_option(&self, locator: &Locator, option: &str) -> StepwrightResult<()>;

    /// Read the clipboard
    async fn read_clipboard(&self) -> StepwrightResult<String>;

    /// Write the clipboard
    async fn write_clipboard(&self, text: &str) -> StepwrightResult<()>;

    /// Subscribe to responses observed from now on
    fn responses(&self) -> broadcast::Receiver<ResponseEvent>;
}
