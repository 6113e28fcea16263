//! Per-scenario fixtures.
//!
//! Every scenario gets its own [`FixtureContext`] (the step "world"): a fresh
//! page, the page objects built on it, lazily loaded data providers and an
//! API client. Worlds are produced and disposed of by a [`WorldFactory`].

use crate::api::{ApiClient, ApiResponse};
use crate::config::{EnvConfig, Timeouts};
use crate::data::{CommonDataProvider, SecretsDataProvider};
use crate::driver::Driver;
use crate::mock::MockDriver;
use crate::page::Page;
use crate::page_object::{BasePage, PageObject};
use crate::pages::TodoPage;
use crate::result::{StepwrightError, StepwrightResult};
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

// =============================================================================
// PAGE FIXTURES
// =============================================================================

/// Page objects reachable by fixture key
#[derive(Debug, Clone)]
pub struct PageFixtures {
    base_page: BasePage,
    todo_page: TodoPage,
}

impl PageFixtures {
    /// Every valid key, in declaration order
    pub const KEYS: [&'static str; 2] = ["basePage", "todoPage"];

    /// Build every page object on `page`
    #[must_use]
    pub fn new(page: Page, config: Arc<EnvConfig>) -> Self {
        Self {
            base_page: BasePage::new(page.clone(), config.clone(), ""),
            todo_page: TodoPage::new(page, config),
        }
    }

    /// Page object registered as `name`
    pub fn get(&self, name: &str) -> StepwrightResult<&dyn PageObject> {
        match name {
            "basePage" => Ok(&self.base_page),
            "todoPage" => Ok(&self.todo_page),
            _ => Err(StepwrightError::PageNotFound {
                name: name.to_string(),
                available: Self::KEYS.iter().map(ToString::to_string).collect(),
            }),
        }
    }

    #[must_use]
    pub const fn base_page(&self) -> &BasePage {
        &self.base_page
    }

    #[must_use]
    pub const fn todo_page(&self) -> &TodoPage {
        &self.todo_page
    }
}

// =============================================================================
// API FIXTURE
// =============================================================================

/// API client plus the last response, for API steps
#[derive(Debug, Clone)]
pub struct ApiFixture {
    pub client: ApiClient,
    last_response: Option<ApiResponse>,
}

impl ApiFixture {
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self {
            client,
            last_response: None,
        }
    }

    /// Remember a response for later assertions
    pub fn record(&mut self, response: ApiResponse) -> &ApiResponse {
        self.last_response.insert(response)
    }

    /// Most recent response
    pub fn last_response(&self) -> StepwrightResult<&ApiResponse> {
        self.last_response
            .as_ref()
            .ok_or_else(|| StepwrightError::assertion("no API request has been sent in this scenario"))
    }
}

// =============================================================================
// WORLD
// =============================================================================

/// Everything a step handler can reach
#[derive(Debug)]
pub struct FixtureContext {
    config: Arc<EnvConfig>,
    page: Page,
    pages: PageFixtures,
    project_root: PathBuf,
    secrets: Option<SecretsDataProvider>,
    common: Option<CommonDataProvider>,
    api: Option<ApiFixture>,
}

impl FixtureContext {
    /// World over `page`, with data files read relative to the working directory
    #[must_use]
    pub fn new(page: Page, config: Arc<EnvConfig>) -> Self {
        Self {
            pages: PageFixtures::new(page.clone(), config.clone()),
            config,
            page,
            project_root: PathBuf::from("."),
            secrets: None,
            common: None,
            api: None,
        }
    }

    /// Read `src/secrets.json` and `src/common.json` under `root`
    #[must_use]
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = root.into();
        self
    }

    /// Preload the shared data record
    #[must_use]
    pub fn with_common_data(mut self, common: CommonDataProvider) -> Self {
        self.common = Some(common);
        self
    }

    /// Use a specific API client
    #[must_use]
    pub fn with_api_client(mut self, client: ApiClient) -> Self {
        self.api = Some(ApiFixture::new(client));
        self
    }

    #[must_use]
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    #[must_use]
    pub const fn page(&self) -> &Page {
        &self.page
    }

    #[must_use]
    pub const fn pages(&self) -> &PageFixtures {
        &self.pages
    }

    #[must_use]
    pub const fn base_page(&self) -> &BasePage {
        self.pages.base_page()
    }

    #[must_use]
    pub const fn todo_page(&self) -> &TodoPage {
        self.pages.todo_page()
    }

    /// Page object by fixture key
    pub fn page_object(&self, name: &str) -> StepwrightResult<&dyn PageObject> {
        self.pages.get(name)
    }

    /// Secrets, loaded on first use
    pub fn secrets(&mut self) -> StepwrightResult<&SecretsDataProvider> {
        if self.secrets.is_none() {
            self.secrets = Some(SecretsDataProvider::load(&self.project_root)?);
        }
        self.secrets
            .as_ref()
            .ok_or_else(|| StepwrightError::driver("secrets provider unavailable"))
    }

    /// Shared scenario data, loaded on first use
    pub fn common_data(&mut self) -> StepwrightResult<&mut CommonDataProvider> {
        if self.common.is_none() {
            self.common = Some(CommonDataProvider::load(&self.project_root)?);
        }
        self.common
            .as_mut()
            .ok_or_else(|| StepwrightError::driver("common data provider unavailable"))
    }

    /// Value at `key` in the shared data, or `key` itself when absent
    pub fn data_or_literal(&mut self, key: &str) -> StepwrightResult<String> {
        Ok(self.common_data()?.text(key).unwrap_or_else(|| key.to_string()))
    }

    /// Replace the API fixture with a fresh one over `client`
    pub fn set_api_client(&mut self, client: ApiClient) -> &mut ApiFixture {
        self.api.insert(ApiFixture::new(client))
    }

    /// API fixture, created on first use against [`EnvConfig::api_base_url`]
    pub fn api(&mut self) -> StepwrightResult<&mut ApiFixture> {
        if self.api.is_none() {
            let client = ApiClient::new(self.config.api_base_url())?;
            self.api = Some(ApiFixture::new(client));
        }
        self.api
            .as_mut()
            .ok_or_else(|| StepwrightError::driver("api fixture unavailable"))
    }
}

// =============================================================================
// FACTORIES
// =============================================================================

/// Creates one world per scenario and disposes of it afterwards
#[async_trait]
pub trait WorldFactory: Send + Sync + 'static {
    /// World type handed to step handlers
    type World: Send + 'static;

    /// Build a fresh world
    async fn create(&self) -> StepwrightResult<Self::World>;

    /// Release a world after its scenario
    async fn teardown(&self, world: Self::World) -> StepwrightResult<()> {
        drop(world);
        Ok(())
    }
}

/// Source of one isolated driver (tab group) per scenario
#[async_trait]
pub trait DriverSource: Send + Sync + fmt::Debug {
    async fn open(&self) -> StepwrightResult<Arc<dyn Driver>>;
}

/// Builds a [`MockDriver`] per scenario
pub struct MockDriverSource {
    build: Box<dyn Fn() -> MockDriver + Send + Sync>,
}

impl fmt::Debug for MockDriverSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockDriverSource").finish_non_exhaustive()
    }
}

impl MockDriverSource {
    #[must_use]
    pub fn new(build: impl Fn() -> MockDriver + Send + Sync + 'static) -> Self {
        Self {
            build: Box::new(build),
        }
    }
}

#[async_trait]
impl DriverSource for MockDriverSource {
    async fn open(&self) -> StepwrightResult<Arc<dyn Driver>> {
        Ok(Arc::new((self.build)()))
    }
}

/// Opens a fresh page per scenario and wraps it in a [`FixtureContext`]
#[derive(Debug, Clone)]
pub struct BrowserWorldFactory {
    source: Arc<dyn DriverSource>,
    config: Arc<EnvConfig>,
    timeouts: Timeouts,
    project_root: PathBuf,
}

impl BrowserWorldFactory {
    #[must_use]
    pub fn new(source: Arc<dyn DriverSource>, config: Arc<EnvConfig>) -> Self {
        Self {
            source,
            config,
            timeouts: Timeouts::default(),
            project_root: PathBuf::from("."),
        }
    }

    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    #[must_use]
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = root.into();
        self
    }

    #[must_use]
    pub const fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }
}

#[async_trait]
impl WorldFactory for BrowserWorldFactory {
    type World = FixtureContext;

    async fn create(&self) -> StepwrightResult<FixtureContext> {
        let driver = self.source.open().await?;
        let page = Page::new(driver, self.timeouts);
        Ok(FixtureContext::new(page, self.config.clone()).with_project_root(self.project_root.clone()))
    }

    async fn teardown(&self, world: FixtureContext) -> StepwrightResult<()> {
        if let Err(e) = world.page().driver().close().await {
            tracing::debug!(error = %e, "page already closed");
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn config() -> Arc<EnvConfig> {
        Arc::new(EnvConfig::from_vars([("E2E_BASE_URL", "https://demo.test")]))
    }

    fn world() -> FixtureContext {
        let page = Page::new(Arc::new(MockDriver::new()), Timeouts::fast());
        FixtureContext::new(page, config())
    }

    mod page_fixture_tests {
        use super::*;

        #[test]
        fn test_known_keys() {
            let w = world();
            assert_eq!(w.page_object("basePage").unwrap().name(), "basePage");
            assert_eq!(w.page_object("todoPage").unwrap().name(), "todoPage");
            assert_eq!(
                w.page_object("todoPage").unwrap().url().unwrap(),
                "https://demo.test/todomvc"
            );
            assert_eq!(w.page_object("basePage").unwrap().url().unwrap(), "https://demo.test/");
        }

        #[test]
        fn test_unknown_key_lists_available() {
            let w = world();
            let err = w.page_object("loginPage").err().unwrap();
            let message = err.to_string();
            assert!(message.contains("loginPage"));
            assert!(message.contains("basePage"));
            assert!(message.contains("todoPage"));
        }

        #[test]
        fn test_lookup_is_case_sensitive() {
            assert!(world().page_object("TodoPage").is_err());
        }
    }

    mod provider_tests {
        use super::*;

        #[test]
        fn test_lazy_common_data() {
            let root = TempDir::new().unwrap();
            fs::create_dir_all(root.path().join("src")).unwrap();
            fs::write(root.path().join("src/common.json"), r#"{"todoItem":"Buy milk"}"#).unwrap();
            let mut w = world().with_project_root(root.path());
            assert_eq!(w.data_or_literal("todoItem").unwrap(), "Buy milk");
            assert_eq!(w.data_or_literal("literal text").unwrap(), "literal text");
        }

        #[test]
        fn test_missing_secrets_fail_only_on_use() {
            let root = TempDir::new().unwrap();
            let mut w = world().with_project_root(root.path());
            assert!(w.page_object("todoPage").is_ok());
            assert!(w.secrets().is_err());
        }

        #[test]
        fn test_preloaded_common_data() {
            let mut w = world().with_common_data(CommonDataProvider::from_value(json!({"a": {"b": 1}})));
            assert_eq!(w.data_or_literal("a.b").unwrap(), "1");
        }

        #[test]
        fn test_api_fixture_defaults() {
            let mut w = world();
            let api = w.api().unwrap();
            assert_eq!(api.client.base_url(), "https://reqres.in/api");
            assert!(api.last_response().is_err());
        }
    }

    mod api_fixture_tests {
        use super::*;

        #[test]
        fn test_api_defaults_to_configured_base_url() {
            let mut w = world();
            let expected = w.config().api_base_url().trim_end_matches('/').to_string();
            assert_eq!(w.api().unwrap().client.base_url(), expected);
        }

        #[test]
        fn test_set_api_client_replaces_fixture() {
            let mut w = world();
            let _ = w.set_api_client(ApiClient::new("http://127.0.0.1:9/api").unwrap());
            assert_eq!(w.api().unwrap().client.base_url(), "http://127.0.0.1:9/api");
            assert!(w.api().unwrap().last_response().is_err());
        }
    }

    mod factory_tests {
        use super::*;

        #[tokio::test]
        async fn test_each_world_gets_its_own_driver() {
            let source = Arc::new(MockDriverSource::new(MockDriver::new));
            let factory = BrowserWorldFactory::new(source, config()).with_timeouts(Timeouts::fast());
            let a = factory.create().await.unwrap();
            let b = factory.create().await.unwrap();
            a.todo_page().base().goto().await.unwrap();
            assert_eq!(a.page().url().await.unwrap(), "https://demo.test/todomvc");
            assert_eq!(b.page().url().await.unwrap(), "about:blank");
            factory.teardown(a).await.unwrap();
            factory.teardown(b).await.unwrap();
        }
    }
}
