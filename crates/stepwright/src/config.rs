//! Environment snapshot, timeout tables and path constants.
//!
//! The environment is read exactly once into an [`EnvConfig`] and shared
//! behind an `Arc` with every page object and data provider. Nothing else in
//! the crate touches `std::env`.

use crate::result::{StepwrightError, StepwrightResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Prefix of environment variables carrying base64 JSON data overrides
pub const DATA_PREFIX: &str = "E2E_DATA_";

/// Directory that fixture data paths are relative to
pub const DATA_DIR: &str = "./src/features";

/// Fallback for [`EnvKey::ApiBaseUrl`]
pub const DEFAULT_API_BASE_URL: &str = "https://reqres.in/api";

/// Named fixture data files, relative to [`DATA_DIR`]
pub const DATA_PATHS: &[(&str, &str)] = &[("USER", "/auth/user.local.json")];

/// Look up the relative data path registered for `name`
#[must_use]
pub fn data_path(name: &str) -> Option<&'static str> {
    DATA_PATHS
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, path)| *path)
}

/// Known page paths
#[derive(Debug, Clone, Copy)]
pub struct PagePath;

impl PagePath {
    /// Site root
    pub const HOME: &'static str = "/";
    /// TodoMVC demo
    pub const TODO: &'static str = "/todomvc";
}

/// Reference API endpoints
#[derive(Debug, Clone, Copy)]
pub struct ApiEndpoint;

impl ApiEndpoint {
    /// User listing and creation
    pub const USERS: &'static str = "/users";
    /// Login
    pub const LOGIN: &'static str = "/login";
    /// Registration
    pub const REGISTER: &'static str = "/register";
}

/// Environment variables understood by the suite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvKey {
    /// Default site base URL
    BaseUrl,
    /// Portal URL that subdomains are prepended to
    PortalUrl,
    /// Subdomain exposed to page objects that opt in
    Subdomain,
    /// `"false"` runs a headed browser
    HeadlessMode,
    /// `"true"` routes subdomain pages to the local URL
    Local,
    /// Local development URL
    LocalUrl,
    /// REST API base URL
    ApiBaseUrl,
}

impl EnvKey {
    /// Every key, in declaration order
    pub const ALL: [Self; 7] = [
        Self::BaseUrl,
        Self::PortalUrl,
        Self::Subdomain,
        Self::HeadlessMode,
        Self::Local,
        Self::LocalUrl,
        Self::ApiBaseUrl,
    ];

    /// Variable name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BaseUrl => "E2E_BASE_URL",
            Self::PortalUrl => "E2E_PORTAL_URL",
            Self::Subdomain => "E2E_SUBDOMAIN",
            Self::HeadlessMode => "HEADLESS_MODE",
            Self::Local => "E2E_LOCAL",
            Self::LocalUrl => "E2E_LOCAL_URL",
            Self::ApiBaseUrl => "API_BASE_URL",
        }
    }
}

/// Named timeouts in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// 500 ms
    XxxShort,
    /// 1 s
    XxShort,
    /// 2 s
    XShort,
    /// 5 s
    Short,
    /// 10 s
    Medium,
    /// 30 s
    Long,
    /// 60 s
    XLong,
}

impl Timeout {
    /// Milliseconds
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        match self {
            Self::XxxShort => 500,
            Self::XxShort => 1000,
            Self::XShort => 2000,
            Self::Short => 5000,
            Self::Medium => 10_000,
            Self::Long => 30_000,
            Self::XLong => 60_000,
        }
    }

    /// As a [`Duration`]
    #[must_use]
    pub const fn duration(self) -> Duration {
        Duration::from_millis(self.as_millis())
    }
}

/// Runtime timeouts applied by the page facade and the runner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Re-poll window for expectations
    pub expect: Duration,
    /// Auto-wait window before a single action
    pub action: Duration,
    /// Navigation timeout
    pub navigation: Duration,
    /// Whole-scenario budget
    pub scenario: Duration,
    /// Poll interval for waits and expectations
    pub poll_interval: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            expect: Duration::from_millis(45_000),
            action: Timeout::Long.duration(),
            navigation: Timeout::XLong.duration(),
            scenario: Duration::from_secs(300),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl Timeouts {
    /// Set the expectation window
    #[must_use]
    pub const fn with_expect(mut self, timeout: Duration) -> Self {
        self.expect = timeout;
        self
    }

    /// Set the action auto-wait window
    #[must_use]
    pub const fn with_action(mut self, timeout: Duration) -> Self {
        self.action = timeout;
        self
    }

    /// Set the navigation timeout
    #[must_use]
    pub const fn with_navigation(mut self, timeout: Duration) -> Self {
        self.navigation = timeout;
        self
    }

    /// Set the per-scenario budget
    #[must_use]
    pub const fn with_scenario(mut self, timeout: Duration) -> Self {
        self.scenario = timeout;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Short timeouts suited to in-memory drivers
    #[must_use]
    pub fn fast() -> Self {
        Self {
            expect: Duration::from_millis(500),
            action: Duration::from_millis(500),
            navigation: Duration::from_millis(500),
            scenario: Duration::from_secs(10),
            poll_interval: Duration::from_millis(10),
        }
    }
}

/// Immutable snapshot of the environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvConfig {
    values: BTreeMap<&'static str, String>,
    data_overrides: BTreeMap<String, String>,
}

impl EnvConfig {
    /// Load `.env` if present, then snapshot the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "ignoring unreadable .env"),
        }
        Self::from_vars(std::env::vars())
    }

    /// Build from explicit key/value pairs. Unknown keys are ignored.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = Self::default();
        for (key, value) in vars {
            let key = key.as_ref();
            if let Some(env_key) = EnvKey::ALL.iter().find(|k| k.as_str() == key) {
                let _ = config.values.insert(env_key.as_str(), value.into());
            } else if let Some(name) = key.strip_prefix(DATA_PREFIX) {
                let _ = config.data_overrides.insert(name.to_string(), value.into());
            }
        }
        config
    }

    /// Raw value, empty when unset
    #[must_use]
    pub fn get(&self, key: EnvKey) -> &str {
        self.values.get(key.as_str()).map_or("", String::as_str)
    }

    /// Default site base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.get(EnvKey::BaseUrl)
    }

    /// Portal URL
    #[must_use]
    pub fn portal_url(&self) -> &str {
        self.get(EnvKey::PortalUrl)
    }

    /// Configured subdomain, if any
    #[must_use]
    pub fn subdomain(&self) -> Option<&str> {
        Some(self.get(EnvKey::Subdomain)).filter(|s| !s.is_empty())
    }

    /// Local URL
    #[must_use]
    pub fn local_url(&self) -> &str {
        self.get(EnvKey::LocalUrl)
    }

    /// Local mode is on only for the literal `"true"`
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.get(EnvKey::Local) == "true"
    }

    /// Headless unless `HEADLESS_MODE=false`
    #[must_use]
    pub fn headless(&self) -> bool {
        self.get(EnvKey::HeadlessMode) != "false"
    }

    /// REST API base URL with the reference API as fallback
    #[must_use]
    pub fn api_base_url(&self) -> &str {
        let value = self.get(EnvKey::ApiBaseUrl);
        if value.is_empty() {
            DEFAULT_API_BASE_URL
        } else {
            value
        }
    }

    /// Raw `E2E_DATA_<NAME>` value, if the variable was present
    #[must_use]
    pub fn data_override(&self, name: &str) -> Option<&str> {
        self.data_overrides.get(name).map(String::as_str)
    }

    /// Return a copy with one key replaced
    #[must_use]
    pub fn with_value(mut self, key: EnvKey, value: impl Into<String>) -> Self {
        let _ = self.values.insert(key.as_str(), value.into());
        self
    }

    /// Resolve `path` to an absolute URL.
    ///
    /// With a subdomain, local mode resolves against the local URL and
    /// ignores the subdomain; otherwise the subdomain is prepended to the
    /// portal host. Without a subdomain the base URL is used.
    pub fn resolve_url(&self, path: &str, subdomain: Option<&str>) -> StepwrightResult<String> {
        let base = match subdomain.filter(|s| !s.is_empty()) {
            Some(_) if self.is_local() => required(EnvKey::LocalUrl, self.local_url())?.to_string(),
            Some(sub) => {
                let portal = required(EnvKey::PortalUrl, self.portal_url())?;
                append_subdomain(sub, portal)?
            }
            None => required(EnvKey::BaseUrl, self.base_url())?.to_string(),
        };
        join_url(&base, path)
    }
}

fn required(key: EnvKey, value: &str) -> StepwrightResult<&str> {
    if value.trim().is_empty() {
        Err(StepwrightError::MissingEnv {
            key: key.as_str().to_string(),
        })
    } else {
        Ok(value)
    }
}

fn parse_url(url: &str) -> StepwrightResult<Url> {
    Url::parse(url).map_err(|e| StepwrightError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Resolve `path` against `base` with WHATWG URL semantics
pub fn join_url(base: &str, path: &str) -> StepwrightResult<String> {
    parse_url(base)?
        .join(path)
        .map(String::from)
        .map_err(|e| StepwrightError::InvalidUrl {
            url: format!("{base} + {path}"),
            message: e.to_string(),
        })
}

/// Prefix the host of `url` with `subdomain`
pub fn append_subdomain(subdomain: &str, url: &str) -> StepwrightResult<String> {
    let mut parsed = parse_url(url)?;
    let host = parsed.host_str().unwrap_or_default().to_string();
    parsed
        .set_host(Some(&format!("{subdomain}.{host}")))
        .map_err(|e| StepwrightError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;
    Ok(parsed.into())
}

/// Join a data path from [`DATA_PATHS`] onto a data directory.
///
/// Registered paths start with `/` but are relative to `dir`.
#[must_use]
pub fn data_file(dir: &Path, relative: &str) -> PathBuf {
    dir.join(relative.trim_start_matches('/'))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> EnvConfig {
        EnvConfig::from_vars(pairs.iter().copied())
    }

    mod env_config_tests {
        use super::*;

        #[test]
        fn test_missing_keys_read_empty() {
            let config = env(&[]);
            assert_eq!(config.base_url(), "");
            assert!(config.subdomain().is_none());
            assert!(!config.is_local());
            assert!(config.headless());
        }

        #[test]
        fn test_local_flag_is_literal_true() {
            assert!(env(&[("E2E_LOCAL", "true")]).is_local());
            assert!(!env(&[("E2E_LOCAL", "TRUE")]).is_local());
            assert!(!env(&[("E2E_LOCAL", "1")]).is_local());
        }

        #[test]
        fn test_headless_false() {
            assert!(!env(&[("HEADLESS_MODE", "false")]).headless());
        }

        #[test]
        fn test_api_base_url_fallback() {
            assert_eq!(env(&[]).api_base_url(), DEFAULT_API_BASE_URL);
            assert_eq!(
                env(&[("API_BASE_URL", "http://localhost:9000")]).api_base_url(),
                "http://localhost:9000"
            );
        }

        #[test]
        fn test_data_overrides_captured() {
            let config = env(&[("E2E_DATA_USER", "e30="), ("UNRELATED", "x")]);
            assert_eq!(config.data_override("USER"), Some("e30="));
            assert_eq!(config.data_override("UNRELATED"), None);
        }
    }

    mod resolve_url_tests {
        use super::*;

        fn full() -> EnvConfig {
            env(&[
                ("E2E_BASE_URL", "https://demo.playwright.dev"),
                ("E2E_PORTAL_URL", "https://portal.example.com"),
                ("E2E_LOCAL_URL", "http://localhost:3000"),
            ])
        }

        #[test]
        fn test_base_url_without_subdomain() {
            let url = full().resolve_url("/todomvc", None).unwrap();
            assert_eq!(url, "https://demo.playwright.dev/todomvc");
        }

        #[test]
        fn test_subdomain_prepended_to_portal() {
            let url = full().resolve_url("/login", Some("acme")).unwrap();
            assert_eq!(url, "https://acme.portal.example.com/login");
        }

        #[test]
        fn test_local_mode_ignores_subdomain() {
            let config = full().with_value(EnvKey::Local, "true");
            let url = config.resolve_url("/login", Some("acme")).unwrap();
            assert_eq!(url, "http://localhost:3000/login");
        }

        #[test]
        fn test_local_mode_without_subdomain_uses_base() {
            let config = full().with_value(EnvKey::Local, "true");
            let url = config.resolve_url("/todomvc", None).unwrap();
            assert_eq!(url, "https://demo.playwright.dev/todomvc");
        }

        #[test]
        fn test_empty_subdomain_treated_as_none() {
            let url = full().resolve_url("/", Some("")).unwrap();
            assert_eq!(url, "https://demo.playwright.dev/");
        }

        #[test]
        fn test_resolution_is_deterministic() {
            let config = full();
            let a = config.resolve_url("/x", Some("t")).unwrap();
            let b = config.resolve_url("/x", Some("t")).unwrap();
            assert_eq!(a, b);
        }

        #[test]
        fn test_missing_base_is_error() {
            let err = env(&[]).resolve_url("/todomvc", None).unwrap_err();
            assert!(matches!(err, StepwrightError::MissingEnv { ref key } if key == "E2E_BASE_URL"));
        }

        #[test]
        fn test_invalid_base_is_error() {
            let err = env(&[("E2E_BASE_URL", "not a url")])
                .resolve_url("/", None)
                .unwrap_err();
            assert!(matches!(err, StepwrightError::InvalidUrl { .. }));
        }
    }

    mod table_tests {
        use super::*;

        #[test]
        fn test_timeout_table() {
            assert_eq!(Timeout::XxxShort.as_millis(), 500);
            assert_eq!(Timeout::Short.as_millis(), 5000);
            assert_eq!(Timeout::XLong.duration(), Duration::from_secs(60));
        }

        #[test]
        fn test_data_path_lookup() {
            assert_eq!(data_path("USER"), Some("/auth/user.local.json"));
            assert_eq!(data_path("NOPE"), None);
        }

        #[test]
        fn test_data_file_strips_leading_slash() {
            let path = data_file(Path::new("./src/features"), "/auth/user.local.json");
            assert_eq!(path, Path::new("./src/features/auth/user.local.json"));
        }

        #[test]
        fn test_timeouts_builder() {
            let t = Timeouts::default().with_expect(Duration::from_secs(1));
            assert_eq!(t.expect, Duration::from_secs(1));
            assert_eq!(t.action, Duration::from_secs(30));
        }
    }
}
