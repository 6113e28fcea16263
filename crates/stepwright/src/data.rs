//! Test data loading.
//!
//! Named data sets come from `E2E_DATA_<NAME>` (base64 JSON) when that
//! variable is set and non-blank, otherwise from a JSON file registered in
//! [`crate::config::DATA_PATHS`]. Secrets and shared scenario values live in
//! `src/secrets.json` and `src/common.json` under the project root.

use crate::config::{data_file, data_path, EnvConfig, DATA_DIR, DATA_PREFIX};
use crate::helpers::get_nested_value;
use crate::result::{StepwrightError, StepwrightResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Loads named data sets relative to a data directory
#[derive(Debug, Clone)]
pub struct DataLoader {
    dir: PathBuf,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new(DATA_DIR)
    }
}

impl DataLoader {
    /// Loader rooted at `dir`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Data directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load the data set registered as `name`
    pub fn load(&self, name: &str, config: &EnvConfig) -> StepwrightResult<Value> {
        let relative = data_path(name).ok_or_else(|| StepwrightError::UnknownDataName {
            name: name.to_string(),
        })?;

        if let Some(encoded) = config.data_override(name).map(str::trim).filter(|s| !s.is_empty()) {
            tracing::debug!(name, var = %format!("{DATA_PREFIX}{name}"), "loading data from environment");
            let bytes = STANDARD.decode(encoded).map_err(|e| StepwrightError::DataLoad {
                name: name.to_string(),
                message: format!("invalid base64: {e}"),
            })?;
            return serde_json::from_slice(&bytes).map_err(|e| StepwrightError::DataLoad {
                name: name.to_string(),
                message: format!("invalid JSON: {e}"),
            });
        }

        let path = data_file(&self.dir, relative);
        tracing::debug!(name, path = %path.display(), "loading data file");
        let content = std::fs::read_to_string(&path).map_err(|e| StepwrightError::DataLoad {
            name: name.to_string(),
            message: format!("{}: {e}", path.display()),
        })?;
        serde_json::from_str(&content).map_err(|e| StepwrightError::DataLoad {
            name: name.to_string(),
            message: format!("{}: {e}", path.display()),
        })
    }
}

/// Load a named data set from the default data directory
pub fn load_data(name: &str, config: &EnvConfig) -> StepwrightResult<Value> {
    DataLoader::default().load(name, config)
}

/// Look up a lodash-style key path (`a.b[0].c`)
#[must_use]
pub fn get_by_key<'v>(data: &'v Value, key: &str) -> Option<&'v Value> {
    get_nested_value(data, key)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> StepwrightResult<T> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

// =============================================================================
// SECRETS
// =============================================================================

/// Credentials of one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginInfo {
    /// Login email
    pub email: String,
    /// Password
    pub password: String,
}

/// Contents of `src/secrets.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretsData {
    pub admin: LoginInfo,
    pub admin_institution: LoginInfo,
    pub reviewer: LoginInfo,
    pub user: LoginInfo,
    pub common_password: String,
}

/// Account roles present in the secrets file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserRole {
    Admin,
    AdminInstitution,
    Reviewer,
    User,
}

impl SecretsData {
    /// Credentials for `role`
    #[must_use]
    pub const fn login(&self, role: UserRole) -> &LoginInfo {
        match role {
            UserRole::Admin => &self.admin,
            UserRole::AdminInstitution => &self.admin_institution,
            UserRole::Reviewer => &self.reviewer,
            UserRole::User => &self.user,
        }
    }
}

/// Secure account data
#[derive(Debug, Clone)]
pub struct SecretsDataProvider {
    pub secrets_data: SecretsData,
}

impl SecretsDataProvider {
    /// Read `<root>/src/secrets.json`
    pub fn load(root: &Path) -> StepwrightResult<Self> {
        let path = root.join("src").join("secrets.json");
        tracing::debug!(path = %path.display(), "loading secrets");
        Ok(Self {
            secrets_data: read_json(&path)?,
        })
    }
}

// =============================================================================
// COMMON DATA
// =============================================================================

/// Values shared between the steps of a scenario
#[derive(Debug, Clone, Default)]
pub struct CommonDataProvider {
    pub common_data: Value,
}

impl CommonDataProvider {
    /// Read `<root>/src/common.json`
    pub fn load(root: &Path) -> StepwrightResult<Self> {
        let path = root.join("src").join("common.json");
        tracing::debug!(path = %path.display(), "loading common data");
        Ok(Self {
            common_data: read_json(&path)?,
        })
    }

    /// Provider over an in-memory record
    #[must_use]
    pub const fn from_value(common_data: Value) -> Self {
        Self { common_data }
    }

    /// Value at a key path
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        get_by_key(&self.common_data, key)
    }

    /// Value at a key path rendered as text; strings are returned unquoted
    #[must_use]
    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Store a top-level value for later steps
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        if !self.common_data.is_object() {
            self.common_data = Value::Object(serde_json::Map::new());
        }
        if let Value::Object(map) = &mut self.common_data {
            let _ = map.insert(key.into(), value.into());
        }
    }
}
