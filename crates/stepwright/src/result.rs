//! Result and error types for Stepwright.

use thiserror::Error;

/// Result type for Stepwright operations
pub type StepwrightResult<T> = Result<T, StepwrightError>;

/// Errors that can occur while resolving, loading or executing steps
#[derive(Debug, Error)]
pub enum StepwrightError {
    /// Required environment variable is unset or empty
    #[error("Missing environment variable {key}")]
    MissingEnv {
        /// Variable name
        key: String,
    },

    /// A URL could not be parsed or joined
    #[error("Invalid URL {url}: {message}")]
    InvalidUrl {
        /// Offending URL
        url: String,
        /// Error message
        message: String,
    },

    /// Fixture name not present in the data path table
    #[error("Unknown test data name: {name}")]
    UnknownDataName {
        /// Requested name
        name: String,
    },

    /// Fixture data exists but could not be decoded
    #[error("Failed to load test data {name}: {message}")]
    DataLoad {
        /// Data name
        name: String,
        /// Error message
        message: String,
    },

    /// Page-object key not registered in the fixture context
    #[error("No page object found for fixture key: {name}.\nAvailable: {}", available.join(", "))]
    PageNotFound {
        /// Requested key
        name: String,
        /// Every valid key
        available: Vec<String>,
    },

    /// No registered expression matches the step text
    #[error("Undefined step: {text}")]
    UndefinedStep {
        /// Step text
        text: String,
    },

    /// More than one registered expression matches the step text
    #[error("Ambiguous step: {text} matches {}", patterns.join(" | "))]
    AmbiguousStep {
        /// Step text
        text: String,
        /// Matching expressions in registration order
        patterns: Vec<String>,
    },

    /// The same expression was registered twice
    #[error("Duplicate step definition: {pattern}")]
    DuplicateStep {
        /// Expression source
        pattern: String,
    },

    /// Step expression could not be compiled
    #[error("Invalid step expression {expression}: {message}")]
    InvalidExpression {
        /// Expression source
        expression: String,
        /// Error message
        message: String,
    },

    /// A step argument has the wrong type or is missing
    #[error("Step argument {index}: {message}")]
    StepArgument {
        /// Zero-based argument position
        index: usize,
        /// Error message
        message: String,
    },

    /// Locator never resolved to an element
    #[error("Element not found: {locator}")]
    ElementNotFound {
        /// Human-readable locator
        locator: String,
    },

    /// Operation timed out
    #[error("Timed out after {ms}ms waiting for {waited_for}")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
        /// What was awaited
        waited_for: String,
    },

    /// Assertion failed
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// Browser driver error
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be interpreted
    #[error("Unexpected response from {url}: {message}")]
    ResponseBody {
        /// Request URL
        url: String,
        /// Error message
        message: String,
    },

    /// Scenario requested to be skipped
    #[error("Skipped: {reason}")]
    Skipped {
        /// Why the scenario was skipped
        reason: String,
    },

    /// Feature file could not be parsed
    #[error("Failed to parse feature {path}: {message}")]
    FeatureParse {
        /// Feature path
        path: String,
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Base64 error
    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl StepwrightError {
    /// Build an assertion failure
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Build a driver failure
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Build a skip signal
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    /// Whether this error asks the runner to skip rather than fail
    #[must_use]
    pub const fn is_skip(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}
