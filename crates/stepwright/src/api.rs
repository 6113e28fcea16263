//! REST API client and response validation for API scenarios.

use crate::result::{StepwrightError, StepwrightResult};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Request timeout
pub const API_TIMEOUT: Duration = Duration::from_secs(30);

/// A completed HTTP exchange. Non-2xx statuses are returned, not raised.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// Final request URL
    pub url: String,
    /// HTTP status code
    pub status: u16,
    /// Response headers (lowercase names)
    pub headers: BTreeMap<String, String>,
    /// JSON body; non-JSON bodies are kept as a string, empty bodies as null
    pub body: Value,
}

impl ApiResponse {
    /// Whether the status is 2xx
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Fail on non-2xx statuses
    pub fn error_for_status(self) -> StepwrightResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(StepwrightError::ResponseBody {
                url: self.url.clone(),
                message: format!("HTTP {}: {}", self.status, self.body),
            })
        }
    }

    /// Field at a key path of the body
    #[must_use]
    pub fn field(&self, path: &str) -> Option<&Value> {
        crate::helpers::get_nested_value(&self.body, path)
    }
}

/// JSON HTTP client with a fixed base URL
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
    headers: HeaderMap,
}

impl ApiClient {
    /// Create a client for `base_url`
    pub fn new(base_url: impl Into<String>) -> StepwrightResult<Self> {
        let client = reqwest::Client::builder().timeout(API_TIMEOUT).build()?;
        Ok(Self::with_client(base_url, client))
    }

    /// Create a client with a custom reqwest client
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            headers,
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send `Authorization: Bearer <token>` from now on
    pub fn set_auth_token(&mut self, token: &str) -> StepwrightResult<()> {
        self.set_header(AUTHORIZATION.as_str(), &format!("Bearer {token}"))
    }

    /// Stop sending the authorization header
    pub fn clear_auth_token(&mut self) {
        let _ = self.headers.remove(AUTHORIZATION);
    }

    /// Send a custom header from now on
    pub fn set_header(&mut self, key: &str, value: &str) -> StepwrightResult<()> {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| StepwrightError::StepArgument { index: 0, message: format!("header name {key:?}: {e}") })?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| StepwrightError::StepArgument { index: 1, message: format!("header value: {e}") })?;
        let _ = self.headers.insert(name, value);
        Ok(())
    }

    /// Headers sent with every request
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    /// GET request
    pub async fn get(&self, path: &str) -> StepwrightResult<ApiResponse> {
        self.request(Method::GET, path, None).await
    }

    /// POST request
    pub async fn post(&self, path: &str, body: &Value) -> StepwrightResult<ApiResponse> {
        self.request(Method::POST, path, Some(body)).await
    }

    /// PUT request
    pub async fn put(&self, path: &str, body: &Value) -> StepwrightResult<ApiResponse> {
        self.request(Method::PUT, path, Some(body)).await
    }

    /// PATCH request
    pub async fn patch(&self, path: &str, body: &Value) -> StepwrightResult<ApiResponse> {
        self.request(Method::PATCH, path, Some(body)).await
    }

    /// DELETE request
    pub async fn delete(&self, path: &str) -> StepwrightResult<ApiResponse> {
        self.request(Method::DELETE, path, None).await
    }

    /// Send a request and collect the response
    pub async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> StepwrightResult<ApiResponse> {
        let url = self.url(path);
        tracing::info!(%method, %url, "api request");
        let start = Instant::now();

        let mut request = self.client.request(method.clone(), &url).headers(self.headers.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        let resp = request.send().await.map_err(|e| {
            tracing::error!(%method, %url, error = %e, "api request failed");
            e
        })?;

        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let text = resp.text().await?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        tracing::info!(status, url = %final_url, elapsed_ms = start.elapsed().as_millis() as u64, "api response");

        Ok(ApiResponse {
            url: final_url,
            status,
            headers,
            body,
        })
    }
}

/// Convert HTTP 429 into a skip signal
pub fn skip_if_rate_limited(response: &ApiResponse) -> StepwrightResult<()> {
    if response.status == 429 {
        tracing::warn!(url = %response.url, "rate limited, skipping");
        return Err(StepwrightError::skipped(format!(
            "rate limited (429) by {}",
            response.url
        )));
    }
    Ok(())
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Response shape checks
#[derive(Debug, Clone, Copy)]
pub struct ApiValidator;

impl ApiValidator {
    /// Status must equal `expected`
    pub fn validate_status(response: &ApiResponse, expected: u16) -> StepwrightResult<()> {
        if response.status == expected {
            Ok(())
        } else {
            Err(StepwrightError::assertion(format!(
                "Expected status {expected}, but got {}",
                response.status
            )))
        }
    }

    /// Every field must be present on the object
    pub fn validate_required_fields(data: &Value, fields: &[&str]) -> StepwrightResult<()> {
        let missing: Vec<&str> = fields
            .iter()
            .copied()
            .filter(|f| data.get(f).is_none())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(StepwrightError::assertion(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )))
        }
    }

    /// Each field must exist with the given JavaScript type name
    /// (`string`, `number`, `boolean`, `object`)
    pub fn validate_schema(data: &Value, schema: &[(&str, &str)]) -> StepwrightResult<()> {
        for (key, expected) in schema {
            let value = data
                .get(key)
                .ok_or_else(|| StepwrightError::assertion(format!("Missing field: {key}")))?;
            let actual = type_name(value);
            if actual != *expected {
                return Err(StepwrightError::assertion(format!(
                    "Field {key} has type {actual}, expected {expected}"
                )));
            }
        }
        Ok(())
    }

    /// Value must be an array of at least `min_len` items
    pub fn validate_array_response(data: &Value, min_len: usize) -> StepwrightResult<()> {
        let items = data
            .as_array()
            .ok_or_else(|| StepwrightError::assertion("Response is not an array"))?;
        if items.len() < min_len {
            return Err(StepwrightError::assertion(format!(
                "Array length {} is less than minimum {min_len}",
                items.len()
            )));
        }
        Ok(())
    }
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Null | Value::Array(_) | Value::Object(_) => "object",
    }
}

// =============================================================================
// REQUEST BODIES
// =============================================================================

/// Request body builders
#[derive(Debug, Clone, Copy)]
pub struct ApiDataBuilder;

impl ApiDataBuilder {
    /// User payload; fields in `overrides` replace the defaults
    #[must_use]
    pub fn build_user(overrides: Value) -> Value {
        merge(
            json!({"name": "Test User", "job": "QA Engineer", "email": "test@example.com"}),
            overrides,
        )
    }

    /// Login payload; fields in `overrides` replace the defaults
    #[must_use]
    pub fn build_credentials(overrides: Value) -> Value {
        merge(
            json!({"email": "test@example.com", "password": "password123"}),
            overrides,
        )
    }

    /// Random lowercase alphanumeric string
    #[must_use]
    pub fn random_string(len: usize) -> String {
        let mut out = String::with_capacity(len);
        while out.len() < len {
            out.push_str(&uuid::Uuid::new_v4().simple().to_string());
        }
        out.truncate(len);
        out
    }

    /// Unique `test_<random>@example.com`
    #[must_use]
    pub fn random_email() -> String {
        format!("test_{}@example.com", Self::random_string(10))
    }
}

fn merge(mut base: Value, overrides: Value) -> Value {
    if let (Value::Object(base_map), Value::Object(extra)) = (&mut base, overrides) {
        base_map.extend(extra);
    }
    base
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn response(status: u16, body: Value) -> ApiResponse {
        ApiResponse {
            url: "https://reqres.in/api/users".to_string(),
            status,
            headers: BTreeMap::new(),
            body,
        }
    }

    mod client_tests {
        use super::*;

        #[test]
        fn test_client_strips_trailing_slash() {
            let client = ApiClient::new("https://reqres.in/api/").unwrap();
            assert_eq!(client.base_url(), "https://reqres.in/api");
            assert_eq!(client.url("/users?page=2"), "https://reqres.in/api/users?page=2");
            assert_eq!(client.url("http://other/x"), "http://other/x");
        }

        #[test]
        fn test_path_joins_with_one_slash() {
            let client = ApiClient::new("https://reqres.in/api").unwrap();
            assert_eq!(client.url("users?page=2"), "https://reqres.in/api/users?page=2");
            assert_eq!(client.url("/users?page=2"), "https://reqres.in/api/users?page=2");
            assert_eq!(client.url("//users"), "https://reqres.in/api/users");
        }

        #[test]
        fn test_auth_token_lifecycle() {
            let mut client = ApiClient::new("http://localhost").unwrap();
            client.set_auth_token("abc").unwrap();
            assert_eq!(client.headers()[AUTHORIZATION], "Bearer abc");
            client.clear_auth_token();
            assert!(client.headers().get(AUTHORIZATION).is_none());
            assert_eq!(client.headers()[CONTENT_TYPE], "application/json");
        }

        #[test]
        fn test_invalid_header_name() {
            let mut client = ApiClient::new("http://localhost").unwrap();
            assert!(client.set_header("bad header", "x").is_err());
            client.set_header("x-api-key", "reqres-free-v1").unwrap();
            assert_eq!(client.headers()["x-api-key"], "reqres-free-v1");
        }
    }

    mod response_tests {
        use super::*;

        #[test]
        fn test_error_for_status() {
            assert!(response(201, Value::Null).error_for_status().is_ok());
            let err = response(404, json!({"error": "nope"})).error_for_status().unwrap_err();
            assert!(err.to_string().contains("HTTP 404"));
        }

        #[test]
        fn test_rate_limit_skips() {
            let err = skip_if_rate_limited(&response(429, Value::Null)).unwrap_err();
            assert!(err.is_skip());
            assert!(skip_if_rate_limited(&response(200, Value::Null)).is_ok());
        }

        #[test]
        fn test_field_lookup() {
            let r = response(200, json!({"data": [{"id": 7}]}));
            assert_eq!(r.field("data[0].id"), Some(&json!(7)));
        }
    }

    mod validator_tests {
        use super::*;

        #[test]
        fn test_validate_status() {
            assert!(ApiValidator::validate_status(&response(200, Value::Null), 200).is_ok());
            let err = ApiValidator::validate_status(&response(500, Value::Null), 200).unwrap_err();
            assert!(err.to_string().contains("Expected status 200, but got 500"));
        }

        #[test]
        fn test_required_fields() {
            let data = json!({"id": 1, "email": "a@b"});
            assert!(ApiValidator::validate_required_fields(&data, &["id", "email"]).is_ok());
            let err = ApiValidator::validate_required_fields(&data, &["id", "first_name", "avatar"]).unwrap_err();
            assert!(err.to_string().contains("Missing required fields: first_name, avatar"));
        }

        #[test]
        fn test_schema() {
            let data = json!({"id": 1, "email": "a@b", "tags": [], "active": true});
            ApiValidator::validate_schema(
                &data,
                &[("id", "number"), ("email", "string"), ("tags", "object"), ("active", "boolean")],
            )
            .unwrap();
            let err = ApiValidator::validate_schema(&data, &[("id", "string")]).unwrap_err();
            assert!(err.to_string().contains("Field id has type number, expected string"));
            assert!(ApiValidator::validate_schema(&data, &[("nope", "string")]).is_err());
        }

        #[test]
        fn test_array_response() {
            assert!(ApiValidator::validate_array_response(&json!([1, 2]), 2).is_ok());
            assert!(ApiValidator::validate_array_response(&json!([1]), 2).is_err());
            assert!(ApiValidator::validate_array_response(&json!({}), 0).is_err());
        }
    }

    mod builder_tests {
        use super::*;

        #[test]
        fn test_build_user_overrides() {
            let user = ApiDataBuilder::build_user(json!({"job": "Lead"}));
            assert_eq!(user["name"], "Test User");
            assert_eq!(user["job"], "Lead");
        }

        #[test]
        fn test_build_credentials_defaults() {
            let creds = ApiDataBuilder::build_credentials(Value::Null);
            assert_eq!(creds, json!({"email": "test@example.com", "password": "password123"}));
        }

        #[test]
        fn test_random_values() {
            assert_eq!(ApiDataBuilder::random_string(40).len(), 40);
            let email = ApiDataBuilder::random_email();
            assert!(email.starts_with("test_") && email.ends_with("@example.com"));
            assert_ne!(ApiDataBuilder::random_email(), email);
        }
    }
}
