//! Retry, polling and small value utilities shared by steps and tests.

use crate::result::{StepwrightError, StepwrightResult};
use serde_json::{Map, Value};
use std::future::Future;
use std::time::{Duration, Instant};

// =============================================================================
// ASYNC CONTROL
// =============================================================================

/// Sleep for `ms` milliseconds
pub async fn sleep(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Run `op` up to `max_retries` times, doubling the delay after each failure.
/// The last error is returned when every attempt fails.
pub async fn retry_with_backoff<T, E, F, Fut>(
    mut op: F,
    max_retries: u32,
    initial_delay: Duration,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = max_retries.max(1);
    let mut delay = initial_delay;
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 < attempts => {
                tracing::debug!(attempt, error = %e, delay_ms = delay.as_millis() as u64, "retrying");
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Run `op` up to `max_retries` times, retrying immediately but only for
/// errors accepted by `matcher`.
pub async fn retry_on_error<T, E, F, Fut, M>(mut op: F, matcher: M, max_retries: u32) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    M: Fn(&E) -> bool,
{
    let attempts = max_retries.max(1);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 < attempts && matcher(&e) => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}

/// Re-evaluate `condition` every `interval` until it holds or `timeout` passes
pub async fn poll_until<F, Fut>(mut condition: F, timeout: Duration, interval: Duration) -> StepwrightResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = Instant::now();
    while start.elapsed() < timeout {
        if condition().await {
            return Ok(());
        }
        tokio::time::sleep(interval).await;
    }
    Err(StepwrightError::Timeout {
        ms: timeout.as_millis() as u64,
        waited_for: "polled condition".to_string(),
    })
}

/// Await `f` `times` times in sequence
pub async fn repeat_async<F, Fut>(times: usize, mut f: F) -> StepwrightResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StepwrightResult<()>>,
{
    for _ in 0..times {
        f().await?;
    }
    Ok(())
}

// =============================================================================
// VALUES
// =============================================================================

/// Strip trailing slashes
#[must_use]
pub fn trim_url(url: &str) -> &str {
    url.trim_end_matches('/')
}

pub use crate::config::append_subdomain;

/// Split `a.b[0].c` into `["a", "b", "0", "c"]`
fn key_path(path: &str) -> impl Iterator<Item = &str> {
    path.split(['.', '[', ']']).filter(|part| !part.is_empty())
}

/// Look up a dotted/bracketed key path (`user.roles[0].name`)
#[must_use]
pub fn get_nested_value<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    key_path(path).try_fold(value, |current, key| match current {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Collect the values of `keys` present in `value`, keyed by path
#[must_use]
pub fn extract_keys(value: &Value, keys: &[String]) -> Map<String, Value> {
    keys.iter()
        .filter_map(|key| get_nested_value(value, key).map(|v| (key.clone(), v.clone())))
        .collect()
}

/// `0x1234...abcd` style shortening; empty input stays empty
#[must_use]
pub fn shorten_address(address: &str, length: usize) -> String {
    if address.is_empty() {
        return String::new();
    }
    let chars: Vec<char> = address.chars().collect();
    let head: String = chars.iter().take(length + 2).collect();
    let tail: String = chars[chars.len().saturating_sub(length)..].iter().collect();
    format!("{head}...{tail}")
}

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// `January/1/2025` to `01/01/2025`
pub fn convert_date_string(date: &str) -> StepwrightResult<String> {
    let invalid = || StepwrightError::StepArgument {
        index: 0,
        message: format!("expected Month/Day/Year, got {date:?}"),
    };
    let mut parts = date.split('/');
    let (Some(month), Some(day), Some(year), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };
    let month = MONTHS.iter().position(|m| *m == month).ok_or_else(invalid)? + 1;
    Ok(format!("{month:02}/{day:0>2}/{year}"))
}

/// Unique id such as `test_1718000000000_1a2b3c4`
#[must_use]
pub fn generate_test_id(prefix: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}_{millis}_{}", &suffix[..7])
}

/// Current time, RFC 3339 with milliseconds
#[must_use]
pub fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Uniform-ish integer in `[min, max]`
#[must_use]
pub fn random_int_in_range(min: i64, max: i64) -> i64 {
    if max <= min {
        return min;
    }
    let span = (max - min) as u128 + 1;
    min + (uuid::Uuid::new_v4().as_u128() % span) as i64
}
