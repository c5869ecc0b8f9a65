//! Retry-After handling for 429 responses.

use std::time::Duration;

use tracing::{debug, instrument};

use super::constants::DEFAULT_RATE_LIMIT_WAIT;

/// Parses a Retry-After header value given as integer seconds.
///
/// Only the delta-seconds form is honored, exactly as sent. Negative,
/// fractional, or date values return `None`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use jira_harvest::fetch::parse_retry_after;
///
/// assert_eq!(parse_retry_after("5"), Some(Duration::from_secs(5)));
/// assert_eq!(parse_retry_after("0"), Some(Duration::ZERO));
/// assert_eq!(parse_retry_after("-1"), None);
/// assert_eq!(parse_retry_after("soon"), None);
/// ```
#[must_use]
#[instrument]
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let header_value = header_value.trim();
    if header_value.is_empty() || !header_value.bytes().all(|b| b.is_ascii_digit()) {
        debug!(header_value, "unparseable Retry-After value");
        return None;
    }

    // All digits but too large for u64
    let seconds = header_value.parse::<u64>().unwrap_or(u64::MAX);
    Some(Duration::from_secs(seconds))
}

/// How long to wait after a 429, given the raw Retry-After header (if any).
#[must_use]
pub fn rate_limit_wait(retry_after: Option<&str>) -> Duration {
    retry_after
        .and_then(parse_retry_after)
        .unwrap_or(DEFAULT_RATE_LIMIT_WAIT)
}
