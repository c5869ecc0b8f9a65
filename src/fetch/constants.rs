//! Constants for the fetch module (timeouts, waits, backoff schedule).

use std::time::Duration;

/// Default per-request timeout (15 seconds).
pub const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Wait applied after a 429 that carries no usable Retry-After header.
pub const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(10);

/// Default maximum attempts, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// First backoff delay.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);

/// Backoff delay cap.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Backoff multiplier (doubles each attempt).
pub const DEFAULT_BACKOFF_MULTIPLIER: u32 = 2;
