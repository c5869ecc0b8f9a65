//! Retry policy with exponential backoff for search requests.
//!
//! A [`RetryPolicy`] is an explicit value: maximum attempts, a backoff
//! schedule, and a predicate deciding which [`FailureKind`]s are retryable.
//! The fetch client consults it after every failed attempt.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use jira_harvest::fetch::{FailureKind, RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::default();
//! match policy.should_retry(FailureKind::Server, 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         assert_eq!(delay, Duration::from_secs(2));
//!         assert_eq!(attempt, 2);
//!     }
//!     RetryDecision::DoNotRetry { reason, .. } => panic!("unexpected: {reason}"),
//! }
//! ```

use std::time::Duration;

use tracing::{debug, instrument};

use super::constants::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY,
};
use super::error::FailureKind;

/// Decision on whether to retry a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number comes next (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Stop retrying.
    DoNotRetry {
        /// Human-readable reason.
        reason: String,
        /// True when the predicate rejected the failure rather than the budget running out.
        rejected: bool,
    },
}

/// Predicate deciding whether a failure kind may be retried.
pub type RetryPredicate = fn(FailureKind) -> bool;

/// Every failure the fetch client produces is retried.
///
/// Non-200 statuses other than 429/5xx are rarely transient, but the budget is
/// small enough that retrying them keeps the policy uniform.
#[must_use]
pub fn retry_all(_kind: FailureKind) -> bool {
    true
}

/// Configuration for retry behavior with exponential backoff.
///
/// # Default Values
///
/// - `max_attempts`: 5
/// - `base_delay`: 2 seconds
/// - `max_delay`: 30 seconds
/// - `backoff_multiplier`: 2
///
/// With defaults the delays between attempts are 2s, 4s, 8s, 16s.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: u32,
    retryable: RetryPredicate,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            retryable: retry_all,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with a custom schedule.
    ///
    /// `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: u32,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            backoff_multiplier,
            retryable: retry_all,
        }
    }

    /// Creates a policy with a custom max_attempts, using defaults for other settings.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Replaces the retryable predicate.
    #[must_use]
    pub fn with_predicate(mut self, retryable: RetryPredicate) -> Self {
        self.retryable = retryable;
        self
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Determines whether to retry after `attempt` (1-indexed) failed with `kind`.
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, kind: FailureKind, attempt: u32) -> RetryDecision {
        if !(self.retryable)(kind) {
            return RetryDecision::DoNotRetry {
                reason: format!("{kind:?} failures are not retryable"),
                rejected: true,
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
                rejected: false,
            };
        }

        let delay = self.backoff_delay(attempt);
        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    /// Backoff after the given failed attempt: `min(base * multiplier^(attempt-1), max)`.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = self
            .backoff_multiplier
            .checked_pow(exponent)
            .unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}
