//! Error types for the fetch module.
//!
//! [`AttemptFailure`] describes why one HTTP attempt failed; [`FetchError`] is
//! what callers see once the retry policy has given up.

use thiserror::Error;

/// Why a single request attempt failed.
#[derive(Debug, Error)]
pub enum AttemptFailure {
    /// Server answered 429 Too Many Requests.
    #[error("429 rate limited")]
    RateLimited {
        /// Raw Retry-After header, if the server sent one.
        retry_after: Option<String>,
    },

    /// Server answered with a 5xx status.
    #[error("server error {status}")]
    ServerError {
        /// The HTTP status code.
        status: u16,
    },

    /// Any other non-200 status.
    #[error("HTTP {status}")]
    UnexpectedStatus {
        /// The HTTP status code.
        status: u16,
    },

    /// Status 200 but the body was not JSON.
    #[error("Invalid JSON")]
    InvalidJson,

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// Connection-level failure (DNS, refused, reset, TLS).
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
}

/// Coarse classification of an [`AttemptFailure`], fed to the retry predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// HTTP 429.
    RateLimited,
    /// HTTP 5xx.
    Server,
    /// Non-200, non-429, non-5xx status.
    UnexpectedStatus,
    /// Undecodable body on a 200.
    InvalidJson,
    /// Timeout or connection failure.
    Network,
}

impl AttemptFailure {
    /// Returns the failure classification used by the retry policy.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::RateLimited { .. } => FailureKind::RateLimited,
            Self::ServerError { .. } => FailureKind::Server,
            Self::UnexpectedStatus { .. } => FailureKind::UnexpectedStatus,
            Self::InvalidJson => FailureKind::InvalidJson,
            Self::Timeout | Self::Network(_) => FailureKind::Network,
        }
    }

    /// Maps a reqwest send error onto a failure, splitting out timeouts.
    pub(crate) fn from_send_error(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(error)
        }
    }
}

/// Errors surfaced by the fetch client once it stops trying.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Every attempt allowed by the retry policy failed.
    #[error("giving up on {url} after {attempts} attempts: {last_failure}")]
    Exhausted {
        /// The endpoint that was queried.
        url: String,
        /// Number of attempts made.
        attempts: u32,
        /// Failure of the final attempt.
        #[source]
        last_failure: AttemptFailure,
    },

    /// The retry predicate declared the failure not worth retrying.
    #[error("not retrying {url} after attempt {attempts}: {failure}")]
    NonRetryable {
        /// The endpoint that was queried.
        url: String,
        /// Number of attempts made.
        attempts: u32,
        /// The failure that stopped the loop.
        #[source]
        failure: AttemptFailure,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// The body was JSON but not shaped like a search page.
    #[error("malformed search page from {url}: {reason}")]
    MalformedPage {
        /// The endpoint that was queried.
        url: String,
        /// What was wrong with the payload.
        reason: String,
    },
}

impl FetchError {
    /// Creates a malformed page error.
    pub fn malformed_page(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedPage {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Number of HTTP attempts made before the error was produced.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } | Self::NonRetryable { attempts, .. } => *attempts,
            Self::MalformedPage { .. } => 1,
            Self::ClientBuild(_) => 0,
        }
    }
}
