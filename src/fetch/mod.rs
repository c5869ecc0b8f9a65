//! Resilient retrieval from the issue search endpoint.
//!
//! # Features
//!
//! - Fixed identifying User-Agent on every request
//! - 15s per-request timeout
//! - Exponential backoff (2s, 4s, 8s, 16s; capped at 30s) over at most 5 attempts
//! - Retry-After compliance on 429 (10s when the header is absent or unusable)
//! - Injectable [`Sleeper`] so tests never wait on a real clock
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use jira_harvest::fetch::{RetryPolicy, SearchClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = SearchClient::builder("https://issues.apache.org/jira/rest/api/2/search")
//!     .timeout(Duration::from_secs(15))
//!     .retry_policy(RetryPolicy::default())
//!     .build()?;
//! let body = client.get_json(&[("jql", "project=KAFKA".to_string())]).await?;
//! println!("{body}");
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod error;
mod page;
mod rate_limit;
mod retry;
mod sleeper;

pub use client::{SearchClient, SearchClientBuilder};
pub use error::{AttemptFailure, FailureKind, FetchError};
pub use page::{Page, PageFetcher, PageQuery, SEARCH_FIELDS};
pub use rate_limit::{parse_retry_after, rate_limit_wait};
pub use retry::{RetryDecision, RetryPolicy, RetryPredicate, retry_all};
pub use sleeper::{RecordingSleeper, Sleeper, TokioSleeper};
