//! HTTP client wrapper for the issue search endpoint.
//!
//! [`SearchClient`] performs one logical GET, retrying failed attempts under a
//! [`RetryPolicy`] and honoring Retry-After on 429 responses. It is strictly
//! sequential: one request in flight, sleeping between attempts.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::RETRY_AFTER;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use super::constants::REQUEST_TIMEOUT_SECS;
use super::error::{AttemptFailure, FetchError};
use super::page::{Page, PageFetcher, PageQuery};
use super::rate_limit::rate_limit_wait;
use super::retry::{RetryDecision, RetryPolicy};
use super::sleeper::{Sleeper, TokioSleeper};
use crate::user_agent::default_user_agent;

/// Blocking-style, retrying JSON client for a single search endpoint.
///
/// # Example
///
/// ```no_run
/// use jira_harvest::fetch::{PageFetcher, PageQuery, SearchClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = SearchClient::new("https://issues.apache.org/jira/rest/api/2/search")?;
/// let page = client.fetch_page(&PageQuery::new("KAFKA", 0, 50)).await?;
/// println!("{} issues (total {:?})", page.len(), page.total);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SearchClient {
    client: Client,
    endpoint: String,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for SearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchClient")
            .field("endpoint", &self.endpoint)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl SearchClient {
    /// Creates a client with the default User-Agent, timeout, and retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, FetchError> {
        Self::builder(endpoint).build()
    }

    /// Starts a builder for custom settings.
    pub fn builder(endpoint: impl Into<String>) -> SearchClientBuilder {
        SearchClientBuilder {
            endpoint: endpoint.into(),
            user_agent: default_user_agent(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// The endpoint every request targets.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The retry policy applied around each request.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GETs the endpoint with `params` and returns the parsed JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Exhausted`] once the retry budget is spent, or
    /// [`FetchError::NonRetryable`] if the policy's predicate rejects a failure.
    #[instrument(skip(self, params), fields(url = %self.endpoint))]
    pub async fn get_json(&self, params: &[(&str, String)]) -> Result<Value, FetchError> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!(attempt, "sending search request");

            let failure = match self.attempt(params).await {
                Ok(value) => return Ok(value),
                Err(failure) => failure,
            };

            // Retry-After is slept in addition to the backoff delay.
            if let AttemptFailure::RateLimited { retry_after } = &failure {
                let wait = rate_limit_wait(retry_after.as_deref());
                warn!(
                    retry_after = ?retry_after,
                    wait_secs = wait.as_secs(),
                    "received 429, honoring rate limit"
                );
                self.sleeper.sleep(wait).await;
            }

            match self.policy.should_retry(failure.kind(), attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    info!(
                        attempt = next_attempt,
                        max_attempts = self.policy.max_attempts(),
                        delay_ms = delay.as_millis(),
                        error = %failure,
                        "retrying search request"
                    );
                    self.sleeper.sleep(delay).await;
                }
                RetryDecision::DoNotRetry { reason, rejected } => {
                    warn!(attempt, %reason, error = %failure, "giving up on search request");
                    let url = self.endpoint.clone();
                    return Err(if rejected {
                        FetchError::NonRetryable {
                            url,
                            attempts: attempt,
                            failure,
                        }
                    } else {
                        FetchError::Exhausted {
                            url,
                            attempts: attempt,
                            last_failure: failure,
                        }
                    });
                }
            }
        }
    }

    /// One HTTP round trip, classified.
    async fn attempt(&self, params: &[(&str, String)]) -> Result<Value, AttemptFailure> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(params)
            .send()
            .await
            .map_err(AttemptFailure::from_send_error)?;

        let status = response.status().as_u16();
        if status == 429 {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(std::string::ToString::to_string);
            return Err(AttemptFailure::RateLimited { retry_after });
        }
        if (500..600).contains(&status) {
            warn!(status, "server error, will retry");
            return Err(AttemptFailure::ServerError { status });
        }
        if status != 200 {
            error!(status, url = %response.url(), "unexpected HTTP status");
            return Err(AttemptFailure::UnexpectedStatus { status });
        }

        let body = response
            .bytes()
            .await
            .map_err(AttemptFailure::from_send_error)?;
        serde_json::from_slice(&body).map_err(|e| {
            error!(error = %e, "invalid JSON response");
            AttemptFailure::InvalidJson
        })
    }
}

#[async_trait]
impl PageFetcher for SearchClient {
    #[instrument(skip(self), fields(source = %query.source, offset = query.offset))]
    async fn fetch_page(&self, query: &PageQuery) -> Result<Page, FetchError> {
        let body = self.get_json(&query.params()).await?;
        Page::from_json(body).map_err(|reason| FetchError::malformed_page(&self.endpoint, reason))
    }
}

/// Builder for [`SearchClient`].
#[must_use]
pub struct SearchClientBuilder {
    endpoint: String,
    user_agent: String,
    timeout: Duration,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl SearchClientBuilder {
    /// Overrides the identifying User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Overrides the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the retry policy.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Overrides how the client sleeps between attempts.
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] if reqwest rejects the configuration.
    pub fn build(self) -> Result<SearchClient, FetchError> {
        let client = Client::builder()
            .user_agent(self.user_agent)
            .timeout(self.timeout)
            .build()
            .map_err(FetchError::ClientBuild)?;
        Ok(SearchClient {
            client,
            endpoint: self.endpoint,
            policy: self.policy,
            sleeper: self.sleeper,
        })
    }
}
