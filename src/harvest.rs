//! Harvest driver: runs every configured source in order.
//!
//! For each source: read its cursor and scrape from there. Every page is
//! appended to the sink before its cursor is persisted. A source that fails
//! only ends up with less progress; the remaining sources still run.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use jira_harvest::{HarvestConfig, Harvester, NoProgress};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let harvester = Harvester::from_config(HarvestConfig::default(), Arc::new(NoProgress))?;
//! let report = harvester.run_all().await?;
//! println!("wrote {} documents", report.total_written());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::checkpoint::{CheckpointStore, Checkpoints};
use crate::config::{ConfigError, HarvestConfig};
use crate::fetch::{FetchError, PageFetcher, SearchClient, Sleeper, TokioSleeper};
use crate::pagination::{Paginator, StopReason};
use crate::progress::ProgressObserver;
use crate::sink::{DocumentSink, JsonlSink};

/// Errors that prevent a run from starting.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// Configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The HTTP client could not be built.
    #[error(transparent)]
    Client(#[from] FetchError),

    /// The output directory could not be created.
    #[error("failed to create output directory {path}: {source}")]
    OutputDir {
        /// Directory path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// What happened to one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    /// Source identifier.
    pub source: String,
    /// Cursor the run resumed from.
    pub start_cursor: u64,
    /// Cursor the next run resumes from.
    pub final_cursor: u64,
    /// Documents appended to the sink.
    pub written: usize,
    /// Records skipped because they failed to transform.
    pub skipped: usize,
    /// Why pagination stopped.
    pub stop: StopReason,
    /// Sink failure message, if appending failed.
    pub sink_error: Option<String>,
}

impl SourceReport {
    /// Whether the source hit a fetch, checkpoint, or sink failure.
    #[must_use]
    pub fn had_failure(&self) -> bool {
        self.stop.is_failure()
    }
}

/// Summary of a full run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestReport {
    /// Per-source reports in run order.
    pub sources: Vec<SourceReport>,
}

impl HarvestReport {
    /// Documents written across all sources.
    #[must_use]
    pub fn total_written(&self) -> usize {
        self.sources.iter().map(|s| s.written).sum()
    }

    /// Number of sources that hit a failure.
    #[must_use]
    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.had_failure()).count()
    }
}

/// Sequential, resumable harvester over the configured sources.
pub struct Harvester {
    config: HarvestConfig,
    paginator: Paginator,
    sink: Arc<dyn DocumentSink>,
}

impl std::fmt::Debug for Harvester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harvester")
            .field("config", &self.config)
            .field("paginator", &self.paginator)
            .finish_non_exhaustive()
    }
}

impl Harvester {
    /// Assembles a harvester from explicit parts.
    pub fn new(
        config: HarvestConfig,
        fetcher: Arc<dyn PageFetcher>,
        sleeper: Arc<dyn Sleeper>,
        progress: Arc<dyn ProgressObserver>,
        sink: Arc<dyn DocumentSink>,
    ) -> Self {
        let paginator = Paginator::new(fetcher, sleeper, progress, config.pagination);
        Self {
            config,
            paginator,
            sink,
        }
    }

    /// Builds the production stack: HTTP search client, tokio sleeps, JSONL sink.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError`] if the config is invalid or the client cannot be built.
    pub fn from_config(
        config: HarvestConfig,
        progress: Arc<dyn ProgressObserver>,
    ) -> Result<Self, HarvestError> {
        Self::from_config_with_sleeper(config, progress, Arc::new(TokioSleeper))
    }

    /// Like [`from_config`](Self::from_config) with a custom sleeper for every delay.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError`] if the config is invalid or the client cannot be built.
    pub fn from_config_with_sleeper(
        config: HarvestConfig,
        progress: Arc<dyn ProgressObserver>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self, HarvestError> {
        config.validate()?;
        let client = SearchClient::builder(config.endpoint.clone())
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .retry_policy(config.retry_policy.clone())
            .sleeper(Arc::clone(&sleeper))
            .build()?;
        let sink = Arc::new(JsonlSink::new(config.output_dir.clone()));
        Ok(Self::new(config, Arc::new(client), sleeper, progress, sink))
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Harvests every configured source, one after another.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError`] only for problems found before any source
    /// runs; per-source failures are reported in the [`HarvestReport`].
    #[instrument(skip(self), fields(sources = self.config.sources.len()))]
    pub async fn run_all(&self) -> Result<HarvestReport, HarvestError> {
        self.config.validate()?;
        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(|source| HarvestError::OutputDir {
                path: self.config.output_dir.clone(),
                source,
            })?;

        let store = CheckpointStore::new(self.config.checkpoint_path.clone());
        let mut checkpoints = Checkpoints::load(store).await;

        let mut report = HarvestReport::default();
        for source in &self.config.sources {
            report
                .sources
                .push(self.run_source(source, &mut checkpoints).await);
        }

        info!(
            written = report.total_written(),
            failed_sources = report.failed_sources(),
            "harvest complete"
        );
        Ok(report)
    }

    async fn run_source(&self, source: &str, checkpoints: &mut Checkpoints) -> SourceReport {
        let start_cursor = checkpoints.cursor(source);
        info!(source, start_cursor, "starting scrape");

        let outcome = self
            .paginator
            .scrape(source, start_cursor, checkpoints, self.sink.as_ref())
            .await;

        if outcome.stop.is_failure() {
            warn!(
                source,
                next_cursor = outcome.final_cursor,
                written = outcome.documents.len(),
                stop = ?outcome.stop,
                "source stopped early"
            );
        } else {
            info!(
                source,
                next_cursor = outcome.final_cursor,
                written = outcome.documents.len(),
                stop = ?outcome.stop,
                "completed source"
            );
        }

        SourceReport {
            source: source.to_string(),
            start_cursor,
            final_cursor: outcome.final_cursor,
            written: outcome.documents.len(),
            skipped: outcome.skipped,
            stop: outcome.stop,
            sink_error: outcome.sink_error,
        }
    }
}
