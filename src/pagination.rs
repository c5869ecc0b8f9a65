//! Pagination and resume state machine for one source.
//!
//! # Overview
//!
//! [`Paginator::scrape`] walks a source from a resume cursor:
//!
//! 1. fetch `page_size` records at `cursor`
//! 2. transform records until `cap` documents are collected
//! 3. append the page's documents to the sink
//! 4. advance the cursor past the whole page and persist it
//! 5. sleep the politeness delay
//!
//! The cursor is only persisted once the page's documents are durably in the
//! sink, so an interrupted run loses at most the page in flight.
//!
//! It stops when the cap is reached, a page comes back empty, the cursor
//! reaches the first page's `total`, or a fetch, write, or checkpoint fails.
//! Failures are not errors for the caller: the documents written so far and
//! the last persisted cursor are returned.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use crate::checkpoint::Checkpoints;
use crate::fetch::{PageFetcher, PageQuery, Sleeper};
use crate::progress::ProgressObserver;
use crate::sink::DocumentSink;
use crate::transform::{TransformedDocument, transform};

/// Default records requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Default documents collected per source per run.
pub const DEFAULT_CAP: usize = 200;

/// Default politeness delay between pages.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_secs(1);

/// Why a scrape stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `cap` documents were collected.
    CapReached,
    /// The server returned an empty page.
    Exhausted,
    /// The cursor reached the total reported by the first page.
    TotalReached,
    /// A page could not be fetched after retries.
    FetchFailed,
    /// A page's documents could not be appended to the sink.
    SinkFailed,
    /// The advanced cursor could not be persisted.
    CheckpointFailed,
}

impl StopReason {
    /// Whether the scrape ended because something went wrong.
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Self::FetchFailed | Self::SinkFailed | Self::CheckpointFailed
        )
    }
}

/// Result of scraping one source.
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    /// Documents appended to the sink, in server order.
    pub documents: Vec<TransformedDocument>,
    /// Cursor to resume from next time.
    pub final_cursor: u64,
    /// Why the loop ended.
    pub stop: StopReason,
    /// Records dropped because they failed to transform.
    pub skipped: usize,
    /// Pages fetched successfully.
    pub pages: usize,
    /// Sink failure message when `stop` is [`StopReason::SinkFailed`].
    pub sink_error: Option<String>,
}

/// Page size, cap, and politeness delay for a [`Paginator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationSettings {
    /// Records requested per page.
    pub page_size: u32,
    /// Maximum documents collected per source per run.
    pub cap: usize,
    /// Delay after every fetched page.
    pub page_delay: Duration,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            cap: DEFAULT_CAP,
            page_delay: DEFAULT_PAGE_DELAY,
        }
    }
}

/// Drives a [`PageFetcher`] across a source's pages.
pub struct Paginator {
    fetcher: Arc<dyn PageFetcher>,
    sleeper: Arc<dyn Sleeper>,
    progress: Arc<dyn ProgressObserver>,
    settings: PaginationSettings,
}

impl std::fmt::Debug for Paginator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginator")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Paginator {
    /// Creates a paginator.
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        sleeper: Arc<dyn Sleeper>,
        progress: Arc<dyn ProgressObserver>,
        settings: PaginationSettings,
    ) -> Self {
        Self {
            fetcher,
            sleeper,
            progress,
            settings,
        }
    }

    /// The configured settings.
    #[must_use]
    pub fn settings(&self) -> PaginationSettings {
        self.settings
    }

    /// Scrapes `source` starting at `resume_cursor`, writing to `sink`.
    ///
    /// Each page's documents are appended to `sink` before the cursor moves.
    /// The cursor then advances by the number of records *fetched* in the
    /// page, even when the cap cuts a page short, and is persisted through
    /// `checkpoints`. A failed append stops the source with the cursor left
    /// before that page.
    #[instrument(skip(self, checkpoints, sink), fields(page_size = self.settings.page_size, cap = self.settings.cap))]
    pub async fn scrape(
        &self,
        source: &str,
        resume_cursor: u64,
        checkpoints: &mut Checkpoints,
        sink: &dyn DocumentSink,
    ) -> ScrapeOutcome {
        let PaginationSettings {
            page_size,
            cap,
            page_delay,
        } = self.settings;

        let mut cursor = resume_cursor;
        let mut documents: Vec<TransformedDocument> = Vec::new();
        let mut total: Option<u64> = None;
        let mut started = false;
        let mut skipped = 0usize;
        let mut pages = 0usize;
        let mut sink_error = None;

        let stop = loop {
            if documents.len() >= cap {
                info!(source, cap, "reached per-source cap, stopping early");
                break StopReason::CapReached;
            }

            let query = PageQuery::new(source, cursor, page_size);
            let page = match self.fetcher.fetch_page(&query).await {
                Ok(page) => page,
                Err(e) => {
                    error!(source, cursor, error = %e, "failed to fetch page, keeping partial results");
                    break StopReason::FetchFailed;
                }
            };
            pages += 1;

            if !started {
                total = page.total;
                let target = total.map_or(cap as u64, |t| t.min(cap as u64));
                self.progress.start(source, target);
                started = true;
            }

            if page.is_empty() {
                info!(source, cursor, "no more issues returned");
                break StopReason::Exhausted;
            }

            let mut batch = Vec::new();
            for record in &page.records {
                if documents.len() + batch.len() >= cap {
                    break;
                }
                match transform(record, source) {
                    Ok(document) => {
                        batch.push(document);
                        self.progress.advance((documents.len() + batch.len()) as u64);
                    }
                    Err(e) => {
                        skipped += 1;
                        warn!(source, issue = ?record.key(), error = %e, "failed to transform issue, skipping");
                    }
                }
            }

            if !batch.is_empty() {
                if let Err(e) = sink.append(source, &batch).await {
                    error!(source, cursor, error = %e, "failed to write page, cursor not advanced");
                    sink_error = Some(e.to_string());
                    break StopReason::SinkFailed;
                }
            }
            documents.append(&mut batch);

            cursor += page.len() as u64;
            debug!(source, cursor, written = documents.len(), "advanced cursor");
            if let Err(e) = checkpoints.record(source, cursor).await {
                error!(source, cursor, error = %e, "failed to persist checkpoint, stopping source");
                break StopReason::CheckpointFailed;
            }

            self.sleeper.sleep(page_delay).await;

            if total.is_some_and(|t| cursor >= t) {
                info!(source, cursor, "reached reported total");
                break StopReason::TotalReached;
            }
        };

        if started {
            self.progress.finish(source, documents.len() as u64);
        }

        ScrapeOutcome {
            documents,
            final_cursor: cursor,
            stop,
            skipped,
            pages,
            sink_error,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::checkpoint::CheckpointStore;
    use crate::fetch::{FetchError, Page, RecordingSleeper};
    use crate::record::RawRecord;
    use crate::sink::{JsonlSink, SinkError};

    /// Serves issues `T-0..T-{count-1}`.
    struct FixedFetcher {
        count: u64,
        report_total: bool,
        /// Offset at which every fetch fails.
        fail_at: Option<u64>,
        /// Positions served as a bare number instead of an issue object.
        non_objects: &'static [u64],
    }

    impl FixedFetcher {
        fn new(count: u64, report_total: bool) -> Self {
            Self {
                count,
                report_total,
                fail_at: None,
                non_objects: &[],
            }
        }
    }

    #[async_trait]
    impl PageFetcher for FixedFetcher {
        async fn fetch_page(&self, query: &PageQuery) -> Result<Page, FetchError> {
            if self.fail_at.is_some_and(|at| query.offset >= at) {
                return Err(FetchError::malformed_page("http://fake", "server went away"));
            }
            let end = (query.offset + u64::from(query.limit)).min(self.count);
            let records = (query.offset..end)
                .map(|i| {
                    if self.non_objects.contains(&i) {
                        RawRecord::new(json!(42))
                    } else {
                        RawRecord::new(json!({"key": format!("T-{i}")}))
                    }
                })
                .collect();
            Ok(Page {
                total: self.report_total.then_some(self.count),
                records,
            })
        }
    }

    /// Accepts the first `ok_batches` appends, then fails.
    struct FlakySink {
        ok_batches: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DocumentSink for FlakySink {
        async fn append(
            &self,
            _source: &str,
            documents: &[TransformedDocument],
        ) -> Result<usize, SinkError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.ok_batches {
                Ok(documents.len())
            } else {
                Err(SinkError::Io {
                    path: "t_issues.jsonl".into(),
                    source: std::io::Error::other("disk full"),
                })
            }
        }
    }

    /// Logs observer calls as strings.
    #[derive(Default)]
    struct EventLog(Mutex<Vec<String>>);

    impl ProgressObserver for EventLog {
        fn start(&self, source: &str, target: u64) {
            self.0.lock().unwrap().push(format!("start {source} {target}"));
        }
        fn advance(&self, _collected: u64) {}
        fn finish(&self, source: &str, collected: u64) {
            self.0.lock().unwrap().push(format!("finish {source} {collected}"));
        }
    }

    fn settings(page_size: u32, cap: usize) -> PaginationSettings {
        PaginationSettings {
            page_size,
            cap,
            page_delay: Duration::from_secs(1),
        }
    }

    fn paginator(fetcher: FixedFetcher, sleeper: &RecordingSleeper, page_size: u32, cap: usize) -> Paginator {
        Paginator::new(
            Arc::new(fetcher),
            Arc::new(sleeper.clone()),
            Arc::new(crate::progress::NoProgress),
            settings(page_size, cap),
        )
    }

    async fn checkpoints(dir: &TempDir) -> Checkpoints {
        Checkpoints::load(CheckpointStore::new(dir.path().join("checkpoints.json"))).await
    }

    fn ids(outcome: &ScrapeOutcome) -> Vec<String> {
        outcome
            .documents
            .iter()
            .map(|d| d.issue_id.clone().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_scrape_until_total() {
        let dir = TempDir::new().unwrap();
        let mut cps = checkpoints(&dir).await;
        let sink = JsonlSink::new(dir.path());
        let sleeper = RecordingSleeper::new();
        let p = paginator(FixedFetcher::new(25, true), &sleeper, 10, 200);

        let outcome = p.scrape("T", 0, &mut cps, &sink).await;

        assert_eq!(outcome.documents.len(), 25);
        assert_eq!(outcome.final_cursor, 25);
        assert_eq!(outcome.stop, StopReason::TotalReached);
        assert_eq!(outcome.pages, 3);
        assert_eq!(cps.cursor("T"), 25);
        // one politeness sleep per page
        assert_eq!(sleeper.recorded(), vec![Duration::from_secs(1); 3]);
        let written = std::fs::read_to_string(sink.path_for("T")).unwrap();
        assert_eq!(written.lines().count(), 25);
    }

    #[tokio::test]
    async fn test_scrape_without_total_stops_on_empty_page() {
        let dir = TempDir::new().unwrap();
        let mut cps = checkpoints(&dir).await;
        let sink = JsonlSink::new(dir.path());
        let sleeper = RecordingSleeper::new();
        let p = paginator(FixedFetcher::new(20, false), &sleeper, 10, 200);

        let outcome = p.scrape("T", 0, &mut cps, &sink).await;

        assert_eq!(outcome.documents.len(), 20);
        assert_eq!(outcome.stop, StopReason::Exhausted);
        assert_eq!(outcome.pages, 3);
        assert_eq!(outcome.final_cursor, 20);
    }

    #[tokio::test]
    async fn test_cap_mid_page_still_advances_past_page() {
        let dir = TempDir::new().unwrap();
        let mut cps = checkpoints(&dir).await;
        let sink = JsonlSink::new(dir.path());
        let sleeper = RecordingSleeper::new();
        let p = paginator(FixedFetcher::new(100, true), &sleeper, 10, 15);

        let outcome = p.scrape("T", 0, &mut cps, &sink).await;

        assert_eq!(outcome.documents.len(), 15);
        assert_eq!(outcome.final_cursor, 20);
        assert_eq!(outcome.stop, StopReason::CapReached);
        assert_eq!(cps.cursor("T"), 20);
    }

    #[tokio::test]
    async fn test_resume_starts_at_cursor() {
        let dir = TempDir::new().unwrap();
        let mut cps = checkpoints(&dir).await;
        let sink = JsonlSink::new(dir.path());
        let sleeper = RecordingSleeper::new();
        let p = paginator(FixedFetcher::new(30, true), &sleeper, 10, 200);

        let outcome = p.scrape("T", 20, &mut cps, &sink).await;

        let ids = ids(&outcome);
        assert_eq!(ids.first().map(String::as_str), Some("T-20"));
        assert_eq!(ids.len(), 10);
    }

    #[tokio::test]
    async fn test_zero_cap_fetches_nothing_and_reports_no_progress() {
        let dir = TempDir::new().unwrap();
        let mut cps = checkpoints(&dir).await;
        let sink = JsonlSink::new(dir.path());
        let events = Arc::new(EventLog::default());
        let p = Paginator::new(
            Arc::new(FixedFetcher::new(30, true)),
            Arc::new(RecordingSleeper::new()),
            events.clone(),
            settings(10, 0),
        );

        let outcome = p.scrape("T", 7, &mut cps, &sink).await;

        assert_eq!(outcome.pages, 0);
        assert_eq!(outcome.final_cursor, 7);
        assert_eq!(outcome.stop, StopReason::CapReached);
        assert!(events.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_progress_start_precedes_finish() {
        let dir = TempDir::new().unwrap();
        let mut cps = checkpoints(&dir).await;
        let sink = JsonlSink::new(dir.path());
        let events = Arc::new(EventLog::default());
        let p = Paginator::new(
            Arc::new(FixedFetcher::new(30, true)),
            Arc::new(RecordingSleeper::new()),
            events.clone(),
            settings(10, 15),
        );

        p.scrape("T", 0, &mut cps, &sink).await;

        assert_eq!(*events.0.lock().unwrap(), vec!["start T 15", "finish T 15"]);
    }

    #[tokio::test]
    async fn test_fetch_failure_after_progress_keeps_written_pages() {
        let dir = TempDir::new().unwrap();
        let mut cps = checkpoints(&dir).await;
        let sink = JsonlSink::new(dir.path());
        let sleeper = RecordingSleeper::new();
        let fetcher = FixedFetcher {
            fail_at: Some(20),
            ..FixedFetcher::new(50, true)
        };
        let p = paginator(fetcher, &sleeper, 10, 200);

        let outcome = p.scrape("T", 0, &mut cps, &sink).await;

        assert_eq!(outcome.stop, StopReason::FetchFailed);
        assert_eq!(outcome.documents.len(), 20);
        assert_eq!(outcome.final_cursor, 20);
        assert_eq!(ids(&outcome).last().map(String::as_str), Some("T-19"));
        assert_eq!(cps.cursor("T"), 20);
        let written = std::fs::read_to_string(sink.path_for("T")).unwrap();
        assert_eq!(written.lines().count(), 20);
    }

    #[tokio::test]
    async fn test_untransformable_record_is_skipped_siblings_kept() {
        let dir = TempDir::new().unwrap();
        let mut cps = checkpoints(&dir).await;
        let sink = JsonlSink::new(dir.path());
        let sleeper = RecordingSleeper::new();
        let fetcher = FixedFetcher {
            non_objects: &[3, 12],
            ..FixedFetcher::new(15, true)
        };
        let p = paginator(fetcher, &sleeper, 10, 200);

        let outcome = p.scrape("T", 0, &mut cps, &sink).await;

        assert_eq!(outcome.skipped, 2);
        assert_eq!(outcome.documents.len(), 13);
        assert_eq!(outcome.final_cursor, 15);
        let ids = ids(&outcome);
        assert!(ids.contains(&"T-2".to_string()));
        assert!(ids.contains(&"T-4".to_string()));
        assert!(!ids.contains(&"T-3".to_string()));
    }

    #[tokio::test]
    async fn test_sink_failure_leaves_cursor_before_failed_page() {
        let dir = TempDir::new().unwrap();
        let mut cps = checkpoints(&dir).await;
        let sink = FlakySink {
            ok_batches: 1,
            calls: AtomicUsize::new(0),
        };
        let sleeper = RecordingSleeper::new();
        let p = paginator(FixedFetcher::new(50, true), &sleeper, 10, 200);

        let outcome = p.scrape("T", 0, &mut cps, &sink).await;

        assert_eq!(outcome.stop, StopReason::SinkFailed);
        assert!(outcome.stop.is_failure());
        assert_eq!(outcome.documents.len(), 10);
        assert_eq!(outcome.final_cursor, 10);
        assert_eq!(cps.cursor("T"), 10);
        assert!(outcome.sink_error.unwrap().contains("disk full"));
    }
}
