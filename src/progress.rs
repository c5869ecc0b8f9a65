//! Progress reporting for per-source harvesting.
//!
//! The paginator reports through [`ProgressObserver`]; rendering is the
//! caller's choice. [`NoProgress`] discards events, [`BarProgress`] draws an
//! indicatif bar per source.

use std::sync::{Mutex, PoisonError};

use indicatif::{ProgressBar, ProgressStyle};

/// Receives harvesting progress for one source at a time.
///
/// `finish` only follows a `start`; a source that never fetched a page reports
/// nothing.
pub trait ProgressObserver: Send + Sync {
    /// A source started; `target` is the number of documents expected.
    fn start(&self, source: &str, target: u64);

    /// `collected` documents have been gathered so far (monotonic).
    fn advance(&self, collected: u64);

    /// The source finished with `collected` documents.
    fn finish(&self, source: &str, collected: u64);
}

/// Ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn start(&self, _source: &str, _target: u64) {}
    fn advance(&self, _collected: u64) {}
    fn finish(&self, _source: &str, _collected: u64) {}
}

/// Terminal progress bar, one per source.
#[derive(Debug, Default)]
pub struct BarProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl BarProgress {
    /// Creates an observer with no active bar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<ProgressBar>> {
        self.bar.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ProgressObserver for BarProgress {
    fn start(&self, source: &str, target: u64) {
        let bar = ProgressBar::new(target);
        bar.set_style(
            ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len} issues ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_message(format!("Scraping {source}"));
        if let Some(previous) = self.slot().replace(bar) {
            previous.finish_and_clear();
        }
    }

    fn advance(&self, collected: u64) {
        if let Some(bar) = self.slot().as_ref() {
            bar.set_position(collected);
        }
    }

    fn finish(&self, source: &str, collected: u64) {
        if let Some(bar) = self.slot().take() {
            bar.set_position(collected);
            bar.finish_with_message(format!("Scraped {source}"));
        }
    }
}
