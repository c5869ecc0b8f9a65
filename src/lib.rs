//! Jira Harvest Core Library
//!
//! Harvests issues from a paginated, rate-limited search endpoint,
//! incrementally and resumably, and turns each one into a normalized JSON
//! document with rule-derived summary, category, and QnA pairs.
//!
//! # Architecture
//!
//! - [`checkpoint`] - Per-source resume cursors persisted as JSON
//! - [`fetch`] - Retrying, rate-limit-aware search client
//! - [`pagination`] - Cursor/cap state machine over one source
//! - [`transform`] - Raw issue → training document
//! - [`sink`] - Append-only JSONL output
//! - [`harvest`] - Driver running every configured source in order

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod checkpoint;
pub mod config;
pub mod fetch;
pub mod harvest;
pub mod pagination;
pub mod progress;
pub mod record;
pub mod sink;
pub mod transform;
pub mod user_agent;

// Re-export commonly used types
pub use checkpoint::{CheckpointError, CheckpointRegistry, CheckpointStore, Checkpoints};
pub use config::{ConfigError, FileConfig, HarvestConfig, load_file_config};
pub use fetch::{FetchError, PageFetcher, RetryPolicy, SearchClient, Sleeper};
pub use harvest::{HarvestError, HarvestReport, Harvester, SourceReport};
pub use pagination::{PaginationSettings, Paginator, ScrapeOutcome, StopReason};
pub use progress::{BarProgress, NoProgress, ProgressObserver};
pub use record::RawRecord;
pub use sink::{DocumentSink, JsonlSink, SinkError};
pub use transform::{TransformError, TransformedDocument, transform};
