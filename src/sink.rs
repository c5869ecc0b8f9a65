//! Append-only line-delimited JSON output, one file per source.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{info, instrument};

use crate::transform::TransformedDocument;

/// Errors that can occur while appending documents.
#[derive(Debug, Error)]
pub enum SinkError {
    /// File system error.
    #[error("IO error appending to {path}: {source}")]
    Io {
        /// The output file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A document could not be serialized.
    #[error("failed to serialize document {issue_id:?}: {source}")]
    Serialize {
        /// Key of the offending document.
        issue_id: Option<String>,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

impl SinkError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Accepts documents for a source and durably appends them.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Appends `documents` for `source`, returning how many were written.
    async fn append(
        &self,
        source: &str,
        documents: &[TransformedDocument],
    ) -> Result<usize, SinkError>;
}

/// Writes `<dir>/<source lower-case>_issues.jsonl`.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    output_dir: PathBuf,
}

impl JsonlSink {
    /// Creates a sink rooted at `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// The output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Output file for `source`.
    #[must_use]
    pub fn path_for(&self, source: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_issues.jsonl", source.to_lowercase()))
    }
}

#[async_trait]
impl DocumentSink for JsonlSink {
    #[instrument(skip(self, documents), fields(count = documents.len()))]
    async fn append(
        &self,
        source: &str,
        documents: &[TransformedDocument],
    ) -> Result<usize, SinkError> {
        let path = self.path_for(source);

        // Whole batch is serialized before the file is touched.
        let mut buffer = Vec::new();
        for document in documents {
            serde_json::to_writer(&mut buffer, document).map_err(|source| {
                SinkError::Serialize {
                    issue_id: document.issue_id.clone(),
                    source,
                }
            })?;
            buffer.push(b'\n');
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| SinkError::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(&buffer)
            .await
            .map_err(|e| SinkError::io(&path, e))?;
        writer.flush().await.map_err(|e| SinkError::io(&path, e))?;
        writer
            .get_ref()
            .sync_all()
            .await
            .map_err(|e| SinkError::io(&path, e))?;

        info!(count = documents.len(), path = %path.display(), "wrote documents");
        Ok(documents.len())
    }
}
