//! Per-source resume cursors persisted as a pretty-printed JSON object.
//!
//! The [`CheckpointStore`] owns the file; the [`CheckpointRegistry`] is the
//! in-memory map. [`Checkpoints`] pairs the two so that every mutation is an
//! explicit call followed by an explicit persist.
//!
//! ```text
//! {
//!   "HADOOP": 200,
//!   "KAFKA": 150
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Errors that can occur while persisting checkpoints.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// File system error while writing the registry.
    #[error("IO error writing checkpoints to {path}: {source}")]
    Io {
        /// The file being written.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The registry could not be serialized.
    #[error("failed to serialize checkpoints: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl CheckpointError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Source identifier → cursor. Keys stay sorted so the file diffs cleanly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckpointRegistry {
    cursors: BTreeMap<String, u64>,
}

impl CheckpointRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The resume cursor for `source`, zero if never recorded.
    #[must_use]
    pub fn cursor(&self, source: &str) -> u64 {
        self.cursors.get(source).copied().unwrap_or(0)
    }

    /// Records `cursor` for `source`.
    ///
    /// Cursors never move backwards; a lower value is ignored and `false` is
    /// returned.
    pub fn advance(&mut self, source: &str, cursor: u64) -> bool {
        let current = self.cursor(source);
        if cursor < current {
            warn!(source, current, cursor, "ignoring checkpoint regression");
            return false;
        }
        self.cursors.insert(source.to_string(), cursor);
        true
    }

    /// Number of sources with a recorded cursor.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    /// Whether no cursor has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    /// Iterates `(source, cursor)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.cursors.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<const N: usize> From<[(&str, u64); N]> for CheckpointRegistry {
    fn from(entries: [(&str, u64); N]) -> Self {
        Self {
            cursors: entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }
}

/// Reads and writes the registry file.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Creates a store backed by `path`. Nothing is read until [`load`](Self::load).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The registry file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the registry. A missing file yields an empty registry; an
    /// unreadable or corrupt file does too, with a warning.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> CheckpointRegistry {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no checkpoint file, starting fresh");
                return CheckpointRegistry::new();
            }
            Err(e) => {
                warn!(error = %e, "unreadable checkpoint file; starting fresh");
                return CheckpointRegistry::new();
            }
        };

        match serde_json::from_slice::<CheckpointRegistry>(&raw) {
            Ok(registry) => {
                debug!(sources = registry.len(), "loaded checkpoints");
                registry
            }
            Err(e) => {
                warn!(error = %e, "corrupt checkpoint file; starting fresh");
                CheckpointRegistry::new()
            }
        }
    }

    /// Overwrites the file with the whole registry.
    ///
    /// Writes a sibling temp file and renames it over the target so a crash
    /// mid-write leaves the previous registry intact.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError`] if serialization or any file operation fails.
    #[instrument(skip(self, registry), fields(path = %self.path.display()))]
    pub async fn save(&self, registry: &CheckpointRegistry) -> Result<(), CheckpointError> {
        let mut body = serde_json::to_vec_pretty(registry)?;
        body.push(b'\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CheckpointError::io(parent, e))?;
        }

        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, &body)
            .await
            .map_err(|e| CheckpointError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| CheckpointError::io(&self.path, e))?;

        debug!(sources = registry.len(), "saved checkpoints");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_else(|| "checkpoints.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Registry plus the store it persists to, passed explicitly to the paginator.
#[derive(Debug)]
pub struct Checkpoints {
    store: CheckpointStore,
    registry: CheckpointRegistry,
}

impl Checkpoints {
    /// Loads the registry from `store`.
    pub async fn load(store: CheckpointStore) -> Self {
        let registry = store.load().await;
        Self { store, registry }
    }

    /// Wraps an already-loaded registry.
    #[must_use]
    pub fn with_registry(store: CheckpointStore, registry: CheckpointRegistry) -> Self {
        Self { store, registry }
    }

    /// The resume cursor for `source`.
    #[must_use]
    pub fn cursor(&self, source: &str) -> u64 {
        self.registry.cursor(source)
    }

    /// The in-memory registry.
    #[must_use]
    pub fn registry(&self) -> &CheckpointRegistry {
        &self.registry
    }

    /// Advances `source` to `cursor` and persists the whole registry.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError`] if the registry cannot be written.
    pub async fn record(&mut self, source: &str, cursor: u64) -> Result<(), CheckpointError> {
        self.registry.advance(source, cursor);
        self.store.save(&self.registry).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_cursor_defaults_to_zero() {
        let registry = CheckpointRegistry::new();
        assert_eq!(registry.cursor("HADOOP"), 0);
    }

    #[test]
    fn test_advance_is_monotonic() {
        let mut registry = CheckpointRegistry::new();
        assert!(registry.advance("A", 40));
        assert!(registry.advance("A", 40));
        assert!(!registry.advance("A", 10));
        assert_eq!(registry.cursor("A"), 40);
        assert!(registry.advance("A", 90));
        assert_eq!(registry.cursor("A"), 90);
    }

    #[test]
    fn test_advance_to_zero_records_new_source() {
        let mut registry = CheckpointRegistry::new();
        assert!(registry.advance("A", 0));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("checkpoints.json"));
        let registry = CheckpointRegistry::from([("A", 40)]);

        store.save(&registry).await.unwrap();
        assert_eq!(store.load().await, registry);
    }

    #[tokio::test]
    async fn test_saved_file_is_pretty_json_object() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("checkpoints.json"));
        store
            .save(&CheckpointRegistry::from([("KAFKA", 150), ("HADOOP", 200)]))
            .await
            .unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(text, "{\n  \"HADOOP\": 200,\n  \"KAFKA\": 150\n}\n");
        assert!(!dir.path().join("checkpoints.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("absent.json"));
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("checkpoints.json");
        std::fs::write(&path, b"{\"A\": 4").unwrap();
        assert!(CheckpointStore::new(&path).load().await.is_empty());

        std::fs::write(&path, b"{\"A\": -3}").unwrap();
        assert!(CheckpointStore::new(&path).load().await.is_empty());
    }

    #[tokio::test]
    async fn test_save_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("nested/out/checkpoints.json"));
        store.save(&CheckpointRegistry::from([("A", 1)])).await.unwrap();
        assert_eq!(store.load().await.cursor("A"), 1);
    }

    #[tokio::test]
    async fn test_record_persists_each_mutation() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("checkpoints.json"));
        let mut checkpoints = Checkpoints::load(store.clone()).await;

        checkpoints.record("SPARK", 50).await.unwrap();
        assert_eq!(store.load().await.cursor("SPARK"), 50);
        checkpoints.record("SPARK", 100).await.unwrap();
        assert_eq!(store.load().await.cursor("SPARK"), 100);
    }
}
