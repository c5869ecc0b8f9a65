//! Harvest configuration: defaults, optional TOML file, validation.
//!
//! Resolution order is defaults → config file → CLI flags; the binary applies
//! the last step. The config file is looked up at, in priority order:
//!
//! 1. an explicit path (`--config`)
//! 2. `$XDG_CONFIG_HOME/jira-harvest/config.toml`
//! 3. `$HOME/.config/jira-harvest/config.toml`
//!
//! ```toml
//! sources = ["HADOOP", "SPARK", "KAFKA"]
//! page_size = 50
//! cap = 200
//! page_delay_ms = 1000
//! output_dir = "data"
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::fetch::RetryPolicy;
use crate::fetch::constants::REQUEST_TIMEOUT_SECS;
use crate::pagination::{DEFAULT_CAP, DEFAULT_PAGE_DELAY, DEFAULT_PAGE_SIZE, PaginationSettings};
use crate::user_agent::default_user_agent;

/// Default Apache Jira search endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://issues.apache.org/jira/rest/api/2/search";

/// Default projects harvested.
pub const DEFAULT_SOURCES: [&str; 3] = ["HADOOP", "SPARK", "KAFKA"];

/// Default output directory.
pub const DEFAULT_OUTPUT_DIR: &str = "data";

/// Checkpoint file name inside the output directory.
pub const CHECKPOINT_FILE_NAME: &str = "checkpoints.json";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// The config file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`FileConfig`].
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// The config file path.
        path: PathBuf,
        /// The underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A value is outside its allowed range.
    #[error("invalid config value for `{field}`: {value}. Expected {expected}")]
    Invalid {
        /// Field name.
        field: &'static str,
        /// Offending value, rendered.
        value: String,
        /// Human-readable constraint.
        expected: &'static str,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, value: impl ToString, expected: &'static str) -> Self {
        Self::Invalid {
            field,
            value: value.to_string(),
            expected,
        }
    }
}

/// Optional overrides read from the TOML config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub sources: Option<Vec<String>>,
    pub endpoint: Option<String>,
    pub page_size: Option<u32>,
    pub cap: Option<usize>,
    pub page_delay_ms: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub max_attempts: Option<u32>,
    pub output_dir: Option<PathBuf>,
    /// Defaults to `<output_dir>/checkpoints.json`.
    pub checkpoint_path: Option<PathBuf>,
    pub user_agent: Option<String>,
}

impl FileConfig {
    /// Parses TOML text.
    ///
    /// # Errors
    ///
    /// Returns the TOML error if the text is not a valid config.
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Reads and parses a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Resolves the default config path.
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg).join("jira-harvest").join("config.toml"));
    }
    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("jira-harvest")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the explicit config file, or the default one if it exists.
///
/// An explicit path must exist; a missing default file is not an error.
///
/// # Errors
///
/// Returns [`ConfigError`] if a file exists but cannot be read or parsed.
pub fn load_file_config(explicit: Option<&Path>) -> Result<Option<FileConfig>, ConfigError> {
    if let Some(path) = explicit {
        return FileConfig::load(path).map(Some);
    }
    match resolve_default_config_path() {
        Some(path) if path.exists() => FileConfig::load(&path).map(Some),
        _ => Ok(None),
    }
}

/// Everything the harvest driver needs.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Sources (projects) harvested in order.
    pub sources: Vec<String>,
    /// Search endpoint URL.
    pub endpoint: String,
    /// Page size, cap, and politeness delay.
    pub pagination: PaginationSettings,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Retry policy for each request.
    pub retry_policy: RetryPolicy,
    /// Directory for JSONL output.
    pub output_dir: PathBuf,
    /// Checkpoint registry file.
    pub checkpoint_path: PathBuf,
    /// User-Agent header.
    pub user_agent: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        let output_dir = PathBuf::from(DEFAULT_OUTPUT_DIR);
        Self {
            sources: DEFAULT_SOURCES.iter().map(|s| (*s).to_string()).collect(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            pagination: PaginationSettings {
                page_size: DEFAULT_PAGE_SIZE,
                cap: DEFAULT_CAP,
                page_delay: DEFAULT_PAGE_DELAY,
            },
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            retry_policy: RetryPolicy::default(),
            checkpoint_path: output_dir.join(CHECKPOINT_FILE_NAME),
            output_dir,
            user_agent: default_user_agent(),
        }
    }
}

impl HarvestConfig {
    /// Applies file overrides on top of `self`.
    #[must_use]
    pub fn merge_file(mut self, file: &FileConfig) -> Self {
        if let Some(sources) = &file.sources {
            self.sources.clone_from(sources);
        }
        if let Some(endpoint) = &file.endpoint {
            self.endpoint.clone_from(endpoint);
        }
        if let Some(page_size) = file.page_size {
            self.pagination.page_size = page_size;
        }
        if let Some(cap) = file.cap {
            self.pagination.cap = cap;
        }
        if let Some(ms) = file.page_delay_ms {
            self.pagination.page_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = file.max_attempts {
            self.retry_policy = RetryPolicy::with_max_attempts(attempts);
        }
        if let Some(dir) = &file.output_dir {
            self.set_output_dir(dir.clone());
        }
        if let Some(path) = &file.checkpoint_path {
            self.checkpoint_path.clone_from(path);
        }
        if let Some(ua) = &file.user_agent {
            self.user_agent.clone_from(ua);
        }
        self
    }

    /// Changes the output directory, moving the checkpoint file along with it
    /// when it still sits at the default location.
    pub fn set_output_dir(&mut self, dir: PathBuf) {
        if self.checkpoint_path == self.output_dir.join(CHECKPOINT_FILE_NAME) {
            self.checkpoint_path = dir.join(CHECKPOINT_FILE_NAME);
        }
        self.output_dir = dir;
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for the first out-of-range value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::invalid("sources", "[]", "at least one source"));
        }
        if let Some(bad) = self.sources.iter().find(|s| !is_valid_source(s)) {
            return Err(ConfigError::invalid(
                "sources",
                bad,
                "alphanumeric project keys (plus `_` or `-`)",
            ));
        }
        if !(1..=1000).contains(&self.pagination.page_size) {
            return Err(ConfigError::invalid(
                "page_size",
                self.pagination.page_size,
                "1..=1000",
            ));
        }
        if self.pagination.cap == 0 {
            return Err(ConfigError::invalid("cap", 0, "at least 1"));
        }
        if self.pagination.page_delay > Duration::from_secs(60) {
            return Err(ConfigError::invalid(
                "page_delay_ms",
                self.pagination.page_delay.as_millis(),
                "0..=60000",
            ));
        }
        if !(1..=3600).contains(&self.request_timeout.as_secs()) {
            return Err(ConfigError::invalid(
                "request_timeout_secs",
                self.request_timeout.as_secs(),
                "1..=3600",
            ));
        }
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(ConfigError::invalid(
                "endpoint",
                &self.endpoint,
                "an http(s) URL",
            ));
        }
        Ok(())
    }
}

/// Source keys end up in JQL and file names, so they are kept simple.
fn is_valid_source(source: &str) -> bool {
    !source.is_empty()
        && source
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
