//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use jira_harvest::{HarvestConfig, RetryPolicy};

/// Harvest Jira issues into JSONL training data.
///
/// Every run resumes each project where the previous run stopped, collects at
/// most `--cap` new issues per project, and appends them to
/// `<output-dir>/<project>_issues.jsonl`.
#[derive(Parser, Debug)]
#[command(name = "jira-harvest")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/jira-harvest/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Projects to harvest, in order (comma-separated or repeated)
    #[arg(short = 's', long = "sources", value_name = "KEY", value_delimiter = ',')]
    pub sources: Vec<String>,

    /// Search endpoint URL
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Issues requested per page (1-1000)
    #[arg(short = 'p', long, value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub page_size: Option<u32>,

    /// Maximum new issues per project per run
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u64).range(1..))]
    pub cap: Option<u64>,

    /// Delay after every page in milliseconds (0 to disable, max 60000)
    #[arg(short = 'l', long, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub page_delay_ms: Option<u64>,

    /// Per-request timeout in seconds (1-3600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub request_timeout_secs: Option<u64>,

    /// Attempts per request before giving up (1-10)
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_attempts: Option<u32>,

    /// Directory for JSONL output
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Checkpoint file (defaults to <output-dir>/checkpoints.json)
    #[arg(long, value_name = "PATH")]
    pub checkpoint_path: Option<PathBuf>,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl Args {
    /// Applies flags that were given on top of `config`.
    pub fn apply(&self, mut config: HarvestConfig) -> HarvestConfig {
        if !self.sources.is_empty() {
            config.sources.clone_from(&self.sources);
        }
        if let Some(endpoint) = &self.endpoint {
            config.endpoint.clone_from(endpoint);
        }
        if let Some(page_size) = self.page_size {
            config.pagination.page_size = page_size;
        }
        if let Some(cap) = self.cap {
            config.pagination.cap = usize::try_from(cap).unwrap_or(usize::MAX);
        }
        if let Some(ms) = self.page_delay_ms {
            config.pagination.page_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = self.request_timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = self.max_attempts {
            config.retry_policy = RetryPolicy::with_max_attempts(attempts);
        }
        if let Some(dir) = &self.output_dir {
            config.set_output_dir(dir.clone());
        }
        if let Some(path) = &self.checkpoint_path {
            config.checkpoint_path.clone_from(path);
        }
        config
    }

    /// Whether a progress bar should be drawn.
    pub fn show_progress(&self) -> bool {
        !self.quiet && !self.no_progress
    }
}
