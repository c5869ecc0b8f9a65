//! CLI entry point for the jira-harvest tool.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use jira_harvest::{
    BarProgress, HarvestConfig, Harvester, NoProgress, ProgressObserver, load_file_config,
};
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let mut config = HarvestConfig::default();
    if let Some(file) = load_file_config(args.config.as_deref()).context("loading config file")? {
        debug!(?file, "config file loaded");
        config = config.merge_file(&file);
    }
    let config = args.apply(config);
    config.validate().context("invalid configuration")?;

    info!(
        sources = ?config.sources,
        cap = config.pagination.cap,
        output_dir = %config.output_dir.display(),
        "jira-harvest starting"
    );

    let progress: Arc<dyn ProgressObserver> = if args.show_progress() {
        Arc::new(BarProgress::new())
    } else {
        Arc::new(NoProgress)
    };

    let harvester =
        Harvester::from_config(config, progress).context("failed to set up harvester")?;
    let report = harvester.run_all().await.context("harvest failed")?;

    for source in &report.sources {
        if source.had_failure() {
            warn!(
                source = %source.source,
                stop = ?source.stop,
                written = source.written,
                next_cursor = source.final_cursor,
                "source finished with errors"
            );
        } else {
            info!(
                source = %source.source,
                stop = ?source.stop,
                written = source.written,
                next_cursor = source.final_cursor,
                "source finished"
            );
        }
    }

    info!(
        written = report.total_written(),
        failed_sources = report.failed_sources(),
        "Harvest complete"
    );

    Ok(())
}
