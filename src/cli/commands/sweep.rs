//! Sweep command - close and drop idle cached sessions

use crate::cli::output::colors;
use crate::cli::OutputFormat;
use crate::core::services::Services;
use chrono::Duration;
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

/// Arguments for the sweep command
#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Only drop sessions idle for at least this many seconds
    /// (default: every session)
    #[arg(long)]
    pub older_than_secs: Option<i64>,
}

/// Sweep response
#[derive(Debug, Serialize)]
pub struct SweepOutput {
    pub removed: usize,
    pub remaining: usize,
}

/// Execute the sweep command
pub async fn execute(
    args: SweepArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = &services.engine;
    let cutoff = args
        .older_than_secs
        .map(|secs| engine.cache().now() - Duration::seconds(secs));

    let removed = engine.clear_all_cache(cutoff)?;
    let output = SweepOutput {
        removed,
        remaining: engine.cache().entries()?.len(),
    };

    match format {
        OutputFormat::Human => {
            println!(
                "{} {} session(s), {} remaining",
                colors::success("Removed"),
                colors::number(&output.removed.to_string()),
                colors::number(&output.remaining.to_string())
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
