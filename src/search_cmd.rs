//! `seqsearch search` and `seqsearch load` commands.
//!
//! `search` submits a job, blocks up to `[jobs].await_timeout_secs` and
//! writes the grouped matches as indented JSON, either to `--output` or to
//! `search_results_<id>_<timestamp>.json` in the working directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::app::build_orchestrator;
use crate::config::Config;
use crate::fetch::LoadOutcome;
use crate::models::AggregatedResult;

pub async fn run_search(
    config: &Config,
    sequence_id: &str,
    pattern: &str,
    output: Option<PathBuf>,
) -> Result<PathBuf> {
    let jobs = build_orchestrator(config).await?;

    println!(
        "Running search on ID {} with pattern '{}'",
        sequence_id, pattern
    );
    let job_id = jobs.submit(sequence_id, pattern).await?;

    println!("Waiting for results (job {})...", job_id);
    let result = jobs.await_result(&job_id, config.await_timeout()).await?;

    let path = output.unwrap_or_else(|| default_output_path(sequence_id, Local::now()));
    write_result(&path, &result)?;

    println!(
        "Search complete: {} distinct matches, {} total. Results saved to {}",
        result.len(),
        result.match_count(),
        path.display()
    );
    Ok(path)
}

/// Fetch and store a sequence without searching it.
pub async fn run_load(config: &Config, sequence_id: &str) -> Result<()> {
    let jobs = build_orchestrator(config).await?;
    match jobs.loader().ensure_loaded(sequence_id).await? {
        LoadOutcome::AlreadyStored => {
            println!("Sequence ID {} already stored. Skipping fetch.", sequence_id);
        }
        LoadOutcome::Fetched { length, chunks } => {
            println!(
                "Saved {} chunks for sequence ID {} (total length: {} bp)",
                chunks, sequence_id, length
            );
        }
    }
    Ok(())
}

/// `search_results_<id>_<YYYYmmdd_HHMMSS>.json` in the working directory.
pub fn default_output_path(sequence_id: &str, at: DateTime<Local>) -> PathBuf {
    let filename = format!(
        "search_results_{}_{}.json",
        sanitize(sequence_id),
        at.format("%Y%m%d_%H%M%S")
    );
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(filename)
}

pub fn write_result(path: &Path, result: &AggregatedResult) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write results to {}", path.display()))?;
    Ok(())
}

/// Keep ids usable as file name components.
fn sanitize(sequence_id: &str) -> String {
    sequence_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
