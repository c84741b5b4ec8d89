//! Core data models shared by the loader, the search engine and the
//! orchestrator.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One stored slice of a sequence.
///
/// `data` holds exactly `chunk_size` characters for every chunk except
/// possibly the last one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub sequence_id: String,
    pub chunk_index: usize,
    pub data: String,
}

/// A single match reported by the map stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    /// Zero-based character offset into the full sequence.
    pub position: usize,
    pub matched_text: String,
}

impl MatchRecord {
    pub fn new(position: usize, matched_text: impl Into<String>) -> Self {
        Self {
            position,
            matched_text: matched_text.into(),
        }
    }
}

/// Distinct matched text → ascending global positions.
///
/// Serialises as a plain JSON object, e.g. `{"AA": [0, 7], "BB": [9]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregatedResult(pub BTreeMap<String, Vec<usize>>);

impl AggregatedResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: MatchRecord) {
        self.0
            .entry(record.matched_text)
            .or_default()
            .push(record.position);
    }

    pub fn positions(&self, matched_text: &str) -> Option<&[usize]> {
        self.0.get(matched_text).map(Vec::as_slice)
    }

    /// Total number of matches across all groups.
    pub fn match_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Pipeline stage a failed job stopped in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailedStage {
    Map { chunk_index: usize },
    Reduce,
}

impl fmt::Display for FailedStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailedStage::Map { chunk_index } => write!(f, "map (chunk {})", chunk_index),
            FailedStage::Reduce => f.write_str("reduce"),
        }
    }
}

/// Why a job ended in [`JobStatus::Failed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub stage: FailedStage,
    pub message: String,
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.message)
    }
}

/// Point-in-time view of a search job, as returned by `poll`.
///
/// `result` is set only when succeeded, `error` only when failed.
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    pub job_id: String,
    pub sequence_id: String,
    pub pattern: String,
    pub status: JobStatus,
    pub result: Option<AggregatedResult>,
    pub error: Option<JobFailure>,
    /// Unix timestamp (seconds) of the last status change.
    pub updated_at: i64,
}

impl JobSnapshot {
    pub fn is_ready(&self) -> bool {
        self.status.is_terminal()
    }
}
