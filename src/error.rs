//! Error kinds for the fetch → store → map → reduce pipeline.

use std::time::Duration;

use thiserror::Error;

/// Result alias for pipeline operations.
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors surfaced by the loader, stores, search engine and orchestrator.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Network failure, timeout or non-success status from the sequence provider.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Provider response was empty or not a single-record FASTA document.
    #[error("malformed sequence response: {0}")]
    Parse(String),

    #[error("invalid pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    /// Chunk persistence failure. `replace_all` leaves the previous set intact.
    #[error("chunk store error: {0}")]
    Store(String),

    #[error("job {job_id} did not finish within {waited:?}")]
    Timeout { job_id: String, waited: Duration },

    #[error("job not found: {0}")]
    JobNotFound(String),

    /// A job terminated abnormally in the named stage.
    #[error("job failed during {stage}: {message}")]
    Task { stage: String, message: String },
}

impl SearchError {
    /// True for errors caused by the upstream provider rather than the caller.
    pub fn is_upstream(&self) -> bool {
        matches!(self, SearchError::Fetch(_) | SearchError::Parse(_))
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::Fetch(err.to_string())
    }
}

impl From<sqlx::Error> for SearchError {
    fn from(err: sqlx::Error) -> Self {
        SearchError::Store(err.to_string())
    }
}
