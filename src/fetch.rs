//! Sequence loader.
//!
//! Fetches a single-record FASTA document from an external provider,
//! normalizes it into one sequence string, splits it into fixed-size chunks
//! and persists them through a [`ChunkStore`].
//!
//! # Flow
//!
//! ```text
//! ensure_loaded(id)
//!   ├─ store.exists(id)?  ── yes ─▶ AlreadyStored (no network)
//!   └─ no ─▶ source.fetch(id) ─▶ parse_fasta ─▶ split_into_chunks ─▶ store.replace_all
//! ```
//!
//! The whole flow runs under a per-sequence async lock, so two concurrent
//! callers for the same unseen id produce exactly one fetch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::chunk::split_into_chunks;
use crate::config::FetchConfig;
use crate::error::{SearchError, SearchResult};
use crate::store::ChunkStore;

/// Provider of raw single-record FASTA text.
#[async_trait]
pub trait SequenceSource: Send + Sync {
    async fn fetch(&self, sequence_id: &str) -> SearchResult<String>;
}

/// NCBI Entrez `efetch` client.
pub struct EntrezSource {
    client: reqwest::Client,
    base_url: String,
    database: String,
}

impl EntrezSource {
    pub fn new(config: &FetchConfig) -> SearchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            database: config.database.clone(),
        })
    }
}

#[async_trait]
impl SequenceSource for EntrezSource {
    async fn fetch(&self, sequence_id: &str) -> SearchResult<String> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("db", self.database.as_str()),
                ("id", sequence_id),
                ("rettype", "fasta"),
                ("retmode", "text"),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SearchError::Fetch(format!(
                "provider returned {} for '{}': {}",
                status,
                sequence_id,
                body.trim()
            )));
        }

        Ok(resp.text().await?)
    }
}

/// Extract the sequence from a single-record FASTA document.
///
/// Header lines (starting with `>`) are dropped and all remaining lines are
/// concatenated without separators. A header-only document yields an empty
/// sequence; an empty document, or one that does not start with a header,
/// is a [`SearchError::Parse`].
pub fn parse_fasta(raw: &str) -> SearchResult<String> {
    let mut lines = raw
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .peekable();

    match lines.peek() {
        None => return Err(SearchError::Parse("empty response".to_string())),
        Some(first) if !first.starts_with('>') => {
            let preview: String = first.chars().take(80).collect();
            return Err(SearchError::Parse(format!(
                "expected FASTA header, got: {}",
                preview
            )));
        }
        Some(_) => {}
    }

    let mut sequence = String::with_capacity(raw.len());
    for line in lines {
        if !line.starts_with('>') {
            sequence.push_str(line);
        }
    }
    Ok(sequence)
}

/// What [`SequenceLoader::ensure_loaded`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Chunks were already stored; nothing was fetched.
    AlreadyStored,
    /// The sequence was fetched and stored.
    Fetched { length: usize, chunks: usize },
}

pub struct SequenceLoader {
    store: Arc<dyn ChunkStore>,
    source: Arc<dyn SequenceSource>,
    chunk_size: usize,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SequenceLoader {
    pub fn new(
        store: Arc<dyn ChunkStore>,
        source: Arc<dyn SequenceSource>,
        chunk_size: usize,
    ) -> Self {
        assert!(chunk_size > 0, "chunk_size must be > 0");
        Self {
            store,
            source,
            chunk_size,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn ChunkStore> {
        &self.store
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn lock_for(&self, sequence_id: &str) -> SearchResult<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| SearchError::Store("loader lock table poisoned".to_string()))?;
        Ok(locks
            .entry(sequence_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone())
    }

    /// Drop the map entry for `sequence_id` unless another caller still holds it.
    fn release_lock(&self, sequence_id: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let Ok(mut locks) = self.locks.lock() else {
            return;
        };
        // one reference in the map, one here
        if Arc::strong_count(&lock) == 2 {
            locks.remove(sequence_id);
        }
    }

    /// Make sure the chunks for `sequence_id` are stored, fetching at most once.
    pub async fn ensure_loaded(&self, sequence_id: &str) -> SearchResult<LoadOutcome> {
        let lock = self.lock_for(sequence_id)?;
        let outcome = {
            let _guard = lock.lock().await;
            self.load_locked(sequence_id).await
        };
        self.release_lock(sequence_id, lock);
        outcome
    }

    async fn load_locked(&self, sequence_id: &str) -> SearchResult<LoadOutcome> {
        if self.store.exists(sequence_id).await? {
            debug!(sequence_id, "sequence already stored, skipping fetch");
            return Ok(LoadOutcome::AlreadyStored);
        }

        info!(sequence_id, "fetching sequence");
        let raw = self.source.fetch(sequence_id).await?;
        let sequence = parse_fasta(&raw)?;
        let chunks = split_into_chunks(sequence_id, &sequence, self.chunk_size);
        self.store.replace_all(sequence_id, &chunks).await?;

        let length = crate::chunk::char_len(&sequence);
        info!(
            sequence_id,
            chunks = chunks.len(),
            length,
            "stored sequence"
        );
        Ok(LoadOutcome::Fetched {
            length,
            chunks: chunks.len(),
        })
    }
}
