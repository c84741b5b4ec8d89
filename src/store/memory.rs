//! In-memory [`ChunkStore`] for tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{SearchError, SearchResult};
use crate::models::Chunk;

use super::{check_chunk_set, ChunkStore};

/// Chunks keyed by sequence id, then by chunk index.
pub struct InMemoryChunkStore {
    sequences: RwLock<HashMap<String, BTreeMap<usize, String>>>,
}

impl InMemoryChunkStore {
    pub fn new() -> Self {
        Self {
            sequences: RwLock::new(HashMap::new()),
        }
    }

    /// Number of chunks stored for `sequence_id`.
    pub fn chunk_count(&self, sequence_id: &str) -> usize {
        self.sequences
            .read()
            .map(|s| s.get(sequence_id).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }
}

impl Default for InMemoryChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> SearchError {
    SearchError::Store("in-memory chunk store lock poisoned".to_string())
}

#[async_trait]
impl ChunkStore for InMemoryChunkStore {
    async fn exists(&self, sequence_id: &str) -> SearchResult<bool> {
        let sequences = self.sequences.read().map_err(|_| poisoned())?;
        Ok(sequences
            .get(sequence_id)
            .is_some_and(|chunks| !chunks.is_empty()))
    }

    async fn replace_all(&self, sequence_id: &str, chunks: &[Chunk]) -> SearchResult<()> {
        check_chunk_set(sequence_id, chunks)?;

        // Build the new set before taking the lock; the swap is a single insert.
        let fresh: BTreeMap<usize, String> = chunks
            .iter()
            .map(|c| (c.chunk_index, c.data.clone()))
            .collect();

        let mut sequences = self.sequences.write().map_err(|_| poisoned())?;
        if fresh.is_empty() {
            sequences.remove(sequence_id);
        } else {
            sequences.insert(sequence_id.to_string(), fresh);
        }
        Ok(())
    }

    async fn list_ordered(&self, sequence_id: &str) -> SearchResult<Vec<String>> {
        let sequences = self.sequences.read().map_err(|_| poisoned())?;
        Ok(sequences
            .get(sequence_id)
            .map(|chunks| chunks.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn insert_chunk(&self, chunk: &Chunk) -> SearchResult<()> {
        let mut sequences = self.sequences.write().map_err(|_| poisoned())?;
        let entry = sequences.entry(chunk.sequence_id.clone()).or_default();
        if entry.contains_key(&chunk.chunk_index) {
            return Err(SearchError::Store(format!(
                "duplicate chunk ({}, {})",
                chunk.sequence_id, chunk.chunk_index
            )));
        }
        entry.insert(chunk.chunk_index, chunk.data.clone());
        Ok(())
    }
}
