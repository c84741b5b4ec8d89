//! Chunk storage abstraction.
//!
//! The [`ChunkStore`] trait is the durable keyed store for sequence chunks.
//! It has no logic beyond CRUD and ordering: a sequence's chunks are only
//! ever replaced wholesale, never mutated in place.
//!
//! Implementations must be `Send + Sync` to be shared across mapper tasks.
//!
//! | Implementation | Backing |
//! |----------------|---------|
//! | [`memory::InMemoryChunkStore`] | `HashMap` behind a `RwLock`, for tests |
//! | [`sqlite::SqliteChunkStore`] | `sequence_chunks` table via `sqlx` |

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::SearchResult;
use crate::models::Chunk;

#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// True if at least one chunk is stored for `sequence_id`.
    async fn exists(&self, sequence_id: &str) -> SearchResult<bool>;

    /// Atomically drop every chunk of `sequence_id` and insert `chunks`.
    ///
    /// Readers observe either the old set or the new set, never a mix. On
    /// error the old set is left intact.
    async fn replace_all(&self, sequence_id: &str, chunks: &[Chunk]) -> SearchResult<()>;

    /// Chunk data in ascending `chunk_index` order.
    async fn list_ordered(&self, sequence_id: &str) -> SearchResult<Vec<String>>;

    /// Insert one chunk outside of `replace_all`.
    ///
    /// Fails with [`SearchError::Store`](crate::error::SearchError::Store)
    /// if `(sequence_id, chunk_index)` is already present.
    async fn insert_chunk(&self, chunk: &Chunk) -> SearchResult<()>;
}

/// Reject chunk sets whose ids or indices don't form `0..N` for one sequence.
pub(crate) fn check_chunk_set(sequence_id: &str, chunks: &[Chunk]) -> SearchResult<()> {
    for (i, c) in chunks.iter().enumerate() {
        if c.sequence_id != sequence_id {
            return Err(crate::error::SearchError::Store(format!(
                "chunk {} belongs to sequence '{}', expected '{}'",
                i, c.sequence_id, sequence_id
            )));
        }
        if c.chunk_index != i {
            return Err(crate::error::SearchError::Store(format!(
                "chunk at position {} has index {}; indices must be contiguous from 0",
                i, c.chunk_index
            )));
        }
    }
    Ok(())
}
