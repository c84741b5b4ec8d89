//! SQLite-backed [`ChunkStore`].
//!
//! Rows live in the `sequence_chunks` table created by
//! [`run_migrations`](crate::migrate::run_migrations), keyed by
//! `(sequence_id, chunk_index)` with a uniqueness constraint.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::error::SearchResult;
use crate::models::Chunk;

use super::{check_chunk_set, ChunkStore};

pub struct SqliteChunkStore {
    pool: SqlitePool,
}

impl SqliteChunkStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ChunkStore for SqliteChunkStore {
    async fn exists(&self, sequence_id: &str) -> SearchResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT COUNT(*) > 0 FROM sequence_chunks WHERE sequence_id = ?",
        )
        .bind(sequence_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn replace_all(&self, sequence_id: &str, chunks: &[Chunk]) -> SearchResult<()> {
        check_chunk_set(sequence_id, chunks)?;

        // Dropping `tx` without commit rolls back, so any `?` below keeps
        // the previous chunk set.
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM sequence_chunks WHERE sequence_id = ?")
            .bind(sequence_id)
            .execute(&mut *tx)
            .await?;

        for chunk in chunks {
            sqlx::query(
                "INSERT INTO sequence_chunks (sequence_id, chunk_index, chunk_data) VALUES (?, ?, ?)",
            )
            .bind(&chunk.sequence_id)
            .bind(chunk.chunk_index as i64)
            .bind(&chunk.data)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_ordered(&self, sequence_id: &str) -> SearchResult<Vec<String>> {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT chunk_data FROM sequence_chunks WHERE sequence_id = ? ORDER BY chunk_index ASC",
        )
        .bind(sequence_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert_chunk(&self, chunk: &Chunk) -> SearchResult<()> {
        sqlx::query(
            "INSERT INTO sequence_chunks (sequence_id, chunk_index, chunk_data) VALUES (?, ?, ?)",
        )
        .bind(&chunk.sequence_id)
        .bind(chunk.chunk_index as i64)
        .bind(&chunk.data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
