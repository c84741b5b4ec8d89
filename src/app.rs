//! Wires the configured components into a [`JobOrchestrator`].

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::cache::MemoryResultCache;
use crate::config::Config;
use crate::db;
use crate::fetch::{EntrezSource, SequenceLoader, SequenceSource};
use crate::jobs::JobOrchestrator;
use crate::migrate;
use crate::pool::WorkerPool;
use crate::store::sqlite::SqliteChunkStore;
use crate::store::ChunkStore;

/// SQLite chunk store + Entrez source + in-memory result cache.
pub async fn build_orchestrator(config: &Config) -> Result<Arc<JobOrchestrator>> {
    let source = Arc::new(EntrezSource::new(&config.fetch)?);
    build_orchestrator_with_source(config, source).await
}

/// Same as [`build_orchestrator`] with a caller-supplied sequence source.
pub async fn build_orchestrator_with_source(
    config: &Config,
    source: Arc<dyn SequenceSource>,
) -> Result<Arc<JobOrchestrator>> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;
    let store: Arc<dyn ChunkStore> = Arc::new(SqliteChunkStore::new(pool));

    info!(
        db = %config.db.path.display(),
        chunk_size = config.chunking.chunk_size,
        workers = config.jobs.workers,
        "search engine ready"
    );

    let loader = Arc::new(SequenceLoader::new(
        store,
        source,
        config.chunking.chunk_size,
    ));
    let orchestrator = JobOrchestrator::new(
        loader,
        Arc::new(MemoryResultCache::new()),
        WorkerPool::new(config.jobs.workers),
        config.cache_ttl(),
    )
    .with_retention(config.job_retention());

    Ok(Arc::new(orchestrator))
}
