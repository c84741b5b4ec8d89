//! End-to-end pipeline tests against the SQLite chunk store.
//!
//! The sequence provider is replaced by in-process fakes so no network is
//! needed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use seqsearch::app::build_orchestrator_with_source;
use seqsearch::chunk::split_into_chunks;
use seqsearch::config::Config;
use seqsearch::db;
use seqsearch::error::{SearchError, SearchResult};
use seqsearch::fetch::{SequenceLoader, SequenceSource};
use seqsearch::jobs::JobOrchestrator;
use seqsearch::mapreduce::{ChunkMapper, RegexMapper};
use seqsearch::migrate;
use seqsearch::models::{Chunk, JobStatus, MatchRecord};
use seqsearch::store::sqlite::SqliteChunkStore;
use seqsearch::store::ChunkStore;
use tempfile::TempDir;

// ─── Fakes ──────────────────────────────────────────────────────────

struct FakeEntrez {
    body: String,
    calls: AtomicUsize,
}

impl FakeEntrez {
    fn new(body: &str) -> Arc<Self> {
        Arc::new(Self {
            body: body.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SequenceSource for FakeEntrez {
    async fn fetch(&self, _sequence_id: &str) -> SearchResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.body.clone())
    }
}

struct DownEntrez;

#[async_trait]
impl SequenceSource for DownEntrez {
    async fn fetch(&self, _sequence_id: &str) -> SearchResult<String> {
        Err(SearchError::Fetch("connection refused".to_string()))
    }
}

/// Counts how many chunks were mapped.
struct CountingMapper {
    mapped: Arc<AtomicUsize>,
}

impl ChunkMapper for CountingMapper {
    fn map_chunk(
        &self,
        chunk: &str,
        regex: &Regex,
        offset: usize,
    ) -> anyhow::Result<Vec<MatchRecord>> {
        std::thread::sleep(Duration::from_millis(5));
        self.mapped.fetch_add(1, Ordering::SeqCst);
        RegexMapper.map_chunk(chunk, regex, offset)
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

fn test_config(tmp: &TempDir, chunk_size: usize) -> Config {
    let mut config = Config::minimal();
    config.db.path = tmp.path().join("data").join("seqsearch.sqlite");
    config.chunking.chunk_size = chunk_size;
    config.jobs.workers = 3;
    config
}

async fn sqlite_store(tmp: &TempDir) -> SqliteChunkStore {
    let pool = db::connect_path(&tmp.path().join("chunks.sqlite"))
        .await
        .unwrap();
    migrate::run_migrations(&pool).await.unwrap();
    SqliteChunkStore::new(pool)
}

// ─── Chunk store ────────────────────────────────────────────────────

#[tokio::test]
async fn test_sqlite_replace_and_list_round_trip() {
    let tmp = TempDir::new().unwrap();
    let store = sqlite_store(&tmp).await;

    let text: String = (0..103).map(|i| ['A', 'C', 'G', 'T'][i % 4]).collect();
    let chunks = split_into_chunks("s1", &text, 10);
    store.replace_all("s1", &chunks).await.unwrap();

    let stored = store.list_ordered("s1").await.unwrap();
    assert_eq!(stored.len(), 11);
    assert_eq!(stored.concat(), text);
    assert!(store.exists("s1").await.unwrap());
    assert!(!store.exists("s2").await.unwrap());
}

#[tokio::test]
async fn test_sqlite_replace_all_drops_previous_set() {
    let tmp = TempDir::new().unwrap();
    let store = sqlite_store(&tmp).await;

    store
        .replace_all("s1", &split_into_chunks("s1", "AAAAAAAAAA", 3))
        .await
        .unwrap();
    store
        .replace_all("s1", &split_into_chunks("s1", "CCCC", 3))
        .await
        .unwrap();

    assert_eq!(store.list_ordered("s1").await.unwrap(), vec!["CCC", "C"]);
}

#[tokio::test]
async fn test_sqlite_duplicate_chunk_rejected() {
    let tmp = TempDir::new().unwrap();
    let store = sqlite_store(&tmp).await;

    store
        .replace_all("s1", &split_into_chunks("s1", "ACGTACGT", 4))
        .await
        .unwrap();

    let dup = Chunk {
        sequence_id: "s1".to_string(),
        chunk_index: 1,
        data: "TTTT".to_string(),
    };
    let err = store.insert_chunk(&dup).await.unwrap_err();
    assert!(matches!(err, SearchError::Store(_)));
    assert_eq!(store.list_ordered("s1").await.unwrap(), vec!["ACGT", "ACGT"]);
}

#[tokio::test]
async fn test_sqlite_rejected_set_keeps_previous_chunks() {
    let tmp = TempDir::new().unwrap();
    let store = sqlite_store(&tmp).await;

    store
        .replace_all("s1", &split_into_chunks("s1", "ACGT", 2))
        .await
        .unwrap();

    let foreign = split_into_chunks("other", "GGGG", 2);
    assert!(store.replace_all("s1", &foreign).await.is_err());
    assert_eq!(store.list_ordered("s1").await.unwrap(), vec!["AC", "GT"]);
}

#[tokio::test]
async fn test_sqlite_failed_insert_rolls_back() {
    let tmp = TempDir::new().unwrap();
    let store = sqlite_store(&tmp).await;

    store
        .replace_all("s1", &split_into_chunks("s1", "ACGT", 2))
        .await
        .unwrap();

    // The delete and the first insert succeed; the second insert aborts.
    sqlx::query(
        "CREATE TRIGGER reject_second_chunk BEFORE INSERT ON sequence_chunks
         WHEN NEW.sequence_id = 's1' AND NEW.chunk_index = 1
         BEGIN SELECT RAISE(ABORT, 'disk full'); END",
    )
    .execute(store.pool())
    .await
    .unwrap();

    let err = store
        .replace_all("s1", &split_into_chunks("s1", "TTTTTT", 2))
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::Store(_)));
    assert_eq!(store.list_ordered("s1").await.unwrap(), vec!["AC", "GT"]);
}

#[tokio::test]
async fn test_migrations_idempotent() {
    let tmp = TempDir::new().unwrap();
    let pool = db::connect_path(&tmp.path().join("m.sqlite")).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();
}

// ─── Loader ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_loader_persists_once_across_restarts() {
    let tmp = TempDir::new().unwrap();
    let source = FakeEntrez::new(">NC_1 test\nACGTACGT\nAA\n");

    let store: Arc<dyn ChunkStore> = Arc::new(sqlite_store(&tmp).await);
    let loader = SequenceLoader::new(store, source.clone(), 4);
    loader.ensure_loaded("s1").await.unwrap();
    loader.ensure_loaded("s1").await.unwrap();

    // A second loader over the same database sees the stored chunks.
    let store: Arc<dyn ChunkStore> = Arc::new(sqlite_store(&tmp).await);
    let reopened = SequenceLoader::new(store.clone(), source.clone(), 4);
    reopened.ensure_loaded("s1").await.unwrap();

    assert_eq!(source.calls(), 1);
    assert_eq!(
        store.list_ordered("s1").await.unwrap(),
        vec!["ACGT", "ACGT", "AA"]
    );
}

// ─── Orchestrator ───────────────────────────────────────────────────

#[tokio::test]
async fn test_search_end_to_end() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp, 4);
    let source = FakeEntrez::new(">seq\nACGTACGTAA\n");
    let jobs = build_orchestrator_with_source(&config, source.clone())
        .await
        .unwrap();

    let job_id = jobs.submit("s1", "AA").await.unwrap();
    let result = jobs
        .await_result(&job_id, Duration::from_secs(10))
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        serde_json::json!({"AA": [8]})
    );
    assert_eq!(jobs.poll(&job_id).unwrap().status, JobStatus::Succeeded);
}

#[tokio::test]
async fn test_alternation_across_many_chunks() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp, 7);
    // GGCAT at 0, 20, 40; AATCGA at 10, 30
    let body = ">seq\nGGCATCCCCCAATCGACCCCGGCATCCCCCAATCGACCCCGGCAT\n";
    let jobs = build_orchestrator_with_source(&config, FakeEntrez::new(body))
        .await
        .unwrap();

    let result = jobs
        .search("s1", "AATCGA|GGCAT", Duration::from_secs(10))
        .await
        .unwrap();

    // Only the match at 0 fits inside one 7-char chunk; the rest straddle
    // a boundary and are not reported.
    for (text, positions) in &result.0 {
        for p in positions {
            assert_eq!(p / 7, (p + text.len() - 1) / 7, "{} at {} crosses a chunk", text, p);
        }
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
    assert_eq!(result.positions("GGCAT"), Some(&[0][..]));
    assert_eq!(result.positions("AATCGA"), None);
}

#[tokio::test]
async fn test_reducer_sees_every_chunk() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp, 3);
    let body = format!(">seq\n{}\n", "ACG".repeat(20));
    let mapped = Arc::new(AtomicUsize::new(0));

    let jobs = build_orchestrator_with_source(&config, FakeEntrez::new(&body))
        .await
        .unwrap();
    let jobs = JobOrchestrator::new(
        jobs.loader().clone(),
        Arc::new(seqsearch::cache::MemoryResultCache::new()),
        seqsearch::pool::WorkerPool::new(2),
        Duration::from_secs(60),
    )
    .with_mapper(Arc::new(CountingMapper {
        mapped: mapped.clone(),
    }));

    let result = jobs
        .search("s1", "ACG", Duration::from_secs(10))
        .await
        .unwrap();

    assert_eq!(mapped.load(Ordering::SeqCst), 20);
    let expected: Vec<usize> = (0..20).map(|i| i * 3).collect();
    assert_eq!(result.positions("ACG"), Some(expected.as_slice()));
}

#[tokio::test]
async fn test_fetch_failure_creates_no_job() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp, 4);
    let jobs = build_orchestrator_with_source(&config, Arc::new(DownEntrez))
        .await
        .unwrap();

    let err = jobs.submit("s1", "AA").await.unwrap_err();
    assert!(matches!(err, SearchError::Fetch(_)));
    assert_eq!(jobs.job_count(), 0);
}

#[tokio::test]
async fn test_malformed_response_is_parse_error() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp, 4);
    let jobs = build_orchestrator_with_source(&config, FakeEntrez::new(""))
        .await
        .unwrap();

    let err = jobs.submit("s1", "AA").await.unwrap_err();
    assert!(matches!(err, SearchError::Parse(_)));
}
