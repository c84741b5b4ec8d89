//! Search job orchestration.
//!
//! A job fans one mapper task per chunk out over the [`WorkerPool`], waits
//! on the pool's barrier, then runs the reducer exactly once and writes the
//! result to the [`ResultCache`].
//!
//! # Lifecycle
//!
//! ```text
//! submit ─▶ pending ─▶ running ─┬─▶ succeeded (result set, cache written)
//!                               └─▶ failed    (stage + message, nothing cached)
//! ```
//!
//! Job state is published through a `tokio::sync::watch` channel per job:
//! [`JobOrchestrator::poll`] reads the latest value without blocking and
//! [`JobOrchestrator::await_result`] waits for a terminal value. Giving up
//! on a wait never affects the job; it keeps running and can be polled.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use regex::Regex;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::{CacheKey, ResultCache};
use crate::chunk::chunk_offsets;
use crate::error::{SearchError, SearchResult};
use crate::fetch::SequenceLoader;
use crate::mapreduce::{compile_pattern, reduce, ChunkMapper, RegexMapper};
use crate::models::{AggregatedResult, FailedStage, JobFailure, JobSnapshot, JobStatus};
use crate::pool::WorkerPool;

type JobChannel = Arc<watch::Sender<JobSnapshot>>;

pub struct JobOrchestrator {
    loader: Arc<SequenceLoader>,
    cache: Arc<dyn ResultCache>,
    pool: WorkerPool,
    mapper: Arc<dyn ChunkMapper>,
    cache_ttl: Duration,
    retention: Duration,
    jobs: RwLock<HashMap<String, JobChannel>>,
}

/// Everything the background driver of one job needs.
struct JobRun {
    job_id: String,
    key: CacheKey,
    regex: Regex,
    chunks: Vec<String>,
    offsets: Vec<usize>,
    channel: JobChannel,
    pool: WorkerPool,
    mapper: Arc<dyn ChunkMapper>,
    cache: Arc<dyn ResultCache>,
    cache_ttl: Duration,
}

fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

fn jobs_poisoned() -> SearchError {
    SearchError::Store("job table lock poisoned".to_string())
}

impl JobOrchestrator {
    pub fn new(
        loader: Arc<SequenceLoader>,
        cache: Arc<dyn ResultCache>,
        pool: WorkerPool,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            loader,
            cache,
            pool,
            mapper: Arc::new(RegexMapper),
            cache_ttl,
            retention: Duration::from_secs(24 * 60 * 60),
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the map-stage function.
    pub fn with_mapper(mut self, mapper: Arc<dyn ChunkMapper>) -> Self {
        self.mapper = mapper;
        self
    }

    /// How long finished jobs stay pollable before [`prune_finished`](Self::prune_finished) drops them.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn loader(&self) -> &Arc<SequenceLoader> {
        &self.loader
    }

    /// Start a search of `sequence_id` for `pattern` and return its job id.
    ///
    /// The pattern is validated before anything else, so an invalid pattern
    /// fails here with [`SearchError::Pattern`] and no job is created. A
    /// cached result yields a job that is already succeeded. Fetch and store
    /// failures while loading the sequence are returned directly.
    pub async fn submit(&self, sequence_id: &str, pattern: &str) -> SearchResult<String> {
        let regex = compile_pattern(pattern)?;
        let job_id = Uuid::new_v4().to_string();
        let key = CacheKey::new(sequence_id, pattern);

        if let Some(cached) = self.cache.get(&key) {
            info!(%job_id, sequence_id, pattern, "cache hit");
            let mut snapshot = self.new_snapshot(&job_id, sequence_id, pattern);
            snapshot.status = JobStatus::Succeeded;
            snapshot.result = Some(cached);
            self.register(snapshot)?;
            return Ok(job_id);
        }

        self.loader.ensure_loaded(sequence_id).await?;
        let chunks = self.loader.store().list_ordered(sequence_id).await?;
        let offsets = chunk_offsets(&chunks);

        let channel = self.register(self.new_snapshot(&job_id, sequence_id, pattern))?;
        info!(%job_id, sequence_id, pattern, chunks = chunks.len(), "submitted search job");

        let run = JobRun {
            job_id: job_id.clone(),
            key,
            regex,
            chunks,
            offsets,
            channel: channel.clone(),
            pool: self.pool.clone(),
            mapper: self.mapper.clone(),
            cache: self.cache.clone(),
            cache_ttl: self.cache_ttl,
        };
        let driver = tokio::spawn(drive(run));
        let supervised_id = job_id.clone();
        tokio::spawn(async move {
            if let Err(e) = driver.await {
                let finished = channel.borrow().is_ready();
                if !finished {
                    fail(
                        &channel,
                        &supervised_id,
                        FailedStage::Reduce,
                        format!("job driver aborted: {}", e),
                    );
                }
            }
        });

        Ok(job_id)
    }

    /// Latest state of a job. Never blocks on the job itself.
    pub fn poll(&self, job_id: &str) -> SearchResult<JobSnapshot> {
        let channel = self.channel(job_id)?;
        let snapshot = channel.borrow().clone();
        Ok(snapshot)
    }

    /// Wait up to `timeout` for the job to finish.
    ///
    /// Returns the aggregated result on success, [`SearchError::Task`] if the
    /// job failed and [`SearchError::Timeout`] if the deadline passed first.
    pub async fn await_result(
        &self,
        job_id: &str,
        timeout: Duration,
    ) -> SearchResult<AggregatedResult> {
        let mut rx = self.channel(job_id)?.subscribe();

        let snapshot = match tokio::time::timeout(timeout, rx.wait_for(|s| s.is_ready())).await {
            Err(_) => {
                return Err(SearchError::Timeout {
                    job_id: job_id.to_string(),
                    waited: timeout,
                })
            }
            Ok(Err(_)) => return Err(SearchError::JobNotFound(job_id.to_string())),
            Ok(Ok(snapshot)) => snapshot.clone(),
        };

        match (snapshot.status, snapshot.result, snapshot.error) {
            (JobStatus::Succeeded, Some(result), _) => Ok(result),
            (_, _, Some(failure)) => Err(SearchError::Task {
                stage: failure.stage.to_string(),
                message: failure.message,
            }),
            (status, _, _) => Err(SearchError::Task {
                stage: "orchestration".to_string(),
                message: format!("job ended as {} without a result", status),
            }),
        }
    }

    /// Submit and wait: the blocking form used by the CLI.
    pub async fn search(
        &self,
        sequence_id: &str,
        pattern: &str,
        timeout: Duration,
    ) -> SearchResult<AggregatedResult> {
        let job_id = self.submit(sequence_id, pattern).await?;
        self.await_result(&job_id, timeout).await
    }

    /// Drop finished jobs whose last update is older than the retention
    /// window. Returns how many were removed.
    pub fn prune_finished(&self) -> usize {
        let cutoff = now_ts() - self.retention.as_secs() as i64;
        let Ok(mut jobs) = self.jobs.write() else {
            return 0;
        };
        let before = jobs.len();
        jobs.retain(|_, channel| {
            let s = channel.borrow();
            let expired = s.is_ready() && s.updated_at < cutoff;
            !expired
        });
        let removed = before - jobs.len();
        if removed > 0 {
            debug!(removed, "pruned finished jobs");
        }
        removed
    }

    /// Free expired result cache entries. Returns how many were removed.
    pub fn purge_expired_results(&self) -> usize {
        let removed = self.cache.purge_expired();
        if removed > 0 {
            debug!(removed, "purged expired cached results");
        }
        removed
    }

    pub fn job_count(&self) -> usize {
        self.jobs.read().map(|j| j.len()).unwrap_or(0)
    }

    fn new_snapshot(&self, job_id: &str, sequence_id: &str, pattern: &str) -> JobSnapshot {
        JobSnapshot {
            job_id: job_id.to_string(),
            sequence_id: sequence_id.to_string(),
            pattern: pattern.to_string(),
            status: JobStatus::Pending,
            result: None,
            error: None,
            updated_at: now_ts(),
        }
    }

    fn register(&self, snapshot: JobSnapshot) -> SearchResult<JobChannel> {
        let job_id = snapshot.job_id.clone();
        let (tx, _rx) = watch::channel(snapshot);
        let channel = Arc::new(tx);
        self.jobs
            .write()
            .map_err(|_| jobs_poisoned())?
            .insert(job_id, channel.clone());
        Ok(channel)
    }

    fn channel(&self, job_id: &str) -> SearchResult<JobChannel> {
        self.jobs
            .read()
            .map_err(|_| jobs_poisoned())?
            .get(job_id)
            .cloned()
            .ok_or_else(|| SearchError::JobNotFound(job_id.to_string()))
    }
}

/// Background driver: map, barrier, reduce, publish.
async fn drive(run: JobRun) {
    let JobRun {
        job_id,
        key,
        regex,
        chunks,
        offsets,
        channel,
        pool,
        mapper,
        cache,
        cache_ttl,
    } = run;

    channel.send_modify(|s| {
        s.status = JobStatus::Running;
        s.updated_at = now_ts();
    });

    let tasks: Vec<_> = chunks
        .into_iter()
        .zip(offsets)
        .enumerate()
        .map(|(chunk_index, (chunk, offset))| {
            let mapper = mapper.clone();
            let regex = regex.clone();
            debug!(%job_id, chunk_index, offset, "dispatching mapper");
            move || mapper.map_chunk(&chunk, &regex, offset)
        })
        .collect();

    let results = pool.scatter(tasks).await;

    let mut per_chunk = Vec::with_capacity(results.len());
    for (chunk_index, result) in results.into_iter().enumerate() {
        match result {
            Ok(matches) => per_chunk.push(matches),
            Err(e) => {
                fail(
                    &channel,
                    &job_id,
                    FailedStage::Map { chunk_index },
                    format!("{:#}", e),
                );
                return;
            }
        }
    }

    let aggregated = match tokio::task::spawn_blocking(move || reduce(per_chunk)).await {
        Ok(aggregated) => aggregated,
        Err(e) => {
            fail(&channel, &job_id, FailedStage::Reduce, e.to_string());
            return;
        }
    };

    cache.set(key, aggregated.clone(), cache_ttl);
    info!(
        %job_id,
        distinct = aggregated.len(),
        matches = aggregated.match_count(),
        "search job succeeded"
    );

    channel.send_modify(|s| {
        s.status = JobStatus::Succeeded;
        s.result = Some(aggregated);
        s.updated_at = now_ts();
    });
}

fn fail(channel: &JobChannel, job_id: &str, stage: FailedStage, message: String) {
    warn!(%job_id, %stage, %message, "search job failed");
    channel.send_modify(|s| {
        s.status = JobStatus::Failed;
        s.error = Some(JobFailure { stage, message });
        s.updated_at = now_ts();
    });
}
