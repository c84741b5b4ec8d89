//! Local worker pool with a join barrier.
//!
//! [`WorkerPool::scatter`] spawns one task per closure, admits at most
//! `workers` of them onto the blocking thread pool at a time, and returns
//! only after every task has finished, successfully or not. Results come
//! back in submission order regardless of completion order.

use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    /// Maximum number of tasks executing at once.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Tasks currently holding a permit.
    pub fn busy(&self) -> usize {
        self.workers - self.permits.available_permits()
    }

    /// Run every task and wait for all of them.
    ///
    /// A task that returns `Err` or panics yields `Err` in its slot; the
    /// other tasks still run to completion.
    pub async fn scatter<T, F>(&self, tasks: Vec<F>) -> Vec<anyhow::Result<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    {
        let handles: Vec<JoinHandle<anyhow::Result<T>>> = tasks
            .into_iter()
            .map(|task| {
                let permits = self.permits.clone();
                tokio::spawn(async move {
                    let _permit = permits
                        .acquire_owned()
                        .await
                        .map_err(|e| anyhow!("worker pool closed: {}", e))?;
                    tokio::task::spawn_blocking(task)
                        .await
                        .map_err(|e| anyhow!("task aborted: {}", e))?
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            let result = match handle.await {
                Ok(inner) => inner,
                Err(e) => Err(anyhow!("task aborted: {}", e)),
            };
            results.push(result);
        }
        results
    }
}
