//! Bounded task pool
//!
//! A fixed number of execution slots (a semaphore), a submission queue
//! (tasks parked on the semaphore) and a join barrier that collects every
//! task's result. One task failing never cancels its siblings.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sprig_core::error::{SprigError, SprigResult};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::error;

/// Pool of keyed async tasks with at most `limit` running at once
#[derive(Debug)]
pub struct TaskPool<K, T> {
    limit: usize,
    semaphore: Arc<Semaphore>,
    tasks: JoinSet<(K, SprigResult<T>)>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl<K, T> TaskPool<K, T>
where
    K: Send + 'static,
    T: Send + 'static,
{
    /// Create a pool with `limit` slots (at least one)
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            limit,
            semaphore: Arc::new(Semaphore::new(limit)),
            tasks: JoinSet::new(),
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of slots
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Tasks submitted and not yet joined
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Highest number of tasks observed running at the same time
    pub fn peak_active(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Queue `task`; it starts once a slot frees up.
    ///
    /// `key` comes back with the task's result, including when the task panics.
    pub fn spawn<F>(&mut self, key: K, task: F)
    where
        F: Future<Output = SprigResult<T>> + Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);
        let active = Arc::clone(&self.active);
        let peak = Arc::clone(&self.peak);

        self.tasks.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    return (
                        key,
                        Err(SprigError::TaskFailed {
                            message: "task pool was shut down".to_string(),
                        }),
                    )
                },
            };

            let running = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(running, Ordering::SeqCst);

            // Run on its own task so a panic surfaces as an error for this key
            let result = match tokio::spawn(task).await {
                Ok(result) => result,
                Err(join_error) => {
                    error!(error = %join_error, "Pooled task panicked or was cancelled");
                    Err(SprigError::TaskFailed {
                        message: join_error.to_string(),
                    })
                },
            };

            active.fetch_sub(1, Ordering::SeqCst);
            (key, result)
        });
    }

    /// Wait for every queued task and return results in completion order
    pub async fn join_all(&mut self) -> Vec<(K, SprigResult<T>)> {
        let mut results = Vec::with_capacity(self.tasks.len());

        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(entry) => results.push(entry),
                // The wrapper only awaits and never panics; a failure here means
                // the runtime is shutting down and the key is lost with it.
                Err(join_error) => error!(error = %join_error, "Pool worker was cancelled"),
            }
        }

        results
    }
}
