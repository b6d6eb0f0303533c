use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::SearchError;

/// Process-wide pool that runs partition scans.
///
/// At most `workers` tasks make progress at once; the rest wait for a
/// permit. Created once at startup and shared by every search. After
/// [`shutdown`](Self::shutdown) in-flight tasks are abandoned (they resolve
/// to `None`) and new spawns are refused.
pub struct ScanPool {
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    token: CancellationToken,
    workers: usize,
}

impl ScanPool {
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            tracker: TaskTracker::new(),
            token: CancellationToken::new(),
            workers,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn is_shut_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Number of tasks spawned and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Spawn a task that runs once a worker permit is free.
    ///
    /// The handle yields `None` if the pool shut down before the task
    /// finished.
    pub fn spawn<F, T>(&self, task: F) -> Result<JoinHandle<Option<T>>, SearchError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if self.token.is_cancelled() {
            return Err(SearchError::ShutDown);
        }
        let permits = self.permits.clone();
        let token = self.token.clone();
        Ok(self.tracker.spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => None,
                out = async {
                    let _permit = permits.acquire_owned().await.ok()?;
                    Some(task.await)
                } => out,
            }
        }))
    }

    /// Abandon in-flight scans and refuse new ones. Does not wait.
    pub fn shutdown(&self) {
        if self.token.is_cancelled() {
            return;
        }
        tracing::info!(in_flight = self.in_flight(), "shutting down scan pool");
        self.token.cancel();
        self.permits.close();
        self.tracker.close();
    }
}

impl Drop for ScanPool {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
