//! Detached refreshes that outlive the request that started them.

use cidian_core::Error;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinSet;

/// Tracked set of background tasks.
///
/// Failures are logged, never surfaced to whoever spawned the task.
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn `work` on the runtime, reaping tasks that already finished.
    pub fn spawn<F>(&self, label: &'static str, work: F)
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let mut tasks = self.lock();
        while let Some(done) = tasks.try_join_next() {
            log_join(done);
        }
        tasks.spawn(async move {
            if let Err(e) = work.await {
                tracing::debug!(task = label, error = %e, "background task failed");
            }
        });
    }

    /// Number of tasks not yet reaped.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Wait for every outstanding task, including ones spawned while waiting.
    pub async fn settle(&self) {
        loop {
            let mut batch = std::mem::take(&mut *self.lock());
            if batch.is_empty() {
                return;
            }
            while let Some(done) = batch.join_next().await {
                log_join(done);
            }
        }
    }
}

fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        tracing::warn!(error = %e, "background task aborted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_settle_waits_for_all_tasks() {
        let tasks = BackgroundTasks::new();
        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let done = done.clone();
            tasks.spawn("count", async move {
                tokio::task::yield_now().await;
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        tasks.settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(tasks.pending(), 0);
    }

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        let tasks = BackgroundTasks::new();
        tasks.spawn("fail", async { Err(Error::Network("offline".into())) });
        tasks.settle().await;
        assert_eq!(tasks.pending(), 0);
    }

    #[tokio::test]
    async fn test_settle_picks_up_nested_spawns() {
        let tasks = BackgroundTasks::new();
        let done = Arc::new(AtomicUsize::new(0));
        let inner = tasks.clone();
        let counter = done.clone();
        tasks.spawn("outer", async move {
            inner.spawn("inner", async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
            Ok(())
        });

        tasks.settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }
}
