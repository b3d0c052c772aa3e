// ABOUTME: Per-application job serialization with a hard deadline.
// ABOUTME: Two deploys for the same app never overlap; different apps run freely.

use crate::types::AppId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Deadline exceeded while running a serialized job.
#[derive(Debug, thiserror::Error)]
#[error("deployment exceeded its deadline of {0:?}")]
pub struct DeadlineExceeded(pub Duration);

/// Serializes work per application key.
///
/// Each application gets one async mutex; a job runs holding it, so
/// back-to-back deploy triggers for the same application execute in order
/// while deploys for different applications proceed concurrently.
#[derive(Default)]
pub struct JobQueue {
    locks: Mutex<HashMap<AppId, Arc<tokio::sync::Mutex<()>>>>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, app_id: &AppId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        locks
            .entry(app_id.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Run a job holding the application's lock, bounded by a deadline.
    ///
    /// The deadline covers waiting for the lock as well: a job stuck behind
    /// a slow predecessor still terminates.
    pub async fn run<F, T>(
        &self,
        app_id: &AppId,
        deadline: Duration,
        job: F,
    ) -> Result<T, DeadlineExceeded>
    where
        F: Future<Output = T>,
    {
        let lock = self.lock_for(app_id);

        tokio::time::timeout(deadline, async move {
            let _guard = lock.lock().await;
            job.await
        })
        .await
        .map_err(|_| DeadlineExceeded(deadline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn jobs_for_same_app_never_overlap() {
        let queue = Arc::new(JobQueue::new());
        let app = AppId::generate();
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let queue = queue.clone();
            let app = app.clone();
            let active = active.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                queue
                    .run(&app, Duration::from_secs(5), async move {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        active.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_apps_run_concurrently() {
        let queue = Arc::new(JobQueue::new());
        let a = AppId::generate();
        let b = AppId::generate();

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let qa = queue.clone();
        let blocker = tokio::spawn(async move {
            qa.run(&a, Duration::from_secs(5), async move {
                let _ = rx.await;
            })
            .await
            .unwrap();
        });

        // Job for a different app completes while the first still holds its lock.
        queue
            .run(&b, Duration::from_secs(1), async {})
            .await
            .unwrap();

        tx.send(()).unwrap();
        blocker.await.unwrap();
    }

    #[tokio::test]
    async fn deadline_cuts_off_a_stuck_job() {
        let queue = JobQueue::new();
        let app = AppId::generate();

        let result = queue
            .run(&app, Duration::from_millis(20), async {
                tokio::time::sleep(Duration::from_secs(10)).await;
            })
            .await;

        assert!(result.is_err());
    }
}
