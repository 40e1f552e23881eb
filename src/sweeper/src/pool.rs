//! Fixed-size worker pool.
//!
//! N workers pull [`Item`]s from one shared queue and push one [`Outcome`]
//! each into a shared results channel. A supervisor task owns the workers in
//! a `JoinSet` and holds the last results `Sender` until every worker has been
//! joined, so the results channel closes exactly once and only after the
//! final outcome was sent.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::{JoinHandle, JoinSet};

use crate::classify::StalenessPolicy;
use crate::item::{Item, Outcome};
use crate::storage::ObjectDeleter;

/// Per-item behaviour shared by all workers.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub policy: StalenessPolicy,
    /// Classify only, never call delete
    pub dry_run: bool,
    /// Fixed "now" for classification. `None` reads the clock per item.
    pub reference_time: Option<DateTime<Utc>>,
}

/// What the supervisor observed once all workers exited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub workers: usize,
    pub processed: usize,
    pub panicked: usize,
}

pub struct WorkerPool {
    results: mpsc::Receiver<Outcome>,
    supervisor: JoinHandle<PoolStats>,
}

impl WorkerPool {
    /// Spawn `workers` workers on `jobs`. A count of zero is treated as one.
    pub fn start(
        deleter: Arc<dyn ObjectDeleter>,
        workers: usize,
        settings: WorkerSettings,
        jobs: mpsc::Receiver<Item>,
    ) -> Self {
        let workers = workers.max(1);
        let (results_tx, results) = mpsc::channel(workers);
        let jobs = Arc::new(Mutex::new(jobs));
        let settings = Arc::new(settings);

        let supervisor = tokio::spawn(async move {
            let mut set = JoinSet::new();
            for worker_id in 0..workers {
                set.spawn(worker_loop(
                    worker_id,
                    jobs.clone(),
                    results_tx.clone(),
                    deleter.clone(),
                    settings.clone(),
                ));
            }

            let mut stats = PoolStats {
                workers,
                ..Default::default()
            };
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok(processed) => stats.processed += processed,
                    Err(e) => {
                        tracing::error!(error = %e, "Worker terminated abnormally");
                        stats.panicked += 1;
                    }
                }
            }

            // Every worker is gone; this closes the results channel.
            drop(results_tx);
            tracing::debug!(
                workers = stats.workers,
                processed = stats.processed,
                "Worker pool drained"
            );
            stats
        });

        Self {
            results,
            supervisor,
        }
    }

    pub fn into_parts(self) -> (mpsc::Receiver<Outcome>, JoinHandle<PoolStats>) {
        (self.results, self.supervisor)
    }
}

async fn worker_loop(
    worker_id: usize,
    jobs: Arc<Mutex<mpsc::Receiver<Item>>>,
    results: mpsc::Sender<Outcome>,
    deleter: Arc<dyn ObjectDeleter>,
    settings: Arc<WorkerSettings>,
) -> usize {
    let mut processed = 0;

    loop {
        // Hold the lock only while waiting for the next item
        let item = {
            let mut jobs = jobs.lock().await;
            jobs.recv().await
        };
        let Some(item) = item else {
            break;
        };

        let outcome = process_item(deleter.as_ref(), &settings, item).await;
        if results.send(outcome).await.is_err() {
            tracing::warn!(worker = worker_id, "Results receiver dropped, worker exiting");
            break;
        }
        processed += 1;
    }

    tracing::trace!(worker = worker_id, processed, "Worker finished");
    processed
}

/// Classify one item and delete it when stale, unless this is a dry run.
///
/// A failed delete is recorded in the outcome and never propagated.
pub async fn process_item(
    deleter: &dyn ObjectDeleter,
    settings: &WorkerSettings,
    item: Item,
) -> Outcome {
    let now = settings.reference_time.unwrap_or_else(Utc::now);
    let is_stale = settings.policy.is_stale(now, item.last_modified);

    let error = if !is_stale {
        None
    } else if settings.dry_run {
        tracing::debug!(
            key = %item.key,
            size_bytes = item.size_bytes,
            last_modified = %item.last_modified,
            "[DRY-RUN] Would delete stale object"
        );
        None
    } else {
        match deleter.delete(&item.container, &item.key).await {
            Ok(()) => {
                tracing::info!(
                    key = %item.key,
                    container = %item.container,
                    size_bytes = item.size_bytes,
                    "Deleted stale object"
                );
                None
            }
            Err(e) => {
                tracing::error!(
                    key = %item.key,
                    container = %item.container,
                    error = %e,
                    "Failed to delete stale object"
                );
                Some(e)
            }
        }
    };

    Outcome {
        key: item.key,
        is_stale,
        size_bytes: item.size_bytes,
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingDeleter {
        fail_keys: HashSet<String>,
        calls: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl ObjectDeleter for RecordingDeleter {
        async fn delete(&self, _container: &str, key: &str) -> Result<(), StorageError> {
            self.calls.lock().unwrap().push(key.to_string());
            if self.fail_keys.contains(key) {
                Err(StorageError::Other(format!("access denied: {key}")))
            } else {
                Ok(())
            }
        }
    }

    fn settings(dry_run: bool) -> WorkerSettings {
        WorkerSettings {
            policy: StalenessPolicy::from_days(10),
            dry_run,
            reference_time: Some(Utc::now()),
        }
    }

    fn item(key: &str, age_days: i64, now: DateTime<Utc>) -> Item {
        Item {
            key: key.to_string(),
            container: "bucket".to_string(),
            size_bytes: 100,
            last_modified: now - Duration::days(age_days),
        }
    }

    #[tokio::test]
    async fn test_fresh_item_is_not_deleted() {
        let deleter = RecordingDeleter::default();
        let settings = settings(false);
        let now = settings.reference_time.unwrap();

        let outcome = process_item(&deleter, &settings, item("fresh", 2, now)).await;

        assert!(!outcome.is_stale);
        assert!(outcome.error.is_none());
        assert!(deleter.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stale_item_is_deleted() {
        let deleter = RecordingDeleter::default();
        let settings = settings(false);
        let now = settings.reference_time.unwrap();

        let outcome = process_item(&deleter, &settings, item("old", 30, now)).await;

        assert!(outcome.is_stale);
        assert!(outcome.error.is_none());
        assert_eq!(*deleter.calls.lock().unwrap(), vec!["old".to_string()]);
    }

    #[tokio::test]
    async fn test_dry_run_never_deletes() {
        let deleter = RecordingDeleter {
            fail_keys: HashSet::from(["old".to_string()]),
            ..Default::default()
        };
        let settings = settings(true);
        let now = settings.reference_time.unwrap();

        let outcome = process_item(&deleter, &settings, item("old", 30, now)).await;

        assert!(outcome.is_stale);
        assert!(outcome.error.is_none());
        assert!(deleter.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_failure_is_captured() {
        let deleter = RecordingDeleter {
            fail_keys: HashSet::from(["old".to_string()]),
            ..Default::default()
        };
        let settings = settings(false);
        let now = settings.reference_time.unwrap();

        let outcome = process_item(&deleter, &settings, item("old", 30, now)).await;

        assert!(outcome.is_stale);
        assert!(outcome.is_failed());
        assert_eq!(outcome.size_bytes, 100);
    }

    #[tokio::test]
    async fn test_pool_emits_one_outcome_per_item() {
        let deleter = Arc::new(RecordingDeleter::default());
        let settings = settings(false);
        let now = settings.reference_time.unwrap();
        let (tx, rx) = mpsc::channel(8);

        let pool = WorkerPool::start(deleter.clone(), 4, settings, rx);
        let (mut results, supervisor) = pool.into_parts();

        let producer = tokio::spawn(async move {
            for i in 0..50 {
                tx.send(item(&format!("k{i}"), i % 20, now)).await.unwrap();
            }
        });

        let mut keys = HashSet::new();
        while let Some(outcome) = results.recv().await {
            assert!(keys.insert(outcome.key), "Duplicate outcome");
        }
        producer.await.unwrap();

        assert_eq!(keys.len(), 50);
        let stats = supervisor.await.unwrap();
        assert_eq!(stats.workers, 4);
        assert_eq!(stats.processed, 50);
        assert_eq!(stats.panicked, 0);
    }

    #[tokio::test]
    async fn test_results_close_when_input_closes() {
        let deleter = Arc::new(RecordingDeleter::default());
        let (tx, rx) = mpsc::channel::<Item>(1);
        drop(tx);

        let (mut results, supervisor) =
            WorkerPool::start(deleter, 3, settings(false), rx).into_parts();

        let closed = tokio::time::timeout(std::time::Duration::from_secs(5), results.recv()).await;
        assert!(matches!(closed, Ok(None)));
        assert_eq!(supervisor.await.unwrap().processed, 0);
    }

    #[tokio::test]
    async fn test_zero_workers_runs_one() {
        let deleter = Arc::new(RecordingDeleter::default());
        let now = Utc::now();
        let (tx, rx) = mpsc::channel(2);

        let (mut results, supervisor) =
            WorkerPool::start(deleter, 0, settings(true), rx).into_parts();
        tx.send(item("a", 1, now)).await.unwrap();
        drop(tx);

        assert!(results.recv().await.is_some());
        assert!(results.recv().await.is_none());
        assert_eq!(supervisor.await.unwrap().workers, 1);
    }
}
