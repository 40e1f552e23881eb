//! Single consumer of the results channel.

use tokio::sync::mpsc;

use crate::item::Outcome;

/// A stale object whose delete failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub key: String,
    pub error: String,
}

/// Aggregate of every outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub delete_mode: bool,
    pub total_objects: usize,
    pub total_bytes: u64,
    pub stale_objects: usize,
    pub stale_bytes: u64,
    pub deleted_objects: usize,
    pub deleted_bytes: u64,
    pub failures: Vec<ItemFailure>,
}

impl ScanSummary {
    pub fn new(delete_mode: bool) -> Self {
        Self {
            delete_mode,
            ..Default::default()
        }
    }

    /// Fold one outcome into the totals.
    pub fn record(&mut self, outcome: Outcome) {
        self.total_objects += 1;
        self.total_bytes = self.total_bytes.saturating_add(outcome.size_bytes);

        if !outcome.is_stale {
            return;
        }

        self.stale_objects += 1;
        self.stale_bytes = self.stale_bytes.saturating_add(outcome.size_bytes);

        match outcome.error {
            None if self.delete_mode => {
                self.deleted_objects += 1;
                self.deleted_bytes = self.deleted_bytes.saturating_add(outcome.size_bytes);
            }
            None => {}
            Some(e) => {
                tracing::warn!(key = %outcome.key, error = %e, "Error processing object");
                self.failures.push(ItemFailure {
                    key: outcome.key,
                    error: e.to_string(),
                });
            }
        }
    }

    pub fn failed_objects(&self) -> usize {
        self.failures.len()
    }
}

/// Drain `results` until every sender is gone and return the totals.
pub async fn collect(mut results: mpsc::Receiver<Outcome>, delete_mode: bool) -> ScanSummary {
    let mut summary = ScanSummary::new(delete_mode);

    while let Some(outcome) = results.recv().await {
        summary.record(outcome);
    }

    tracing::debug!(
        total = summary.total_objects,
        stale = summary.stale_objects,
        deleted = summary.deleted_objects,
        failed = summary.failed_objects(),
        "Results stream closed"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;

    fn outcome(key: &str, is_stale: bool, size_bytes: u64, failed: bool) -> Outcome {
        Outcome {
            key: key.to_string(),
            is_stale,
            size_bytes,
            error: failed.then(|| StorageError::Other("boom".to_string())),
        }
    }

    #[test]
    fn test_dry_run_counts_no_deletions() {
        let mut summary = ScanSummary::new(false);
        summary.record(outcome("a", true, 100, false));
        summary.record(outcome("b", false, 200, false));
        summary.record(outcome("c", true, 300, false));

        assert_eq!(summary.total_objects, 3);
        assert_eq!(summary.total_bytes, 600);
        assert_eq!(summary.stale_objects, 2);
        assert_eq!(summary.stale_bytes, 400);
        assert_eq!(summary.deleted_objects, 0);
        assert_eq!(summary.deleted_bytes, 0);
        assert!(summary.failures.is_empty());
    }

    #[test]
    fn test_delete_mode_counts_successes_only() {
        let mut summary = ScanSummary::new(true);
        summary.record(outcome("a", true, 100, false));
        summary.record(outcome("b", false, 200, false));
        summary.record(outcome("c", true, 300, true));

        assert_eq!(summary.stale_objects, 2);
        assert_eq!(summary.deleted_objects, 1);
        assert_eq!(summary.deleted_bytes, 100);
        assert_eq!(
            summary.failures,
            vec![ItemFailure {
                key: "c".to_string(),
                error: "boom".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_collect_until_closed() {
        let (tx, rx) = mpsc::channel(4);
        let producer = tokio::spawn(async move {
            for i in 0..10 {
                tx.send(outcome(&format!("k{i}"), i % 2 == 0, 10, false))
                    .await
                    .unwrap();
            }
        });

        let summary = collect(rx, true).await;
        producer.await.unwrap();

        assert_eq!(summary.total_objects, 10);
        assert_eq!(summary.total_bytes, 100);
        assert_eq!(summary.stale_objects, 5);
        assert_eq!(summary.deleted_objects, 5);
    }
}
