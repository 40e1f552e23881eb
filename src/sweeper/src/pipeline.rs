//! One scan run: enumerator, worker pool and collector wired together.
//!
//! ```text
//! ObjectLister -> Enumerator -> [bounded queue] -> WorkerPool (N) -> [results] -> collector
//! ```
//!
//! The run moves through `Running` (listing and classifying concurrently),
//! `Draining` (queue closed, workers finishing) and `Complete` (results
//! closed, collector returned). A listing failure or cancellation only stops
//! production: everything already queued is still classified and reported.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::classify::StalenessPolicy;
use crate::collector::{self, ScanSummary};
use crate::enumerator::{
    DEFAULT_PROGRESS_INTERVAL_PAGES, EnumerationOutcome, EnumerationStats, Enumerator,
};
use crate::error::EnumerationError;
use crate::pool::{PoolStats, WorkerPool, WorkerSettings};
use crate::storage::{ObjectDeleter, ObjectLister};

/// Capacity of the queue between the enumerator and the workers.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub struct ScanSettings {
    /// Staleness threshold in days
    pub days: u64,
    pub workers: usize,
    /// `false` is a dry run
    pub delete: bool,
    pub queue_capacity: usize,
    pub progress_interval_pages: usize,
    /// Pin "now" for the whole run; `None` reads the clock per object
    pub reference_time: Option<DateTime<Utc>>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            days: 30,
            workers: 10,
            delete: false,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            progress_interval_pages: DEFAULT_PROGRESS_INTERVAL_PAGES,
            reference_time: None,
        }
    }
}

impl From<&common::config::ScanConfig> for ScanSettings {
    fn from(config: &common::config::ScanConfig) -> Self {
        Self {
            days: config.days,
            workers: config.workers,
            delete: config.delete,
            queue_capacity: config.queue_capacity,
            progress_interval_pages: config.progress_interval_pages,
            reference_time: None,
        }
    }
}

impl ScanSettings {
    fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            policy: StalenessPolicy::from_days(self.days),
            dry_run: !self.delete,
            reference_time: self.reference_time,
        }
    }
}

/// Terminal state of a run.
#[derive(Debug)]
pub struct PipelineRun {
    pub summary: ScanSummary,
    pub enumeration: EnumerationStats,
    /// Why listing stopped early, if it did
    pub enumeration_error: Option<EnumerationError>,
    pub pool: PoolStats,
}

impl PipelineRun {
    /// The listing failed before a single object could be queued.
    ///
    /// A crashed enumerator loses its counters, so the collected outcomes
    /// count as well.
    pub fn failed_before_first_item(&self) -> bool {
        matches!(
            self.enumeration_error,
            Some(EnumerationError::Listing(_) | EnumerationError::TaskFailed(_))
        ) && self.enumeration.items == 0
            && self.summary.total_objects == 0
    }

    pub fn was_cancelled(&self) -> bool {
        self.enumeration_error
            .as_ref()
            .is_some_and(EnumerationError::is_cancelled)
    }
}

pub struct ScanPipeline {
    lister: Arc<dyn ObjectLister>,
    deleter: Arc<dyn ObjectDeleter>,
    settings: ScanSettings,
}

impl ScanPipeline {
    pub fn new<C>(client: Arc<C>, settings: ScanSettings) -> Self
    where
        C: ObjectLister + ObjectDeleter + 'static,
    {
        Self {
            lister: client.clone(),
            deleter: client,
            settings,
        }
    }

    pub fn from_parts(
        lister: Arc<dyn ObjectLister>,
        deleter: Arc<dyn ObjectDeleter>,
        settings: ScanSettings,
    ) -> Self {
        Self {
            lister,
            deleter,
            settings,
        }
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Scan `container` to completion and return the aggregated result.
    ///
    /// Returns once the results channel has closed, which happens only after
    /// the enumerator closed the queue and every worker exited.
    pub async fn run(&self, container: &str, cancel: CancellationToken) -> PipelineRun {
        tracing::info!(
            container = %container,
            days = self.settings.days,
            workers = self.settings.workers,
            dry_run = !self.settings.delete,
            "Starting scan"
        );

        let (queue_tx, queue_rx) = mpsc::channel(self.settings.queue_capacity.max(1));

        let enumerator = Enumerator::new(self.lister.clone(), container)
            .with_progress_interval(self.settings.progress_interval_pages);
        let producer = tokio::spawn(enumerator.run(queue_tx, cancel));

        let (results, supervisor) = WorkerPool::start(
            self.deleter.clone(),
            self.settings.workers,
            self.settings.worker_settings(),
            queue_rx,
        )
        .into_parts();

        let summary = collector::collect(results, self.settings.delete).await;

        let EnumerationOutcome {
            stats: enumeration,
            error: enumeration_error,
        } = match producer.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Enumerator task failed");
                EnumerationOutcome {
                    stats: EnumerationStats::default(),
                    error: Some(EnumerationError::TaskFailed(e.to_string())),
                }
            }
        };

        let pool = supervisor.await.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Worker pool supervisor failed");
            PoolStats::default()
        });

        if summary.total_objects != enumeration.items {
            tracing::warn!(
                queued = enumeration.items,
                collected = summary.total_objects,
                "Collected outcome count differs from queued item count"
            );
        }

        PipelineRun {
            summary,
            enumeration,
            enumeration_error,
            pool,
        }
    }
}
