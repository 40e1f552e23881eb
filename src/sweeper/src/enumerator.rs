//! Listing producer.
//!
//! The enumerator is the single writer of the work queue. [`Enumerator::run`]
//! takes the queue's only `Sender` by value, so the queue closes exactly once,
//! when `run` returns, whichever way it returns. Workers therefore always see
//! end-of-input after the last pushed item.

use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::EnumerationError;
use crate::item::Item;
use crate::storage::{ObjectEntry, ObjectLister};

/// Pages between progress log lines unless configured otherwise.
pub const DEFAULT_PROGRESS_INTERVAL_PAGES: usize = 10;

/// Counters for what the enumerator managed to hand off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnumerationStats {
    pub pages: usize,
    pub items: usize,
}

/// How a run of the enumerator ended.
#[derive(Debug)]
pub struct EnumerationOutcome {
    pub stats: EnumerationStats,
    pub error: Option<EnumerationError>,
}

pub struct Enumerator {
    lister: Arc<dyn ObjectLister>,
    container: String,
    progress_interval_pages: usize,
}

impl Enumerator {
    pub fn new(lister: Arc<dyn ObjectLister>, container: impl Into<String>) -> Self {
        Self {
            lister,
            container: container.into(),
            progress_interval_pages: DEFAULT_PROGRESS_INTERVAL_PAGES,
        }
    }

    pub fn with_progress_interval(mut self, pages: usize) -> Self {
        self.progress_interval_pages = pages.max(1);
        self
    }

    /// List the container into `queue` until the listing is exhausted, a page
    /// fails, or `cancel` fires.
    ///
    /// A full queue suspends the push; that is the only thing slowing the
    /// listing down to worker speed. Cancellation is honoured while waiting
    /// on either a push or a page.
    pub async fn run(
        self,
        queue: mpsc::Sender<Item>,
        cancel: CancellationToken,
    ) -> EnumerationOutcome {
        let mut stats = EnumerationStats::default();

        let error = self.drive(&queue, &cancel, &mut stats).await.err();

        match &error {
            None => tracing::info!(
                container = %self.container,
                pages = stats.pages,
                items = stats.items,
                "Listing complete"
            ),
            Some(EnumerationError::Cancelled) => tracing::warn!(
                container = %self.container,
                pages = stats.pages,
                items = stats.items,
                "Listing cancelled, no further objects will be queued"
            ),
            Some(e) => tracing::error!(
                container = %self.container,
                pages = stats.pages,
                items = stats.items,
                error = %e,
                "Listing stopped"
            ),
        }

        drop(queue);
        EnumerationOutcome { stats, error }
    }

    async fn drive(
        &self,
        queue: &mpsc::Sender<Item>,
        cancel: &CancellationToken,
        stats: &mut EnumerationStats,
    ) -> Result<(), EnumerationError> {
        tracing::info!(container = %self.container, "Starting listing");

        let mut pages = self.lister.list_pages(&self.container);

        loop {
            let page = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(EnumerationError::Cancelled),
                page = pages.next() => page,
            };

            let Some(page) = page else {
                return Ok(());
            };
            let entries = page.map_err(EnumerationError::Listing)?;

            for entry in entries {
                let item = self.to_item(entry);
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(EnumerationError::Cancelled),
                    sent = queue.send(item) => {
                        sent.map_err(|_| EnumerationError::QueueClosed)?;
                    }
                }
                stats.items += 1;
            }

            stats.pages += 1;
            if stats.pages % self.progress_interval_pages == 0 {
                tracing::info!(
                    container = %self.container,
                    pages = stats.pages,
                    items = stats.items,
                    "Listing progress"
                );
            }
        }
    }

    fn to_item(&self, entry: ObjectEntry) -> Item {
        Item {
            key: entry.key,
            container: self.container.clone(),
            size_bytes: entry.size_bytes,
            last_modified: entry.last_modified,
        }
    }
}
