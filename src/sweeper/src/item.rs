//! Values flowing through the scan pipeline.

use chrono::{DateTime, Utc};

use crate::error::StorageError;

/// One listed object, handed from the enumerator to exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub key: String,
    pub container: String,
    pub size_bytes: u64,
    pub last_modified: DateTime<Utc>,
}

/// Result of classifying (and possibly deleting) one [`Item`].
#[derive(Debug)]
pub struct Outcome {
    pub key: String,
    pub is_stale: bool,
    pub size_bytes: u64,
    /// Set only when a delete was attempted and failed
    pub error: Option<StorageError>,
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}
