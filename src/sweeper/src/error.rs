use thiserror::Error;

/// Failure talking to the storage provider
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("container '{requested}' is not served by this client (bound to '{bound}')")]
    UnknownContainer { requested: String, bound: String },

    #[error(transparent)]
    Backend(#[from] object_store::Error),

    /// Failure reported by a non `object_store` backend
    #[error("{0}")]
    Other(String),
}

/// Why the enumerator stopped before the listing was exhausted
#[derive(Debug, Error)]
pub enum EnumerationError {
    #[error("failed to list objects: {0}")]
    Listing(#[source] StorageError),

    #[error("listing cancelled")]
    Cancelled,

    /// Every worker is gone, nobody is left to take items
    #[error("work queue closed by consumers")]
    QueueClosed,

    #[error("enumerator task failed: {0}")]
    TaskFailed(String),
}

impl EnumerationError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EnumerationError::Cancelled)
    }
}
