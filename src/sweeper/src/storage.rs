//! Storage capabilities consumed by the pipeline.
//!
//! The enumerator only needs [`ObjectLister`] and the workers only need
//! [`ObjectDeleter`]. Both are shared behind an `Arc` by every task of a run,
//! so implementations must tolerate concurrent calls.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use object_store::ObjectStore;
use object_store::path::Path as ObjectPath;
use std::sync::Arc;

use crate::error::StorageError;

/// Entries per listing page, matching the S3 ListObjectsV2 maximum.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// One entry of a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    pub size_bytes: u64,
    pub last_modified: DateTime<Utc>,
}

impl From<object_store::ObjectMeta> for ObjectEntry {
    fn from(meta: object_store::ObjectMeta) -> Self {
        Self {
            key: meta.location.to_string(),
            size_bytes: meta.size,
            last_modified: meta.last_modified,
        }
    }
}

/// Paginated listing of a container.
pub trait ObjectLister: Send + Sync {
    /// Lazily list every object in `container`, one `Vec` per page.
    ///
    /// An `Err` element is a failed page fetch; callers stop at the first one.
    fn list_pages<'a>(
        &'a self,
        container: &'a str,
    ) -> BoxStream<'a, Result<Vec<ObjectEntry>, StorageError>>;
}

/// Removal of a single object.
#[async_trait]
pub trait ObjectDeleter: Send + Sync {
    async fn delete(&self, container: &str, key: &str) -> Result<(), StorageError>;
}

/// [`ObjectLister`] and [`ObjectDeleter`] over an `object_store` backend bound
/// to one bucket.
#[derive(Debug, Clone)]
pub struct ObjectStoreClient {
    bucket: String,
    object_store: Arc<dyn ObjectStore>,
    page_size: usize,
}

impl ObjectStoreClient {
    pub fn new(bucket: impl Into<String>, object_store: Arc<dyn ObjectStore>) -> Self {
        Self {
            bucket: bucket.into(),
            object_store,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    fn check_container(&self, container: &str) -> Result<(), StorageError> {
        if container == self.bucket {
            Ok(())
        } else {
            Err(StorageError::UnknownContainer {
                requested: container.to_string(),
                bound: self.bucket.clone(),
            })
        }
    }
}

impl ObjectLister for ObjectStoreClient {
    fn list_pages<'a>(
        &'a self,
        container: &'a str,
    ) -> BoxStream<'a, Result<Vec<ObjectEntry>, StorageError>> {
        if let Err(e) = self.check_container(container) {
            return stream::once(async move { Err(e) }).boxed();
        }

        self.object_store
            .list(None)
            .chunks(self.page_size)
            .map(|page| {
                page.into_iter()
                    .map(|meta| meta.map(ObjectEntry::from).map_err(StorageError::from))
                    .collect::<Result<Vec<_>, _>>()
            })
            .boxed()
    }
}

#[async_trait]
impl ObjectDeleter for ObjectStoreClient {
    async fn delete(&self, container: &str, key: &str) -> Result<(), StorageError> {
        self.check_container(container)?;
        self.object_store.delete(&ObjectPath::from(key)).await?;
        Ok(())
    }
}
