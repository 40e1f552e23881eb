//! Stale object scanning for object storage buckets.
//!
//! A scan lists a bucket, classifies every object as stale or fresh by the
//! age of its last modification, optionally deletes stale objects and
//! reports aggregate counts.
//!
//! ## Architecture
//!
//! - `enumerator`: single producer paging the listing into a bounded queue
//! - `pool`: fixed-size worker pool classifying and deleting in parallel
//! - `collector`: single consumer aggregating outcomes into a [`ScanSummary`]
//! - `pipeline`: wires the three together for one run
//! - `storage`: listing/deletion capabilities and the `object_store` adapter
//!
//! A full queue pauses the listing, which is the only flow control. A failed
//! delete is recorded on that object's outcome and never stops the run.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use sweeper::{ObjectStoreClient, ScanPipeline, ScanSettings};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(store: Arc<dyn object_store::ObjectStore>) {
//! let client = Arc::new(ObjectStoreClient::new("my-app-logs", store));
//! let pipeline = ScanPipeline::new(client, ScanSettings::default());
//!
//! let run = pipeline.run("my-app-logs", CancellationToken::new()).await;
//! println!("{}", sweeper::report::render(&run.summary));
//! # }
//! ```

pub mod classify;
pub mod collector;
pub mod enumerator;
pub mod error;
pub mod item;
pub mod pipeline;
pub mod pool;
pub mod report;
pub mod storage;

// Re-export commonly used types
pub use classify::StalenessPolicy;
pub use collector::{ItemFailure, ScanSummary};
pub use enumerator::{EnumerationStats, Enumerator};
pub use error::{EnumerationError, StorageError};
pub use item::{Item, Outcome};
pub use pipeline::{PipelineRun, ScanPipeline, ScanSettings};
pub use pool::{WorkerPool, WorkerSettings};
pub use storage::{ObjectDeleter, ObjectEntry, ObjectLister, ObjectStoreClient};
