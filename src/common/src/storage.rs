use anyhow::{Context, Result};
use object_store::{ObjectStore, aws::AmazonS3Builder, local::LocalFileSystem, memory::InMemory};
use std::sync::Arc;
use url::Url;

use crate::config::StorageConfig;

/// Create the object store serving `bucket`.
///
/// Without `storage.url` this is an S3 client. Credentials come from the
/// standard `AWS_*` environment variables; region and endpoint come from the
/// configuration.
pub fn create_object_store(
    storage_config: &StorageConfig,
    bucket: &str,
) -> Result<Arc<dyn ObjectStore>> {
    if bucket.trim().is_empty() {
        anyhow::bail!("Bucket name cannot be empty");
    }

    match &storage_config.url {
        Some(url) => create_object_store_from_url(url, bucket),
        None => {
            let builder = create_s3_builder(storage_config, bucket);
            let store = builder
                .build()
                .with_context(|| format!("Failed to build S3 client for bucket '{bucket}'"))?;
            Ok(Arc::new(store))
        }
    }
}

/// Create a local object store from a `memory://` or `file://` URL.
///
/// For `file:///srv/buckets` the bucket is the directory `/srv/buckets/<bucket>`,
/// which must already exist.
pub fn create_object_store_from_url(url: &str, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
    let parsed =
        Url::parse(url).map_err(|e| anyhow::anyhow!("Invalid storage URL '{}': {}", url, e))?;

    match parsed.scheme() {
        "memory" => Ok(Arc::new(InMemory::new())),
        "file" => {
            let root = parsed.path();
            if root.is_empty() || root == "/" {
                return Err(anyhow::anyhow!(
                    "File URL must specify a path: file:///path/to/buckets"
                ));
            }
            let bucket_dir = std::path::Path::new(root).join(bucket);
            let store = LocalFileSystem::new_with_prefix(&bucket_dir).with_context(|| {
                format!("Failed to open bucket directory {}", bucket_dir.display())
            })?;
            Ok(Arc::new(store))
        }
        scheme => Err(anyhow::anyhow!(
            "Unsupported storage scheme: {}. Supported: file, memory",
            scheme
        )),
    }
}

/// Build an S3 client for one bucket.
///
/// A custom endpoint switches to path-style requests, which MinIO and most
/// other S3-compatible services require.
pub fn create_s3_builder(storage_config: &StorageConfig, bucket: &str) -> AmazonS3Builder {
    let mut builder = AmazonS3Builder::from_env()
        .with_bucket_name(bucket)
        .with_region(&storage_config.region);

    if let Some(endpoint) = &storage_config.endpoint {
        builder = builder
            .with_endpoint(endpoint)
            .with_allow_http(storage_config.allow_http)
            .with_virtual_hosted_style_request(false);
    }

    builder
}
