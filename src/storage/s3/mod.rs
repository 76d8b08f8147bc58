use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use regex::Regex;
use tracing::{debug, trace};

use crate::config::ClientConfig;
use crate::storage::{Storage, StorageProvider, StorageTrait};
use crate::types::Region;

mod client_builder;

const BUCKET_EXISTS_MAX_ATTEMPTS: u32 = 20;
const BUCKET_EXISTS_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Object storage backed by an S3-compatible endpoint.
#[derive(Clone)]
pub struct S3Storage {
    client: Arc<Client>,
}

impl S3Storage {
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

#[async_trait]
impl StorageTrait for S3Storage {
    async fn create_bucket(&self, bucket: &str, location_constraint: &str) -> Result<()> {
        debug!(
            bucket = bucket,
            location_constraint = location_constraint,
            "create bucket."
        );

        let constraint = BucketLocationConstraint::from(location_constraint);
        let config = CreateBucketConfiguration::builder()
            .location_constraint(constraint)
            .build();

        self.client
            .create_bucket()
            .create_bucket_configuration(config)
            .bucket(bucket)
            .send()
            .await
            .with_context(|| format!("failed to create bucket {bucket}"))?;

        Ok(())
    }

    async fn wait_until_bucket_exists(&self, bucket: &str) -> Result<()> {
        for attempt in 0..BUCKET_EXISTS_MAX_ATTEMPTS {
            let head_bucket_result = self.client.head_bucket().bucket(bucket).send().await;
            if head_bucket_result.is_ok() {
                trace!(bucket = bucket, attempt = attempt, "bucket is visible.");
                return Ok(());
            }

            if !head_bucket_result
                .err()
                .unwrap()
                .into_service_error()
                .is_not_found()
            {
                return Err(anyhow!("failed to check existence of bucket {bucket}"));
            }

            tokio::time::sleep(BUCKET_EXISTS_POLL_INTERVAL).await;
        }

        Err(anyhow!("bucket {bucket} did not become visible"))
    }

    async fn put_object(&self, path: &Path, key: &str, bucket: &str) -> Result<()> {
        let stream = ByteStream::from_path(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(stream)
            .send()
            .await
            .with_context(|| format!("failed to upload {key} to bucket {bucket}"))?;

        Ok(())
    }

    async fn list_objects(&self, bucket: &str, filter: Option<&Regex>) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation_token = None;

        loop {
            let list_objects_output = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .set_continuation_token(continuation_token)
                .send()
                .await
                .with_context(|| format!("failed to list objects in bucket {bucket}"))?;

            for object in list_objects_output.contents() {
                let Some(key) = object.key() else {
                    continue;
                };
                if filter.is_none_or(|regex| regex.is_match(key)) {
                    keys.push(key.to_string());
                }
            }

            if list_objects_output.is_truncated().unwrap_or_default() {
                continuation_token = list_objects_output
                    .next_continuation_token()
                    .map(|token| token.to_string());
            } else {
                break;
            }
        }

        Ok(keys)
    }
}

/// Builds one client per (instance, region) pair. S3-compatible backends
/// address the instance through credentials and endpoint, so only the region
/// varies per handle.
pub struct S3StorageProvider {
    client_config: ClientConfig,
}

impl S3StorageProvider {
    pub fn new(client_config: ClientConfig) -> Self {
        Self { client_config }
    }
}

#[async_trait]
impl StorageProvider for S3StorageProvider {
    async fn storage_for(&self, instance: &str, region: Region) -> Result<Storage> {
        trace!(instance = instance, region = %region, "create storage client.");

        let client = self.client_config.create_client(region.as_str()).await;
        Ok(Box::new(S3Storage::new(client)))
    }
}
