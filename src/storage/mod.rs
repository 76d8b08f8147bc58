use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use dyn_clone::DynClone;
use regex::Regex;

use crate::types::{Region, ServiceInstance};

pub mod memory;
pub mod s3;

pub type Storage = Box<dyn StorageTrait + Send + Sync>;

/// Object-storage operations the harness consumes. Implementations must be
/// safe to share across upload workers (stateless per-call usage).
#[async_trait]
pub trait StorageTrait: DynClone {
    /// Creates a bucket with a `"{region}-{tier}"` location constraint.
    async fn create_bucket(&self, bucket: &str, location_constraint: &str) -> Result<()>;
    /// Blocks until the bucket is visible, with bounded polling.
    async fn wait_until_bucket_exists(&self, bucket: &str) -> Result<()>;
    /// Uploads a single local file under the given key.
    async fn put_object(&self, path: &Path, key: &str, bucket: &str) -> Result<()>;
    /// Lists object keys, optionally restricted to those matching the filter.
    async fn list_objects(&self, bucket: &str, filter: Option<&Regex>) -> Result<Vec<String>>;
}

dyn_clone::clone_trait_object!(StorageTrait);

/// Creates storage handles bound to a service instance and region, the way
/// the harness needs one client per (instance, region) pair.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    async fn storage_for(&self, instance: &str, region: Region) -> Result<Storage>;
}

/// Resource-management control plane. Real cloud implementations live outside
/// this crate; the harness reaches them only through this seam.
#[async_trait]
pub trait ResourceManager: Send + Sync {
    async fn list_resource_groups(&self) -> Result<Vec<String>>;
    async fn create_service_instance(
        &self,
        name: &str,
        service_type: &str,
        plan: &str,
        resource_group: &str,
        region: &str,
    ) -> Result<ServiceInstance>;
    async fn list_service_instances(
        &self,
        instance_type: &str,
        name: &str,
    ) -> Result<Vec<ServiceInstance>>;
    async fn delete_service_instance(&self, id: &str, recursive: bool) -> Result<()>;
}
