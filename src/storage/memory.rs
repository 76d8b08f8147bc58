use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use regex::Regex;
use tracing::trace;
use uuid::Uuid;

use crate::storage::{ResourceManager, Storage, StorageProvider, StorageTrait};
use crate::types::{Region, ServiceInstance};

#[derive(Default)]
struct BucketState {
    buckets: HashMap<String, BTreeSet<String>>,
    constraints: HashMap<String, String>,
    fail_uploads: BTreeSet<String>,
    // (bucket, key) -> number of listings before the key becomes visible
    deferred: HashMap<(String, String), u32>,
}

/// In-memory object storage. Backs the unit tests and the in-process scenario
/// tests; all clones share one state.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    state: Arc<Mutex<BucketState>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every upload of the given key fail.
    pub fn fail_upload_of(&self, key: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_uploads
            .insert(key.to_string());
    }

    /// Hides an object for the next `listings` list passes, emulating
    /// replication lag.
    pub fn defer_visibility(&self, bucket: &str, key: &str, listings: u32) {
        self.state
            .lock()
            .unwrap()
            .deferred
            .insert((bucket.to_string(), key.to_string()), listings);
    }

    pub fn insert_object(&self, bucket: &str, key: &str) {
        self.state
            .lock()
            .unwrap()
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string());
    }

    pub fn remove_object(&self, bucket: &str, key: &str) {
        if let Some(keys) = self.state.lock().unwrap().buckets.get_mut(bucket) {
            keys.remove(key);
        }
    }

    pub fn object_count(&self, bucket: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .buckets
            .get(bucket)
            .map(BTreeSet::len)
            .unwrap_or_default()
    }

    pub fn location_constraint_of(&self, bucket: &str) -> Option<String> {
        self.state.lock().unwrap().constraints.get(bucket).cloned()
    }

    /// Copies every object from one bucket into another. Used by the
    /// in-process trigger that stands in for the external sync command.
    pub fn copy_bucket(&self, from: &str, to: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let keys = state
            .buckets
            .get(from)
            .cloned()
            .ok_or_else(|| anyhow!("no such bucket: {from}"))?;

        state
            .buckets
            .get_mut(to)
            .ok_or_else(|| anyhow!("no such bucket: {to}"))?
            .extend(keys);

        Ok(())
    }
}

#[async_trait]
impl StorageTrait for InMemoryStorage {
    async fn create_bucket(&self, bucket: &str, location_constraint: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.buckets.entry(bucket.to_string()).or_default();
        state
            .constraints
            .insert(bucket.to_string(), location_constraint.to_string());
        Ok(())
    }

    async fn wait_until_bucket_exists(&self, bucket: &str) -> Result<()> {
        if self.state.lock().unwrap().buckets.contains_key(bucket) {
            Ok(())
        } else {
            Err(anyhow!("bucket {bucket} did not become visible"))
        }
    }

    async fn put_object(&self, path: &Path, key: &str, bucket: &str) -> Result<()> {
        // The pipeline contract includes reading the file bytes.
        tokio::fs::read(path).await?;

        let mut state = self.state.lock().unwrap();
        if state.fail_uploads.contains(key) {
            return Err(anyhow!("injected upload failure for {key}"));
        }

        state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| anyhow!("no such bucket: {bucket}"))?
            .insert(key.to_string());

        Ok(())
    }

    async fn list_objects(&self, bucket: &str, filter: Option<&Regex>) -> Result<Vec<String>> {
        let mut state = self.state.lock().unwrap();

        let keys = state
            .buckets
            .get(bucket)
            .cloned()
            .ok_or_else(|| anyhow!("no such bucket: {bucket}"))?;

        let mut visible = Vec::new();
        for key in keys {
            let deferred_entry = (bucket.to_string(), key.clone());
            if let Some(remaining) = state.deferred.get_mut(&deferred_entry) {
                if *remaining > 0 {
                    *remaining -= 1;
                    continue;
                }
            }

            if filter.is_none_or(|regex| regex.is_match(&key)) {
                visible.push(key);
            }
        }

        Ok(visible)
    }
}

/// Storage provider handing out clones of one shared in-memory storage,
/// whatever the instance/region pair.
pub struct InMemoryStorageProvider {
    storage: InMemoryStorage,
}

impl InMemoryStorageProvider {
    pub fn new(storage: InMemoryStorage) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl StorageProvider for InMemoryStorageProvider {
    async fn storage_for(&self, instance: &str, region: Region) -> Result<Storage> {
        trace!(instance = instance, region = %region, "create in-memory storage handle.");
        Ok(Box::new(self.storage.clone()))
    }
}

/// In-memory resource-management control plane.
#[derive(Clone, Default)]
pub struct InMemoryResourceManager {
    instances: Arc<Mutex<Vec<ServiceInstance>>>,
}

impl InMemoryResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.lock().unwrap().len()
    }
}

#[async_trait]
impl ResourceManager for InMemoryResourceManager {
    async fn list_resource_groups(&self) -> Result<Vec<String>> {
        Ok(vec!["default".to_string()])
    }

    async fn create_service_instance(
        &self,
        name: &str,
        _service_type: &str,
        _plan: &str,
        _resource_group: &str,
        _region: &str,
    ) -> Result<ServiceInstance> {
        let instance = ServiceInstance {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
        };
        self.instances.lock().unwrap().push(instance.clone());
        Ok(instance)
    }

    async fn list_service_instances(
        &self,
        _instance_type: &str,
        name: &str,
    ) -> Result<Vec<ServiceInstance>> {
        Ok(self
            .instances
            .lock()
            .unwrap()
            .iter()
            .filter(|instance| instance.name == name)
            .cloned()
            .collect())
    }

    async fn delete_service_instance(&self, id: &str, _recursive: bool) -> Result<()> {
        let mut instances = self.instances.lock().unwrap();
        let before = instances.len();
        instances.retain(|instance| instance.id != id);

        if instances.len() == before {
            return Err(anyhow!("no such service instance: {id}"));
        }

        Ok(())
    }
}
