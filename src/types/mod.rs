use std::fmt;
use std::fmt::{Debug, Formatter};
use std::path::PathBuf;

use anyhow::Error;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod error;
pub mod token;

pub const BUCKET_NAME_PREFIX: &str = "image-sync-";
pub const INSTANCE_NAME_PREFIX: &str = "cos-image-sync-test-";

pub const SERVICE_TYPE: &str = "cloud-object-storage";
pub const SERVICE_PLAN: &str = "standard";
pub const SERVICE_INSTANCE_TYPE: &str = "service_instance";
pub const RESOURCE_GROUP_API_REGION: &str = "global";

/// Regions a bucket may be placed in. The set is closed, so a value that made
/// it into a spec is always valid for the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "us-east")]
    UsEast,
    #[serde(rename = "jp-tok")]
    JpTok,
    #[serde(rename = "us-south")]
    UsSouth,
    #[serde(rename = "au-syd")]
    AuSyd,
    #[serde(rename = "eu-de")]
    EuDe,
    #[serde(rename = "ca-tor")]
    CaTor,
}

impl Region {
    pub const ALL: [Region; 6] = [
        Region::UsEast,
        Region::JpTok,
        Region::UsSouth,
        Region::AuSyd,
        Region::EuDe,
        Region::CaTor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::UsEast => "us-east",
            Region::JpTok => "jp-tok",
            Region::UsSouth => "us-south",
            Region::AuSyd => "au-syd",
            Region::EuDe => "eu-de",
            Region::CaTor => "ca-tor",
        }
    }

    pub fn choose(rng: &mut impl Rng) -> Region {
        Region::ALL[rng.gen_range(0..Region::ALL.len())]
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage quality-of-service class, encoded into the bucket location
/// constraint together with the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageTier {
    Smart,
    Standard,
    Vault,
    Cold,
}

impl StorageTier {
    pub const ALL: [StorageTier; 4] = [
        StorageTier::Smart,
        StorageTier::Standard,
        StorageTier::Vault,
        StorageTier::Cold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageTier::Smart => "smart",
            StorageTier::Standard => "standard",
            StorageTier::Vault => "vault",
            StorageTier::Cold => "cold",
        }
    }

    pub fn choose(rng: &mut impl Rng) -> StorageTier {
        StorageTier::ALL[rng.gen_range(0..StorageTier::ALL.len())]
    }
}

impl fmt::Display for StorageTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location constraint string understood by the storage backend,
/// `"{region}-{tier}"`.
pub fn location_constraint(region: Region, tier: StorageTier) -> String {
    format!("{region}-{tier}")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub bucket: String,
    /// Service-instance name the bucket belongs to.
    pub cos: String,
    /// Object name filter. Empty means all objects.
    pub object: String,
    pub plan: StorageTier,
    pub region: Region,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub bucket: String,
    pub plan: StorageTier,
    pub region: Region,
}

/// One declarative replication intent: a source bucket and the ordered list
/// of target buckets its objects must be copied to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSpec {
    pub source: SourceSpec,
    pub target: Vec<TargetSpec>,
}

impl SyncSpec {
    /// Generates a spec with collision-resistant bucket/instance names and
    /// random region/tier assignments.
    pub fn generate(targets_per_source: usize, rng: &mut impl Rng) -> Self {
        let source = SourceSpec {
            bucket: unique_name(BUCKET_NAME_PREFIX),
            cos: unique_name(INSTANCE_NAME_PREFIX),
            object: String::new(),
            plan: StorageTier::choose(rng),
            region: Region::choose(rng),
        };

        let target = (0..targets_per_source)
            .map(|_| TargetSpec {
                bucket: unique_name(BUCKET_NAME_PREFIX),
                plan: StorageTier::choose(rng),
                region: Region::choose(rng),
            })
            .collect();

        Self { source, target }
    }
}

fn unique_name(prefix: &str) -> String {
    format!("{prefix}{}", Uuid::new_v4())
}

/// A single unit of work for the upload pipeline. Consumed exactly once by
/// exactly one worker.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadTask {
    pub path: PathBuf,
    pub bucket: String,
}

impl UploadTask {
    pub fn key(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Outcome of one upload. The path stays attached to the error so the
/// aggregator can report exactly which uploads failed.
#[derive(Debug)]
pub struct UploadResult {
    pub path: PathBuf,
    pub error: Option<Error>,
}

impl UploadResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// A provisioned service instance as reported by the resource manager.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceInstance {
    pub id: String,
    pub name: String,
}
