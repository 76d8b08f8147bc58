use std::path::PathBuf;
use std::time::Duration;

pub mod args;

/// Harness configuration for one scenario run.
#[derive(Debug, Clone)]
pub struct Config {
    /// The external sync tool under test.
    pub sync_command: PathBuf,
    pub sources: usize,
    pub targets_per_source: usize,
    pub object_count: usize,
    pub object_size: usize,
    pub worker_size: u16,
    /// Deadline applied to each single-object upload. None means no deadline.
    pub upload_timeout: Option<Duration>,
    pub scan_backoff: ScanBackoffConfig,
    pub client_config: ClientConfig,
    pub tracing_config: Option<TracingConfig>,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credential: S3Credentials,
    /// Overrides the per-bucket region, for single-endpoint test backends.
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub retry_config: RetryConfig,
}

#[derive(Debug, Clone)]
pub enum S3Credentials {
    FromEnvironment,
    Credentials {
        access_key: String,
        secret_access_key: String,
    },
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub aws_max_attempts: u32,
    pub initial_backoff_milliseconds: u64,
}

/// Retry policy for the verification scanner. One attempt preserves the
/// original single-pass, fail-fast behavior.
#[derive(Debug, Clone, Copy)]
pub struct ScanBackoffConfig {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for ScanBackoffConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TracingConfig {
    pub tracing_level: log::Level,
    pub json_tracing: bool,
}
