use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};

use crate::Config;
use crate::config::{
    ClientConfig, RetryConfig, S3Credentials, ScanBackoffConfig, TracingConfig,
};

const DEFAULT_SOURCES: usize = 2;
const DEFAULT_TARGETS_PER_SOURCE: usize = 2;
const DEFAULT_OBJECT_COUNT: usize = 200;
const DEFAULT_OBJECT_SIZE: usize = 200;
const DEFAULT_WORKER_SIZE: u16 = 20;
const DEFAULT_VERIFY_ATTEMPTS: u32 = 1;
const DEFAULT_VERIFY_INITIAL_BACKOFF_MILLISECONDS: u64 = 500;
const DEFAULT_AWS_MAX_ATTEMPTS: u32 = 10;
const DEFAULT_INITIAL_BACKOFF_MILLISECONDS: u64 = 100;

const PARTIAL_CREDENTIALS: &str =
    "--access-key and --secret-access-key must be specified together\n";
const INVALID_WORKER_SIZE: &str = "--worker-size must be at least 1\n";
const INVALID_SOURCES: &str = "--sources must be at least 1\n";
const INVALID_VERIFY_ATTEMPTS: &str = "--verify-attempts must be at least 1\n";

#[derive(Parser, Debug)]
#[command(version, about = "End-to-end harness for bucket sync tools", long_about = None)]
pub struct CLIArgs {
    /// The sync CLI under test, e.g. pvsadm
    pub sync_command: PathBuf,

    /// Number of source buckets
    #[arg(long, default_value_t = DEFAULT_SOURCES)]
    pub sources: usize,

    /// Number of target buckets per source
    #[arg(long, default_value_t = DEFAULT_TARGETS_PER_SOURCE)]
    pub targets_per_source: usize,

    /// Number of objects seeded into each source bucket
    #[arg(long, default_value_t = DEFAULT_OBJECT_COUNT)]
    pub object_count: usize,

    /// Size of each generated object in bytes
    #[arg(long, default_value_t = DEFAULT_OBJECT_SIZE)]
    pub object_size: usize,

    /// Number of concurrent upload workers
    #[arg(long, default_value_t = DEFAULT_WORKER_SIZE)]
    pub worker_size: u16,

    /// Deadline for a single object upload, in milliseconds
    #[arg(long)]
    pub upload_timeout_milliseconds: Option<u64>,

    /// Listing passes before an object is declared missing
    #[arg(long, default_value_t = DEFAULT_VERIFY_ATTEMPTS)]
    pub verify_attempts: u32,

    /// Initial backoff between listing passes, in milliseconds
    #[arg(long, default_value_t = DEFAULT_VERIFY_INITIAL_BACKOFF_MILLISECONDS)]
    pub verify_initial_backoff_milliseconds: u64,

    /// Storage endpoint URL, for S3-compatible backends
    #[arg(long)]
    pub endpoint_url: Option<String>,

    /// Fixed region overriding the per-bucket region assignment
    #[arg(long)]
    pub region: Option<String>,

    #[arg(long, env = "COSSYNC_ACCESS_KEY", requires = "secret_access_key")]
    pub access_key: Option<String>,

    #[arg(long, env = "COSSYNC_SECRET_ACCESS_KEY", requires = "access_key")]
    pub secret_access_key: Option<String>,

    #[arg(long)]
    pub force_path_style: bool,

    #[arg(long, default_value_t = DEFAULT_AWS_MAX_ATTEMPTS)]
    pub aws_max_attempts: u32,

    #[arg(long, default_value_t = DEFAULT_INITIAL_BACKOFF_MILLISECONDS)]
    pub initial_backoff_milliseconds: u64,

    /// Output traces as JSON
    #[arg(long)]
    pub json_tracing: bool,

    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,
}

pub fn parse_from_args<I, T>(args: I) -> Result<CLIArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    CLIArgs::try_parse_from(args)
}

impl TryFrom<CLIArgs> for Config {
    type Error = String;

    fn try_from(args: CLIArgs) -> Result<Self, Self::Error> {
        validate_args(&args)?;

        let credential = match (&args.access_key, &args.secret_access_key) {
            (Some(access_key), Some(secret_access_key)) => S3Credentials::Credentials {
                access_key: access_key.clone(),
                secret_access_key: secret_access_key.clone(),
            },
            _ => S3Credentials::FromEnvironment,
        };

        let tracing_config = args.verbosity.log_level().map(|level| TracingConfig {
            tracing_level: level,
            json_tracing: args.json_tracing,
        });

        Ok(Config {
            sync_command: args.sync_command,
            sources: args.sources,
            targets_per_source: args.targets_per_source,
            object_count: args.object_count,
            object_size: args.object_size,
            worker_size: args.worker_size,
            upload_timeout: args
                .upload_timeout_milliseconds
                .map(Duration::from_millis),
            scan_backoff: ScanBackoffConfig {
                max_attempts: args.verify_attempts,
                initial_backoff: Duration::from_millis(
                    args.verify_initial_backoff_milliseconds,
                ),
            },
            client_config: ClientConfig {
                credential,
                region: args.region,
                endpoint_url: args.endpoint_url,
                force_path_style: args.force_path_style,
                retry_config: RetryConfig {
                    aws_max_attempts: args.aws_max_attempts,
                    initial_backoff_milliseconds: args.initial_backoff_milliseconds,
                },
            },
            tracing_config,
        })
    }
}

fn validate_args(args: &CLIArgs) -> Result<(), String> {
    if args.access_key.is_some() != args.secret_access_key.is_some() {
        return Err(PARTIAL_CREDENTIALS.to_string());
    }
    if args.worker_size == 0 {
        return Err(INVALID_WORKER_SIZE.to_string());
    }
    if args.sources == 0 {
        return Err(INVALID_SOURCES.to_string());
    }
    if args.verify_attempts == 0 {
        return Err(INVALID_VERIFY_ATTEMPTS.to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_config_with_defaults() {
        init_dummy_tracing_subscriber();

        let args = vec!["cossync-e2e", "pvsadm"];
        let config = Config::try_from(parse_from_args(args).unwrap()).unwrap();

        assert_eq!(config.sync_command, PathBuf::from("pvsadm"));
        assert_eq!(config.sources, DEFAULT_SOURCES);
        assert_eq!(config.targets_per_source, DEFAULT_TARGETS_PER_SOURCE);
        assert_eq!(config.object_count, DEFAULT_OBJECT_COUNT);
        assert_eq!(config.object_size, DEFAULT_OBJECT_SIZE);
        assert_eq!(config.worker_size, DEFAULT_WORKER_SIZE);
        assert!(config.upload_timeout.is_none());
        assert_eq!(config.scan_backoff.max_attempts, DEFAULT_VERIFY_ATTEMPTS);
        assert!(matches!(
            config.client_config.credential,
            S3Credentials::FromEnvironment
        ));
        assert!(config.tracing_config.is_some());
    }

    #[test]
    fn build_config_with_overrides() {
        init_dummy_tracing_subscriber();

        let args = vec![
            "cossync-e2e",
            "--sources",
            "3",
            "--targets-per-source",
            "1",
            "--object-count",
            "10",
            "--object-size",
            "32",
            "--worker-size",
            "4",
            "--upload-timeout-milliseconds",
            "5000",
            "--verify-attempts",
            "5",
            "--verify-initial-backoff-milliseconds",
            "250",
            "--endpoint-url",
            "https://localhost:9000",
            "--force-path-style",
            "pvsadm",
        ];
        let config = Config::try_from(parse_from_args(args).unwrap()).unwrap();

        assert_eq!(config.sources, 3);
        assert_eq!(config.targets_per_source, 1);
        assert_eq!(config.object_count, 10);
        assert_eq!(config.object_size, 32);
        assert_eq!(config.worker_size, 4);
        assert_eq!(config.upload_timeout, Some(Duration::from_millis(5000)));
        assert_eq!(config.scan_backoff.max_attempts, 5);
        assert_eq!(
            config.scan_backoff.initial_backoff,
            Duration::from_millis(250)
        );
        assert_eq!(
            config.client_config.endpoint_url.as_deref(),
            Some("https://localhost:9000")
        );
        assert!(config.client_config.force_path_style);
    }

    #[test]
    fn build_config_with_static_credentials() {
        init_dummy_tracing_subscriber();

        let args = vec![
            "cossync-e2e",
            "--access-key",
            "access_key",
            "--secret-access-key",
            "secret_access_key",
            "pvsadm",
        ];
        let config = Config::try_from(parse_from_args(args).unwrap()).unwrap();

        assert!(matches!(
            config.client_config.credential,
            S3Credentials::Credentials { .. }
        ));
    }

    #[test]
    fn partial_credentials_rejected() {
        init_dummy_tracing_subscriber();

        let args = vec!["cossync-e2e", "--access-key", "access_key", "pvsadm"];
        assert!(parse_from_args(args).is_err());
    }

    #[test]
    fn zero_worker_size_rejected() {
        init_dummy_tracing_subscriber();

        let args = vec!["cossync-e2e", "--worker-size", "0", "pvsadm"];
        let result = Config::try_from(parse_from_args(args).unwrap());
        assert_eq!(result.unwrap_err(), INVALID_WORKER_SIZE);
    }

    #[test]
    fn zero_sources_rejected() {
        init_dummy_tracing_subscriber();

        let args = vec!["cossync-e2e", "--sources", "0", "pvsadm"];
        let result = Config::try_from(parse_from_args(args).unwrap());
        assert_eq!(result.unwrap_err(), INVALID_SOURCES);
    }

    #[test]
    fn zero_verify_attempts_rejected() {
        init_dummy_tracing_subscriber();

        let args = vec!["cossync-e2e", "--verify-attempts", "0", "pvsadm"];
        let result = Config::try_from(parse_from_args(args).unwrap());
        assert_eq!(result.unwrap_err(), INVALID_VERIFY_ATTEMPTS);
    }

    #[test]
    fn quiet_disables_tracing() {
        init_dummy_tracing_subscriber();

        let args = vec!["cossync-e2e", "-qq", "pvsadm"];
        let config = Config::try_from(parse_from_args(args).unwrap()).unwrap();
        assert!(config.tracing_config.is_none());
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
