#![allow(dead_code)]

use std::env;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tokio::sync::Semaphore;

use cossync_e2e::Config;
use cossync_e2e::config::args::parse_from_args;

/// Path of the CLI under test. Required for every e2e test.
pub const SYNC_COMMAND_ENV_VAR: &str = "COSSYNC_E2E_SYNC_COMMAND";
/// Optional S3-compatible endpoint override for single-endpoint backends.
pub const ENDPOINT_URL_ENV_VAR: &str = "COSSYNC_E2E_ENDPOINT_URL";
pub const REGION_ENV_VAR: &str = "COSSYNC_E2E_REGION";

// Scenarios share service instance names and the backend, run them one at a time.
pub static SEMAPHORE: Lazy<Arc<Semaphore>> = Lazy::new(|| Arc::new(Semaphore::new(1)));

#[cfg(feature = "e2e_test")]
pub struct TestHelper {}

#[cfg(feature = "e2e_test")]
impl TestHelper {
    pub fn sync_command_from_env() -> String {
        env::var(SYNC_COMMAND_ENV_VAR)
            .unwrap_or_else(|_| panic!("{SYNC_COMMAND_ENV_VAR} must be set for e2e tests"))
    }

    /// Builds a harness config from the environment, on top of the given
    /// extra CLI arguments.
    pub fn config_from_env(extra_args: &[&str]) -> Config {
        let sync_command = Self::sync_command_from_env();

        let mut args = vec!["cossync-e2e".to_string()];
        if let Ok(endpoint_url) = env::var(ENDPOINT_URL_ENV_VAR) {
            args.push("--endpoint-url".to_string());
            args.push(endpoint_url);
            args.push("--force-path-style".to_string());
        }
        if let Ok(region) = env::var(REGION_ENV_VAR) {
            args.push("--region".to_string());
            args.push(region);
        }
        args.extend(extra_args.iter().map(|arg| arg.to_string()));
        args.push(sync_command);

        Config::try_from(parse_from_args(args).unwrap()).unwrap()
    }

    pub fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
