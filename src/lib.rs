/*!
# Overview
cossync-e2e is an end-to-end test harness for CLI-driven bucket
synchronization across regions.

It generates a randomized sync spec (sources, targets, service instances,
buckets), provisions the resources, seeds the source buckets with generated
objects through a concurrent upload pipeline, invokes the external sync
subcommand with the spec file, and verifies that every expected object is
visible in every target bucket. All provisioned resources are cleaned up
whatever the outcome.

## As a library
The CLI is a thin wrapper of this library. The seams are traits:
[`storage::StorageTrait`] / [`storage::StorageProvider`] for object storage,
[`storage::ResourceManager`] for the control plane, and
[`scenario::SyncTrigger`] for the sync operation itself, so scenarios can run
against a real S3-compatible backend or fully in process.

Example usage

```Toml
[dependencies]
cossync-e2e = "0.3"
tokio = { version = "1", features = ["full"] }
```

```no_run
use std::sync::Arc;

use cossync_e2e::Config;
use cossync_e2e::config::args::parse_from_args;
use cossync_e2e::scenario::Scenario;
use cossync_e2e::scenario::command::{CommandSyncTrigger, SyncCommand};
use cossync_e2e::storage::memory::InMemoryResourceManager;
use cossync_e2e::storage::s3::S3StorageProvider;
use cossync_e2e::types::token::create_pipeline_cancellation_token;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = vec!["program", "/usr/local/bin/cossync"];

    let config = Config::try_from(parse_from_args(args)?).unwrap();
    let cancellation_token = create_pipeline_cancellation_token();

    let trigger = CommandSyncTrigger::new(SyncCommand::new(&config.sync_command));
    let scenario = Scenario::new(
        config.clone(),
        Arc::new(InMemoryResourceManager::new()),
        Arc::new(S3StorageProvider::new(config.client_config)),
        Arc::new(trigger),
        cancellation_token,
    );

    scenario.run().await
}
```
*/

pub use crate::config::Config;
pub use crate::config::args::CLIArgs;

pub mod config;
pub mod generator;
pub mod pipeline;
pub mod scenario;
pub mod storage;
pub mod types;
