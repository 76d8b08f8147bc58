use std::sync::Arc;

use anyhow::{Result, anyhow};
use tokio::time::Instant;
use tracing::{error, trace};

use cossync_e2e::Config;
use cossync_e2e::scenario::Scenario;
use cossync_e2e::scenario::command::{CommandSyncTrigger, SyncCommand};
use cossync_e2e::storage::memory::InMemoryResourceManager;
use cossync_e2e::storage::s3::S3StorageProvider;
use cossync_e2e::types::token::create_pipeline_cancellation_token;

mod ctrl_c_handler;

pub async fn run(config: Config) -> Result<()> {
    let cancellation_token = create_pipeline_cancellation_token();

    ctrl_c_handler::spawn_ctrl_c_handler(cancellation_token.clone());

    let start_time = Instant::now();
    trace!("sync scenario start.");

    let trigger = CommandSyncTrigger::new(SyncCommand::new(&config.sync_command));
    let scenario = Scenario::new(
        config.clone(),
        Arc::new(InMemoryResourceManager::new()),
        Arc::new(S3StorageProvider::new(config.client_config)),
        Arc::new(trigger),
        cancellation_token,
    );

    let result = scenario.run().await;

    let duration_sec = format!("{:.3}", start_time.elapsed().as_secs_f32());
    if let Err(e) = result {
        error!(duration_sec = duration_sec, error = %e, "sync scenario failed.");

        return Err(anyhow!("sync scenario failed."));
    }

    trace!(
        duration_sec = duration_sec,
        "sync scenario has been completed."
    );

    Ok(())
}
