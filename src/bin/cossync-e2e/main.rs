use ::tracing::trace;
use anyhow::Result;
use clap::Parser;

use cossync_e2e::CLIArgs;
use cossync_e2e::Config;

mod cli;
mod tracing;

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config_exit_if_err();

    start_tracing_if_necessary(&config);

    trace!("config = {:?}", config);

    cli::run(config).await?;

    Ok(())
}

fn load_config_exit_if_err() -> Config {
    let config = Config::try_from(CLIArgs::parse());
    if let Err(error_message) = config {
        clap::Error::raw(clap::error::ErrorKind::ValueValidation, error_message).exit();
    }

    config.unwrap()
}

fn start_tracing_if_necessary(config: &Config) -> bool {
    if config.tracing_config.is_none() {
        return false;
    }

    tracing::init_tracing(config.tracing_config.as_ref().unwrap());
    true
}
