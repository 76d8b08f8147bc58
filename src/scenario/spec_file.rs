use std::io::Write;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::types::SyncSpec;

/// Serializes the replication intent into a temporary spec file consumed by
/// the external sync command. The file is removed when the handle drops.
pub fn write_spec_file(specs: &[SyncSpec]) -> Result<NamedTempFile> {
    info!("create spec file.");

    let mut file = tempfile::Builder::new()
        .prefix("spec.")
        .suffix(".json")
        .tempfile()
        .context("failed to create spec file")?;

    let document =
        serde_json::to_string_pretty(specs).context("failed to serialize spec")?;
    file.write_all(document.as_bytes())
        .context("failed to write spec file")?;
    file.flush()?;

    debug!(path = %file.path().display(), "spec file written.");
    Ok(file)
}
