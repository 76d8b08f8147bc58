use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{error, info, trace};

use crate::scenario::SyncTrigger;
use crate::types::SyncSpec;
use crate::types::error::HarnessError;

const SUBCOMMAND: [&str; 2] = ["image", "sync"];

/// Captured outcome of one external CLI invocation.
#[derive(Debug)]
pub struct CommandOutput {
    /// Process exit code. None if terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Invokes `<tool> image sync ...`, capturing exit status and output.
pub struct SyncCommand {
    program: PathBuf,
}

impl SyncCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub async fn run<I, S>(&self, args: I) -> Result<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        trace!(program = %self.program.display(), "invoke sync command.");

        let output = Command::new(&self.program)
            .args(SUBCOMMAND)
            .args(args)
            .output()
            .await
            .with_context(|| format!("failed to invoke {}", self.program.display()))?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    pub async fn sync_with_spec_file(&self, spec_file: &Path) -> Result<CommandOutput> {
        self.run(["--spec-file".as_ref(), spec_file.as_os_str()])
            .await
    }

    pub async fn help(&self) -> Result<CommandOutput> {
        self.run(["--help"]).await
    }
}

/// Production trigger: hands the spec file to the external sync CLI.
pub struct CommandSyncTrigger {
    command: SyncCommand,
}

impl CommandSyncTrigger {
    pub fn new(command: SyncCommand) -> Self {
        Self { command }
    }
}

#[async_trait]
impl SyncTrigger for CommandSyncTrigger {
    async fn sync(&self, spec_file: &Path, _specs: &[SyncSpec]) -> Result<()> {
        let output = self.command.sync_with_spec_file(spec_file).await?;

        if !output.success() {
            error!(
                status = output.status,
                stderr = output.stderr,
                "sync command failed."
            );
            return Err(HarnessError::SyncCommandFailed {
                status: output.status.unwrap_or(-1),
            }
            .into());
        }

        info!(stdout = output.stdout, "sync command has been completed.");
        Ok(())
    }
}
