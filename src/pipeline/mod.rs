use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use tracing::{info, trace};

use crate::storage::Storage;
use crate::types::error::HarnessError;
use crate::types::token::PipelineCancellationToken;
use crate::types::{UploadResult, UploadTask};

mod stage;
mod uploader;

pub mod scanner;

use stage::Stage;
use uploader::ObjectUploader;

/// Uploads a batch of local files to one bucket through a fixed pool of
/// worker tasks sharing a bounded work queue and a bounded result queue.
///
/// Exactly one result is produced per submitted file, in no particular
/// order. A failed upload never cancels in-flight or queued uploads; the
/// batch is judged only after all results have been drained.
pub struct UploadPipeline {
    storage: Storage,
    worker_size: u16,
    upload_timeout: Option<Duration>,
    cancellation_token: PipelineCancellationToken,
}

impl UploadPipeline {
    pub fn new(
        storage: Storage,
        worker_size: u16,
        upload_timeout: Option<Duration>,
        cancellation_token: PipelineCancellationToken,
    ) -> Self {
        Self {
            storage,
            worker_size,
            upload_timeout,
            cancellation_token,
        }
    }

    /// Runs the batch and returns one result per file.
    pub async fn upload(&self, files: &[PathBuf], bucket: &str) -> Result<Vec<UploadResult>> {
        info!(
            bucket = bucket,
            files = files.len(),
            workers = self.worker_size,
            "upload objects to bucket."
        );

        // Queue capacity equals the file count, so the dispatcher below
        // never blocks. Bounded channels need a capacity of at least one.
        let capacity = files.len().max(1);
        let (task_sender, task_receiver) = async_channel::bounded::<UploadTask>(capacity);
        let (result_sender, result_receiver) = async_channel::bounded::<UploadResult>(capacity);

        let mut worker_handles = Vec::with_capacity(self.worker_size as usize);
        for worker_index in 0..self.worker_size {
            let stage = Stage::new(
                dyn_clone::clone_box(&*self.storage),
                task_receiver.clone(),
                result_sender.clone(),
                self.cancellation_token.clone(),
                self.upload_timeout,
            );
            let uploader = ObjectUploader::new(stage, worker_index);

            worker_handles.push(tokio::spawn(async move { uploader.upload().await }));
        }
        drop(result_sender);

        for path in files {
            let task = UploadTask {
                path: path.clone(),
                bucket: bucket.to_string(),
            };
            task_sender.send(task).await?;
        }
        // Workers terminate once the queue is closed and drained.
        task_sender.close();

        let mut results = Vec::with_capacity(files.len());
        while results.len() < files.len() {
            if self.cancellation_token.is_cancelled() {
                return Err(HarnessError::Cancelled.into());
            }

            tokio::select! {
                recv_result = result_receiver.recv() => {
                    results.push(recv_result?);
                },
                _ = self.cancellation_token.cancelled() => {
                    return Err(HarnessError::Cancelled.into());
                }
            }
        }

        for handle in worker_handles {
            handle.await??;
        }

        trace!(bucket = bucket, "upload batch has been completed.");
        Ok(results)
    }

    /// Runs the batch and fails if any single upload failed, naming the
    /// failed paths.
    pub async fn upload_all(&self, files: &[PathBuf], bucket: &str) -> Result<()> {
        let results = self.upload(files, bucket).await?;

        let failed: Vec<PathBuf> = results
            .iter()
            .filter(|result| !result.is_success())
            .map(|result| result.path.clone())
            .collect();

        if !failed.is_empty() {
            return Err(HarnessError::UploadFailed { failed }.into());
        }

        Ok(())
    }
}

/// Lists the files of a local directory, the upload batch input.
pub fn list_local_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();

    Ok(files)
}
