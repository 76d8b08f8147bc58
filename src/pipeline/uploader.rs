use anyhow::{Result, anyhow};
use tracing::{error, info, trace};

use crate::types::{UploadResult, UploadTask};

use super::stage::{SendResult, Stage};

pub struct ObjectUploader {
    worker_index: u16,
    base: Stage,
}

impl ObjectUploader {
    pub fn new(base: Stage, worker_index: u16) -> Self {
        Self { worker_index, base }
    }

    /// Drains the work queue until it is closed and exhausted, publishing one
    /// result per task. A failed upload is recorded and never cancels the
    /// rest of the batch.
    pub async fn upload(&self) -> Result<()> {
        trace!(
            worker_index = self.worker_index,
            "upload worker has started."
        );

        loop {
            if self.base.cancellation_token.is_cancelled() {
                info!(
                    worker_index = self.worker_index,
                    "upload worker has been cancelled."
                );
                return Ok(());
            }

            tokio::select! {
                recv_result = self.base.receiver.recv() => {
                    match recv_result {
                        Ok(task) => {
                            if self.upload_and_publish(task).await? == SendResult::Closed {
                                return Ok(());
                            }
                        },
                        Err(_) => {
                            // normal shutdown
                            trace!(
                                worker_index = self.worker_index,
                                "upload worker has been completed."
                            );
                            break;
                        }
                    }
                },
                _ = self.base.cancellation_token.cancelled() => {
                    info!(
                        worker_index = self.worker_index,
                        "upload worker has been cancelled."
                    );
                    return Ok(());
                }
            }
        }

        Ok(())
    }

    async fn upload_and_publish(&self, task: UploadTask) -> Result<SendResult> {
        let result = self.upload_object(&task).await;

        if let Err(e) = &result {
            error!(
                worker_index = self.worker_index,
                path = %task.path.display(),
                error = e.to_string(),
                "upload failed."
            );
        }

        self.base
            .send(UploadResult {
                path: task.path,
                error: result.err(),
            })
            .await
    }

    async fn upload_object(&self, task: &UploadTask) -> Result<()> {
        let key = task.key();

        match self.base.upload_timeout {
            Some(timeout) => tokio::time::timeout(
                timeout,
                self.base.storage.put_object(&task.path, &key, &task.bucket),
            )
            .await
            .map_err(|_| anyhow!("upload of {} timed out", task.path.display()))?,
            None => {
                self.base
                    .storage
                    .put_object(&task.path, &key, &task.bucket)
                    .await
            }
        }
    }
}
