use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_channel::{Receiver, Sender};

use crate::storage::Storage;
use crate::types::token::PipelineCancellationToken;
use crate::types::{UploadResult, UploadTask};

pub struct Stage {
    pub storage: Storage,
    pub receiver: Receiver<UploadTask>,
    pub sender: Sender<UploadResult>,
    pub cancellation_token: PipelineCancellationToken,
    pub upload_timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    Success,
    Closed,
}

impl Stage {
    pub fn new(
        storage: Storage,
        receiver: Receiver<UploadTask>,
        sender: Sender<UploadResult>,
        cancellation_token: PipelineCancellationToken,
        upload_timeout: Option<Duration>,
    ) -> Self {
        Self {
            storage,
            receiver,
            sender,
            cancellation_token,
            upload_timeout,
        }
    }

    pub async fn send(&self, result: UploadResult) -> Result<SendResult> {
        let send_result = self
            .sender
            .send(result)
            .await
            .context("async_channel::Sender::send() failed.");

        if let Err(e) = send_result {
            return if !self.is_channel_closed() {
                Err(anyhow!(e))
            } else {
                Ok(SendResult::Closed)
            };
        }

        Ok(SendResult::Success)
    }

    pub fn is_channel_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
