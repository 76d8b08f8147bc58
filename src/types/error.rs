use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("upload failed for {} object(s): {failed:?}", failed.len())]
    UploadFailed { failed: Vec<PathBuf> },
    #[error("object {key} not found in the bucket {bucket}")]
    ObjectMissing { bucket: String, key: String },
    #[error("sync command exited with status {status}")]
    SyncCommandFailed { status: i32 },
    #[error("cancelled")]
    Cancelled,
}
