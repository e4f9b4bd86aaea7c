//! Pipeline error types.

use mediarelay_transfer::{PollError, SubmissionError};

/// A chat platform call failed.
///
/// When raised by a best-effort status update this is the "notify" error:
/// it is logged and never ends a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("chat platform error: {0}")]
pub struct ChatError(pub String);

/// Errors produced by the download stage.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error("download failed: {reason}")]
    Failed { reason: String },
}

/// Errors produced by the upload stage.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("upload failed: {0}")]
    Transfer(ChatError),

    #[error("forward failed: {0}")]
    Forward(ChatError),
}
