//! Data types for the relay pipeline.

use std::path::PathBuf;
use std::time::Duration;

use mediarelay_transfer::{DEFAULT_POLL_INTERVAL, DEFAULT_RENDER_THROTTLE, Requester};
use serde::{Deserialize, Serialize};

/// A message in some chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i32,
}

/// A single URL button attached to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkButton {
    pub label: String,
    pub url: String,
}

impl LinkButton {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

/// One user request. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    /// Share link sent by the user.
    pub source_ref: String,
    /// Chat the media is uploaded to before being forwarded.
    pub destination_chat: i64,
    pub requester: Requester,
    /// The user's message carrying the link.
    pub origin: MessageRef,
}

/// Output of a successful download stage.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadedMedia {
    pub file_path: PathBuf,
    pub thumbnail_path: Option<PathBuf>,
    pub title: String,
    pub session_id: String,
}

/// Terminal outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineResult {
    Success { remote_message: MessageRef },
    ResolutionFailed,
    DownloadFailed { reason: String },
    UploadFailed { reason: String },
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Pipeline state. Transitions only move forward, one stage at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    Resolving,
    Downloading,
    Uploading,
    Done,
    Failed,
}

impl PipelineStage {
    /// Returns `true` if `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: PipelineStage) -> bool {
        use PipelineStage::*;
        matches!(
            (self, next),
            (Idle, Resolving)
                | (Resolving, Downloading)
                | (Downloading, Uploading)
                | (Uploading, Done)
                | (Resolving | Downloading | Uploading, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Tunables consumed by the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Spacing between download status polls.
    pub poll_interval: Duration,
    /// Consecutive failed status reads tolerated before the download is
    /// abandoned.
    pub max_poll_errors: u32,
    /// Minimum spacing between rendered upload progress pushes.
    pub render_throttle: Duration,
    /// Only used in the failure message template.
    pub max_file_size_mb: u64,
    /// Where thumbnails are written.
    pub thumbnail_dir: PathBuf,
    /// Sticker sent after a successful run, removed after `sticker_linger`.
    pub done_sticker: Option<String>,
    pub sticker_linger: Duration,
    /// Pause between forwarding the media and deleting the user's message.
    pub origin_delete_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_errors: 5,
            render_throttle: DEFAULT_RENDER_THROTTLE,
            max_file_size_mb: 120,
            thumbnail_dir: PathBuf::from("downloads"),
            done_sticker: None,
            sticker_linger: Duration::from_secs(5),
            origin_delete_delay: Duration::from_secs(1),
        }
    }
}
