//! Relay pipeline for one user request.
//!
//! This crate holds the business logic only. The bot app supplies a
//! [`ChatPlatform`] implementation for the chat transport; the download
//! manager and link resolver are injected the same way.
//!
//! # Pipeline
//!
//! 1. **Resolve**: turn the share link into a direct URL and file name
//! 2. **Download**: submit to the download manager and poll until terminal
//! 3. **Upload**: stream the file to the destination chat, then forward it
//! 4. **Cleanup**: remove the downloaded file and thumbnail on every path

pub mod artifacts;
pub mod chat;
pub mod coordinator;
pub mod download;
pub mod error;
pub mod messages;
pub mod resolve;
pub mod types;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

pub use artifacts::Artifacts;
pub use chat::{ChatPlatform, VideoUpload};
pub use coordinator::PipelineCoordinator;
pub use download::DownloadOrchestrator;
pub use error::{ChatError, DownloadError, UploadError};
pub use resolve::LinkResolver;
pub use types::{
    DownloadedMedia, LinkButton, MessageRef, PipelineConfig, PipelineResult, PipelineStage,
    TransferRequest,
};
pub use upload::UploadOrchestrator;
