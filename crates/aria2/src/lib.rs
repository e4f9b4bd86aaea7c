//! aria2 JSON-RPC client.
//!
//! Only the calls the relay needs are wrapped: `aria2.addUri`,
//! `aria2.tellStatus` and `aria2.changeGlobalOption`. The [`Client`] also
//! implements [`mediarelay_transfer::TransferSession`], so the download
//! orchestrator can drive it without knowing about RPC.

pub mod client;
mod session;
pub mod types;

pub use client::{Client, Error};
pub use types::{DownloadOptions, DownloadState, DownloadStatus, FileInfo};
