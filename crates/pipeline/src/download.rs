//! Download stage: drive one manager session to a terminal state.

use std::path::PathBuf;

use mediarelay_resolver::ResolvedLink;
use mediarelay_transfer::{
    SessionHandle, SessionStatus, TransferMetrics, TransferSession, format_progress,
};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::artifacts::{Artifacts, remove_file_if_exists};
use crate::chat::{ChatPlatform, edit_best_effort};
use crate::error::DownloadError;
use crate::messages::{STATUS_DOWNLOADED, STATUS_DOWNLOADING};
use crate::resolve::LinkResolver;
use crate::types::{DownloadedMedia, MessageRef, PipelineConfig, TransferRequest};

/// Submits a resolved link to the download manager and polls it until it
/// completes or fails.
///
/// There is no wall-clock timeout here. The manager's own retry budget is
/// the only bound on how long a download may take.
pub struct DownloadOrchestrator<'a> {
    session: &'a dyn TransferSession,
    resolver: &'a dyn LinkResolver,
    chat: &'a dyn ChatPlatform,
    config: &'a PipelineConfig,
}

impl<'a> DownloadOrchestrator<'a> {
    pub fn new(
        session: &'a dyn TransferSession,
        resolver: &'a dyn LinkResolver,
        chat: &'a dyn ChatPlatform,
        config: &'a PipelineConfig,
    ) -> Self {
        Self {
            session,
            resolver,
            chat,
            config,
        }
    }

    /// Downloads `link` and returns the local file plus its thumbnail.
    ///
    /// Every tick renders a progress report into `status`; failed renders
    /// are logged and the loop continues. Failed status reads are retried
    /// on the next tick until `max_poll_errors` of them happen in a row.
    pub async fn download(
        &self,
        link: &ResolvedLink,
        request: &TransferRequest,
        status: &MessageRef,
    ) -> Result<DownloadedMedia, DownloadError> {
        let handle = self.session.submit(&link.direct_link).await?;
        let started = Instant::now();
        info!(gid = %handle, file = %link.file_name, "download submitted");

        let mut poll_errors = 0u32;
        loop {
            let polled = match self.session.poll(&handle).await {
                Ok(polled) => {
                    poll_errors = 0;
                    polled
                }
                Err(e) => {
                    poll_errors += 1;
                    if poll_errors >= self.config.max_poll_errors {
                        error!(
                            gid = %handle,
                            error = %e,
                            attempts = poll_errors,
                            "giving up on download"
                        );
                        self.abandon(&handle).await;
                        return Err(e.into());
                    }
                    warn!(
                        gid = %handle,
                        error = %e,
                        attempts = poll_errors,
                        "status poll failed, retrying"
                    );
                    tokio::time::sleep(self.config.poll_interval).await;
                    continue;
                }
            };

            match polled {
                SessionStatus::Active(metrics) => {
                    let metrics = relabel(&metrics, &link.file_name, &handle, started);
                    self.render(&metrics, STATUS_DOWNLOADING, request, status).await;
                }
                SessionStatus::Completed { metrics, path } => {
                    let metrics = relabel(&metrics, &link.file_name, &handle, started);
                    info!(
                        gid = %handle,
                        path = %path.display(),
                        bytes = metrics.bytes_total,
                        "download completed"
                    );
                    self.render(&metrics, STATUS_DOWNLOADED, request, status).await;

                    let thumbnail_path = match &link.thumbnail_url {
                        Some(url) => self.fetch_thumbnail(url, &handle).await,
                        None => None,
                    };
                    return Ok(DownloadedMedia {
                        file_path: path,
                        thumbnail_path,
                        title: link.file_name.clone(),
                        session_id: handle.id().to_string(),
                    });
                }
                SessionStatus::Failed {
                    reason,
                    partial_path,
                } => {
                    error!(gid = %handle, reason = %reason, "download failed");
                    if let Some(path) = partial_path {
                        Artifacts::partial_download(&path).remove_all().await;
                    }
                    return Err(DownloadError::Failed { reason });
                }
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Stops a session that is no longer watched and removes whatever it
    /// wrote so far.
    async fn abandon(&self, handle: &SessionHandle) {
        match self.session.cancel(handle).await {
            Ok(Some(path)) => {
                let removed = Artifacts::partial_download(&path).remove_all().await;
                debug!(
                    gid = %handle,
                    path = %path.display(),
                    removed,
                    "partial download removed"
                );
            }
            Ok(None) => {}
            Err(e) => {
                warn!(
                    gid = %handle,
                    error = %e,
                    "could not stop download, partial file may remain"
                );
            }
        }
    }

    async fn render(
        &self,
        metrics: &TransferMetrics,
        label: &str,
        request: &TransferRequest,
        status: &MessageRef,
    ) {
        let text = format_progress(metrics, label, &request.requester);
        edit_best_effort(self.chat, status, &text, None).await;
    }

    /// Fetches and stores the thumbnail. Any failure leaves no file behind
    /// and yields `None`.
    async fn fetch_thumbnail(&self, url: &str, handle: &SessionHandle) -> Option<PathBuf> {
        let path = self
            .config
            .thumbnail_dir
            .join(format!("thumb_{}.jpg", handle.id()));

        let bytes = match self.resolver.fetch_thumbnail(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(gid = %handle, error = %e, "thumbnail fetch failed, continuing without");
                return None;
            }
        };

        let written = async {
            tokio::fs::create_dir_all(&self.config.thumbnail_dir).await?;
            tokio::fs::write(&path, &bytes).await
        }
        .await;

        match written {
            Ok(()) => {
                debug!(gid = %handle, path = %path.display(), "thumbnail saved");
                Some(path)
            }
            Err(e) => {
                warn!(gid = %handle, error = %e, "thumbnail write failed, continuing without");
                let _ = remove_file_if_exists(&path).await;
                None
            }
        }
    }
}

/// Shows the resolved title and the time since submission instead of the
/// manager's own label.
fn relabel(
    metrics: &TransferMetrics,
    title: &str,
    handle: &SessionHandle,
    started: Instant,
) -> TransferMetrics {
    TransferMetrics::new(
        title,
        metrics.bytes_done,
        metrics.bytes_total,
        metrics.speed_bytes_per_sec,
        started.elapsed().as_secs_f64(),
    )
    .with_session(handle.id())
}
