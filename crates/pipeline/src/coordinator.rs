//! One pipeline run per user request.

use std::sync::Arc;

use mediarelay_transfer::TransferSession;
use tracing::{debug, error, info, warn};

use crate::artifacts::Artifacts;
use crate::chat::{ChatPlatform, delete_best_effort, edit_best_effort};
use crate::download::DownloadOrchestrator;
use crate::messages;
use crate::resolve::LinkResolver;
use crate::types::{MessageRef, PipelineConfig, PipelineResult, PipelineStage, TransferRequest};
use crate::upload::UploadOrchestrator;

/// Sequences resolve, download, upload and cleanup for one request.
///
/// Holds only shared service handles, so a single coordinator can drive any
/// number of concurrent runs. Each stage starts only after the previous one
/// reached a terminal outcome, and a failed stage ends the run.
pub struct PipelineCoordinator {
    chat: Arc<dyn ChatPlatform>,
    resolver: Arc<dyn LinkResolver>,
    session: Arc<dyn TransferSession>,
    config: PipelineConfig,
}

impl PipelineCoordinator {
    pub fn new(
        chat: Arc<dyn ChatPlatform>,
        resolver: Arc<dyn LinkResolver>,
        session: Arc<dyn TransferSession>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            chat,
            resolver,
            session,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the pipeline for `request`, using `status` as the progress
    /// message.
    ///
    /// Never returns an error: every failure becomes a [`PipelineResult`] and
    /// exactly one terminal edit of `status` (or, on success, its removal).
    /// Local files are gone by the time this returns.
    pub async fn run(&self, request: &TransferRequest, status: &MessageRef) -> PipelineResult {
        let mut run = Run::new(request);
        let chat = self.chat.as_ref();

        run.advance(PipelineStage::Resolving);
        let link = match self.resolver.resolve(&request.source_ref).await {
            Ok(link) => link,
            Err(e) => {
                error!(source = %request.source_ref, error = %e, "link resolution failed");
                run.advance(PipelineStage::Failed);
                let text = messages::request_failed(self.config.max_file_size_mb);
                edit_best_effort(chat, status, &text, None).await;
                return PipelineResult::ResolutionFailed;
            }
        };
        debug!(file = %link.file_name, "link resolved");

        run.advance(PipelineStage::Downloading);
        let downloader = DownloadOrchestrator::new(
            self.session.as_ref(),
            self.resolver.as_ref(),
            chat,
            &self.config,
        );
        let media = match downloader.download(&link, request, status).await {
            Ok(media) => media,
            Err(e) => {
                error!(source = %request.source_ref, error = %e, "download stage failed");
                run.advance(PipelineStage::Failed);
                let button = messages::direct_download_button(&link.direct_link);
                edit_best_effort(chat, status, messages::MANUAL_DOWNLOAD, Some(&button)).await;
                return PipelineResult::DownloadFailed {
                    reason: e.to_string(),
                };
            }
        };

        run.advance(PipelineStage::Uploading);
        edit_best_effort(chat, status, messages::UPLOADING, None).await;
        let artifacts = Artifacts::from_media(&media);
        let uploaded = UploadOrchestrator::new(chat, &self.config)
            .upload(&media, request, status)
            .await;
        artifacts.remove_all().await;

        match uploaded {
            Ok(remote_message) => {
                run.advance(PipelineStage::Done);
                self.celebrate(request, status).await;
                PipelineResult::Success { remote_message }
            }
            Err(e) => {
                error!(file = %media.file_path.display(), error = %e, "upload stage failed");
                run.advance(PipelineStage::Failed);
                edit_best_effort(chat, status, messages::UPLOAD_FAILED, None).await;
                PipelineResult::UploadFailed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Replaces the status message with a short-lived sticker.
    async fn celebrate(&self, request: &TransferRequest, status: &MessageRef) {
        let chat = self.chat.as_ref();
        delete_best_effort(chat, status).await;

        let Some(sticker) = self.config.done_sticker.as_deref() else {
            return;
        };
        match chat.send_sticker(request.origin.chat_id, sticker).await {
            Ok(sent) => {
                tokio::time::sleep(self.config.sticker_linger).await;
                delete_best_effort(chat, &sent).await;
            }
            Err(e) => warn!(chat_id = request.origin.chat_id, error = %e, "failed to send sticker"),
        }
    }
}

/// Stage bookkeeping for a single run.
struct Run {
    stage: PipelineStage,
    requester: i64,
}

impl Run {
    fn new(request: &TransferRequest) -> Self {
        Self {
            stage: PipelineStage::Idle,
            requester: request.requester.id,
        }
    }

    fn advance(&mut self, next: PipelineStage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "illegal stage transition {:?} -> {next:?}",
            self.stage
        );
        info!(user_id = self.requester, from = ?self.stage, to = ?next, "pipeline stage");
        self.stage = next;
    }
}
