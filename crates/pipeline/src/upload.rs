//! Upload stage: stream a file to the destination chat and hand it to the
//! requester.

use std::sync::Arc;

use mediarelay_transfer::{ProgressSink, RateMeter, Requester, Throttle, format_progress};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::artifacts::Artifacts;
use crate::chat::{ChatPlatform, VideoUpload, delete_best_effort, edit_best_effort};
use crate::error::UploadError;
use crate::messages::{STATUS_UPLOADING, upload_caption};
use crate::types::{DownloadedMedia, MessageRef, PipelineConfig, TransferRequest};

/// Publishes the latest `(bytes_done, bytes_total)` pair.
///
/// The transport calls this from its read path; `send_replace` never waits
/// and never fails, and a slow reader only ever sees the newest value.
struct WatchSink(watch::Sender<(u64, u64)>);

impl ProgressSink for WatchSink {
    fn report(&self, bytes_done: u64, bytes_total: u64) {
        self.0.send_replace((bytes_done, bytes_total));
    }
}

/// Turns byte counts into throttled status edits.
struct UploadReporter<'a> {
    chat: &'a dyn ChatPlatform,
    status: &'a MessageRef,
    requester: &'a Requester,
    title: &'a str,
    meter: RateMeter,
    throttle: Throttle,
    completion_rendered: bool,
}

impl UploadReporter<'_> {
    /// Renders every value published on `rx` until the sender goes away.
    async fn follow(&mut self, rx: &mut watch::Receiver<(u64, u64)>) {
        while rx.changed().await.is_ok() {
            let (done, total) = *rx.borrow_and_update();
            self.push(done, total).await;
        }
    }

    async fn push(&mut self, done: u64, total: u64) {
        let now = Instant::now();
        let complete = total > 0 && done >= total;
        if (complete && self.completion_rendered) || !self.throttle.ready(now, complete) {
            return;
        }
        self.render(done, total, now, complete).await;
    }

    async fn render(&mut self, done: u64, total: u64, now: Instant, complete: bool) {
        let metrics = self.meter.snapshot(self.title, done, total, now);
        let text = format_progress(&metrics, STATUS_UPLOADING, self.requester);
        if edit_best_effort(self.chat, self.status, &text, None).await {
            self.throttle.mark(now);
            self.completion_rendered |= complete;
        }
    }

    /// Shows the final state once the transport is done. Bypasses the
    /// throttle, so it renders even when the last report landed inside a
    /// window, was never observed, or the file was empty.
    async fn finish(&mut self, total: u64) {
        if !self.completion_rendered {
            self.render(total, total, Instant::now(), true).await;
        }
    }
}

/// Streams a downloaded file to the destination chat, then copies it to the
/// requester and removes the local files.
pub struct UploadOrchestrator<'a> {
    chat: &'a dyn ChatPlatform,
    config: &'a PipelineConfig,
}

impl<'a> UploadOrchestrator<'a> {
    pub fn new(chat: &'a dyn ChatPlatform, config: &'a PipelineConfig) -> Self {
        Self { chat, config }
    }

    /// Uploads `media` and returns the message it produced in the
    /// destination chat.
    ///
    /// Progress edits into `status` are throttled to one per render window;
    /// failed edits are logged and never abort the stream. Nothing is copied
    /// to the requester unless the whole stream succeeded.
    pub async fn upload(
        &self,
        media: &DownloadedMedia,
        request: &TransferRequest,
        status: &MessageRef,
    ) -> Result<MessageRef, UploadError> {
        let total = tokio::fs::metadata(&media.file_path).await?.len();
        let caption = upload_caption(&media.title, &request.requester);
        let video = VideoUpload {
            chat_id: request.destination_chat,
            path: &media.file_path,
            file_name: &media.title,
            caption: &caption,
            thumbnail: media.thumbnail_path.as_deref(),
        };

        let started = Instant::now();
        let (tx, mut rx) = watch::channel((0u64, total));
        let sink: Arc<dyn ProgressSink> = Arc::new(WatchSink(tx));
        let mut reporter = UploadReporter {
            chat: self.chat,
            status,
            requester: &request.requester,
            title: &media.title,
            meter: RateMeter::new(started),
            throttle: Throttle::new(self.config.render_throttle, started),
            completion_rendered: false,
        };

        info!(
            session = %media.session_id,
            bytes = total,
            chat_id = request.destination_chat,
            "upload started"
        );

        let upload = self.chat.send_video(video, sink);
        tokio::pin!(upload);
        let finished = {
            let follow = reporter.follow(&mut rx);
            tokio::pin!(follow);
            tokio::select! {
                res = &mut upload => Some(res),
                () = &mut follow => None,
            }
        };
        let sent = match finished {
            Some(res) => res,
            None => upload.await,
        }
        .map_err(UploadError::Transfer)?;

        let (_, reported_total) = *rx.borrow();
        reporter.finish(reported_total.max(total)).await;
        info!(
            session = %media.session_id,
            message_id = sent.message_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "upload finished"
        );

        self.chat
            .copy_message(request.origin.chat_id, &sent)
            .await
            .map_err(UploadError::Forward)?;
        debug!(chat_id = request.origin.chat_id, "media copied to requester");

        tokio::time::sleep(self.config.origin_delete_delay).await;
        delete_best_effort(self.chat, &request.origin).await;

        let removed = Artifacts::from_media(media).remove_all().await;
        debug!(session = %media.session_id, removed, "local files removed");
        Ok(sent)
    }
}
