//! Chat platform trait.
//!
//! `ChatPlatform` is implemented by the bot app on top of the real chat API.
//! The pipeline only uses it as a status sink (send/edit/delete text) and an
//! artifact sink (send video, copy message). Keeping it a trait lets every
//! stage run against in-memory mocks.

use std::path::Path;
use std::sync::Arc;

use mediarelay_transfer::{BoxFuture, ProgressSink};
use tracing::warn;

use crate::error::ChatError;
use crate::types::{LinkButton, MessageRef};

/// A video to stream to a chat.
#[derive(Debug, Clone, Copy)]
pub struct VideoUpload<'a> {
    pub chat_id: i64,
    pub path: &'a Path,
    /// File name shown by the client.
    pub file_name: &'a str,
    pub caption: &'a str,
    pub thumbnail: Option<&'a Path>,
}

/// Abstract chat platform.
pub trait ChatPlatform: Send + Sync {
    /// Sends a text message, optionally with one URL button.
    fn send_text<'a>(
        &'a self,
        chat_id: i64,
        text: &'a str,
        button: Option<&'a LinkButton>,
    ) -> BoxFuture<'a, Result<MessageRef, ChatError>>;

    /// Replaces the text (and button) of an existing message.
    fn edit_text<'a>(
        &'a self,
        message: &'a MessageRef,
        text: &'a str,
        button: Option<&'a LinkButton>,
    ) -> BoxFuture<'a, Result<(), ChatError>>;

    fn delete_message<'a>(
        &'a self,
        message: &'a MessageRef,
    ) -> BoxFuture<'a, Result<(), ChatError>>;

    fn send_sticker<'a>(
        &'a self,
        chat_id: i64,
        sticker_id: &'a str,
    ) -> BoxFuture<'a, Result<MessageRef, ChatError>>;

    /// Streams a local video file. The transport calls `progress` with
    /// cumulative byte counts at whatever granularity it reads the file.
    fn send_video<'a>(
        &'a self,
        video: VideoUpload<'a>,
        progress: Arc<dyn ProgressSink>,
    ) -> BoxFuture<'a, Result<MessageRef, ChatError>>;

    /// Copies `message` into `to_chat` without a forward header.
    fn copy_message<'a>(
        &'a self,
        to_chat: i64,
        message: &'a MessageRef,
    ) -> BoxFuture<'a, Result<MessageRef, ChatError>>;

    /// Returns `true` if `user_id` is a member, admin or owner of `chat_id`.
    fn is_member<'a>(
        &'a self,
        chat_id: i64,
        user_id: i64,
    ) -> BoxFuture<'a, Result<bool, ChatError>>;
}

/// Edits a status message, logging instead of failing.
///
/// Returns `true` if the edit went through.
pub(crate) async fn edit_best_effort(
    chat: &dyn ChatPlatform,
    message: &MessageRef,
    text: &str,
    button: Option<&LinkButton>,
) -> bool {
    match chat.edit_text(message, text, button).await {
        Ok(()) => true,
        Err(e) => {
            warn!(
                chat_id = message.chat_id,
                message_id = message.message_id,
                error = %e,
                "status update failed"
            );
            false
        }
    }
}

/// Deletes a message, logging instead of failing.
pub(crate) async fn delete_best_effort(chat: &dyn ChatPlatform, message: &MessageRef) {
    if let Err(e) = chat.delete_message(message).await {
        warn!(
            chat_id = message.chat_id,
            message_id = message.message_id,
            error = %e,
            "failed to delete message"
        );
    }
}
