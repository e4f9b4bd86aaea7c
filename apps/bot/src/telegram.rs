//! Telegram implementation of the pipeline's chat platform.

use std::fmt::Display;
use std::sync::Arc;

use mediarelay_pipeline::{ChatError, ChatPlatform, LinkButton, MessageRef, VideoUpload};
use mediarelay_transfer::{BoxFuture, ProgressSink};
use teloxide::prelude::*;
use teloxide::types::{
    ChatId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, MessageId, ReplyMarkup, UserId,
};
use tokio_util::io::InspectReader;
use tracing::debug;

/// Chat platform backed by the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramChat {
    bot: Bot,
}

impl TelegramChat {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn chat_err(e: impl Display) -> ChatError {
    ChatError(e.to_string())
}

fn message_ref(msg: &Message) -> MessageRef {
    MessageRef {
        chat_id: msg.chat.id.0,
        message_id: msg.id.0,
    }
}

/// One-row inline keyboard with URL buttons.
pub fn url_keyboard<'a>(
    buttons: impl IntoIterator<Item = &'a LinkButton>,
) -> Result<InlineKeyboardMarkup, ChatError> {
    let row = buttons
        .into_iter()
        .map(|b| {
            let url = b
                .url
                .parse()
                .map_err(|e| ChatError(format!("invalid button URL {}: {e}", b.url)))?;
            Ok(InlineKeyboardButton::url(b.label.clone(), url))
        })
        .collect::<Result<Vec<_>, ChatError>>()?;
    Ok(InlineKeyboardMarkup::new([row]))
}

impl ChatPlatform for TelegramChat {
    fn send_text<'a>(
        &'a self,
        chat_id: i64,
        text: &'a str,
        button: Option<&'a LinkButton>,
    ) -> BoxFuture<'a, Result<MessageRef, ChatError>> {
        Box::pin(async move {
            let mut req = self.bot.send_message(ChatId(chat_id), text);
            if let Some(button) = button {
                req.reply_markup = Some(ReplyMarkup::InlineKeyboard(url_keyboard([button])?));
            }
            let msg = req.await.map_err(chat_err)?;
            Ok(message_ref(&msg))
        })
    }

    fn edit_text<'a>(
        &'a self,
        message: &'a MessageRef,
        text: &'a str,
        button: Option<&'a LinkButton>,
    ) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            let mut req = self.bot.edit_message_text(
                ChatId(message.chat_id),
                MessageId(message.message_id),
                text,
            );
            if let Some(button) = button {
                req.reply_markup = Some(url_keyboard([button])?);
            }
            req.await.map_err(chat_err)?;
            Ok(())
        })
    }

    fn delete_message<'a>(
        &'a self,
        message: &'a MessageRef,
    ) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            self.bot
                .delete_message(ChatId(message.chat_id), MessageId(message.message_id))
                .await
                .map_err(chat_err)?;
            Ok(())
        })
    }

    fn send_sticker<'a>(
        &'a self,
        chat_id: i64,
        sticker_id: &'a str,
    ) -> BoxFuture<'a, Result<MessageRef, ChatError>> {
        Box::pin(async move {
            let msg = self
                .bot
                .send_sticker(ChatId(chat_id), InputFile::file_id(sticker_id.to_string()))
                .await
                .map_err(chat_err)?;
            Ok(message_ref(&msg))
        })
    }

    fn send_video<'a>(
        &'a self,
        video: VideoUpload<'a>,
        progress: Arc<dyn ProgressSink>,
    ) -> BoxFuture<'a, Result<MessageRef, ChatError>> {
        Box::pin(async move {
            let file = tokio::fs::File::open(video.path).await.map_err(chat_err)?;
            let total = file.metadata().await.map_err(chat_err)?.len();

            // Every chunk the HTTP body pulls from the file is counted here.
            let mut sent = 0u64;
            let reader = InspectReader::new(file, move |chunk: &[u8]| {
                sent += chunk.len() as u64;
                progress.report(sent, total);
            });

            let input = InputFile::read(reader).file_name(video.file_name.to_string());
            let mut req = self.bot.send_video(ChatId(video.chat_id), input);
            req.caption = Some(video.caption.to_string());
            req.supports_streaming = Some(true);
            if let Some(thumb) = video.thumbnail {
                req.thumbnail = Some(InputFile::file(thumb.to_path_buf()));
            }

            debug!(chat_id = video.chat_id, bytes = total, "sending video");
            let msg = req.await.map_err(chat_err)?;
            Ok(message_ref(&msg))
        })
    }

    fn copy_message<'a>(
        &'a self,
        to_chat: i64,
        message: &'a MessageRef,
    ) -> BoxFuture<'a, Result<MessageRef, ChatError>> {
        Box::pin(async move {
            let id = self
                .bot
                .copy_message(
                    ChatId(to_chat),
                    ChatId(message.chat_id),
                    MessageId(message.message_id),
                )
                .await
                .map_err(chat_err)?;
            Ok(MessageRef {
                chat_id: to_chat,
                message_id: id.0,
            })
        })
    }

    fn is_member<'a>(
        &'a self,
        chat_id: i64,
        user_id: i64,
    ) -> BoxFuture<'a, Result<bool, ChatError>> {
        Box::pin(async move {
            let member = self
                .bot
                .get_chat_member(ChatId(chat_id), UserId(user_id as u64))
                .await
                .map_err(chat_err)?;
            Ok(member.kind.is_privileged() || member.kind.is_member())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyboard_keeps_button_order() {
        let join = LinkButton::new("Join", "https://t.me/example_channel");
        let dev = LinkButton::new("Developer", "https://t.me/example_dev");
        let markup = url_keyboard([&join, &dev]).unwrap();

        assert_eq!(markup.inline_keyboard.len(), 1);
        let row = &markup.inline_keyboard[0];
        assert_eq!(row.len(), 2);
        assert_eq!(row[0].text, "Join");
        assert_eq!(row[1].text, "Developer");
    }

    #[test]
    fn keyboard_rejects_bad_url() {
        let bad = LinkButton::new("Broken", "not a url");
        let err = url_keyboard([&bad]).unwrap_err();
        assert!(err.0.contains("not a url"));
    }
}
