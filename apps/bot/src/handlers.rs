//! Update handlers: `/start`, `/broadcast` and shared links.

use std::sync::Arc;
use std::time::Duration;

use mediarelay_pipeline::{
    ChatPlatform, LinkButton, PipelineCoordinator, TransferRequest, messages,
};
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, Message, ReplyMarkup, User};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::telegram::{TelegramChat, url_keyboard};
use crate::users::UserStore;

const START_STICKER_LINGER: Duration = Duration::from_secs(2);
const BROADCAST_REPORT_EVERY: usize = 10;

const INVALID_LINK: &str = "Please send a valid link.";
const JOIN_REQUIRED: &str = "You must join my channel to use me.";
const BROADCAST_USAGE: &str = "Please provide a message to broadcast.";

/// Services shared by every handler.
#[derive(Clone)]
pub struct App {
    pub chat: Arc<TelegramChat>,
    pub coordinator: Arc<PipelineCoordinator>,
    pub users: Arc<UserStore>,
    pub config: Arc<Config>,
}

/// Builds the dispatcher handler tree.
pub fn schema() -> UpdateHandler<teloxide::RequestError> {
    Update::filter_message()
        .branch(
            dptree::filter(|msg: Message| command(&msg).is_some_and(|(c, _)| c == "start"))
                .endpoint(handle_start),
        )
        .branch(
            dptree::filter(|msg: Message| command(&msg).is_some_and(|(c, _)| c == "broadcast"))
                .endpoint(handle_broadcast),
        )
        .branch(
            dptree::filter(|msg: Message| msg.text().is_some() && command(&msg).is_none())
                .endpoint(handle_link),
        )
}

fn command(msg: &Message) -> Option<(&str, &str)> {
    msg.text().and_then(parse_command)
}

/// Splits `/cmd@bot rest` into `("cmd", "rest")`.
pub fn parse_command(text: &str) -> Option<(&str, &str)> {
    let rest = text.trim_start().strip_prefix('/')?;
    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (rest, ""),
    };
    let name = head.split('@').next().unwrap_or(head);
    if name.is_empty() {
        return None;
    }
    Some((name, args))
}

/// How a user is shown in reports and captions.
pub fn display_name(user: &User) -> String {
    match &user.username {
        Some(username) => format!("@{username}"),
        None => user.full_name(),
    }
}

fn welcome_text(name: &str) -> String {
    format!(
        "Welcome, {name}.\n\n\
         🌟 I am a media downloader bot. Send me a share link and I will \
         download it and send it to you within a few seconds ✨."
    )
}

fn join_button(config: &Config) -> Option<LinkButton> {
    config
        .join_url
        .as_deref()
        .map(|url| LinkButton::new("Join ❤️🚀", url))
}

fn welcome_buttons(config: &Config) -> Vec<LinkButton> {
    let mut buttons: Vec<LinkButton> = join_button(config).into_iter().collect();
    if let Some(url) = config.developer_url.as_deref() {
        buttons.push(LinkButton::new("Developer ⚡️", url));
    }
    buttons
}

async fn save_user(app: &App, user: &User) {
    app.users
        .save_if_absent(user.id.0 as i64, user.username.as_deref())
        .await;
}

async fn handle_start(bot: Bot, msg: Message, app: App) -> ResponseResult<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    save_user(&app, user).await;

    if let Some(sticker) = app.config.start_sticker.as_deref() {
        match bot
            .send_sticker(msg.chat.id, InputFile::file_id(sticker.to_string()))
            .await
        {
            Ok(sent) => {
                tokio::time::sleep(START_STICKER_LINGER).await;
                if let Err(e) = bot.delete_message(sent.chat.id, sent.id).await {
                    warn!(chat_id = sent.chat.id.0, error = %e, "failed to delete start sticker");
                }
            }
            Err(e) => warn!(chat_id = msg.chat.id.0, error = %e, "failed to send start sticker"),
        }
    }

    let mut req = bot.send_message(msg.chat.id, welcome_text(&display_name(user)));
    let buttons = welcome_buttons(&app.config);
    if !buttons.is_empty() {
        match url_keyboard(&buttons) {
            Ok(markup) => req.reply_markup = Some(ReplyMarkup::InlineKeyboard(markup)),
            Err(e) => warn!(error = %e, "welcome buttons skipped"),
        }
    }
    req.await?;
    Ok(())
}

/// Counts broadcast deliveries.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastTally {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
}

impl BroadcastTally {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Records one delivery. Returns `true` when a progress report is due.
    pub fn record(&mut self, delivered: bool) -> bool {
        if delivered {
            self.success += 1;
        } else {
            self.failed += 1;
        }
        (self.success + self.failed) % BROADCAST_REPORT_EVERY == 0
    }

    pub fn progress_text(&self) -> String {
        format!(
            "Broadcast progress:\n✅ Success: {}\n❌ Failed: {}\nTotal: {}",
            self.success, self.failed, self.total
        )
    }

    pub fn final_text(&self) -> String {
        format!(
            "Broadcast completed!\n✅ Success: {}\n❌ Failed: {}",
            self.success, self.failed
        )
    }
}

async fn handle_broadcast(bot: Bot, msg: Message, app: App) -> ResponseResult<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    if user.id.0 as i64 != app.config.admin_id {
        warn!(user_id = user.id.0, "broadcast attempted by non-admin");
        return Ok(());
    }
    let text = command(&msg).map(|(_, args)| args).unwrap_or_default();
    if text.is_empty() {
        bot.send_message(msg.chat.id, BROADCAST_USAGE).await?;
        return Ok(());
    }

    let recipients = app.users.user_ids().await;
    let mut tally = BroadcastTally::new(recipients.len());
    let status = bot
        .send_message(msg.chat.id, format!("Broadcasting to {} users...", tally.total))
        .await?;
    info!(recipients = tally.total, "broadcast started");

    for user_id in recipients {
        let delivered = match bot.send_message(ChatId(user_id), text).await {
            Ok(_) => true,
            Err(e) => {
                warn!(user_id, error = %e, "broadcast delivery failed");
                false
            }
        };
        if tally.record(delivered) {
            if let Err(e) = bot
                .edit_message_text(status.chat.id, status.id, tally.progress_text())
                .await
            {
                warn!(error = %e, "broadcast progress update failed");
            }
        }
    }

    info!(success = tally.success, failed = tally.failed, "broadcast finished");
    bot.edit_message_text(status.chat.id, status.id, tally.final_text())
        .await?;
    Ok(())
}

/// Returns `true` if the user may use the bot. A failed lookup counts as
/// not being a member.
pub async fn passes_gate(chat: &dyn ChatPlatform, gate: Option<i64>, user_id: i64) -> bool {
    let Some(gate) = gate else {
        return true;
    };
    match chat.is_member(gate, user_id).await {
        Ok(member) => member,
        Err(e) => {
            error!(user_id, chat_id = gate, error = %e, "membership check failed");
            false
        }
    }
}

async fn handle_link(bot: Bot, msg: Message, app: App) -> ResponseResult<()> {
    let (Some(user), Some(text)) = (msg.from.as_ref(), msg.text()) else {
        return Ok(());
    };
    let user_id = user.id.0 as i64;
    save_user(&app, user).await;

    if !passes_gate(app.chat.as_ref(), app.config.fsub_chat_id, user_id).await {
        let button = join_button(&app.config);
        if let Err(e) = app
            .chat
            .send_text(msg.chat.id.0, JOIN_REQUIRED, button.as_ref())
            .await
        {
            warn!(user_id, error = %e, "failed to send join prompt");
        }
        return Ok(());
    }

    let link = text.trim();
    if !app.config.accepts_link(link) {
        bot.send_message(msg.chat.id, INVALID_LINK).await?;
        return Ok(());
    }

    let status = match app
        .chat
        .send_text(msg.chat.id.0, messages::SENDING_MEDIA, None)
        .await
    {
        Ok(status) => status,
        Err(e) => {
            error!(user_id, error = %e, "failed to send status message");
            return Ok(());
        }
    };

    let request = TransferRequest {
        source_ref: link.to_string(),
        destination_chat: app.config.dump_chat_id,
        requester: mediarelay_transfer::Requester::new(user_id, display_name(user)),
        origin: mediarelay_pipeline::MessageRef {
            chat_id: msg.chat.id.0,
            message_id: msg.id.0,
        },
    };
    info!(user_id, link = %request.source_ref, "relay requested");

    let coordinator = app.coordinator.clone();
    tokio::spawn(async move {
        let result = coordinator.run(&request, &status).await;
        info!(
            user_id = request.requester.id,
            success = result.is_success(),
            result = ?result,
            "relay finished"
        );
    });
    Ok(())
}
