//! Service wiring and the update dispatcher.

use std::sync::Arc;

use anyhow::Context;
use mediarelay_pipeline::PipelineCoordinator;
use teloxide::prelude::*;
use tracing::{error, info};

use crate::config::Config;
use crate::handlers::{self, App};
use crate::telegram::TelegramChat;
use crate::users::UserStore;

/// Builds every service from `config` and runs until Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&config.download_dir)
        .await
        .with_context(|| format!("failed to create {}", config.download_dir.display()))?;

    let aria2 = mediarelay_aria2::Client::new(
        Some(config.aria2.rpc_url.as_str()),
        config.aria2.secret.clone(),
        config.download_options(),
    )?;
    // Submissions carry the same options, so a daemon that is down now still
    // gets them once it is reachable.
    match aria2.apply_global_options().await {
        Ok(()) => info!(rpc_url = %config.aria2.rpc_url, "download manager configured"),
        Err(e) => error!(
            rpc_url = %config.aria2.rpc_url,
            error = %e,
            "failed to configure download manager"
        ),
    }

    let resolver =
        mediarelay_resolver::Client::new(&config.resolver.base_url, &config.resolver.api_key)?;
    let users = UserStore::open(&config.users_file).await?;

    let bot = Bot::new(&config.bot_token);
    let me = bot.get_me().await.context("failed to authenticate bot")?;
    info!(username = %me.username(), "bot authenticated");

    let chat = Arc::new(TelegramChat::new(bot.clone()));
    let coordinator = PipelineCoordinator::new(
        chat.clone(),
        Arc::new(resolver),
        Arc::new(aria2),
        config.pipeline(),
    );
    let app = App {
        chat,
        coordinator: Arc::new(coordinator),
        users: Arc::new(users),
        config: Arc::new(config),
    };

    info!("starting update dispatcher");
    Dispatcher::builder(bot, handlers::schema())
        .dependencies(dptree::deps![app])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
