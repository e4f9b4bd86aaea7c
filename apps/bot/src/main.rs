//! mediarelay bot entry point.

mod app;
mod config;
mod handlers;
mod telegram;
mod users;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting mediarelay bot");

    let config = config::Config::load()?;
    tracing::info!(
        dump_chat_id = config.dump_chat_id,
        gate = ?config.fsub_chat_id,
        download_dir = %config.download_dir.display(),
        "configuration loaded"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config))?;

    tracing::info!("bot shut down cleanly");
    Ok(())
}
