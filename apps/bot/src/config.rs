//! Bot configuration.
//!
//! Configuration is read from TOML at `$MEDIARELAY_CONFIG`, falling back to
//! `mediarelay.toml` in the working directory. Secrets may instead come from
//! `BOT_TOKEN`, `RESOLVER_API_KEY` and `ARIA2_SECRET`, which override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use mediarelay_aria2::DownloadOptions;
use mediarelay_pipeline::PipelineConfig;
use serde::{Deserialize, Serialize};

const CONFIG_ENV: &str = "MEDIARELAY_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "mediarelay.toml";

/// Bot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Telegram bot API token.
    #[serde(default)]
    pub bot_token: String,

    /// Channel every upload lands in before it is copied to the requester.
    #[serde(default)]
    pub dump_chat_id: i64,

    /// Users must be members of this chat to use the bot.
    #[serde(default)]
    pub fsub_chat_id: Option<i64>,

    /// Only this user may broadcast.
    #[serde(default)]
    pub admin_id: i64,

    /// Size hint shown in failure messages. Not enforced.
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,

    /// Where thumbnails are written. Downloads go here too unless aria2 is
    /// told otherwise.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// JSON file holding known users.
    #[serde(default = "default_users_file")]
    pub users_file: PathBuf,

    #[serde(default = "default_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_interval_secs")]
    pub render_throttle_secs: u64,

    /// Failed status reads in a row before a download is abandoned.
    #[serde(default = "default_max_poll_errors")]
    pub max_poll_errors: u32,

    /// Case-insensitive substrings a link must contain to be accepted.
    #[serde(default = "default_accepted_hosts")]
    pub accepted_hosts: Vec<String>,

    #[serde(default)]
    pub join_url: Option<String>,

    #[serde(default)]
    pub developer_url: Option<String>,

    /// Sticker shown briefly on `/start`.
    #[serde(default)]
    pub start_sticker: Option<String>,

    /// Sticker shown briefly after a successful relay.
    #[serde(default)]
    pub done_sticker: Option<String>,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub aria2: Aria2Config,
}

/// Link-resolution API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_resolver_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,
}

/// aria2 RPC settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aria2Config {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    #[serde(default)]
    pub secret: Option<String>,

    #[serde(default = "default_max_tries")]
    pub max_tries: u32,

    #[serde(default = "default_retry_wait_secs")]
    pub retry_wait_secs: u64,

    #[serde(default = "default_true")]
    pub continue_downloads: bool,
}

fn default_max_file_size_mb() -> u64 {
    120
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_users_file() -> PathBuf {
    PathBuf::from("users.json")
}

fn default_interval_secs() -> u64 {
    2
}

fn default_max_poll_errors() -> u32 {
    5
}

fn default_accepted_hosts() -> Vec<String> {
    vec!["terabox".into()]
}

fn default_resolver_url() -> String {
    "https://api.roldex.me/".into()
}

fn default_rpc_url() -> String {
    "http://localhost:6800/jsonrpc".into()
}

fn default_max_tries() -> u32 {
    50
}

fn default_retry_wait_secs() -> u64 {
    3
}

fn default_true() -> bool {
    true
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            base_url: default_resolver_url(),
            api_key: String::new(),
        }
    }
}

impl Default for Aria2Config {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            secret: None,
            max_tries: default_max_tries(),
            retry_wait_secs: default_retry_wait_secs(),
            continue_downloads: default_true(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            dump_chat_id: 0,
            fsub_chat_id: None,
            admin_id: 0,
            max_file_size_mb: default_max_file_size_mb(),
            download_dir: default_download_dir(),
            users_file: default_users_file(),
            poll_interval_secs: default_interval_secs(),
            render_throttle_secs: default_interval_secs(),
            max_poll_errors: default_max_poll_errors(),
            accepted_hosts: default_accepted_hosts(),
            join_url: None,
            developer_url: None,
            start_sticker: None,
            done_sticker: None,
            resolver: ResolverConfig::default(),
            aria2: Aria2Config::default(),
        }
    }
}

impl Config {
    /// Loads configuration from disk and the environment, then validates it.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path();
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            tracing::info!(
                path = %path.display(),
                "no config file, using defaults and environment"
            );
            Self::default()
        };
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration read");
        Ok(config)
    }

    /// Overrides secrets with non-empty values from `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(token) = lookup("BOT_TOKEN") {
            self.bot_token = token;
        }
        if let Some(key) = lookup("RESOLVER_API_KEY") {
            self.resolver.api_key = key;
        }
        if let Some(secret) = lookup("ARIA2_SECRET") {
            self.aria2.secret = Some(secret);
        }
    }

    /// Rejects configurations the bot cannot start with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bot_token.trim().is_empty() {
            bail!("bot_token is missing (set it in the config file or BOT_TOKEN)");
        }
        if self.dump_chat_id == 0 {
            bail!("dump_chat_id is missing");
        }
        if self.poll_interval_secs == 0 {
            bail!("poll_interval_secs must be at least 1");
        }
        if self.max_poll_errors == 0 {
            bail!("max_poll_errors must be at least 1");
        }
        Ok(())
    }

    /// Returns `true` if `text` looks like a link this bot handles.
    pub fn accepts_link(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.accepted_hosts
            .iter()
            .any(|host| text.contains(&host.to_lowercase()))
    }

    /// Retry policy handed to aria2.
    pub fn download_options(&self) -> DownloadOptions {
        DownloadOptions {
            max_tries: self.aria2.max_tries,
            retry_wait: Duration::from_secs(self.aria2.retry_wait_secs),
            continue_downloads: self.aria2.continue_downloads,
            dir: Some(self.download_dir.clone()),
        }
    }

    /// Tunables for the relay pipeline.
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            render_throttle: Duration::from_secs(self.render_throttle_secs),
            max_poll_errors: self.max_poll_errors,
            max_file_size_mb: self.max_file_size_mb,
            thumbnail_dir: self.download_dir.clone(),
            done_sticker: self.done_sticker.clone(),
            ..PipelineConfig::default()
        }
    }
}

fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}
