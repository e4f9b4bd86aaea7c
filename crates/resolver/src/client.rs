//! Link-resolution API client.
//!
//! `GET <base_url>?url=<share link>&api_key=<key>` answering
//! `{"direct_link": .., "file_name": .., "thumb": ..}`.

use std::time::Duration;

use tracing::debug;

use crate::types::{ApiResponse, ResolvedLink};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from the resolver client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no direct link in API response")]
    NoDirectLink,
}

/// Link-resolution API client.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl Client {
    /// Creates a client for the API at `base_url`.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, Error> {
        let http = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Resolves a share link.
    pub async fn resolve(&self, source_url: &str) -> Result<ResolvedLink, Error> {
        let params = [("url", source_url), ("api_key", self.api_key.as_str())];
        let resp = self.http.get(&self.base_url).query(&params).send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.bytes().await?;
        let api: ApiResponse = serde_json::from_slice(&body)?;
        let link = api.into_resolved().ok_or(Error::NoDirectLink)?;
        debug!(file = %link.file_name, has_thumb = link.thumbnail_url.is_some(), "link resolved");
        Ok(link)
    }

    /// Downloads thumbnail bytes from `url`.
    pub async fn download_thumbnail(&self, url: &str) -> Result<Vec<u8>, Error> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                body: "thumbnail download failed".into(),
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }
}
