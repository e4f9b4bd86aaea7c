//! aria2 JSON-RPC client.
//!
//! Async HTTP client using `reqwest`, authenticating with the RPC secret
//! token (`token:<secret>` as the first positional parameter).

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::types::{
    DownloadOptions, DownloadStatus, RpcRequest, RpcResponse, STATUS_KEYS,
};

const DEFAULT_RPC_URL: &str = "http://localhost:6800/jsonrpc";
const REQUEST_ID: &str = "mediarelay";

/// Errors from the aria2 client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("RPC response carried neither result nor error")]
    EmptyResponse,
}

/// aria2 RPC client.
pub struct Client {
    http: reqwest::Client,
    rpc_url: String,
    secret: Option<String>,
    options: DownloadOptions,
}

impl Client {
    /// Creates a client for `rpc_url` (defaults to `http://localhost:6800/jsonrpc`).
    pub fn new(
        rpc_url: Option<&str>,
        secret: Option<String>,
        options: DownloadOptions,
    ) -> Result<Self, Error> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            rpc_url: rpc_url.unwrap_or(DEFAULT_RPC_URL).to_string(),
            secret: secret.filter(|s| !s.is_empty()),
            options,
        })
    }

    /// Returns the options attached to each submission.
    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    /// Performs one RPC call.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, Error> {
        let mut all = Vec::with_capacity(params.len() + 1);
        if let Some(secret) = &self.secret {
            all.push(Value::String(format!("token:{secret}")));
        }
        all.extend(params);

        let req = RpcRequest {
            jsonrpc: "2.0",
            id: REQUEST_ID,
            method,
            params: all,
        };

        let resp = self.http.post(&self.rpc_url).json(&req).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;

        // aria2 answers RPC-level failures with a 400 and an error envelope,
        // so the envelope is checked before the status code.
        match serde_json::from_slice::<RpcResponse<T>>(&body) {
            Ok(RpcResponse {
                error: Some(err), ..
            }) => Err(Error::Rpc {
                code: err.code,
                message: err.message,
            }),
            Ok(RpcResponse {
                result: Some(result),
                ..
            }) if status.is_success() => Ok(result),
            Ok(_) if status.is_success() => Err(Error::EmptyResponse),
            Err(e) if status.is_success() => Err(Error::Json(e)),
            _ => Err(Error::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            }),
        }
    }

    /// Enqueues `uri` with the configured options; returns the new GID.
    pub async fn add_uri(&self, uri: &str) -> Result<String, Error> {
        let params = vec![
            Value::Array(vec![Value::String(uri.to_string())]),
            Value::Object(self.options.rpc_options()),
        ];
        let gid: String = self.call("aria2.addUri", params).await?;
        debug!(%gid, "aria2 accepted uri");
        Ok(gid)
    }

    /// Reads the status of one download.
    pub async fn tell_status(&self, gid: &str) -> Result<DownloadStatus, Error> {
        let keys = STATUS_KEYS
            .iter()
            .map(|k| Value::String((*k).to_string()))
            .collect();
        let params = vec![Value::String(gid.to_string()), Value::Array(keys)];
        self.call("aria2.tellStatus", params).await
    }

    /// Stops a download at once, without waiting on the remote side.
    pub async fn force_remove(&self, gid: &str) -> Result<(), Error> {
        let _gid: String = self
            .call("aria2.forceRemove", vec![Value::String(gid.to_string())])
            .await?;
        debug!(%gid, "aria2 download removed");
        Ok(())
    }

    /// Applies the retry options daemon-wide.
    pub async fn apply_global_options(&self) -> Result<(), Error> {
        let params = vec![Value::Object(self.options.global_rpc_options())];
        let _ok: String = self.call("aria2.changeGlobalOption", params).await?;
        debug!(
            max_tries = self.options.max_tries,
            retry_wait_secs = self.options.retry_wait.as_secs(),
            "aria2 global options applied"
        );
        Ok(())
    }
}
