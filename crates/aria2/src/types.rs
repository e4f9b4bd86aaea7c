//! RPC payload types for aria2.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Keys requested from `aria2.tellStatus`.
pub(crate) const STATUS_KEYS: [&str; 8] = [
    "gid",
    "status",
    "totalLength",
    "completedLength",
    "downloadSpeed",
    "errorCode",
    "errorMessage",
    "files",
];

/// Retry and placement options sent with every submission.
///
/// The manager's own retry budget is the only retry layer for downloads,
/// so it is kept explicit here instead of relying on daemon defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadOptions {
    /// `max-tries`; 0 means unlimited.
    pub max_tries: u32,
    /// `retry-wait` between attempts.
    #[serde(with = "secs")]
    pub retry_wait: Duration,
    /// `continue`: resume partially downloaded files.
    pub continue_downloads: bool,
    /// `dir`: where the manager writes files. `None` keeps its default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            max_tries: 50,
            retry_wait: Duration::from_secs(3),
            continue_downloads: true,
            dir: None,
        }
    }
}

impl DownloadOptions {
    /// Options accepted by `aria2.changeGlobalOption` (no `dir`).
    pub fn global_rpc_options(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("max-tries".into(), Value::String(self.max_tries.to_string()));
        map.insert(
            "retry-wait".into(),
            Value::String(self.retry_wait.as_secs().to_string()),
        );
        map.insert(
            "continue".into(),
            Value::String(self.continue_downloads.to_string()),
        );
        map
    }

    /// Per-download options for `aria2.addUri`.
    pub fn rpc_options(&self) -> Map<String, Value> {
        let mut map = self.global_rpc_options();
        if let Some(dir) = &self.dir {
            map.insert("dir".into(), Value::String(dir.to_string_lossy().into_owned()));
        }
        map
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Serialize)]
pub(crate) struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: &'a str,
    pub method: &'a str,
    pub params: Vec<Value>,
}

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct RpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcErrorBody {
    pub code: i64,
    pub message: String,
}

/// Lifecycle state reported by aria2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadState {
    Active,
    Waiting,
    Paused,
    Error,
    Complete,
    Removed,
}

/// One file of a download.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FileInfo {
    #[serde(default)]
    pub path: String,
}

/// Subset of `aria2.tellStatus` output. aria2 encodes numbers as strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadStatus {
    pub gid: String,
    pub status: DownloadState,
    #[serde(default, deserialize_with = "u64_from_str")]
    pub total_length: u64,
    #[serde(default, deserialize_with = "u64_from_str")]
    pub completed_length: u64,
    #[serde(default, deserialize_with = "u64_from_str")]
    pub download_speed: u64,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub files: Vec<FileInfo>,
}

impl DownloadStatus {
    /// Path of the first file, if the manager has assigned one.
    pub fn primary_path(&self) -> Option<PathBuf> {
        self.files
            .first()
            .map(|f| f.path.as_str())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }
}

fn u64_from_str<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    let raw = String::deserialize(d)?;
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse().map_err(serde::de::Error::custom)
}
