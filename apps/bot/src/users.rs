//! Known-user store backed by a JSON file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info};

/// One stored user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: i64,
    #[serde(default)]
    pub username: Option<String>,
    pub join_date: DateTime<Utc>,
}

/// Insert-if-absent user table.
///
/// Concurrent saves for the same user are serialized by the lock, so a user
/// is recorded at most once. The whole table is rewritten on each insert.
pub struct UserStore {
    path: PathBuf,
    users: Mutex<BTreeMap<i64, UserRecord>>,
}

impl UserStore {
    /// Opens the store at `path`. A missing file is an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let users = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let records: Vec<UserRecord> = serde_json::from_slice(&bytes)
                    .with_context(|| format!("failed to parse {}", path.display()))?;
                records.into_iter().map(|r| (r.user_id, r)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        };
        info!(path = %path.display(), users = users.len(), "user store opened");
        Ok(Self {
            path,
            users: Mutex::new(users),
        })
    }

    /// Records a user unless already known. Returns `true` if the user was
    /// new. Persistence failures are logged; the user stays recorded in
    /// memory.
    pub async fn save_if_absent(&self, user_id: i64, username: Option<&str>) -> bool {
        let mut users = self.users.lock().await;
        if users.contains_key(&user_id) {
            return false;
        }
        users.insert(
            user_id,
            UserRecord {
                user_id,
                username: username.map(str::to_string),
                join_date: Utc::now(),
            },
        );
        match persist(&self.path, &users).await {
            Ok(()) => info!(user_id, username = ?username, "new user saved"),
            Err(e) => error!(user_id, error = %format!("{e:#}"), "failed to save user"),
        }
        true
    }

    pub async fn user_ids(&self) -> Vec<i64> {
        self.users.lock().await.keys().copied().collect()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.users.lock().await.len()
    }
}

/// Writes through a temporary file so readers never see a partial table.
async fn persist(path: &Path, users: &BTreeMap<i64, UserRecord>) -> anyhow::Result<()> {
    let records: Vec<&UserRecord> = users.values().collect();
    let json = serde_json::to_vec_pretty(&records)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}
