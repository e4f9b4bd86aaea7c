//! Local temporary files owned by one pipeline run.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::types::DownloadedMedia;

/// Suffix of the control file aria2-style managers keep next to partial downloads.
const CONTROL_SUFFIX: &str = ".aria2";

/// Files a run created and must remove before it ends.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Artifacts {
    paths: Vec<PathBuf>,
}

impl Artifacts {
    /// Downloaded file plus thumbnail, if any.
    pub fn from_media(media: &DownloadedMedia) -> Self {
        let mut paths = vec![media.file_path.clone()];
        paths.extend(media.thumbnail_path.clone());
        Self { paths }
    }

    /// A partial download and its control file.
    pub fn partial_download(path: &Path) -> Self {
        let mut control = path.as_os_str().to_owned();
        control.push(CONTROL_SUFFIX);
        Self {
            paths: vec![path.to_path_buf(), PathBuf::from(control)],
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Removes every tracked file. Missing files are not an error; other
    /// failures are logged. Returns the number of files actually removed.
    pub async fn remove_all(&self) -> usize {
        let mut removed = 0;
        for path in &self.paths {
            match remove_file_if_exists(path).await {
                Ok(true) => {
                    debug!(path = %path.display(), "removed temporary file");
                    removed += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to remove temporary file")
                }
            }
        }
        removed
    }
}

/// Removes `path`; `Ok(false)` if it did not exist.
pub async fn remove_file_if_exists(path: &Path) -> io::Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
