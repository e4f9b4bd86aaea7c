use std::path::{Path, PathBuf};

use mediarelay_transfer::{
    BoxFuture, PollError, SessionHandle, SessionStatus, SubmissionError, TransferMetrics,
    TransferSession,
};
use tracing::{debug, warn};

use crate::client::{Client, Error};
use crate::types::{DownloadState, DownloadStatus};

impl TransferSession for Client {
    fn submit<'a>(
        &'a self,
        source_url: &'a str,
    ) -> BoxFuture<'a, Result<SessionHandle, SubmissionError>> {
        Box::pin(async move {
            self.add_uri(source_url)
                .await
                .map(SessionHandle::new)
                .map_err(|e| {
                    warn!(error = %e, "aria2 submission failed");
                    submission_error(e)
                })
        })
    }

    fn poll<'a>(
        &'a self,
        handle: &'a SessionHandle,
    ) -> BoxFuture<'a, Result<SessionStatus, PollError>> {
        Box::pin(async move {
            let status = self
                .tell_status(handle.id())
                .await
                .map_err(|e| PollError(e.to_string()))?;
            Ok(session_status(status))
        })
    }

    fn cancel<'a>(
        &'a self,
        handle: &'a SessionHandle,
    ) -> BoxFuture<'a, Result<Option<PathBuf>, PollError>> {
        Box::pin(async move {
            // A stopped session refuses removal but still reports its files.
            if let Err(e) = self.force_remove(handle.id()).await {
                debug!(gid = %handle, error = %e, "aria2 force remove refused");
            }
            let status = self
                .tell_status(handle.id())
                .await
                .map_err(|e| PollError(e.to_string()))?;
            Ok(status.primary_path())
        })
    }
}

fn submission_error(e: Error) -> SubmissionError {
    match e {
        Error::Rpc { message, .. } => SubmissionError::Rejected(message),
        Error::Json(_) | Error::EmptyResponse => SubmissionError::Rejected(e.to_string()),
        Error::Http(_) | Error::Status { .. } => SubmissionError::Unreachable(e.to_string()),
    }
}

/// Maps one aria2 status read onto the manager-agnostic session state.
pub(crate) fn session_status(status: DownloadStatus) -> SessionStatus {
    let path = status.primary_path();
    let label = path
        .as_deref()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let metrics = TransferMetrics::new(
        label,
        status.completed_length,
        status.total_length,
        status.download_speed as f64,
        0.0,
    )
    .with_session(status.gid.clone());

    match status.status {
        DownloadState::Complete => match path {
            Some(path) => SessionStatus::Completed { metrics, path },
            None => SessionStatus::Failed {
                reason: "download completed without an output file".into(),
                partial_path: None,
            },
        },
        DownloadState::Error => SessionStatus::Failed {
            reason: status
                .error_message
                .filter(|m| !m.is_empty())
                .or_else(|| status.error_code.map(|c| format!("aria2 error code {c}")))
                .unwrap_or_else(|| "download failed".into()),
            partial_path: path,
        },
        DownloadState::Removed => SessionStatus::Failed {
            reason: "download removed from the manager".into(),
            partial_path: path,
        },
        DownloadState::Active | DownloadState::Waiting | DownloadState::Paused => {
            SessionStatus::Active(metrics)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::{mock_sequence, mock_server};
    use crate::types::{DownloadOptions, FileInfo};

    fn status(state: DownloadState, path: &str) -> DownloadStatus {
        DownloadStatus {
            gid: "2089b05ecca3d829".into(),
            status: state,
            total_length: 100,
            completed_length: 40,
            download_speed: 20,
            error_code: None,
            error_message: None,
            files: vec![FileInfo { path: path.into() }],
        }
    }

    #[test]
    fn active_maps_to_metrics() {
        let SessionStatus::Active(m) = session_status(status(DownloadState::Active, "/d/clip.mp4"))
        else {
            panic!("expected active");
        };
        assert_eq!(m.label, "clip.mp4");
        assert_eq!(m.percentage, 40.0);
        assert_eq!(m.eta_seconds, 3.0);
        assert_eq!(m.session_id.as_deref(), Some("2089b05ecca3d829"));
    }

    #[test]
    fn waiting_and_paused_are_active() {
        for state in [DownloadState::Waiting, DownloadState::Paused] {
            assert!(matches!(
                session_status(status(state, "")),
                SessionStatus::Active(_)
            ));
        }
    }

    #[test]
    fn complete_carries_path() {
        let s = session_status(status(DownloadState::Complete, "/d/clip.mp4"));
        assert!(matches!(
            s,
            SessionStatus::Completed { ref path, .. } if path == &PathBuf::from("/d/clip.mp4")
        ));
    }

    #[test]
    fn complete_without_path_fails() {
        let s = session_status(status(DownloadState::Complete, ""));
        assert!(matches!(s, SessionStatus::Failed { partial_path: None, .. }));
    }

    #[test]
    fn error_prefers_message_then_code() {
        let mut st = status(DownloadState::Error, "/d/clip.mp4");
        st.error_message = Some("Too many retries".into());
        let SessionStatus::Failed {
            reason,
            partial_path,
        } = session_status(st)
        else {
            panic!("expected failure");
        };
        assert_eq!(reason, "Too many retries");
        assert_eq!(partial_path, Some(PathBuf::from("/d/clip.mp4")));

        let mut st = status(DownloadState::Error, "");
        st.error_code = Some("3".into());
        let SessionStatus::Failed { reason, .. } = session_status(st) else {
            panic!("expected failure");
        };
        assert_eq!(reason, "aria2 error code 3");
    }

    #[test]
    fn removed_is_failure() {
        assert!(matches!(
            session_status(status(DownloadState::Removed, "")),
            SessionStatus::Failed { .. }
        ));
    }

    #[tokio::test]
    async fn submit_rejection_maps_to_rejected() {
        let (url, handle) = mock_server(
            400,
            r#"{"id":"mediarelay","jsonrpc":"2.0","error":{"code":1,"message":"No URI to download."}}"#,
        )
        .await;
        let client = Client::new(Some(&url), None, DownloadOptions::default()).unwrap();
        let err = client.submit("").await.unwrap_err();
        assert!(matches!(err, SubmissionError::Rejected(ref m) if m == "No URI to download."));
        handle.abort();
    }

    #[tokio::test]
    async fn poll_reads_status() {
        let (url, handle) = mock_server(
            200,
            r#"{"id":"mediarelay","jsonrpc":"2.0","result":{"gid":"g1","status":"active","totalLength":"0","completedLength":"0","downloadSpeed":"0","files":[]}}"#,
        )
        .await;
        let client = Client::new(Some(&url), None, DownloadOptions::default()).unwrap();
        let s = client.poll(&SessionHandle::new("g1")).await.unwrap();
        let SessionStatus::Active(m) = s else {
            panic!("expected active");
        };
        assert_eq!(m.bytes_total, 0);
        assert_eq!(m.percentage, 0.0);
        handle.abort();
    }

    #[tokio::test]
    async fn cancel_removes_then_reports_partial_path() {
        let (url, handle) = mock_sequence(vec![
            (200, r#"{"id":"mediarelay","jsonrpc":"2.0","result":"g1"}"#),
            (
                200,
                r#"{"id":"mediarelay","jsonrpc":"2.0","result":{"gid":"g1","status":"removed","totalLength":"100","completedLength":"40","downloadSpeed":"0","files":[{"path":"/d/clip.mp4"}]}}"#,
            ),
        ])
        .await;
        let client = Client::new(Some(&url), None, DownloadOptions::default()).unwrap();

        let path = client.cancel(&SessionHandle::new("g1")).await.unwrap();
        assert_eq!(path, Some(PathBuf::from("/d/clip.mp4")));

        let requests = handle.await.unwrap();
        assert!(requests[0].contains("\"aria2.forceRemove\""));
        assert!(requests[1].contains("\"aria2.tellStatus\""));
    }

    #[tokio::test]
    async fn cancel_of_stopped_session_still_reports_path() {
        let (url, handle) = mock_sequence(vec![
            (
                400,
                r#"{"id":"mediarelay","jsonrpc":"2.0","error":{"code":1,"message":"Active Download not found for GID#g1"}}"#,
            ),
            (
                200,
                r#"{"id":"mediarelay","jsonrpc":"2.0","result":{"gid":"g1","status":"error","totalLength":"100","completedLength":"40","downloadSpeed":"0","files":[{"path":"/d/clip.mp4"}]}}"#,
            ),
        ])
        .await;
        let client = Client::new(Some(&url), None, DownloadOptions::default()).unwrap();

        let path = client.cancel(&SessionHandle::new("g1")).await.unwrap();
        assert_eq!(path, Some(PathBuf::from("/d/clip.mp4")));
        handle.await.unwrap();
    }
}
