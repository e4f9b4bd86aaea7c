//! Seams between the orchestrators and the transports that move bytes.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use crate::types::TransferMetrics;

/// Boxed, sendable future returned by the session traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Opaque handle for one download tracked by the external manager.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionHandle(String);

impl SessionHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of a single status read.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    /// Still queued or transferring.
    Active(TransferMetrics),
    /// Finished; `path` is the file the manager wrote.
    Completed {
        metrics: TransferMetrics,
        path: PathBuf,
    },
    /// Gave up after exhausting its own retry budget, or was removed.
    Failed {
        reason: String,
        partial_path: Option<PathBuf>,
    },
}

/// The manager could not accept a URI.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("download manager unreachable: {0}")]
    Unreachable(String),

    #[error("download manager rejected URI: {0}")]
    Rejected(String),
}

/// A status read could not be completed.
#[derive(Debug, thiserror::Error)]
#[error("status poll failed: {0}")]
pub struct PollError(pub String);

/// Stateless accessor over an external download manager's session table.
///
/// Implementations do no timing of their own; the caller owns the poll loop.
pub trait TransferSession: Send + Sync {
    /// Enqueues one URI and returns the manager's handle for it.
    fn submit<'a>(
        &'a self,
        source_url: &'a str,
    ) -> BoxFuture<'a, Result<SessionHandle, SubmissionError>>;

    /// Reads the current state of a session without blocking on progress.
    fn poll<'a>(
        &'a self,
        handle: &'a SessionHandle,
    ) -> BoxFuture<'a, Result<SessionStatus, PollError>>;

    /// Stops a session the caller has given up on. Returns the file the
    /// manager was writing, if it reported one, so the caller can remove it.
    fn cancel<'a>(
        &'a self,
        handle: &'a SessionHandle,
    ) -> BoxFuture<'a, Result<Option<PathBuf>, PollError>>;
}

/// Receives cumulative byte counts from a streaming transport.
///
/// Called from inside the transport's read path, so implementations must not
/// block.
pub trait ProgressSink: Send + Sync {
    fn report(&self, bytes_done: u64, bytes_total: u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_display_is_id() {
        let h = SessionHandle::new("2089b05ecca3d829");
        assert_eq!(h.id(), "2089b05ecca3d829");
        assert_eq!(h.to_string(), "2089b05ecca3d829");
    }

    #[test]
    fn submission_error_messages() {
        let e = SubmissionError::Rejected("unsupported scheme".into());
        assert_eq!(e.to_string(), "download manager rejected URI: unsupported scheme");
        let e = PollError("connection refused".into());
        assert_eq!(e.to_string(), "status poll failed: connection refused");
    }
}
