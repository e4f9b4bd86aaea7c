//! Transfer metrics, progress rendering and the session seams shared by the
//! download and upload stages.
//!
//! - [`TransferMetrics`] is a point-in-time snapshot of one transfer.
//! - [`format_progress`] renders a snapshot into the status text shown to users.
//! - [`TransferSession`] bridges to an external download manager.
//! - [`ProgressSink`] receives incremental byte counts from an upload transport.

mod format;
mod progress;
mod session;
mod types;

pub use format::{BAR_WIDTH, format_duration, format_progress, format_size};
pub use progress::{RateMeter, Throttle};
pub use session::{
    BoxFuture, PollError, ProgressSink, SessionHandle, SessionStatus, SubmissionError,
    TransferSession,
};
pub use types::{Requester, TransferMetrics};

/// Default spacing between download status polls.
pub const DEFAULT_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(2);

/// Default minimum spacing between two rendered upload status pushes.
pub const DEFAULT_RENDER_THROTTLE: std::time::Duration = std::time::Duration::from_secs(2);
