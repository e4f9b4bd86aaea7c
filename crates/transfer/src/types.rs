use serde::{Deserialize, Serialize};

/// Snapshot of one transfer at a point in time.
///
/// `bytes_total` is 0 while the size is unknown. `percentage` is derived from
/// the byte counts and always lies in `[0, 100]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferMetrics {
    pub bytes_done: u64,
    pub bytes_total: u64,
    pub speed_bytes_per_sec: f64,
    pub eta_seconds: f64,
    pub elapsed_seconds: f64,
    pub percentage: f64,
    /// File name or title shown in the report.
    pub label: String,
    /// Download-manager session identifier (downloads only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl TransferMetrics {
    /// Builds a snapshot, deriving percentage and ETA from the byte counts.
    pub fn new(
        label: impl Into<String>,
        bytes_done: u64,
        bytes_total: u64,
        speed_bytes_per_sec: f64,
        elapsed_seconds: f64,
    ) -> Self {
        let speed = if speed_bytes_per_sec.is_finite() && speed_bytes_per_sec > 0.0 {
            speed_bytes_per_sec
        } else {
            0.0
        };
        Self {
            bytes_done,
            bytes_total,
            speed_bytes_per_sec: speed,
            eta_seconds: eta_seconds(bytes_done, bytes_total, speed),
            elapsed_seconds: elapsed_seconds.max(0.0),
            percentage: percentage(bytes_done, bytes_total),
            label: label.into(),
            session_id: None,
        }
    }

    /// Attaches a download-manager session identifier.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Replaces the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Returns `true` once every byte of a known-size transfer is done.
    pub fn is_complete(&self) -> bool {
        self.bytes_total > 0 && self.bytes_done >= self.bytes_total
    }
}

/// Identity of the user who asked for a transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub id: i64,
    pub display: String,
}

impl Requester {
    pub fn new(id: i64, display: impl Into<String>) -> Self {
        Self {
            id,
            display: display.into(),
        }
    }
}

fn percentage(done: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (done as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}

fn eta_seconds(done: u64, total: u64, speed: f64) -> f64 {
    if total == 0 || speed <= 0.0 {
        return 0.0;
    }
    total.saturating_sub(done) as f64 / speed
}
