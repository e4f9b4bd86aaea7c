use std::time::Duration;

use tokio::time::Instant;

use crate::types::TransferMetrics;

/// Rate limiter for rendered progress pushes.
///
/// A push is allowed once `interval` has passed since the last *successful*
/// push (or since the throttle was created). A snapshot that marks the end of
/// the transfer is always allowed.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last: Instant,
}

impl Throttle {
    /// Creates a throttle whose first window starts at `start`.
    pub fn new(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            last: start,
        }
    }

    /// Returns `true` if a push may happen at `now`.
    pub fn ready(&self, now: Instant, complete: bool) -> bool {
        complete || now.saturating_duration_since(self.last) >= self.interval
    }

    /// Records a successful push at `now`.
    pub fn mark(&mut self, now: Instant) {
        self.last = now;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Derives speed, ETA and elapsed time from cumulative byte counts.
///
/// Speed is the average since `started`; there is no sliding window because
/// the transport reports at its own granularity.
#[derive(Debug, Clone)]
pub struct RateMeter {
    started: Instant,
}

impl RateMeter {
    pub fn new(started: Instant) -> Self {
        Self { started }
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    /// Builds a snapshot for `bytes_done` of `bytes_total` at `now`.
    pub fn snapshot(
        &self,
        label: &str,
        bytes_done: u64,
        bytes_total: u64,
        now: Instant,
    ) -> TransferMetrics {
        let elapsed = now.saturating_duration_since(self.started).as_secs_f64();
        let speed = if elapsed > 0.0 {
            bytes_done as f64 / elapsed
        } else {
            0.0
        };
        TransferMetrics::new(label, bytes_done, bytes_total, speed, elapsed)
    }
}
