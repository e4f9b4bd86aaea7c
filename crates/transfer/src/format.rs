//! Plain-text progress report rendering.

use crate::types::{Requester, TransferMetrics};

/// Number of cells in the progress bar.
pub const BAR_WIDTH: usize = 10;

const FILLED: char = '●';
const EMPTY: char = '○';
const UNKNOWN: &str = "unknown";

/// Renders a progress report for one transfer.
///
/// Never divides by a reported total or speed: a zero total renders as
/// `unknown` sizes and 0%, a zero speed renders the ETA as `unknown`.
/// The session line only appears when the snapshot carries a session id,
/// which download snapshots do and upload snapshots do not.
pub fn format_progress(metrics: &TransferMetrics, status: &str, requester: &Requester) -> String {
    let pct = rendered_percentage(metrics);
    let total = if metrics.bytes_total == 0 {
        UNKNOWN.to_string()
    } else {
        format_size(metrics.bytes_total)
    };

    let mut lines = vec![
        format!("┏ File: {}", metrics.label),
        format!("┠ [{}] {pct:.2}%", bar(pct)),
        format!("┠ Processed: {} of {total}", format_size(metrics.bytes_done)),
        format!("┠ Status: {status}"),
        format!("┠ Speed: {}", format_speed(metrics.speed_bytes_per_sec)),
        format!("┠ ETA: {}", format_eta(metrics)),
        format!("┠ Elapsed: {}", format_duration(metrics.elapsed_seconds)),
        format!("┠ User: {} | ID: {}", requester.display, requester.id),
    ];
    if let Some(gid) = metrics.session_id.as_deref().filter(|s| !s.is_empty()) {
        lines.push(format!("┠ Session: {gid}"));
    }
    if let Some(last) = lines.last_mut() {
        *last = last.replacen('┠', "┖", 1);
    }
    lines.join("\n")
}

/// Formats a byte count with binary units, e.g. `1.50 MiB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

/// Formats seconds as `1h 2m 3s`, dropping leading zero components.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    };
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    match (h, m) {
        (0, 0) => format!("{s}s"),
        (0, _) => format!("{m}m {s}s"),
        _ => format!("{h}h {m}m {s}s"),
    }
}

fn rendered_percentage(metrics: &TransferMetrics) -> f64 {
    if metrics.bytes_total == 0 || !metrics.percentage.is_finite() {
        return 0.0;
    }
    metrics.percentage.clamp(0.0, 100.0)
}

fn bar(pct: f64) -> String {
    let filled = ((pct / 100.0) * BAR_WIDTH as f64).floor() as usize;
    let filled = filled.min(BAR_WIDTH);
    let mut out = String::with_capacity(BAR_WIDTH * 3);
    out.extend(std::iter::repeat_n(FILLED, filled));
    out.extend(std::iter::repeat_n(EMPTY, BAR_WIDTH - filled));
    out
}

fn format_speed(speed: f64) -> String {
    if !speed.is_finite() || speed <= 0.0 {
        return "0 B/s".to_string();
    }
    format!("{}/s", format_size(speed as u64))
}

fn format_eta(metrics: &TransferMetrics) -> String {
    if metrics.is_complete() {
        return format_duration(0.0);
    }
    if metrics.bytes_total == 0 || metrics.speed_bytes_per_sec <= 0.0 {
        return UNKNOWN.to_string();
    }
    format_duration(metrics.eta_seconds)
}
