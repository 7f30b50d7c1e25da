//! Output formatting for CLI results

use chrono::{Local, TimeZone};

pub mod json;
pub mod table;

pub use json::{WorkerMeta, format_json, format_worker_json};
pub use table::format_table;

/// Format bytes as human-readable size
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;
    const GB: usize = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Format a Unix timestamp (seconds) in local time.
///
/// Returns "N/A" for zero or out-of-range values.
pub fn format_timestamp(secs: i64) -> String {
    if secs == 0 {
        return "N/A".to_string();
    }
    match Local.timestamp_opt(secs, 0) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        _ => "N/A".to_string(),
    }
}
