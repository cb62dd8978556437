//! Digest output file naming.

use chrono::{DateTime, Local};

/// Build the timestamped digest file name, e.g. `digest-31-01-2025-13-05-09.epub`.
///
/// Day-first ordering matches the names readers already see on their devices.
pub fn digest_file_name(prefix: &str, now: DateTime<Local>) -> String {
    format!("{prefix}-{}.epub", now.format("%d-%m-%Y-%H-%M-%S"))
}
