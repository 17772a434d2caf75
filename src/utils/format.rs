//! Small text helpers shared by the report builders, backends and the tool runner.

use std::time::Duration;

use time::PrimitiveDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

const DATE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");
const TIME_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[hour]:[minute]:[second]");

/// Format a duration as `H:MM:SS`, truncating sub-second precision.
///
/// Hours are not wrapped at 24; a 25 hour recording renders as `25:00:00`.
pub fn format_hms(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}

/// `YYYY-MM-DD`
pub fn format_date(ts: PrimitiveDateTime) -> String {
    ts.format(DATE_FORMAT).unwrap_or_else(|_| ts.date().to_string())
}

/// `HH:MM:SS`, sub-second precision dropped.
pub fn format_time(ts: PrimitiveDateTime) -> String {
    ts.format(TIME_FORMAT).unwrap_or_else(|_| ts.time().to_string())
}

/// `YYYY-MM-DD HH:MM:SS`
pub fn format_timestamp(ts: PrimitiveDateTime) -> String {
    format!("{} {}", format_date(ts), format_time(ts))
}

/// Truncate `text` to at most `max_chars` characters on a char boundary.
///
/// Tool diagnostics and remote error bodies can be large and may contain
/// multi-byte text, so byte slicing is never used here.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
