//! Source file identity and origin timestamps.

use std::path::{Path, PathBuf};
use std::time::Duration;

use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time};
use tracing::debug;

/// One input recording. Immutable after ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub name: String,
    pub path: PathBuf,
    /// Recording start, parsed from the filename or defaulted to ingestion time.
    pub origin: PrimitiveDateTime,
    pub duration: Duration,
    pub byte_size: u64,
}

impl SourceFile {
    pub fn new(
        path: impl Into<PathBuf>,
        origin: PrimitiveDateTime,
        duration: Duration,
        byte_size: u64,
    ) -> Self {
        let path = path.into();
        Self {
            name: display_name(&path),
            path,
            origin,
            duration,
            byte_size,
        }
    }

    /// Read identity from storage. `duration` comes from the probe and is
    /// zero when the file could not be probed.
    pub async fn ingest(path: &Path, duration: Duration) -> Self {
        let byte_size = tokio::fs::metadata(path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        let name = display_name(path);
        let origin = parse_origin_timestamp(&name).unwrap_or_else(|| {
            debug!("No timestamp in '{}', using current time", name);
            now_local()
        });

        Self {
            name,
            path: path.to_path_buf(),
            origin,
            duration,
            byte_size,
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Current wall-clock time in the local offset, falling back to UTC.
pub fn now_local() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    PrimitiveDateTime::new(now.date(), now.time())
}

fn digits(s: &str, range: std::ops::Range<usize>) -> Option<u32> {
    s.get(range)?.parse().ok()
}

/// Parse `YYYYMMDD_HHMMSS[_anything].ext` into a timestamp.
///
/// Only the first two underscore-separated parts of the stem are used.
pub fn parse_origin_timestamp(filename: &str) -> Option<PrimitiveDateTime> {
    let stem = Path::new(filename).file_stem()?.to_str()?;
    let mut parts = stem.split('_');
    let stamp = format!("{}{}", parts.next()?, parts.next()?);

    if stamp.len() != 14 || !stamp.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let year = digits(&stamp, 0..4)? as i32;
    let month = Month::try_from(digits(&stamp, 4..6)? as u8).ok()?;
    let day = digits(&stamp, 6..8)? as u8;
    let date = Date::from_calendar_date(year, month, day).ok()?;
    let time = Time::from_hms(
        digits(&stamp, 8..10)? as u8,
        digits(&stamp, 10..12)? as u8,
        digits(&stamp, 12..14)? as u8,
    )
    .ok()?;

    Some(PrimitiveDateTime::new(date, time))
}
