// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! Conversion between on-disk time tokens and epoch seconds.
//!
//! Files written by old versions store raw epoch integers (`1700000000`); current files store
//! readable local date-times (`2023-11-14 23:13:20`), optionally followed by a UTC offset. Both are
//! read forever; only the readable form is written.

use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;

/// Persisted and displayed date-time format.
pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One time token as it may appear in a time-range line: readable date-time with optional UTC
/// offset, or a legacy run of digits.
pub(crate) const TOKEN_PATTERN: &str =
    r"\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}(?: ?[+-]\d{2}:?\d{2})?|\d+";

static RE_YEAR_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-").unwrap());

/// Parses a time token into epoch seconds; `None` if it is not a valid timestamp.
pub fn decode(token: &str) -> Option<i64> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    if token.bytes().all(|b| b.is_ascii_digit()) {
        return token.parse().ok();
    }
    if !RE_YEAR_PREFIX.is_match(token) {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_str(token, "%Y-%m-%d %H:%M:%S %z") {
        return Some(dt.timestamp());
    }
    let naive = NaiveDateTime::parse_from_str(token, FORMAT).ok()?;
    local_epoch(naive)
}

/// Renders epoch seconds as `YYYY-MM-DD HH:MM:SS` in local time.
pub fn encode(epoch: i64) -> String {
    match Local.timestamp_opt(epoch, 0) {
        LocalResult::Single(dt) => dt.format(FORMAT).to_string(),
        LocalResult::Ambiguous(dt, _) => dt.format(FORMAT).to_string(),
        // Out of chrono's range: the legacy form still decodes.
        LocalResult::None => epoch.to_string(),
    }
}

/// Local wall time to epoch. Ambiguous times (DST fall-back) take the earlier instant; times in a
/// DST gap are moved forward an hour.
fn local_epoch(naive: NaiveDateTime) -> Option<i64> {
    match naive.and_local_timezone(Local) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Some(dt.timestamp()),
        LocalResult::None => (naive + Duration::hours(1))
            .and_local_timezone(Local)
            .earliest()
            .map(|dt| dt.timestamp()),
    }
}

/// Parses a user-supplied report boundary (`--start-at` / `--end-at`).
///
/// Accepts everything [`decode`] does, plus `YYYY-MM-DD HH:MM` and a bare `YYYY-MM-DD` (local
/// midnight).
pub fn parse_filter_time(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Some(epoch) = decode(s) {
        return Some(epoch);
    }
    let formats = ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];
    for fmt in formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return local_epoch(dt);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return local_epoch(d.and_hms_opt(0, 0, 0)?);
    }
    None
}
