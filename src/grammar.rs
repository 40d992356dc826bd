// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! Line grammar of a project file.
//!
//! ```text
//! My Project                                  title (first line, unless it is a time range)
//! hourlyRate: 45 USD                          metadata
//! # picked up after lunch                     comment, opaque
//! 2023-11-14 09:00:00 - 2023-11-14 12:30:00   closed time range
//! 1700000000-1700003600                       closed time range, legacy epoch form
//! 2023-11-14 13:15:00                         open (running) time range
//! ```
//!
//! [`classify`] maps one line onto exactly one [`Line`] variant. It does not know about line
//! positions; title selection is done by the store.

use crate::timestamp::{self, TOKEN_PATTERN};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static RE_METADATA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z0-9]+):\s*(.*)$").unwrap());

static RE_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+$").unwrap());

static RE_TIME_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(?P<start>{TOKEN_PATTERN})(?:\s*-\s*(?P<end>{TOKEN_PATTERN}))?$"
    ))
    .unwrap()
});

/// One tracked interval. `end == None` means the project is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeRange {
    pub start: i64,
    pub end: Option<i64>,
}

impl TimeRange {
    pub fn open(start: i64) -> Self {
        Self { start, end: None }
    }

    pub fn closed(start: i64, end: i64) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// End of the range, or `now` while it is still running.
    pub fn effective_end(&self, now: i64) -> i64 {
        self.end.unwrap_or(now)
    }

    pub fn duration(&self, now: i64) -> i64 {
        self.effective_end(now) - self.start
    }

    /// Parses a trimmed line. Both tokens must decode; a line whose end token is unreadable is
    /// not a time range at all.
    pub fn parse(line: &str) -> Option<Self> {
        let caps = RE_TIME_RANGE.captures(line.trim())?;
        let start = timestamp::decode(caps.name("start")?.as_str())?;
        let end = match caps.name("end") {
            Some(m) => Some(timestamp::decode(m.as_str())?),
            None => None,
        };
        Some(Self { start, end })
    }
}

/// Serialized form: `start` or `start - end`, always in the readable format.
impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(
                f,
                "{} - {}",
                timestamp::encode(self.start),
                timestamp::encode(end)
            ),
            None => f.write_str(&timestamp::encode(self.start)),
        }
    }
}

/// A classified line of a project file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Line {
    /// `# ...`, kept verbatim.
    Comment(String),
    /// `key: value`
    Metadata { key: String, value: String },
    TimeRange(TimeRange),
    /// Anything else: a title, a blank line, or junk.
    PlainText(String),
}

/// Classifies a single line. Leading and trailing whitespace is ignored.
pub fn classify(raw: &str) -> Line {
    let line = raw.trim();
    if line.starts_with('#') {
        return Line::Comment(line.to_string());
    }
    if let Some(range) = TimeRange::parse(line) {
        return Line::TimeRange(range);
    }
    if let Some(caps) = RE_METADATA.captures(line) {
        return Line::Metadata {
            key: caps[1].to_string(),
            value: caps[2].to_string(),
        };
    }
    Line::PlainText(line.to_string())
}

/// True when `key` may be used as a metadata key.
pub fn is_valid_key(key: &str) -> bool {
    RE_KEY.is_match(key)
}

/// True when `title` reads back as a title when written as the first line of a file.
pub fn is_valid_title(title: &str) -> bool {
    match classify(title) {
        Line::PlainText(text) => !text.is_empty(),
        Line::Metadata { .. } => true,
        Line::Comment(_) | Line::TimeRange(_) => false,
    }
}

/// Line breaks become spaces so a value stays on its `key: value` line.
pub fn single_line(value: &str) -> String {
    value
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn format_metadata(key: &str, value: &str) -> String {
    format!("{}: {}", key, value)
}
