// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! Totals, earnings and the text reports built from them.

use crate::grammar::TimeRange;
use crate::resolver::sanitize;
use crate::store::{Entry, ProjectRecord};
use crate::timestamp;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_HOURLY_RATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*(.*?)\s*$").unwrap());

/// Separator line between itemized ranges and the grand total in [`details_report`].
const DETAILS_RULE: &str = "========";

/// Optional report window. A range counts only if it starts strictly after `start_at` and ends
/// strictly before `end_at`; running ranges end "now".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Filter {
    pub start_at: Option<i64>,
    pub end_at: Option<i64>,
}

impl Filter {
    pub fn new(start_at: Option<i64>, end_at: Option<i64>) -> Self {
        Self { start_at, end_at }
    }

    pub fn includes(&self, range: &TimeRange, now: i64) -> bool {
        if self.start_at.is_some_and(|s| s >= range.start) {
            return false;
        }
        if self.end_at.is_some_and(|e| e <= range.effective_end(now)) {
            return false;
        }
        true
    }
}

/// `hourlyRate` metadata, e.g. `45 USD` → `{ rate: 45.0, currency: "USD" }`.
#[derive(Clone, Debug, PartialEq)]
pub struct HourlyRate {
    pub rate: f64,
    pub currency: String,
}

impl HourlyRate {
    /// `None` unless the value starts with a number.
    pub fn parse(value: &str) -> Option<Self> {
        let caps = RE_HOURLY_RATE.captures(value)?;
        Some(Self {
            rate: caps[1].parse().ok()?,
            currency: caps[2].to_string(),
        })
    }

    pub fn display(&self) -> String {
        with_currency(self.rate, &self.currency)
    }
}

/// Sum of the durations of all ranges the filter lets through.
pub fn total_duration<'a>(
    ranges: impl IntoIterator<Item = &'a TimeRange>,
    filter: &Filter,
    now: i64,
) -> i64 {
    ranges
        .into_iter()
        .filter(|r| filter.includes(r, now))
        .map(|r| r.duration(now))
        .sum()
}

/// `HH:MM:SS`; hours are not capped at 99.
pub fn humanize_duration(seconds: i64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds / 60) % 60,
        seconds % 60
    )
}

/// `rate * seconds / 3600`, rounded to cents.
pub fn hourly_earnings(total_seconds: i64, rate: f64) -> f64 {
    (rate * total_seconds as f64 / 3600.0 * 100.0).round() / 100.0
}

/// Whole amounts keep one decimal (`1000.0`), others print as-is (`12.5`, `1.11`).
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 && amount.abs() < 1e15 {
        format!("{:.1}", amount)
    } else {
        format!("{}", amount)
    }
}

fn with_currency(amount: f64, currency: &str) -> String {
    if currency.is_empty() {
        format_amount(amount)
    } else {
        format!("{} {}", format_amount(amount), currency)
    }
}

pub fn status_label(record: &ProjectRecord) -> &'static str {
    if record.is_running() {
        "running"
    } else {
        "stopped"
    }
}

/// Title, with the file name appended when the title would not resolve back to it.
pub fn display_name(record: &ProjectRecord) -> String {
    if sanitize(&record.title) == record.project {
        record.title.clone()
    } else {
        format!("{} [{}]", record.title, record.project)
    }
}

/// One line per range (`duration<TAB>start - end`) with comments kept in place, then a rule and
/// the grand total.
pub fn details_report(record: &ProjectRecord, now: i64) -> String {
    let mut out = vec![
        format!("{} ({})", record.title, status_label(record)),
        String::new(),
    ];
    for entry in &record.entries {
        match entry {
            Entry::Comment(text) => out.push(text.clone()),
            Entry::Range(range) => out.push(format!(
                "{}\t{} - {}",
                humanize_duration(range.duration(now)),
                timestamp::encode(range.start),
                timestamp::encode(range.effective_end(now))
            )),
        }
    }
    out.push(DETAILS_RULE.to_string());
    let total = total_duration(record.time_ranges(), &Filter::default(), now);
    out.push(format!("{}\t(total)", humanize_duration(total)));
    out.join("\n")
}

/// Header matching the columns of [`csv_row`].
pub fn csv_header() -> String {
    quote_row(&[
        "project",
        "status",
        "last activity",
        "total duration",
        "hourly rate",
        "earnings",
    ])
}

/// `"name","status","last activity","HH:MM:SS","rate","earnings"`; the last two are empty
/// without an hourly rate.
pub fn csv_row(record: &ProjectRecord, filter: &Filter, now: i64) -> String {
    let total = total_duration(record.time_ranges(), filter, now);
    let last_activity = record
        .last_range()
        .map(|r| timestamp::encode(r.effective_end(now)))
        .unwrap_or_default();
    let (rate, earnings) = match record.metadata.hourly_rate() {
        Some(hr) => (
            hr.display(),
            with_currency(hourly_earnings(total, hr.rate), &hr.currency),
        ),
        None => (String::new(), String::new()),
    };
    quote_row(&[
        &display_name(record),
        status_label(record),
        &last_activity,
        &humanize_duration(total),
        &rate,
        &earnings,
    ])
}

fn quote_row(fields: &[&str]) -> String {
    let quoted: Vec<String> = fields
        .iter()
        .map(|f| format!("\"{}\"", f.replace('"', "\"\"")))
        .collect();
    quoted.join(",")
}
