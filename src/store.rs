// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! File-backed project records.
//!
//! A [`ProjectStore`] wraps one resolved path and performs every read and write on it. Nothing is
//! cached: each mutation goes straight to disk, and callers reload when they need fresh state.

use crate::aggregate::HourlyRate;
use crate::error::{PunchCardError, Result};
use crate::grammar::{self, classify, Line, TimeRange};
use crate::resolver::sanitize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// `key: value` pairs from a project file, in first-seen order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: Vec<(String, String)>,
}

impl Metadata {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Inserts or replaces; a replaced key keeps its position.
    pub fn set(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `hourlyRate`, if it starts with a number.
    pub fn hourly_rate(&self) -> Option<HourlyRate> {
        self.get("hourlyRate").and_then(HourlyRate::parse)
    }
}

/// Body line of a project file that reports care about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entry {
    Comment(String),
    Range(TimeRange),
}

/// In-memory view of one project file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectRecord {
    pub path: PathBuf,
    /// Display name: the file's title line, or `project` when there is none.
    pub title: String,
    /// File name; re-resolving this name finds the same file.
    pub project: String,
    pub metadata: Metadata,
    /// Comments and time ranges in file order.
    pub entries: Vec<Entry>,
}

impl ProjectRecord {
    /// Builds a record from file contents.
    ///
    /// The first non-blank, non-comment line is the title unless it is itself a time range.
    pub fn parse(path: &Path, content: &str) -> Self {
        let project = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut title: Option<String> = None;
        let mut seen_header = false;
        let mut metadata = Metadata::default();
        let mut entries = Vec::new();
        for raw in content.lines() {
            let line = classify(raw);
            if !seen_header {
                match &line {
                    Line::Comment(_) => {}
                    Line::PlainText(text) if text.is_empty() => {}
                    Line::TimeRange(_) => seen_header = true,
                    Line::PlainText(_) | Line::Metadata { .. } => {
                        seen_header = true;
                        title = Some(raw.trim().to_string());
                        continue;
                    }
                }
            }
            match line {
                Line::Comment(text) => entries.push(Entry::Comment(text)),
                Line::Metadata { key, value } => metadata.set(&key, &value),
                Line::TimeRange(range) => entries.push(Entry::Range(range)),
                Line::PlainText(_) => {}
            }
        }
        Self {
            path: path.to_path_buf(),
            title: title.unwrap_or_else(|| project.clone()),
            project,
            metadata,
            entries,
        }
    }

    pub fn time_ranges(&self) -> impl Iterator<Item = &TimeRange> {
        self.entries.iter().filter_map(|e| match e {
            Entry::Range(r) => Some(r),
            Entry::Comment(_) => None,
        })
    }

    pub fn last_range(&self) -> Option<&TimeRange> {
        self.time_ranges().last()
    }

    pub fn is_running(&self) -> bool {
        self.last_range().is_some_and(TimeRange::is_open)
    }

    /// Title, then metadata, then time ranges; empty sections are omitted. Comments are dropped.
    pub fn serialize(&self) -> String {
        let meta: Vec<String> = self
            .metadata
            .iter()
            .map(|(k, v)| grammar::format_metadata(k, v))
            .collect();
        let ranges: Vec<String> = self.time_ranges().map(ToString::to_string).collect();
        let sections = [self.title.clone(), meta.join("\n"), ranges.join("\n")];
        let mut out = sections
            .iter()
            .filter(|s| !s.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");
        out.push('\n');
        out
    }
}

/// Result of [`ProjectStore::rename`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Renamed {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Read/write primitives for a single resolved project file.
#[derive(Clone, Debug)]
pub struct ProjectStore {
    path: PathBuf,
}

impl ProjectStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn load(&self) -> Result<ProjectRecord> {
        let content = self.read()?;
        Ok(ProjectRecord::parse(&self.path, &content))
    }

    /// Creates the file holding only `title` if it does not exist yet, then loads it.
    pub fn ensure_exists(&self, title: &str) -> Result<ProjectRecord> {
        if !self.exists() {
            check_title(title)?;
            tracing::debug!(path = %self.path.display(), "creating project file");
            self.write(&format!("{}\n", title.trim()))?;
        }
        self.load()
    }

    /// Sets one metadata entry and rewrites the file as title, metadata, time ranges.
    pub fn set_metadata(&self, key: &str, value: &str) -> Result<Metadata> {
        if !grammar::is_valid_key(key) {
            return Err(PunchCardError::InvalidKey {
                key: key.to_string(),
            });
        }
        let mut record = self.load()?;
        record.metadata.set(key, &grammar::single_line(value));
        self.write(&record.serialize())?;
        Ok(record.metadata)
    }

    /// Appends an open range after a blank line, leaving the rest of the file untouched.
    pub fn append_time_range(&self, start: i64) -> Result<TimeRange> {
        let range = TimeRange::open(start);
        tracing::debug!(path = %self.path.display(), start, "appending time range");
        let mut f = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| PunchCardError::io(&self.path, e))?;
        f.write_all(format!("\n{}\n", range).as_bytes())
            .map_err(|e| PunchCardError::io(&self.path, e))?;
        Ok(range)
    }

    /// Closes the last time range of the file at `end`. Returns `None` without writing when the
    /// last range is already closed or there is none.
    pub fn close_last_time_range(&self, end: i64) -> Result<Option<TimeRange>> {
        let content = self.read()?;
        let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
        let last = lines.iter().enumerate().rev().find_map(|(i, l)| match classify(l) {
            Line::TimeRange(r) => Some((i, r)),
            _ => None,
        });
        let (idx, range) = match last {
            Some((idx, range)) if range.is_open() => (idx, range),
            _ => return Ok(None),
        };
        let closed = TimeRange::closed(range.start, end);
        lines[idx] = closed.to_string();
        tracing::debug!(path = %self.path.display(), line = idx + 1, "closing time range");
        self.write(&(lines.join("\n") + "\n"))?;
        Ok(Some(closed))
    }

    /// Replaces the title line and moves the file to the sanitized new name.
    pub fn rename(&self, new_title: &str) -> Result<Renamed> {
        let new_title = new_title.trim();
        check_title(new_title)?;
        let content = self.read()?;
        let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
        let title_idx = lines.iter().position(|l| match classify(l) {
            Line::Comment(_) => false,
            Line::PlainText(t) => !t.is_empty(),
            _ => true,
        });
        match title_idx {
            Some(i) if !matches!(classify(&lines[i]), Line::TimeRange(_)) => {
                lines[i] = new_title.to_string()
            }
            _ => lines.insert(0, new_title.to_string()),
        }
        let dir = self.path.parent().unwrap_or(Path::new("."));
        let target = dir.join(sanitize(new_title));
        if target != self.path && target.exists() {
            return Err(PunchCardError::io(
                &target,
                std::io::Error::new(std::io::ErrorKind::AlreadyExists, "project already exists"),
            ));
        }
        self.write(&(lines.join("\n") + "\n"))?;
        if target != self.path {
            tracing::debug!(from = %self.path.display(), to = %target.display(), "renaming project file");
            fs::rename(&self.path, &target).map_err(|e| PunchCardError::io(&self.path, e))?;
        }
        Ok(Renamed {
            from: self.path.clone(),
            to: target,
        })
    }

    /// Deletes the file. `false` if there was nothing to delete.
    pub fn remove(&self) -> Result<bool> {
        if !self.exists() {
            return Ok(false);
        }
        tracing::debug!(path = %self.path.display(), "removing project file");
        fs::remove_file(&self.path).map_err(|e| PunchCardError::io(&self.path, e))?;
        Ok(true)
    }

    fn read(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|e| PunchCardError::io(&self.path, e))
    }

    fn write(&self, content: &str) -> Result<()> {
        tracing::debug!(path = %self.path.display(), bytes = content.len(), "writing project file");
        fs::write(&self.path, content).map_err(|e| PunchCardError::io(&self.path, e))
    }
}

fn check_title(title: &str) -> Result<()> {
    if grammar::is_valid_title(title) {
        Ok(())
    } else {
        Err(PunchCardError::InvalidTitle {
            title: title.trim().to_string(),
        })
    }
}
