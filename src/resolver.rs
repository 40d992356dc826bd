// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! Maps project names to files in the storage directory.
//!
//! - `My Project` → `<dir>/my_project`
//! - `My*` → the most recently modified file in `<dir>` whose name starts with `my`; if none
//!   matches, `<dir>/my` (which does not exist).
//!
//! Resolution is repeated on every operation so a wildcard handle follows whichever matching
//! project was touched last.

use crate::error::{PunchCardError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Suffix that turns a name into a "latest matching project" pattern.
pub const WILDCARD: char = '*';

/// A project name as typed by the user, split into its sanitized file stem and wildcard flag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectName {
    /// Name with the wildcard marker removed and whitespace trimmed, for display.
    pub display: String,
    /// Sanitized file name (or prefix, when `wildcard`).
    pub file_stem: String,
    pub wildcard: bool,
}

impl ProjectName {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let (base, wildcard) = match trimmed.strip_suffix(WILDCARD) {
            Some(base) => (base.trim(), true),
            None => (trimmed, false),
        };
        Self {
            display: base.to_string(),
            file_stem: sanitize(base),
            wildcard,
        }
    }
}

/// Lower-cases, drops `/` and `\`, and replaces everything outside `[0-9a-z.-]` with `_`.
pub fn sanitize(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| *c != '/' && *c != '\\')
        .map(|c| {
            if c.is_ascii_digit() || c.is_ascii_lowercase() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Resolves `name` to a path inside `dir`. The path may not exist.
///
/// Wildcard ties (equal modification times) go to the name that sorts last.
pub fn resolve(dir: &Path, name: &ProjectName) -> Result<PathBuf> {
    let literal = dir.join(&name.file_stem);
    if !name.wildcard {
        return Ok(literal);
    }
    let mut best: Option<(SystemTime, String)> = None;
    for file_name in project_files(dir)? {
        if !file_name.starts_with(&name.file_stem) {
            continue;
        }
        let path = dir.join(&file_name);
        let mtime = fs::metadata(&path)
            .and_then(|m| m.modified())
            .map_err(|e| PunchCardError::io(&path, e))?;
        // project_files is sorted, so `>=` lets the later name win a tie.
        if best.as_ref().map_or(true, |(t, _)| mtime >= *t) {
            best = Some((mtime, file_name));
        }
    }
    let resolved = best.map(|(_, f)| dir.join(f)).unwrap_or(literal);
    tracing::debug!(pattern = %name.file_stem, path = %resolved.display(), "resolved wildcard");
    Ok(resolved)
}

/// Project file names in `dir`, sorted. Hidden files and directories are skipped. A missing
/// directory has no projects.
pub fn list_projects(dir: &Path) -> Result<Vec<String>> {
    project_files(dir)
}

fn project_files(dir: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(PunchCardError::io(dir, e)),
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PunchCardError::io(dir, e))?;
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if !name.starts_with('.') {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}
