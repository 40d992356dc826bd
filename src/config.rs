// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! Storage root and wall-clock collaborators.
//!
//! Production code uses [`Settings::from_env`], which honors `PUNCHCARD_DIR` and otherwise falls
//! back to `~/.punchcard`. Tests use [`Settings::with_dir`] with a temp directory.

use crate::error::{PunchCardError, Result};
use chrono::Local;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the storage directory.
pub const DIR_ENV: &str = "PUNCHCARD_DIR";

/// Default directory name under `$HOME`.
const DEFAULT_DIR: &str = ".punchcard";

/// Where project files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    dir: PathBuf,
}

impl Settings {
    /// `$PUNCHCARD_DIR`, or `$HOME/.punchcard`.
    pub fn from_env() -> Result<Self> {
        if let Some(dir) = env::var_os(DIR_ENV).filter(|d| !d.is_empty()) {
            return Ok(Self::with_dir(dir));
        }
        let home = dirs::home_dir().ok_or(PunchCardError::NoHomeDir)?;
        Ok(Self::with_dir(home.join(DEFAULT_DIR)))
    }

    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the storage directory if missing. Safe to call repeatedly.
    pub fn ensure_dir(&self) -> Result<()> {
        if !self.dir.is_dir() {
            tracing::debug!(dir = %self.dir.display(), "creating storage directory");
            fs::create_dir_all(&self.dir).map_err(|e| PunchCardError::io(&self.dir, e))?;
        }
        Ok(())
    }
}

/// Source of "now" as epoch seconds.
pub trait Clock {
    fn now(&self) -> i64;
}

/// Local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Local::now().timestamp()
    }
}
