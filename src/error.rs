// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! Error types for punchcard operations.

use std::path::{Path, PathBuf};

/// All errors that can occur while reading, mutating or reporting on a project.
#[derive(Debug, thiserror::Error)]
pub enum PunchCardError {
    /// Metadata keys are restricted to `[A-Za-z0-9]+`.
    #[error("Key '{key}' can only be alphanumeric")]
    InvalidKey { key: String },

    #[error("'{name}' does not exist")]
    NotFound { name: String },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A title that would read back as a time range or a comment.
    #[error("'{title}' cannot be used as a project title")]
    InvalidTitle { title: String },

    #[error("could not parse time: {input}")]
    InvalidTime { input: String },

    #[error("could not determine home directory; set PUNCHCARD_DIR")]
    NoHomeDir,
}

impl PunchCardError {
    /// Wraps an I/O error with the path it happened on.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        PunchCardError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PunchCardError>;
