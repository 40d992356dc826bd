// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! # punchcard — per-project time tracking in plain text files
//!
//! Each project is one file in the storage directory (`$PUNCHCARD_DIR`, default
//! `$HOME/.punchcard`), named after the sanitized project name:
//!
//! ```text
//! My Project
//! hourlyRate: 45 USD
//! 2023-11-14 09:00:00 - 2023-11-14 12:30:00
//! 2023-11-14 13:15:00
//! ```
//!
//! The first line is the title, `key: value` lines are metadata, and every other line is a time
//! range; an open range means the project is running. Lines starting with `#` are comments.
//! Old files with epoch-integer ranges (`1700000000-1700003600`) are still read.
//!
//! ## Modules
//!
//! | Module      | Role |
//! |-------------|------|
//! | `timestamp` | Epoch ↔ `YYYY-MM-DD HH:MM:SS`, legacy integer tokens. |
//! | `grammar`   | Classifies file lines; `TimeRange`. |
//! | `resolver`  | Name sanitizing and `name*` wildcard resolution. |
//! | `store`     | Loads and rewrites project files. |
//! | `aggregate` | Totals, earnings, details and CSV reports. |
//! | `project`   | `start` / `stop` / `toggle` and the reports, per project. |

pub mod aggregate;
pub mod config;
pub mod error;
pub mod grammar;
pub mod project;
pub mod resolver;
pub mod store;
pub mod timestamp;

pub use aggregate::{Filter, HourlyRate};
pub use config::{Clock, Settings, SystemClock};
pub use error::{PunchCardError, Result};
pub use grammar::{Line, TimeRange};
pub use project::{csv_all, Project};
pub use store::{Metadata, ProjectRecord, ProjectStore};
