// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! # punched — punchcard CLI
//!
//! ## Subcommands
//!
//! | Command   | Description |
//! |-----------|-------------|
//! | `start`   | Start tracking a project (creates it if needed). |
//! | `stop`    | Stop tracking a project. |
//! | `toggle`  | Stop if running, else start. |
//! | `status`  | Running state and total. |
//! | `details` | Every tracked interval with durations, then the total. |
//! | `csv`     | One CSV row; optional `--start-at` / `--end-at` window. |
//! | `total`   | Total tracked time; optional window. |
//! | `set`     | Set a metadata entry, e.g. `hourlyRate "45 USD"`. |
//! | `rename`  | Retitle a project and rename its file. |
//! | `remove`  | Delete a project file. |
//! | `all`     | CSV header plus one row per project. |
//!
//! A project name ending in `*` selects the most recently modified matching project.

use clap::{Args, Parser, Subcommand};
use punchcard::{aggregate, timestamp, Filter, Project, PunchCardError, Settings, SystemClock};
use std::env;
use std::io::{self, Write};
use std::process;
use tracing_subscriber::EnvFilter;
#[cfg(unix)]
use libc::{signal, SIG_IGN};

/// Forces debug logging when set to `1`, `true` or `yes`.
const DEBUG_ENV: &str = "PUNCHCARD_DEBUG";

#[derive(Parser)]
#[command(name = "punched")]
#[command(about = "Track working time per project in plain text files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start tracking
    Start { project: String },
    /// Stop tracking
    Stop { project: String },
    /// Stop if running, start otherwise
    Toggle { project: String },
    /// Show running state and total
    Status { project: String },
    /// List tracked intervals and the total
    Details { project: String },
    /// Print one CSV row
    Csv {
        project: String,
        #[command(flatten)]
        window: Window,
    },
    /// Print total tracked time
    Total {
        project: String,
        #[command(flatten)]
        window: Window,
    },
    /// Set a metadata entry
    Set {
        project: String,
        /// Alphanumeric key, e.g. hourlyRate
        key: String,
        value: String,
    },
    /// Retitle a project and rename its file
    Rename {
        project: String,
        #[arg(value_name = "NEW_NAME")]
        new_name: String,
    },
    /// Delete a project
    Remove { project: String },
    /// CSV for every project
    All {
        #[command(flatten)]
        window: Window,
    },
}

/// Report window for `csv`, `total` and `all`.
#[derive(Args)]
struct Window {
    /// Only count ranges starting after this time (YYYY-MM-DD[ HH:MM[:SS]])
    #[arg(long)]
    start_at: Option<String>,
    /// Only count ranges ending before this time
    #[arg(long)]
    end_at: Option<String>,
}

impl Window {
    fn filter(&self) -> Result<Filter, PunchCardError> {
        Ok(Filter::new(
            parse_bound(self.start_at.as_deref())?,
            parse_bound(self.end_at.as_deref())?,
        ))
    }
}

fn parse_bound(arg: Option<&str>) -> Result<Option<i64>, PunchCardError> {
    arg.map(|s| {
        timestamp::parse_filter_time(s).ok_or_else(|| PunchCardError::InvalidTime {
            input: s.to_string(),
        })
    })
    .transpose()
}

fn init_logging() {
    let debug_enabled = env::var(DEBUG_ENV)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands, settings: Settings) -> Result<String, PunchCardError> {
    match command {
        Commands::Start { project } => Project::open(settings, &project)?.start(),
        Commands::Stop { project } => Project::open(settings, &project)?.stop(),
        Commands::Toggle { project } => Project::open(settings, &project)?.toggle(),
        Commands::Status { project } => Project::open_existing(settings, &project)?.status(),
        Commands::Details { project } => Project::open_existing(settings, &project)?.details(),
        Commands::Csv { project, window } => {
            let filter = window.filter()?;
            Project::open_existing(settings, &project)?.csv(&filter)
        }
        Commands::Total { project, window } => {
            let filter = window.filter()?;
            let total = Project::open_existing(settings, &project)?.total(&filter)?;
            Ok(aggregate::humanize_duration(total))
        }
        Commands::Set {
            project,
            key,
            value,
        } => {
            let metadata = Project::open(settings, &project)?.set(&key, &value)?;
            let lines: Vec<String> = metadata
                .iter()
                .map(|(k, v)| punchcard::grammar::format_metadata(k, v))
                .collect();
            Ok(lines.join("\n"))
        }
        Commands::Rename { project, new_name } => {
            Project::open_existing(settings, &project)?.rename(&new_name)
        }
        Commands::Remove { project } => Project::open_existing(settings, &project)?.remove(),
        Commands::All { window } => {
            let filter = window.filter()?;
            punchcard::csv_all(&settings, &filter, &SystemClock)
        }
    }
}

fn main() {
    #[cfg(unix)]
    unsafe {
        signal(libc::SIGPIPE, SIG_IGN);
    }
    init_logging();
    let cli = Cli::parse();
    let result = Settings::from_env().and_then(|settings| run(cli.command, settings));
    match result {
        Ok(output) => {
            let mut out = io::stdout();
            if let Err(e) = writeln!(out, "{}", output) {
                if e.kind() != io::ErrorKind::BrokenPipe {
                    eprintln!("{}", e);
                    process::exit(1);
                }
            }
        }
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}
