// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! Project handle: start/stop/toggle and the reports.
//!
//! A project is **running** when its last time range is open and **stopped** otherwise.
//!
//! | Call     | Stopped                   | Running                         |
//! |----------|---------------------------|---------------------------------|
//! | `start`  | append open range → run   | no change, "already started"    |
//! | `stop`   | no change                 | close last range → stopped      |
//! | `toggle` | `start`                   | `stop`                          |
//!
//! Every call re-resolves the project name, so a wildcard handle (`Client*`) always acts on the
//! most recently modified matching file.

use crate::aggregate::{self, Filter};
use crate::config::{Clock, Settings, SystemClock};
use crate::error::{PunchCardError, Result};
use crate::grammar;
use crate::resolver::{self, ProjectName};
use crate::store::{Metadata, ProjectRecord, ProjectStore};
use std::rc::Rc;

pub struct Project {
    settings: Settings,
    name: ProjectName,
    clock: Rc<dyn Clock>,
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("settings", &self.settings)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Project {
    /// Opens a project, creating its file (title line only) when the name is not a wildcard and
    /// no file exists yet.
    pub fn open(settings: Settings, name: &str) -> Result<Self> {
        settings.ensure_dir()?;
        let project = Self::handle(settings, name);
        let store = project.store()?;
        if !project.name.wildcard && !store.exists() {
            store.ensure_exists(&project.name.display)?;
        }
        Ok(project)
    }

    /// Opens a project that must already exist; never creates anything.
    pub fn open_existing(settings: Settings, name: &str) -> Result<Self> {
        let project = Self::handle(settings, name);
        project.load_existing()?;
        Ok(project)
    }

    fn handle(settings: Settings, name: &str) -> Self {
        Self {
            settings,
            name: ProjectName::parse(name),
            clock: Rc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn store(&self) -> Result<ProjectStore> {
        if self.name.file_stem.is_empty() && !self.name.wildcard {
            return Err(PunchCardError::NotFound {
                name: self.name.display.clone(),
            });
        }
        resolver::resolve(self.settings.dir(), &self.name).map(ProjectStore::new)
    }

    fn load_existing(&self) -> Result<ProjectRecord> {
        let store = self.store()?;
        if !store.exists() {
            return Err(PunchCardError::NotFound {
                name: self.name.display.clone(),
            });
        }
        store.load()
    }

    /// Current contents of the resolved file.
    pub fn record(&self) -> Result<ProjectRecord> {
        self.load_existing()
    }

    pub fn is_running(&self) -> Result<bool> {
        let store = self.store()?;
        Ok(store.exists() && store.load()?.is_running())
    }

    pub fn start(&self) -> Result<String> {
        let store = self.store()?;
        let record = store.ensure_exists(&self.name.display)?;
        let now = self.clock.now();
        let total = self.humanized_total(&record, now);
        if let Some(running) = record.last_range().filter(|r| r.is_open()) {
            return Ok(format!(
                "'{}' already started ({} total)\n{}",
                record.title,
                total,
                aggregate::humanize_duration(running.duration(now))
            ));
        }
        store.append_time_range(now)?;
        tracing::info!(project = %record.title, "started");
        Ok(format!("'{}' started ({} total)", record.title, total))
    }

    pub fn stop(&self) -> Result<String> {
        let store = self.store()?;
        if !store.exists() {
            return Ok("Nothing to stop".to_string());
        }
        let record = store.load()?;
        let now = self.clock.now();
        match record.last_range() {
            None => Ok("Nothing to stop".to_string()),
            Some(range) if !range.is_open() => Ok(format!(
                "'{}' already stopped ({} total)",
                record.title,
                self.humanized_total(&record, now)
            )),
            Some(_) => {
                store.close_last_time_range(now)?;
                let record = store.load()?;
                tracing::info!(project = %record.title, "stopped");
                Ok(format!(
                    "'{}' stopped ({} total)",
                    record.title,
                    self.humanized_total(&record, now)
                ))
            }
        }
    }

    pub fn toggle(&self) -> Result<String> {
        if self.is_running()? {
            self.stop()
        } else {
            self.start()
        }
    }

    /// `Title (running|stopped)`, a blank line, then the total.
    pub fn status(&self) -> Result<String> {
        let record = self.load_existing()?;
        let now = self.clock.now();
        Ok(format!(
            "{} ({})\n\n{}",
            record.title,
            aggregate::status_label(&record),
            self.humanized_total(&record, now)
        ))
    }

    pub fn details(&self) -> Result<String> {
        let record = self.load_existing()?;
        Ok(aggregate::details_report(&record, self.clock.now()))
    }

    pub fn csv(&self, filter: &Filter) -> Result<String> {
        let record = self.load_existing()?;
        Ok(aggregate::csv_row(&record, filter, self.clock.now()))
    }

    /// Tracked seconds within `filter`.
    pub fn total(&self, filter: &Filter) -> Result<i64> {
        let record = self.load_existing()?;
        Ok(aggregate::total_duration(
            record.time_ranges(),
            filter,
            self.clock.now(),
        ))
    }

    /// Sets a metadata entry, creating the project if needed.
    pub fn set(&self, key: &str, value: &str) -> Result<Metadata> {
        if !grammar::is_valid_key(key) {
            return Err(PunchCardError::InvalidKey {
                key: key.to_string(),
            });
        }
        let store = self.store()?;
        store.ensure_exists(&self.name.display)?;
        store.set_metadata(key, value)
    }

    /// Retitles the project and moves its file; the handle follows the new name.
    pub fn rename(&mut self, new_name: &str) -> Result<String> {
        self.load_existing()?;
        let renamed = self.store()?.rename(new_name)?;
        self.name = ProjectName::parse(new_name);
        tracing::info!(from = %renamed.from.display(), to = %renamed.to.display(), "renamed");
        Ok(format!("{} -> {}", renamed.from.display(), renamed.to.display()))
    }

    pub fn remove(&self) -> Result<String> {
        let store = self.store()?;
        if !store.remove()? {
            return Err(PunchCardError::NotFound {
                name: self.name.display.clone(),
            });
        }
        Ok(format!("Deleted {}", store.path().display()))
    }

    fn humanized_total(&self, record: &ProjectRecord, now: i64) -> String {
        aggregate::humanize_duration(aggregate::total_duration(
            record.time_ranges(),
            &Filter::default(),
            now,
        ))
    }
}

/// CSV header plus one row per project file in the storage directory.
pub fn csv_all(settings: &Settings, filter: &Filter, clock: &dyn Clock) -> Result<String> {
    let now = clock.now();
    let mut rows = vec![aggregate::csv_header()];
    for file_name in resolver::list_projects(settings.dir())? {
        let record = ProjectStore::new(settings.dir().join(file_name)).load()?;
        rows.push(aggregate::csv_row(&record, filter, now));
    }
    Ok(rows.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::ManualClock;
    use crate::timestamp::encode;
    use std::fs;
    use std::path::Path;

    const T0: i64 = 1_700_000_000;

    fn setup(dir: &Path) -> (Settings, Rc<ManualClock>) {
        (Settings::with_dir(dir), Rc::new(ManualClock::new(T0)))
    }

    fn open(settings: &Settings, clock: &Rc<ManualClock>, name: &str) -> Project {
        Project::open(settings.clone(), name)
            .unwrap()
            .with_clock(clock.clone())
    }

    fn project_file(dir: &Path, name: &str) -> String {
        fs::read_to_string(dir.join(name)).unwrap()
    }

    #[test]
    fn test_open_creates_title_file() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, clock) = setup(dir.path());
        let project = open(&settings, &clock, "My Project");
        assert_eq!(project_file(dir.path(), "my_project"), "My Project\n");
        assert_eq!(project.record().unwrap().title, "My Project");
    }

    #[test]
    fn test_open_creates_storage_dir() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::with_dir(dir.path().join(".punchcard"));
        Project::open(settings, "x").unwrap();
        assert!(dir.path().join(".punchcard").join("x").exists());
    }

    #[test]
    fn test_utf8_title_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, clock) = setup(dir.path());
        open(&settings, &clock, "Playing Motörhead");
        assert_eq!(
            project_file(dir.path(), "playing_mot_rhead").trim(),
            "Playing Motörhead"
        );
        let project = open(&settings, &clock, "Playing*");
        assert_eq!(project.record().unwrap().title, "Playing Motörhead");
    }

    #[test]
    fn test_start_creates_one_open_range() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, clock) = setup(dir.path());
        let project = open(&settings, &clock, "Demo");
        assert_eq!(project.start().unwrap(), "'Demo' started (00:00:00 total)");
        clock.advance(5);
        let msg = project.start().unwrap();
        assert_eq!(msg, "'Demo' already started (00:00:05 total)\n00:00:05");
        let record = project.record().unwrap();
        assert_eq!(record.time_ranges().count(), 1);
        assert!(record.is_running());
    }

    #[test]
    fn test_stop_closes_range_with_now() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, clock) = setup(dir.path());
        let project = open(&settings, &clock, "Demo");
        project.start().unwrap();
        clock.advance(2);
        assert_eq!(project.stop().unwrap(), "'Demo' stopped (00:00:02 total)");
        assert_eq!(project.total(&Filter::default()).unwrap(), 2);
        let last = project_file(dir.path(), "demo")
            .lines()
            .last()
            .unwrap()
            .to_string();
        assert_eq!(last, format!("{} - {}", encode(T0), encode(T0 + 2)));
    }

    #[test]
    fn test_stop_when_stopped_or_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, clock) = setup(dir.path());
        let project = open(&settings, &clock, "Demo");
        assert_eq!(project.stop().unwrap(), "Nothing to stop");
        project.start().unwrap();
        clock.advance(60);
        project.stop().unwrap();
        clock.advance(60);
        assert_eq!(
            project.stop().unwrap(),
            "'Demo' already stopped (00:01:00 total)"
        );
        assert_eq!(project.record().unwrap().time_ranges().count(), 1);
    }

    #[test]
    fn test_stop_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, clock) = setup(dir.path());
        let project = open(&settings, &clock, "Nothing*");
        assert_eq!(project.stop().unwrap(), "Nothing to stop");
        assert!(!dir.path().join("nothing").exists());
    }

    #[test]
    fn test_toggle() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, clock) = setup(dir.path());
        let project = open(&settings, &clock, "My Project");
        project.start().unwrap();
        clock.advance(1);
        project.stop().unwrap();
        assert!(project.status().unwrap().lines().next().unwrap().contains("stopped"));
        project.toggle().unwrap();
        assert!(project.status().unwrap().lines().next().unwrap().contains("running"));
        clock.advance(1);
        project.toggle().unwrap();
        assert!(project.status().unwrap().lines().next().unwrap().contains("stopped"));
        let content = project_file(dir.path(), "my_project");
        let lines: Vec<&str> = content.lines().filter(|l| !l.is_empty()).collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[lines.len() - 1].starts_with(|c: char| c.is_ascii_digit()));
        assert!(lines[lines.len() - 2].starts_with(|c: char| c.is_ascii_digit()));
    }

    #[test]
    fn test_status_format() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, clock) = setup(dir.path());
        let project = open(&settings, &clock, "Demo");
        project.start().unwrap();
        clock.advance(3725);
        assert_eq!(project.status().unwrap(), "Demo (running)\n\n01:02:05");
    }

    #[test]
    fn test_details_last_line_is_total() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, clock) = setup(dir.path());
        let project = open(&settings, &clock, "Demo");
        project.start().unwrap();
        clock.advance(2);
        project.stop().unwrap();
        let details = project.details().unwrap();
        assert_eq!(details.lines().last().unwrap(), "00:00:02\t(total)");
    }

    #[test]
    fn test_total_accumulates_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, clock) = setup(dir.path());
        let project = open(&settings, &clock, "Demo");
        project.start().unwrap();
        clock.advance(2);
        assert_eq!(project.total(&Filter::default()).unwrap(), 2);
        project.stop().unwrap();
        clock.advance(100);
        project.start().unwrap();
        clock.advance(2);
        project.stop().unwrap();
        assert_eq!(project.total(&Filter::default()).unwrap(), 4);
    }

    #[test]
    fn test_two_projects_tracked_simultaneously() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, clock) = setup(dir.path());
        let a = open(&settings, &clock, "A");
        let b = open(&settings, &clock, "B");
        a.start().unwrap();
        b.start().unwrap();
        clock.advance(2);
        a.stop().unwrap();
        clock.advance(2);
        b.stop().unwrap();
        let diff = b.total(&Filter::default()).unwrap() - a.total(&Filter::default()).unwrap();
        assert!((1..=5).contains(&diff), "diff was {}", diff);
    }

    #[test]
    fn test_set_writes_metadata_line() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, clock) = setup(dir.path());
        let project = open(&settings, &clock, "My Project");
        project.start().unwrap();
        clock.advance(1);
        project.stop().unwrap();
        project.set("hourlyRate", "1000 €").unwrap();
        let content = project_file(dir.path(), "my_project");
        assert_eq!(content.lines().nth(1).unwrap(), "hourlyRate: 1000 €");
    }

    #[test]
    fn test_set_invalid_key_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, clock) = setup(dir.path());
        let project = open(&settings, &clock, "Later*");
        let err = project.set("bad key", "1").unwrap_err();
        assert!(matches!(err, PunchCardError::InvalidKey { .. }));
        assert!(!dir.path().join("later").exists());
    }

    #[test]
    fn test_csv_earnings_for_one_hour() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, clock) = setup(dir.path());
        let project = open(&settings, &clock, "My Project");
        project.set("hourlyRate", "1000 EUR").unwrap();
        project.start().unwrap();
        clock.advance(3600);
        project.stop().unwrap();
        let row = project.csv(&Filter::default()).unwrap();
        let fields: Vec<&str> = row.split("\",\"").collect();
        assert_eq!(fields[0], "\"My Project");
        assert_eq!(fields[1], "stopped");
        assert_eq!(fields[3], "01:00:00");
        assert_eq!(fields[4], "1000.0 EUR");
        assert_eq!(fields[5], "1000.0 EUR\"");
    }

    #[test]
    fn test_csv_earnings_partial_hour() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, clock) = setup(dir.path());
        let project = open(&settings, &clock, "My Project");
        project.set("hourlyRate", "1000EURO").unwrap();
        project.toggle().unwrap();
        clock.advance(2);
        project.toggle().unwrap();
        project.toggle().unwrap();
        clock.advance(2);
        project.toggle().unwrap();
        let row = project.csv(&Filter::default()).unwrap();
        assert!(row.starts_with("\"My Project\",\"stopped\",\""));
        assert!(row.ends_with("\"00:00:04\",\"1000.0 EURO\",\"1.11 EURO\""));
    }

    #[test]
    fn test_filtered_total() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, clock) = setup(dir.path());
        let project = open(&settings, &clock, "Demo");
        project.start().unwrap();
        clock.advance(100);
        project.stop().unwrap();
        clock.advance(1000);
        project.start().unwrap();
        clock.advance(50);
        project.stop().unwrap();
        let after_first = Filter::new(Some(T0 + 500), None);
        assert_eq!(project.total(&after_first).unwrap(), 50);
        let before_second = Filter::new(None, Some(T0 + 500));
        assert_eq!(project.total(&before_second).unwrap(), 100);
        let row = project.csv(&after_first).unwrap();
        assert!(row.contains("\"00:00:50\""));
    }

    #[test]
    fn test_wildcard_follows_latest_project() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, clock) = setup(dir.path());
        let a = open(&settings, &clock, "My random Project a1");
        let latest = open(&settings, &clock, "My random*");
        assert_eq!(latest.record().unwrap().title, "My random Project a1");
        let file_a = fs::File::options()
            .write(true)
            .open(dir.path().join("my_random_project_a1"))
            .unwrap();
        file_a
            .set_modified(std::time::SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000))
            .unwrap();
        let b = open(&settings, &clock, "My random Project b2");
        assert_eq!(latest.record().unwrap().title, "My random Project b2");
        latest.start().unwrap();
        assert!(b.is_running().unwrap());
        assert!(!a.is_running().unwrap());
    }

    #[test]
    fn test_rename() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, clock) = setup(dir.path());
        let mut project = open(&settings, &clock, "My Project");
        let before = project_file(dir.path(), "my_project");
        let msg = project.rename("Renamed Project").unwrap();
        assert!(msg.ends_with("renamed_project"));
        assert_eq!(
            project_file(dir.path(), "renamed_project"),
            before.replace("My Project", "Renamed Project")
        );
        assert!(!dir.path().join("my_project").exists());
        assert_eq!(project.record().unwrap().title, "Renamed Project");

        project.start().unwrap();
        clock.advance(1);
        project.stop().unwrap();
        let before = project_file(dir.path(), "renamed_project");
        project.rename("Other Project").unwrap();
        assert_eq!(
            project_file(dir.path(), "other_project"),
            before.replace("Renamed Project", "Other Project")
        );
        assert!(!dir.path().join("renamed_project").exists());
    }

    #[test]
    fn test_numeric_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::with_dir(dir.path());
        assert!(matches!(
            Project::open(settings.clone(), "2024"),
            Err(PunchCardError::InvalidTitle { .. })
        ));
        assert!(!dir.path().join("2024").exists());
        let (settings, clock) = setup(dir.path());
        let project = open(&settings, &clock, "2024 Budget");
        assert_eq!(
            project.start().unwrap(),
            "'2024 Budget' started (00:00:00 total)"
        );
        assert_eq!(project.record().unwrap().time_ranges().count(), 1);
    }

    #[test]
    fn test_start_on_wildcard_with_numeric_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, clock) = setup(dir.path());
        let project = open(&settings, &clock, "2024*");
        assert!(matches!(
            project.start(),
            Err(PunchCardError::InvalidTitle { .. })
        ));
        assert!(!dir.path().join("2024").exists());
    }

    #[test]
    fn test_multiline_metadata_value_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, clock) = setup(dir.path());
        let project = open(&settings, &clock, "Notes");
        project.set("note", "x\n1600000000").unwrap();
        assert!(!project.is_running().unwrap());
        let record = project.record().unwrap();
        assert_eq!(record.time_ranges().count(), 0);
        assert_eq!(record.metadata.get("note"), Some("x 1600000000"));
        assert_eq!(project.status().unwrap(), "Notes (stopped)\n\n00:00:00");
    }

    #[test]
    fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, clock) = setup(dir.path());
        let project = open(&settings, &clock, "My Project");
        assert!(dir.path().join("my_project").exists());
        assert!(project.remove().unwrap().starts_with("Deleted "));
        assert!(!dir.path().join("my_project").exists());
        assert!(matches!(
            project.remove(),
            Err(PunchCardError::NotFound { .. })
        ));
    }

    #[test]
    fn test_reads_require_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, clock) = setup(dir.path());
        let project = open(&settings, &clock, "Ghost*");
        assert!(matches!(project.status(), Err(PunchCardError::NotFound { .. })));
        assert!(matches!(project.details(), Err(PunchCardError::NotFound { .. })));
        assert!(matches!(
            project.csv(&Filter::default()),
            Err(PunchCardError::NotFound { .. })
        ));
        assert!(matches!(
            Project::open_existing(settings.clone(), "Ghost"),
            Err(PunchCardError::NotFound { .. })
        ));
        assert!(!dir.path().join("ghost").exists());
    }

    #[test]
    fn test_comments_survive_reads_but_not_metadata_writes() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, clock) = setup(dir.path());
        fs::write(
            dir.path().join("notes"),
            "Notes\n1700000000-1700000060\n# 1700000100-1700000200\n# rate: 5\n",
        )
        .unwrap();
        let project = open(&settings, &clock, "Notes");
        let details = project.details().unwrap();
        assert!(details.contains("\n# 1700000100-1700000200\n"));
        assert!(details.contains("\n# rate: 5\n"));
        assert_eq!(project.total(&Filter::default()).unwrap(), 60);
        assert!(project_file(dir.path(), "notes").contains("# rate: 5"));
        project.set("client", "ACME").unwrap();
        assert!(!project_file(dir.path(), "notes").contains('#'));
    }

    #[test]
    fn test_legacy_file_still_reads() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, clock) = setup(dir.path());
        fs::write(
            dir.path().join("legacy"),
            "Legacy\n1700000000-1700003600\n\n1700010000",
        )
        .unwrap();
        let project = open(&settings, &clock, "legacy");
        clock.advance(10_000 + 60);
        assert!(project.is_running().unwrap());
        assert_eq!(project.total(&Filter::default()).unwrap(), 3600 + 60);
        project.stop().unwrap();
        let record = project.record().unwrap();
        assert_eq!(record.time_ranges().count(), 2);
        assert!(!record.is_running());
    }

    #[test]
    fn test_csv_all() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, clock) = setup(dir.path());
        open(&settings, &clock, "Beta").start().unwrap();
        open(&settings, &clock, "Alpha");
        let out = csv_all(&settings, &Filter::default(), clock.as_ref()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("\"project\""));
        assert!(lines[1].starts_with("\"Alpha\",\"stopped\""));
        assert!(lines[2].starts_with("\"Beta\",\"running\""));
    }

    #[test]
    fn test_real_clock_start_stop() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::with_dir(dir.path());
        let project = Project::open(settings, "Demo").unwrap();
        project.start().unwrap();
        std::thread::sleep(std::time::Duration::from_secs(2));
        project.stop().unwrap();
        let total = project.total(&Filter::default()).unwrap();
        assert!((1..=3).contains(&total), "total was {}", total);
        let details = project.details().unwrap();
        let last = details.lines().last().unwrap();
        let (hms, label) = last.split_once('\t').unwrap();
        assert_eq!(label, "(total)");
        assert_eq!(hms.len(), 8);
        assert_eq!(hms.matches(':').count(), 2);
    }
}
