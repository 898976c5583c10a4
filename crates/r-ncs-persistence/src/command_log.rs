//! ---
//! ncs_section: "03-persistence-logging"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Persistence abstractions and storage bindings."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};
use r_ncs_common::time::{elapsed_millis, wall_clock};
use tracing::debug;

use crate::{PersistenceError, Result};

const CMD_PREFIX: &str = "cmd: ";
const START_PREFIX: &str = "start time: ";
const SPAN_PREFIX: &str = "time span: ";

/// One timed console command as kept in the command log.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRecord {
    /// Command line exactly as typed.
    pub command: String,
    /// Wall-clock start, already rendered.
    pub start_time: String,
    /// Elapsed milliseconds, three decimals.
    pub elapsed_ms: f64,
}

impl CommandRecord {
    /// Build a record from a start instant and elapsed duration.
    pub fn new(command: impl Into<String>, started_at: DateTime<Local>, elapsed: Duration) -> Self {
        Self {
            command: command.into(),
            start_time: wall_clock(started_at),
            elapsed_ms: elapsed_millis(elapsed),
        }
    }
}

/// Append-only writer for the command log. Each record spans three lines.
pub struct CommandLogWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl CommandLogWriter {
    /// Open the log for appending, creating parent directories as needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        debug!(path = %path.display(), "command log opened");
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    /// Append a record and flush it to disk.
    pub fn append(&mut self, record: &CommandRecord) -> Result<()> {
        writeln!(self.writer, "{CMD_PREFIX}{}", record.command)?;
        writeln!(self.writer, "{START_PREFIX}{}", record.start_time)?;
        writeln!(self.writer, "{SPAN_PREFIX}{}ms", record.elapsed_ms)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Access the current path on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Read every record back from a command log file.
pub fn read_records(path: &Path) -> Result<Vec<CommandRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    let mut pending: Option<(String, Option<String>)> = None;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let malformed = || PersistenceError::Malformed {
            line: index + 1,
            content: line.clone(),
        };
        if line.trim().is_empty() {
            continue;
        }
        if let Some(command) = line.strip_prefix(CMD_PREFIX) {
            pending = Some((command.to_owned(), None));
        } else if let Some(start) = line.strip_prefix(START_PREFIX) {
            match pending.as_mut() {
                Some((_, slot @ None)) => *slot = Some(start.to_owned()),
                _ => return Err(malformed()),
            }
        } else if let Some(span) = line.strip_prefix(SPAN_PREFIX) {
            let Some((command, Some(start_time))) = pending.take() else {
                return Err(malformed());
            };
            let elapsed_ms = span
                .trim_end_matches("ms")
                .parse::<f64>()
                .map_err(|_| malformed())?;
            records.push(CommandRecord {
                command,
                start_time,
                elapsed_ms,
            });
        } else {
            return Err(malformed());
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn record(command: &str, micros: u64) -> CommandRecord {
        let at = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        CommandRecord::new(command, at, Duration::from_micros(micros))
    }

    #[test]
    fn append_and_read_back_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs/commands.log");
        let mut writer = CommandLogWriter::open(&path).unwrap();
        writer.append(&record("apps", 1_500)).unwrap();
        writer.append(&record("orch run", 42_250)).unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].command, "apps");
        assert_eq!(records[1].command, "orch run");
        assert_eq!(records[1].elapsed_ms, 42.25);
        assert_eq!(records[0].start_time, "Tue Jan  2 03:04:05 2024");
    }

    #[test]
    fn reopening_appends_instead_of_truncating() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("commands.log");
        CommandLogWriter::open(&path)
            .unwrap()
            .append(&record("stat", 10))
            .unwrap();
        CommandLogWriter::open(&path)
            .unwrap()
            .append(&record("reinit", 10))
            .unwrap();

        let commands: Vec<_> = read_records(&path)
            .unwrap()
            .into_iter()
            .map(|r| r.command)
            .collect();
        assert_eq!(commands, vec!["stat", "reinit"]);
    }

    #[test]
    fn stray_line_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("commands.log");
        fs::write(&path, "cmd: apps\ntime span: 1ms\n").unwrap();
        let err = read_records(&path).unwrap_err();
        assert!(matches!(err, PersistenceError::Malformed { line: 2, .. }));
    }
}
