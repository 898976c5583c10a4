//! ---
//! ncs_section: "01-core-functionality"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Session environment and startup orchestration."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use tracing::{debug, info, warn};

use crate::error::{EnvError, Result};

#[derive(Debug)]
struct Supervised {
    command: String,
    child: Child,
    temp_file: Option<PathBuf>,
}

/// Counts from a completed teardown.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TeardownReport {
    pub reaped: usize,
    pub files_removed: usize,
}

/// Helper processes spawned during the session, reaped at teardown.
///
/// Processes are tracked, not awaited, at spawn time. Once teardown begins
/// the pool is closed and further spawns fail with [`EnvError::SessionClosed`].
#[derive(Debug, Default)]
pub struct ProcessPool {
    entries: Vec<Supervised>,
    closed: bool,
}

impl ProcessPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Launch `command` through the shell and track it along with an optional
    /// temp file to delete at teardown. Returns the child's pid.
    pub fn spawn(&mut self, command: &str, temp_file: Option<PathBuf>) -> Result<u32> {
        if self.closed {
            if let Some(path) = &temp_file {
                remove_temp_file(path);
            }
            return Err(EnvError::SessionClosed);
        }
        self.spawn_with(Command::new("sh").arg("-c").arg(command), command, temp_file)
    }

    fn spawn_with(
        &mut self,
        launcher: &mut Command,
        command: &str,
        temp_file: Option<PathBuf>,
    ) -> Result<u32> {
        let spawned = launcher
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn();
        let child = match spawned {
            Ok(child) => child,
            Err(source) => {
                if let Some(path) = &temp_file {
                    remove_temp_file(path);
                }
                return Err(EnvError::Spawn {
                    command: command.to_owned(),
                    source,
                });
            }
        };
        let pid = child.id();
        debug!(pid, command, "supervised process spawned");
        self.entries.push(Supervised {
            command: command.to_owned(),
            child,
            temp_file,
        });
        Ok(pid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Close the pool, wait for every process and delete their temp files.
    /// Later calls only report zero counts.
    pub fn teardown(&mut self) -> TeardownReport {
        self.closed = true;
        let mut report = TeardownReport::default();
        if !self.entries.is_empty() {
            info!(count = self.entries.len(), "waiting for supervised processes");
        }
        for mut entry in self.entries.drain(..) {
            match entry.child.wait() {
                Ok(status) => {
                    debug!(command = %entry.command, %status, "supervised process exited");
                    report.reaped += 1;
                }
                Err(err) => warn!(command = %entry.command, error = %err, "failed to wait for supervised process"),
            }
            if let Some(path) = entry.temp_file {
                if remove_temp_file(&path) {
                    report.files_removed += 1;
                }
            }
        }
        report
    }
}

impl Drop for ProcessPool {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            self.teardown();
        }
    }
}

fn remove_temp_file(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(err) if err.kind() == ErrorKind::NotFound => false,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to remove temp file");
            false
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn teardown_reaps_processes_and_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("watch.sql");
        fs::write(&temp, "SELECT 1;").unwrap();

        let mut pool = ProcessPool::new();
        pool.spawn("true", Some(temp.clone())).unwrap();
        pool.spawn("sleep 0.1", None).unwrap();
        assert_eq!(pool.len(), 2);

        let report = pool.teardown();
        assert_eq!(report, TeardownReport { reaped: 2, files_removed: 1 });
        assert!(!temp.exists());
        assert!(pool.is_empty());
        assert_eq!(pool.teardown(), TeardownReport::default());
    }

    #[test]
    fn spawn_after_teardown_fails_closed() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("late.sql");
        fs::write(&temp, "SELECT 1;").unwrap();

        let mut pool = ProcessPool::new();
        pool.teardown();
        let err = pool.spawn("true", Some(temp.clone())).unwrap_err();
        assert!(matches!(err, EnvError::SessionClosed));
        assert!(pool.is_empty());
        assert!(!temp.exists());
    }

    #[test]
    fn failed_spawn_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("watch.sql");
        fs::write(&temp, "SELECT 1;").unwrap();

        let mut pool = ProcessPool::new();
        let missing = dir.path().join("no-such-terminal");
        let err = pool
            .spawn_with(&mut Command::new(&missing), "no-such-terminal", Some(temp.clone()))
            .unwrap_err();
        assert!(matches!(err, EnvError::Spawn { .. }));
        assert!(pool.is_empty());
        assert!(!temp.exists());
    }
}
