//! ---
//! ncs_section: "05-networking-external-interfaces"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Network provider interface and topology model."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Looks for an already running SDN controller through its pid file.
#[derive(Debug, Clone)]
pub struct ControllerProbe {
    pid_file: PathBuf,
}

impl ControllerProbe {
    pub fn new(pid_file: impl Into<PathBuf>) -> Self {
        Self {
            pid_file: pid_file.into(),
        }
    }

    pub fn pid_file(&self) -> &Path {
        &self.pid_file
    }

    /// Pid of a live controller, if the pid file names one.
    pub fn running_pid(&self) -> Option<u32> {
        let raw = fs::read_to_string(&self.pid_file).ok()?;
        // pid 0 would address the caller's own process group
        let pid = raw.trim().parse::<u32>().ok().filter(|&pid| pid != 0)?;
        let alive = is_process_alive(pid);
        debug!(pid, alive, pid_file = %self.pid_file.display(), "controller probe");
        alive.then_some(pid)
    }

    pub fn is_running(&self) -> bool {
        self.running_pid().is_some()
    }
}

#[cfg(unix)]
fn is_process_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // kill(pid, 0) checks existence without sending a signal
    if unsafe { libc::kill(pid, 0) } == 0 {
        return true;
    }
    // EPERM: the process exists but belongs to another user
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
fn is_process_alive(_pid: u32) -> bool {
    true
}
