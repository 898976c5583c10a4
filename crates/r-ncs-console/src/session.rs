//! ---
//! ncs_section: "06-user-interfaces"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Interactive console: dispatcher and session loop."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
use std::any::Any;
use std::io::{self, BufRead, Write};
use std::ops::{Deref, DerefMut};
use std::panic::{self, AssertUnwindSafe};

use r_ncs_core::Environment;
use r_ncs_logging::{log_system_event, LogContext, SystemEventOutcome};
use tracing::{info, warn};

use crate::dispatcher::Console;

/// Stops the wrapped environment when dropped, however the session ends.
pub struct TeardownGuard<'a> {
    env: &'a mut Environment,
}

impl<'a> TeardownGuard<'a> {
    pub fn new(env: &'a mut Environment) -> Self {
        Self { env }
    }
}

impl Deref for TeardownGuard<'_> {
    type Target = Environment;

    fn deref(&self) -> &Environment {
        self.env
    }
}

impl DerefMut for TeardownGuard<'_> {
    fn deref_mut(&mut self) -> &mut Environment {
        self.env
    }
}

impl Drop for TeardownGuard<'_> {
    fn drop(&mut self) {
        if let Some(report) = self.env.stop() {
            info!(
                reaped = report.reaped,
                files_removed = report.files_removed,
                "session torn down"
            );
        }
    }
}

/// Totals for a finished session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Non-empty lines executed.
    pub commands: u64,
    /// Times the read loop restarted after a crash.
    pub restarts: u32,
    /// `run` commands synthesized by auto-orchestration.
    pub auto_runs: u64,
}

/// Run the console until `exit` or end of input.
///
/// A panic inside a command is logged and the read loop restarts with the
/// same environment. The environment is stopped exactly once on return.
pub fn run_session<R: BufRead, W: Write>(
    env: &mut Environment,
    mut input: R,
    out: W,
) -> io::Result<SessionSummary> {
    supervise(Console::new(env, out), |console| console.cmdloop(&mut input))
}

/// Same as [`run_session`], reading from the controlling terminal with
/// command-name completion.
pub fn run_terminal_session(env: &mut Environment) -> io::Result<SessionSummary> {
    supervise(Console::new(env, io::stdout()), |console| {
        console.cmdloop_terminal()
    })
}

fn supervise<'e, W, F>(mut console: Console<'e, W>, mut read_loop: F) -> io::Result<SessionSummary>
where
    W: Write,
    F: FnMut(&mut Console<'e, W>) -> io::Result<()>,
{
    console.intro()?;

    let mut restarts = 0;
    loop {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| read_loop(&mut console)));
        match outcome {
            Ok(Ok(())) => break,
            Ok(Err(err)) => {
                warn!(error = %err, "console i/o failed; ending session");
                break;
            }
            Err(payload) => {
                restarts += 1;
                let reason = panic_message(payload.as_ref());
                warn!(restarts, reason = %reason, "console crashed; restarting");
                log_system_event(
                    Some(&LogContext::new().with_phase("session")),
                    "console_restart",
                    &reason,
                    SystemEventOutcome::Fault,
                );
            }
        }
    }

    let summary = SessionSummary {
        commands: console.commands(),
        restarts,
        auto_runs: console.auto_runs(),
    };
    drop(console);
    Ok(summary)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}
