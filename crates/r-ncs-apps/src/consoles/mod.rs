//! ---
//! ncs_section: "01-core-functionality"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Application discovery, consoles, and lifecycle management."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
//! Per-application command handlers.

use std::fmt::Debug;

use r_ncs_db::Database;
use r_ncs_net::NetworkProvider;

use crate::error::Result;
use crate::manifest::{AppManifest, Handler};

mod mn;
mod orch;
mod psql;
mod scripted;

pub use mn::MnConsole;
pub use orch::OrchConsole;
pub use psql::PsqlConsole;
pub use scripted::ScriptedConsole;

/// Session resources an application command may act on.
pub struct AppContext<'a> {
    pub db: &'a mut dyn Database,
    pub provider: &'a dyn NetworkProvider,
}

/// Capability shared by every application console.
pub trait AppConsole: Debug {
    /// Execute `line` (the command text after the application key) and return
    /// whatever should be printed.
    fn execute(&mut self, ctx: &mut AppContext<'_>, line: &str) -> Result<String>;

    /// Help text for `topic`, or the command overview when `topic` is empty.
    fn help(&self, topic: &str) -> String;

    /// Auto-orchestration flag, for consoles that have one.
    fn auto(&self) -> Option<bool> {
        None
    }
}

/// Build the console selected by the manifest's `handler`.
pub fn console_for(name: &str, manifest: &AppManifest) -> Box<dyn AppConsole> {
    let scripted = ScriptedConsole::new(name, manifest.commands.clone());
    match manifest.handler {
        Some(Handler::Psql) => Box::new(PsqlConsole),
        Some(Handler::Mn) => Box::new(MnConsole),
        Some(Handler::Orch) => Box::new(OrchConsole::new(scripted)),
        None => Box::new(scripted),
    }
}

/// Split a command line at the first run of whitespace.
pub(crate) fn split_command(line: &str) -> (&str, &str) {
    let line = line.trim();
    match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim_start()),
        None => (line, ""),
    }
}
