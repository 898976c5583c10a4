//! ---
//! ncs_section: "01-core-functionality"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Application discovery, consoles, and lifecycle management."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
use tracing::info;

use super::{split_command, AppConsole, AppContext, ScriptedConsole};
use crate::error::{AppError, Result};

/// Orchestration console. `run` executes the manifest's `run` command; other
/// manifest commands pass through unchanged.
#[derive(Debug, Clone)]
pub struct OrchConsole {
    auto: bool,
    scripted: ScriptedConsole,
}

impl OrchConsole {
    pub fn new(scripted: ScriptedConsole) -> Self {
        Self {
            auto: false,
            scripted,
        }
    }
}

impl AppConsole for OrchConsole {
    fn execute(&mut self, ctx: &mut AppContext<'_>, line: &str) -> Result<String> {
        match split_command(line) {
            ("auto", arg) => {
                match arg.to_ascii_lowercase().as_str() {
                    "on" => self.auto = true,
                    "off" => self.auto = false,
                    _ => return Err(AppError::command("orch", "usage: auto on|off")),
                }
                info!(auto = self.auto, "auto-orchestration toggled");
                Ok(format!("auto-orchestration {}", if self.auto { "on" } else { "off" }))
            }
            ("status", _) => Ok(format!(
                "auto-orchestration {}",
                if self.auto { "on" } else { "off" }
            )),
            ("run", _) if !self.scripted.has_command("run") => {
                Err(AppError::command("orch", "no run statement configured"))
            }
            _ => self.scripted.execute(ctx, line),
        }
    }

    fn help(&self, topic: &str) -> String {
        match topic.trim() {
            "" => format!(
                "  auto: auto on|off, run orchestration after every application command\n  status: show auto mode\n{}",
                self.scripted.help("")
            ),
            "auto" => "auto on|off: run orchestration after every application command".to_owned(),
            "status" => "status: show auto mode".to_owned(),
            other => self.scripted.help(other),
        }
    }

    fn auto(&self) -> Option<bool> {
        Some(self.auto)
    }
}
