//! ---
//! ncs_section: "01-core-functionality"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Application discovery, consoles, and lifecycle management."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
use indexmap::IndexMap;
use tracing::debug;

use super::{split_command, AppConsole, AppContext};
use crate::error::{AppError, Result};
use crate::manifest::CommandSpec;

/// Console running the SQL templates declared in an application manifest.
#[derive(Debug, Clone)]
pub struct ScriptedConsole {
    app: String,
    commands: IndexMap<String, CommandSpec>,
}

impl ScriptedConsole {
    pub fn new(app: &str, commands: IndexMap<String, CommandSpec>) -> Self {
        Self {
            app: app.to_owned(),
            commands,
        }
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }
}

impl AppConsole for ScriptedConsole {
    fn execute(&mut self, ctx: &mut AppContext<'_>, line: &str) -> Result<String> {
        let (command, args) = split_command(line);
        if command.is_empty() {
            return Err(AppError::command(&self.app, "missing command"));
        }
        let spec = self
            .commands
            .get(command)
            .ok_or_else(|| AppError::command(&self.app, format!("unknown command '{command}'")))?;
        let sql = spec.render(args);
        debug!(app = %self.app, command, %sql, "running scripted command");
        ctx.db
            .execute(&sql)
            .map_err(|err| AppError::command(&self.app, err.to_string()))
    }

    fn help(&self, topic: &str) -> String {
        let topic = topic.trim();
        if topic.is_empty() {
            if self.commands.is_empty() {
                return format!("{} has no commands", self.app);
            }
            return self
                .commands
                .iter()
                .map(|(name, spec)| match &spec.help {
                    Some(help) => format!("  {name}: {help}"),
                    None => format!("  {name}"),
                })
                .collect::<Vec<_>>()
                .join("\n");
        }
        match self.commands.get(topic) {
            Some(CommandSpec { help: Some(help), .. }) => help.clone(),
            Some(spec) => spec.sql.clone(),
            None => format!("*** No help on {topic}"),
        }
    }
}
