//! ---
//! ncs_section: "01-core-functionality"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Application discovery, consoles, and lifecycle management."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
use super::{AppConsole, AppContext};
use crate::error::{AppError, Result};

/// Passes its input to the database verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct PsqlConsole;

impl AppConsole for PsqlConsole {
    fn execute(&mut self, ctx: &mut AppContext<'_>, line: &str) -> Result<String> {
        let sql = line.trim();
        if sql.is_empty() {
            return Err(AppError::command("psql", "usage: psql <statement>"));
        }
        ctx.db
            .execute(sql)
            .map_err(|err| AppError::command("psql", err.to_string()))
    }

    fn help(&self, _topic: &str) -> String {
        "psql <statement>: run a SQL statement against the database".to_owned()
    }
}
