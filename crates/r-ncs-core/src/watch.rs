//! ---
//! ncs_section: "01-core-functionality"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Session environment and startup orchestration."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{EnvError, Result};

const DEFAULT_MAX_ROWS: u32 = 20;

/// One `<table>[,<max_rows>]` argument of `watch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub table: String,
    pub max_rows: u32,
}

impl FromStr for WatchTarget {
    type Err = EnvError;

    fn from_str(arg: &str) -> Result<Self> {
        let invalid = || EnvError::InvalidWatch(arg.to_owned());
        let (table, rows) = match arg.split_once(',') {
            Some((table, rows)) => (table, Some(rows)),
            None => (arg, None),
        };
        let valid_ident = !table.is_empty()
            && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !table.starts_with(|c: char| c.is_ascii_digit());
        if !valid_ident {
            return Err(invalid());
        }
        let max_rows = match rows {
            Some(rows) => rows
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(invalid)?,
            None => DEFAULT_MAX_ROWS,
        };
        Ok(Self {
            table: table.to_owned(),
            max_rows,
        })
    }
}

/// A terminal command watching tables, plus the query file it reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchCommand {
    pub command: String,
    pub query_file: PathBuf,
}

impl WatchCommand {
    /// Write the query file for `targets` into `temp_dir` and build the
    /// terminal command that refreshes it against `database` as `user`.
    pub fn build(
        terminal: &str,
        database: &str,
        user: &str,
        targets: &[WatchTarget],
        temp_dir: &Path,
    ) -> Result<Self> {
        if targets.is_empty() {
            return Err(EnvError::InvalidWatch(String::new()));
        }
        let io_err = |source: std::io::Error| EnvError::Spawn {
            command: "watch".to_owned(),
            source,
        };
        let mut file = tempfile::Builder::new()
            .prefix("ncs-watch-")
            .suffix(".sql")
            .tempfile_in(temp_dir)
            .map_err(io_err)?;
        for target in targets {
            writeln!(file, "\\echo {}", target.table).map_err(io_err)?;
            writeln!(
                file,
                "SELECT * FROM {} LIMIT {};",
                target.table, target.max_rows
            )
            .map_err(io_err)?;
        }
        let (_, query_file) = file.keep().map_err(|err| io_err(err.error))?;
        let command = format!(
            "{terminal} watch -n 1 psql -X -q -d {database} -U {user} -f {}",
            query_file.display()
        );
        Ok(Self {
            command,
            query_file,
        })
    }
}
