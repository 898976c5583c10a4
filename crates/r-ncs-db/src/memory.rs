//! ---
//! ncs_section: "03-persistence-logging"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Topology database interface and implementations."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use r_ncs_net::NetworkProvider;
use tracing::debug;

use crate::{Database, DbError, DbState, Result, TOPOLOGY_TABLES};

/// One operation recorded by the in-memory database, in issue order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbOp {
    /// All non-topology tables were emptied.
    Truncate,
    /// A schema file was installed.
    LoadSchema(PathBuf),
    /// The topology bulk load ran.
    LoadTopo {
        /// Switch rows written.
        switches: usize,
        /// Host rows written.
        hosts: usize,
        /// Link rows written.
        links: usize,
    },
    /// A statement was executed.
    Execute(String),
}

/// A trigger reacting to rows written into its table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEvent {
    /// Trigger name as declared in the schema.
    pub trigger: String,
    /// Table the trigger is attached to.
    pub table: String,
}

#[derive(Debug, Default)]
struct MemoryState {
    journal: Vec<DbOp>,
    tables: IndexMap<String, u64>,
    triggers: IndexMap<String, String>,
    fired: Vec<TriggerEvent>,
    statements: u64,
}

impl MemoryState {
    fn insert_rows(&mut self, table: &str, rows: u64) {
        *self.tables.entry(table.to_owned()).or_default() += rows;
        for (trigger, target) in &self.triggers {
            if target == table {
                for _ in 0..rows {
                    self.fired.push(TriggerEvent {
                        trigger: trigger.clone(),
                        table: table.to_owned(),
                    });
                }
            }
        }
    }

    fn apply_statement(&mut self, statement: &str) -> String {
        let words: Vec<String> = statement
            .split_whitespace()
            .map(|w| w.trim_matches(|c| c == '(' || c == ';').to_owned())
            .collect();
        let upper: Vec<String> = words.iter().map(|w| w.to_ascii_uppercase()).collect();
        let upper: Vec<&str> = upper.iter().map(String::as_str).collect();

        match upper.as_slice() {
            ["CREATE", "TABLE", rest @ ..] => {
                let name = table_name(rest, &words[2..]);
                self.tables.entry(name.clone()).or_default();
                format!("CREATE TABLE {name}")
            }
            ["CREATE", ..] if upper.contains(&"TRIGGER") => {
                let Some(pos) = upper.iter().position(|w| *w == "TRIGGER") else {
                    return String::new();
                };
                let Some(name) = words.get(pos + 1) else {
                    return String::new();
                };
                let table = upper
                    .iter()
                    .enumerate()
                    .skip(pos + 2)
                    .find(|(_, w)| **w == "ON")
                    .and_then(|(idx, _)| words.get(idx + 1))
                    .map(|t| t.to_ascii_lowercase());
                if let Some(table) = table {
                    self.triggers.insert(name.to_ascii_lowercase(), table);
                }
                "CREATE TRIGGER".to_owned()
            }
            ["INSERT", "INTO", table, ..] => {
                self.insert_rows(&table.to_ascii_lowercase(), 1);
                "INSERT 0 1".to_owned()
            }
            ["DROP", "TABLE", rest @ ..] => {
                let name = table_name(rest, &words[2..]);
                self.tables.shift_remove(&name);
                self.triggers.retain(|_, table| *table != name);
                "DROP TABLE".to_owned()
            }
            ["DROP", "TRIGGER", rest @ ..] => {
                let name = table_name(rest, &words[2..]);
                self.triggers.shift_remove(&name);
                "DROP TRIGGER".to_owned()
            }
            ["SELECT", ..] => {
                let rows = upper
                    .iter()
                    .position(|w| *w == "FROM")
                    .and_then(|idx| words.get(idx + 1))
                    .and_then(|t| self.tables.get(&t.to_ascii_lowercase()).copied())
                    .unwrap_or(0);
                format!("({rows} rows)")
            }
            _ => "OK".to_owned(),
        }
    }
}

fn table_name(upper_rest: &[&str], words_rest: &[String]) -> String {
    let skip = match upper_rest {
        ["IF", "NOT", "EXISTS", ..] => 3,
        ["IF", "EXISTS", ..] => 2,
        _ => 0,
    };
    words_rest
        .get(skip)
        .map(|w| w.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Split a SQL document into statements, dropping `--` comments.
fn statements(sql: &str) -> Vec<String> {
    let stripped = sql
        .lines()
        .map(|line| line.split("--").next().unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n");
    stripped
        .split(';')
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect()
}

/// In-process database keeping an ordered journal, per-table row counts and
/// the trigger events fired by writes. Clones share the same state.
#[derive(Debug, Clone)]
pub struct MemoryDatabase {
    name: String,
    user: String,
    state: DbState,
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryDatabase {
    pub fn new(name: &str, user: &str, state: DbState) -> Self {
        Self {
            name: name.to_owned(),
            user: user.to_owned(),
            state,
            inner: Arc::new(Mutex::new(MemoryState::default())),
        }
    }

    /// Operations issued so far, oldest first.
    pub fn journal(&self) -> Vec<DbOp> {
        self.inner.lock().journal.clone()
    }

    /// Trigger events fired so far, oldest first.
    pub fn fired_triggers(&self) -> Vec<TriggerEvent> {
        self.inner.lock().fired.clone()
    }

    /// Row count of `table`, or `None` when the table was never created or written.
    pub fn row_count(&self, table: &str) -> Option<u64> {
        self.inner.lock().tables.get(table).copied()
    }

    /// Names of the installed triggers.
    pub fn triggers(&self) -> Vec<String> {
        self.inner.lock().triggers.keys().cloned().collect()
    }
}

impl Database for MemoryDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    fn user(&self) -> &str {
        &self.user
    }

    fn state(&self) -> DbState {
        self.state
    }

    fn truncate(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        for (table, rows) in inner.tables.iter_mut() {
            if !TOPOLOGY_TABLES.contains(&table.as_str()) {
                *rows = 0;
            }
        }
        inner.journal.push(DbOp::Truncate);
        inner.statements += 1;
        Ok(())
    }

    fn load_schema(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(DbError::MissingSchema(path.to_path_buf()));
        }
        let sql = fs::read_to_string(path)?;
        let mut inner = self.inner.lock();
        let mut count = 0;
        for statement in statements(&sql) {
            inner.apply_statement(&statement);
            count += 1;
        }
        debug!(path = %path.display(), statements = count, "schema installed");
        inner.journal.push(DbOp::LoadSchema(path.to_path_buf()));
        inner.statements += 1;
        Ok(())
    }

    fn load_topo(&mut self, provider: &dyn NetworkProvider) -> Result<()> {
        let topology = provider.topology();
        let mut inner = self.inner.lock();
        inner.insert_rows("switches", topology.switches.len() as u64);
        inner.insert_rows("hosts", topology.hosts.len() as u64);
        inner.insert_rows("tp", topology.links.len() as u64);
        inner.journal.push(DbOp::LoadTopo {
            switches: topology.switches.len(),
            hosts: topology.hosts.len(),
            links: topology.links.len(),
        });
        inner.statements += 1;
        Ok(())
    }

    fn execute(&mut self, sql: &str) -> Result<String> {
        let mut inner = self.inner.lock();
        let output = statements(sql)
            .iter()
            .map(|statement| inner.apply_statement(statement))
            .collect::<Vec<_>>()
            .join("\n");
        inner.journal.push(DbOp::Execute(sql.trim().to_owned()));
        inner.statements += 1;
        Ok(output)
    }

    fn statements_issued(&self) -> u64 {
        self.inner.lock().statements
    }
}
