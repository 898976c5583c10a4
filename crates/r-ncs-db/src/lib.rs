//! ---
//! ncs_section: "03-persistence-logging"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Topology database interface and implementations."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
//! Connection abstraction over the relational engine that stores topology,
//! flow, and application state.
#![warn(missing_docs)]

use std::path::{Path, PathBuf};

use r_ncs_common::config::{DatabaseBackend, DatabaseConfig};
use r_ncs_net::NetworkProvider;
use strum::Display;
use tracing::{info, warn};

pub mod memory;
pub mod psql;

pub use memory::{DbOp, MemoryDatabase, TriggerEvent};
pub use psql::PsqlDatabase;

/// Tables populated by the topology bulk load; `truncate` never touches them.
pub const TOPOLOGY_TABLES: &[&str] = &["switches", "hosts", "tp"];

/// Result alias used throughout the database crate.
pub type Result<T> = std::result::Result<T, DbError>;

/// Errors raised by database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Wrapper for IO errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// A schema file referenced by the caller does not exist.
    #[error("schema file {0} not found")]
    MissingSchema(PathBuf),
    /// The database client reported a failure.
    #[error("database command failed ({status}): {stderr}")]
    Command {
        /// Exit status description.
        status: String,
        /// Captured client stderr.
        stderr: String,
    },
}

/// Whether the session starts from a freshly initialised database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum DbState {
    /// Base schema was just (re)installed; no prior session data.
    Fresh,
    /// Connected to pre-existing data which is trusted as-is.
    Reconnected,
}

impl DbState {
    /// Map the `reconnect` configuration flag to a state.
    pub fn from_reconnect(reconnect: bool) -> Self {
        if reconnect {
            Self::Reconnected
        } else {
            Self::Fresh
        }
    }

    /// True for a freshly initialised database.
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Fresh)
    }
}

/// Connection to the topology database.
pub trait Database {
    /// Database name.
    fn name(&self) -> &str;

    /// Role used to connect.
    fn user(&self) -> &str;

    /// Fresh or reconnected; fixed for the lifetime of the connection.
    fn state(&self) -> DbState;

    /// Delete all data except topology.
    fn truncate(&mut self) -> Result<()>;

    /// Install the SQL file at `path`.
    fn load_schema(&mut self, path: &Path) -> Result<()>;

    /// Bulk-load the provider's current topology into the topology tables.
    fn load_topo(&mut self, provider: &dyn NetworkProvider) -> Result<()>;

    /// Run a statement and return the client's textual output.
    fn execute(&mut self, sql: &str) -> Result<String>;

    /// Statements issued since the connection opened.
    fn statements_issued(&self) -> u64;
}

/// Open the configured backend and install the base schema on a fresh database.
pub fn open_database(config: &DatabaseConfig) -> Result<Box<dyn Database>> {
    let state = DbState::from_reconnect(config.reconnect);
    let mut db: Box<dyn Database> = match config.backend {
        DatabaseBackend::Memory => Box::new(MemoryDatabase::new(&config.name, &config.user, state)),
        DatabaseBackend::Psql => Box::new(PsqlDatabase::new(
            &config.name,
            &config.user,
            config.password(),
            state,
        )),
    };

    if state.is_clean() {
        if config.base_schema.exists() {
            db.load_schema(&config.base_schema)?;
        } else if config.backend == DatabaseBackend::Psql {
            return Err(DbError::MissingSchema(config.base_schema.clone()));
        } else {
            warn!(path = %config.base_schema.display(), "base schema missing; starting with an empty journal");
        }
    }
    info!(backend = %config.backend, database = %config.name, %state, "database connected");
    Ok(db)
}
