//! ---
//! ncs_section: "01-core-functionality"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Application discovery, consoles, and lifecycle management."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
use std::path::PathBuf;

use r_ncs_db::DbError;
use thiserror::Error;

/// Result alias for application operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Errors raised while discovering, loading, or driving applications.
#[derive(Debug, Error)]
pub enum AppError {
    /// An application directory is missing or unreadable.
    #[error("cannot scan application directory {path}: {reason}")]
    Discovery { path: PathBuf, reason: String },
    /// No application with this name was discovered.
    #[error("unknown application '{0}'")]
    UnknownApplication(String),
    /// The application's own load routine failed.
    #[error("failed to load application '{name}': {source}")]
    ApplicationLoad {
        name: String,
        #[source]
        source: DbError,
    },
    /// Core applications cannot be unloaded.
    #[error("cannot unload core application '{0}'")]
    ProtectedApplication(String),
    /// A manifest file could not be read or parsed.
    #[error("invalid manifest {path}: {reason}")]
    Manifest { path: PathBuf, reason: String },
    /// An application rejected or failed a console command.
    #[error("{app}: {reason}")]
    Command { app: String, reason: String },
}

impl AppError {
    pub(crate) fn command(app: &str, reason: impl Into<String>) -> Self {
        Self::Command {
            app: app.to_owned(),
            reason: reason.into(),
        }
    }
}
