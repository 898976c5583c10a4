//! ---
//! ncs_section: "06-user-interfaces"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Interactive console: dispatcher and session loop."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
use r_ncs_apps::AppError;
use r_ncs_core::EnvError;
use r_ncs_persistence::PersistenceError;
use thiserror::Error;

/// Failure of a single console command. Never ends the session.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Env(#[from] EnvError),
    #[error(transparent)]
    App(#[from] AppError),
    #[error("command log: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
    /// Wrong arguments for a built-in command.
    #[error("{0}")]
    Usage(&'static str),
}
