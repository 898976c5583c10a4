//! ---
//! ncs_section: "01-core-functionality"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Session environment and startup orchestration."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
use r_ncs_apps::AppError;
use r_ncs_db::DbError;
use r_ncs_net::NetError;
use thiserror::Error;

/// Result alias for environment operations.
pub type Result<T> = std::result::Result<T, EnvError>;

/// Errors raised by the session environment.
#[derive(Debug, Error)]
pub enum EnvError {
    /// A schema installation step failed; the session cannot proceed.
    #[error("schema installation failed at {step}: {reason}")]
    SchemaInstall { step: String, reason: String },
    /// The network provider did not come up.
    #[error("network provider failed to start: {0}")]
    ProviderStart(#[source] NetError),
    /// Teardown has begun; no new supervised processes are accepted.
    #[error("session is closed")]
    SessionClosed,
    /// A controller is already running.
    #[error("controller already running (pid {pid}); shut it down first")]
    ControllerRunning { pid: u32 },
    /// A core application was discovered but has nothing to load.
    #[error("core application '{0}' is not loadable")]
    CoreAppNotLoadable(String),
    #[error(transparent)]
    App(#[from] AppError),
    #[error(transparent)]
    Db(#[from] DbError),
    /// A supervised process could not be launched.
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    /// Malformed `watch` arguments.
    #[error("invalid watch target '{0}'; usage: watch <table>[,<max_rows>] ...")]
    InvalidWatch(String),
}

impl EnvError {
    pub(crate) fn schema(step: impl Into<String>, reason: impl ToString) -> Self {
        Self::SchemaInstall {
            step: step.into(),
            reason: reason.to_string(),
        }
    }
}
