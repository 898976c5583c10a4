//! ---
//! ncs_section: "03-persistence-logging"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Persistence abstractions and storage bindings."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
#![warn(missing_docs)]

/// Result alias used throughout the persistence crate.
pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Error type for the persistence subsystem.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Wrapper for IO errors encountered while reading/writing persistence files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// A command log entry could not be parsed back.
    #[error("malformed command log line {line}: {content}")]
    Malformed {
        /// One-based line number in the log file.
        line: usize,
        /// Offending line content.
        content: String,
    },
}

pub mod command_log;

pub use command_log::{read_records, CommandLogWriter, CommandRecord};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_error_display() {
        let err = PersistenceError::Malformed {
            line: 3,
            content: "bogus".into(),
        };
        assert_eq!(format!("{err}"), "malformed command log line 3: bogus");
    }
}
