//! ---
//! ncs_section: "06-user-interfaces"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Interactive console: dispatcher and session loop."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
//! Interactive console over a started [`r_ncs_core::Environment`].
//!
//! Lines resolve first against the built-in commands, then against the keys
//! of loaded applications; anything else is reported as unknown.

pub mod builtins;
pub mod dispatcher;
pub mod error;
pub mod line_editor;
pub mod session;

pub use builtins::Builtin;
pub use dispatcher::{Console, Control};
pub use error::ConsoleError;
pub use line_editor::{KeyOutcome, LineBuffer};
pub use session::{run_session, run_terminal_session, SessionSummary, TeardownGuard};

/// Heading of the built-in help listing.
pub const DOC_HEADER: &str = "Commands (type help <topic>):";
