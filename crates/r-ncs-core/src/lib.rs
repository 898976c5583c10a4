//! ---
//! ncs_section: "01-core-functionality"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Session environment and startup orchestration."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
//! The session environment.
//!
//! [`Environment`] owns the database connection, the network provider, the
//! application lifecycle manager and the pool of supervised helper processes.
//! `start` runs the schema installation sequence and loads the core
//! applications; `stop` tears everything down exactly once.

pub mod environment;
pub mod error;
pub mod process;
pub mod schema;
pub mod watch;

pub use environment::{Environment, CORE_APPS};
pub use error::{EnvError, Result};
pub use process::{ProcessPool, TeardownReport};
pub use schema::{render_schema, SchemaOrchestrator, SchemaStep, RESOURCE_PLACEHOLDER};
pub use watch::{WatchCommand, WatchTarget};
