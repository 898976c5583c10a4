//! ---
//! ncs_section: "01-core-functionality"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Application discovery, consoles, and lifecycle management."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
//! Pluggable control applications.
//!
//! Applications are discovered from a list of directories ([`AppRegistry`]),
//! bound to a console that executes their commands ([`AppConsole`]), and
//! loaded or unloaded against the database by the [`LifecycleManager`].

pub mod consoles;
pub mod descriptor;
pub mod error;
pub mod lifecycle;
pub mod manifest;
pub mod registry;

pub use consoles::{console_for, AppConsole, AppContext};
pub use descriptor::{AppDescriptor, LifecycleState};
pub use error::{AppError, Result};
pub use lifecycle::{LifecycleManager, LoadOutcome};
pub use manifest::{AppManifest, CommandSpec, Handler};
pub use registry::{AppRegistry, DiscoveryReport};

/// File extension of an application's control-logic manifest.
pub const MANIFEST_EXTENSION: &str = "toml";
/// File extension of an application's schema file.
pub const SCHEMA_EXTENSION: &str = "sql";
