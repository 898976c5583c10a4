//! ---
//! ncs_section: "05-networking-external-interfaces"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Network provider interface and topology model."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
//! The network side of the console: a provider that can be started and
//! stopped and exposes a topology snapshot, plus the controller probe used to
//! refuse a double start.
#![warn(missing_docs)]

pub mod controller;
pub mod provider;
pub mod topology;

pub use controller::ControllerProbe;
pub use provider::{provider_from_config, CommandProvider, NetworkProvider, OfflineProvider};
pub use topology::{Link, Node, Topology, TopologySpec};

/// Result alias used throughout the network crate.
pub type Result<T> = std::result::Result<T, NetError>;

/// Errors raised by topology construction and provider lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// The topology spec string could not be parsed or is out of range.
    #[error("invalid topology '{spec}': {reason}")]
    InvalidTopology {
        /// Spec string as configured.
        spec: String,
        /// Why it was rejected.
        reason: String,
    },
    /// An external provider command failed to launch or exited non-zero.
    #[error("provider command '{command}' failed: {reason}")]
    Command {
        /// Command line that was run.
        command: String,
        /// Failure description.
        reason: String,
    },
    /// Wrapper for IO errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
