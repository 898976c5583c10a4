//! ---
//! ncs_section: "01-core-functionality"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Shared primitives and utilities for the console runtime."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
//! Core shared primitives for the R-NCS workspace.
//! This crate exposes configuration loading, tracing initialisation, and
//! time helpers consumed across the workspace.

pub mod config;
pub mod logging;
pub mod time;

pub use config::{
    AppConfig, AppsConfig, ConsoleConfig, ControllerConfig, DatabaseBackend, DatabaseConfig,
    LoadedAppConfig, LoggingConfig, NetworkConfig, NetworkMode, ResourceConfig,
};
pub use logging::{init_tracing, LogFormat};
