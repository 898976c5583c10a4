//! ---
//! ncs_section: "01-core-functionality"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Shared primitives and utilities for the console runtime."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use path_absolutize::Absolutize;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use strum::{Display, EnumString};
use tracing::debug;

use crate::logging::LogFormat;

/// Topology kinds understood by the network layer.
pub const TOPOLOGY_KINDS: &[&str] = &["single", "linear", "tree", "fattree"];

fn default_db_name() -> String {
    "ncs".to_owned()
}

fn default_db_user() -> String {
    "ncs".to_owned()
}

fn default_base_schema() -> PathBuf {
    PathBuf::from("resources/sql/base.sql")
}

fn default_topology() -> String {
    "single,3".to_owned()
}

fn default_pid_file() -> PathBuf {
    PathBuf::from("target/ncs/controller.pid")
}

fn default_app_directories() -> Vec<PathBuf> {
    vec![PathBuf::from("apps")]
}

fn default_resource_directory() -> PathBuf {
    PathBuf::from("resources")
}

fn default_schema_dir() -> PathBuf {
    PathBuf::from("resources/sql")
}

fn default_render_dir() -> PathBuf {
    PathBuf::from("target/ncs/schema")
}

fn default_prompt() -> String {
    "ncs> ".to_owned()
}

fn default_terminal() -> String {
    "xterm -e".to_owned()
}

fn default_profile_settle() -> Duration {
    Duration::from_millis(500)
}

fn default_command_log() -> PathBuf {
    PathBuf::from("target/ncs/commands.log")
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

/// Primary configuration object for the console runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub apps: AppsConfig,
    #[serde(default)]
    pub resources: ResourceConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "R_NCS_CONFIG";

    /// Load configuration from disk, respecting the `R_NCS_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.database.validate()?;
        self.network.validate()?;
        if self.apps.directories.is_empty() {
            return Err(anyhow!("at least one application directory must be configured"));
        }
        if self.console.terminal.trim().is_empty() {
            return Err(anyhow!("console terminal command must not be empty"));
        }
        Ok(())
    }

    /// Startup parameters shown by the console banner and the `stat` command.
    pub fn parameters(&self) -> IndexMap<String, String> {
        let mut params = IndexMap::new();
        params.insert("topology".to_owned(), self.network.topology.clone());
        params.insert(
            "controller".to_owned(),
            if self.controller.enabled { "running" } else { "offline" }.to_owned(),
        );
        params.insert(
            "network".to_owned(),
            match self.network.mode {
                NetworkMode::Offline => "offline",
                NetworkMode::Command => "running",
            }
            .to_owned(),
        );
        params.insert("database".to_owned(), self.database.name.clone());
        params.insert("username".to_owned(), self.database.user.clone());
        params.insert(
            "app path".to_owned(),
            self.apps
                .directories
                .iter()
                .map(|dir| dir.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        );
        params
    }

    /// Render [`AppConfig::parameters`] as an aligned, indented block.
    pub fn pprint(&self) -> String {
        let params = self.parameters();
        let pad = params.keys().map(|key| key.len()).max().unwrap_or(0) + 2;
        params
            .iter()
            .map(|(key, value)| format!("  {:<pad$} {}\n", format!("{key}:"), value, pad = pad))
            .collect()
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Database engine reached by the console.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Default, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DatabaseBackend {
    /// In-process journal database; nothing leaves the process.
    #[default]
    Memory,
    /// PostgreSQL reached through the `psql` client binary.
    Psql,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_name")]
    pub name: String,
    #[serde(default = "default_db_user")]
    pub user: String,
    #[serde(default)]
    pub password_env: Option<String>,
    #[serde(default)]
    pub reconnect: bool,
    #[serde(default = "default_base_schema")]
    pub base_schema: PathBuf,
    #[serde(default)]
    pub backend: DatabaseBackend,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            name: default_db_name(),
            user: default_db_user(),
            password_env: None,
            reconnect: false,
            base_schema: default_base_schema(),
            backend: DatabaseBackend::default(),
        }
    }
}

impl DatabaseConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(anyhow!("database name must not be empty"));
        }
        if self.user.trim().is_empty() {
            return Err(anyhow!("database user must not be empty"));
        }
        Ok(())
    }

    /// Resolve the password from the configured environment variable, if any.
    pub fn password(&self) -> Option<String> {
        self.password_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
    }
}

/// How the network provider is realised.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Default, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NetworkMode {
    /// No real networking; the topology only exists in the database.
    #[default]
    Offline,
    /// External commands start and stop the emulation backend.
    Command,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_topology")]
    pub topology: String,
    #[serde(default)]
    pub mode: NetworkMode,
    #[serde(default)]
    pub start_command: Option<String>,
    #[serde(default)]
    pub stop_command: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            topology: default_topology(),
            mode: NetworkMode::default(),
            start_command: None,
            stop_command: None,
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<()> {
        let kind = self
            .topology
            .split(',')
            .next()
            .map(str::trim)
            .unwrap_or_default();
        if !TOPOLOGY_KINDS.contains(&kind) {
            return Err(anyhow!(
                "unknown topology '{}'; expected one of {}",
                self.topology,
                TOPOLOGY_KINDS.join(", ")
            ));
        }
        if self.mode == NetworkMode::Command && self.start_command.is_none() {
            return Err(anyhow!("network mode 'command' requires start_command"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_pid_file")]
    pub pid_file: PathBuf,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            pid_file: default_pid_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppsConfig {
    #[serde(default = "default_app_directories")]
    pub directories: Vec<PathBuf>,
}

impl Default for AppsConfig {
    fn default() -> Self {
        Self {
            directories: default_app_directories(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    #[serde(default = "default_resource_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_schema_dir")]
    pub schema_dir: PathBuf,
    #[serde(default = "default_render_dir")]
    pub render_dir: PathBuf,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            directory: default_resource_directory(),
            schema_dir: default_schema_dir(),
            render_dir: default_render_dir(),
        }
    }
}

impl ResourceConfig {
    /// Absolute on-disk resource directory, as embedded into trigger bodies.
    pub fn resolved_directory(&self) -> Result<PathBuf> {
        let absolute = self.directory.absolutize().with_context(|| {
            format!(
                "unable to resolve resource directory {}",
                self.directory.display()
            )
        })?;
        Ok(absolute.into_owned())
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default = "default_prompt")]
    pub prompt: String,
    #[serde(default = "default_terminal")]
    pub terminal: String,
    #[serde(default = "default_profile_settle")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub profile_settle: Duration,
    #[serde(default = "default_command_log")]
    pub command_log: PathBuf,
    #[serde(default)]
    pub command_log_enabled: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            terminal: default_terminal(),
            profile_settle: default_profile_settle(),
            command_log: default_command_log(),
            command_log_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn empty_document_uses_defaults() {
        let config = AppConfig::from_str("").expect("defaults are valid");
        assert_eq!(config.database.name, "ncs");
        assert_eq!(config.network.topology, "single,3");
        assert_eq!(config.console.profile_settle, Duration::from_millis(500));
        assert_eq!(config.apps.directories, vec![PathBuf::from("apps")]);
    }

    #[test]
    fn parses_sections() {
        let config = AppConfig::from_str(
            r#"
            [database]
            name = "mininet"
            user = "ravel"
            reconnect = true
            backend = "psql"

            [network]
            topology = "fattree,4"

            [apps]
            directories = ["apps", "extra/apps"]

            [console]
            profile_settle = 250
            "#,
        )
        .expect("valid config");
        assert!(config.database.reconnect);
        assert_eq!(config.database.backend, DatabaseBackend::Psql);
        assert_eq!(config.apps.directories.len(), 2);
        assert_eq!(config.console.profile_settle, Duration::from_millis(250));
    }

    #[test]
    fn rejects_unknown_topology() {
        let err = AppConfig::from_str("[network]\ntopology = \"ring,3\"").unwrap_err();
        assert!(err.to_string().contains("unknown topology"));
    }

    #[test]
    fn rejects_empty_app_directories() {
        assert!(AppConfig::from_str("[apps]\ndirectories = []").is_err());
    }

    #[test]
    fn pprint_aligns_parameters() {
        let rendered = AppConfig::default().pprint();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "  topology:    single,3");
        assert_eq!(lines[1], "  controller:  offline");
        assert!(lines[5].starts_with("  app path:") && lines[5].ends_with(" apps"));
    }

    #[test]
    fn load_reports_inspected_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let err = AppConfig::load(&[missing.clone()]).unwrap_err();
        assert!(err.to_string().contains(&missing.display().to_string()));

        let present = dir.path().join("ncs.toml");
        fs::write(&present, "[database]\nname = \"lab\"\n").unwrap();
        let loaded = AppConfig::load_with_source(&[missing, present.clone()]).unwrap();
        assert_eq!(loaded.source, present);
        assert_eq!(loaded.config.database.name, "lab");
    }
}
