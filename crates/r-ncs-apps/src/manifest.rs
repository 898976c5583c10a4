//! ---
//! ncs_section: "01-core-functionality"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Application discovery, consoles, and lifecycle management."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
//! On-disk control-logic manifest (`<name>.toml`).
//!
//! ```toml
//! shortcut = "fw"
//! description = "Firewall application"
//! unload_sql = ["DROP TABLE IF EXISTS fw_policy;"]
//!
//! [commands.addflow]
//! sql = "INSERT INTO fw_policy VALUES ({args});"
//! help = "addflow <src> <dst>: permit traffic between two hosts"
//! ```

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use strum::{Display, EnumString};

use crate::error::{AppError, Result};

/// Native console bound to an application instead of the scripted default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Handler {
    /// Forwards SQL to the database.
    Psql,
    /// Inspects the network provider's topology.
    Mn,
    /// Orchestration trigger with an `auto` mode.
    Orch,
}

/// A named command executed as a SQL template.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandSpec {
    /// SQL run by the command; `{args}` is replaced with the argument text.
    pub sql: String,
    #[serde(default)]
    pub help: Option<String>,
}

impl CommandSpec {
    /// Render the statement for `args`.
    pub fn render(&self, args: &str) -> String {
        self.sql.replace("{args}", args.trim())
    }
}

/// Parsed application manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AppManifest {
    #[serde(default)]
    pub shortcut: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub handler: Option<Handler>,
    /// Statements run by `unload`.
    #[serde(default)]
    pub unload_sql: Vec<String>,
    #[serde(default)]
    pub commands: IndexMap<String, CommandSpec>,
}

impl AppManifest {
    pub fn from_path(path: &Path) -> Result<Self> {
        let invalid = |reason: String| AppError::Manifest {
            path: path.to_path_buf(),
            reason,
        };
        let contents = fs::read_to_string(path).map_err(|err| invalid(err.to_string()))?;
        let manifest: AppManifest =
            toml::from_str(&contents).map_err(|err| invalid(err.to_string()))?;
        if let Some(shortcut) = &manifest.shortcut {
            if shortcut.trim().is_empty() || shortcut.contains(char::is_whitespace) {
                return Err(invalid(format!("shortcut '{shortcut}' must be a single word")));
            }
        }
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fw.toml");
        fs::write(
            &path,
            r#"
            shortcut = "fw"
            description = "Firewall"
            unload_sql = ["DROP TABLE IF EXISTS fw_policy;"]

            [commands.addflow]
            sql = "INSERT INTO fw_policy VALUES ({args});"
            help = "addflow <src> <dst>"
            "#,
        )
        .unwrap();
        let manifest = AppManifest::from_path(&path).unwrap();
        assert_eq!(manifest.shortcut.as_deref(), Some("fw"));
        assert_eq!(manifest.handler, None);
        assert_eq!(manifest.unload_sql.len(), 1);
        assert_eq!(
            manifest.commands["addflow"].render(" 1, 2 "),
            "INSERT INTO fw_policy VALUES (1, 2);"
        );
    }

    #[test]
    fn handler_is_parsed_lowercase() {
        let manifest: AppManifest = toml::from_str("handler = \"orch\"").unwrap();
        assert_eq!(manifest.handler, Some(Handler::Orch));
        assert_eq!(Handler::Mn.to_string(), "mn");
    }

    #[test]
    fn rejects_multiword_shortcut_and_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "shortcut = \"a b\"").unwrap();
        assert!(matches!(
            AppManifest::from_path(&path),
            Err(AppError::Manifest { .. })
        ));
        fs::write(&path, "shortcut = ").unwrap();
        assert!(AppManifest::from_path(&path).is_err());
    }
}
