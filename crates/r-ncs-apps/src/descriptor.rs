//! ---
//! ncs_section: "01-core-functionality"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Application discovery, consoles, and lifecycle management."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use r_ncs_db::Database;
use r_ncs_logging::{ncs_debug, ncs_warn, LogContext};
use strum::Display;

use crate::consoles::{console_for, AppConsole};
use crate::error::{AppError, Result};
use crate::manifest::AppManifest;
use crate::{MANIFEST_EXTENSION, SCHEMA_EXTENSION};

/// Lifecycle of a discovered application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
#[strum(serialize_all = "lowercase")]
pub enum LifecycleState {
    Discovered,
    Initialized,
    Loaded,
}

/// Registry record of one application.
#[derive(Debug)]
pub struct AppDescriptor {
    name: String,
    shortcut: Option<String>,
    description: Option<String>,
    source_paths: IndexSet<PathBuf>,
    state: LifecycleState,
    manifest: Option<AppManifest>,
    console: Option<Box<dyn AppConsole>>,
}

impl AppDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shortcut: None,
            description: None,
            source_paths: IndexSet::new(),
            state: LifecycleState::Discovered,
            manifest: None,
            console: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shortcut(&self) -> Option<&str> {
        self.shortcut.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn source_paths(&self) -> impl Iterator<Item = &Path> {
        self.source_paths.iter().map(PathBuf::as_path)
    }

    pub fn manifest_path(&self) -> Option<&Path> {
        self.path_with_extension(MANIFEST_EXTENSION)
    }

    pub fn schema_path(&self) -> Option<&Path> {
        self.path_with_extension(SCHEMA_EXTENSION)
    }

    fn path_with_extension(&self, ext: &str) -> Option<&Path> {
        self.source_paths
            .iter()
            .rev()
            .find(|path| path.extension().and_then(|e| e.to_str()) == Some(ext))
            .map(PathBuf::as_path)
    }

    /// Link a backing file. Returns `true` when the path was not linked yet.
    /// A file of an already-linked kind replaces the previous one.
    pub fn link(&mut self, path: PathBuf) -> bool {
        if self.source_paths.contains(&path) {
            return false;
        }
        let ext = path.extension().map(|e| e.to_os_string());
        self.source_paths
            .retain(|existing| existing.extension().map(|e| e.to_os_string()) != ext);
        let is_manifest = ext.as_deref().and_then(|e| e.to_str()) == Some(MANIFEST_EXTENSION);
        self.source_paths.insert(path);
        if is_manifest && self.state != LifecycleState::Discovered {
            self.refresh_manifest();
        }
        true
    }

    /// One-time initialisation after discovery: parse the manifest and bind
    /// the console. Repeated calls are no-ops.
    pub fn init(&mut self) {
        if self.state != LifecycleState::Discovered {
            return;
        }
        self.refresh_manifest();
        self.state = LifecycleState::Initialized;
        ncs_debug!(
            context = LogContext::new().with_app(&self.name),
            "application initialized from {} file(s)",
            self.source_paths.len()
        );
    }

    fn refresh_manifest(&mut self) {
        let Some(path) = self.manifest_path().map(Path::to_path_buf) else {
            return;
        };
        match AppManifest::from_path(&path) {
            Ok(manifest) => self.apply_manifest(manifest),
            Err(err) => ncs_warn!(
                context = LogContext::new().with_app(&self.name),
                "{err}"
            ),
        }
    }

    fn apply_manifest(&mut self, manifest: AppManifest) {
        self.shortcut = manifest.shortcut.clone();
        self.description = manifest.description.clone();
        self.console = Some(console_for(&self.name, &manifest));
        self.manifest = Some(manifest);
    }

    /// Whether the application defines runnable logic.
    pub fn is_loadable(&self) -> bool {
        self.manifest_path().is_some()
    }

    /// Install the application's database objects.
    pub(crate) fn load(&mut self, db: &mut dyn Database) -> Result<()> {
        if let Some(path) = self.manifest_path().map(Path::to_path_buf) {
            if self.manifest.is_none() {
                self.apply_manifest(AppManifest::from_path(&path)?);
            }
        }
        if let Some(schema) = self.schema_path().map(Path::to_path_buf) {
            db.load_schema(&schema)
                .map_err(|source| AppError::ApplicationLoad {
                    name: self.name.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Reverse [`AppDescriptor::load`] by running the manifest's unload statements.
    pub(crate) fn unload(&mut self, db: &mut dyn Database) -> Result<()> {
        let statements = self
            .manifest
            .as_ref()
            .map(|m| m.unload_sql.clone())
            .unwrap_or_default();
        for sql in statements {
            db.execute(&sql).map_err(|err| AppError::command(&self.name, err.to_string()))?;
        }
        Ok(())
    }

    pub(crate) fn set_state(&mut self, state: LifecycleState) {
        self.state = state;
    }

    pub fn console(&self) -> Option<&dyn AppConsole> {
        self.console.as_deref()
    }

    pub fn console_mut(&mut self) -> Option<&mut (dyn AppConsole + 'static)> {
        self.console.as_deref_mut()
    }
}
