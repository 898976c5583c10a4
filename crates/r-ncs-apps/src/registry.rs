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

use indexmap::IndexMap;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::descriptor::AppDescriptor;
use crate::error::AppError;
use crate::{MANIFEST_EXTENSION, SCHEMA_EXTENSION};

/// Outcome of one discovery pass.
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Names of descriptors created by this pass.
    pub created: Vec<String>,
    /// Directories that were skipped.
    pub errors: Vec<AppError>,
}

/// Sole owner of the application descriptors found in the search path.
#[derive(Debug)]
pub struct AppRegistry {
    directories: Vec<PathBuf>,
    apps: IndexMap<String, AppDescriptor>,
}

impl AppRegistry {
    pub fn new(directories: Vec<PathBuf>) -> Self {
        Self {
            directories,
            apps: IndexMap::new(),
        }
    }

    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }

    /// Scan every directory, creating descriptors for new names and linking
    /// every matching file. Unreadable directories are skipped with a warning.
    pub fn discover(&mut self) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();
        for dir in self.directories.clone() {
            match scan_directory(&dir) {
                Ok(files) => {
                    for (name, path) in files {
                        let app = self.apps.entry(name.clone()).or_insert_with(|| {
                            report.created.push(name.clone());
                            AppDescriptor::new(name)
                        });
                        app.link(path);
                    }
                }
                Err(err) => {
                    warn!(error = %err, "skipping application directory");
                    report.errors.push(err);
                }
            }
        }

        for name in &report.created {
            if let Some(app) = self.apps.get_mut(name) {
                app.init();
            }
        }
        if !report.created.is_empty() {
            debug!(created = ?report.created, total = self.apps.len(), "applications discovered");
        }
        report
    }

    pub fn get(&self, name: &str) -> Option<&AppDescriptor> {
        self.apps.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut AppDescriptor> {
        self.apps.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.apps.contains_key(name)
    }

    /// Descriptors in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &AppDescriptor> {
        self.apps.values()
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}

fn scan_directory(dir: &Path) -> Result<Vec<(String, PathBuf)>, AppError> {
    let discovery_error = |reason: String| AppError::Discovery {
        path: dir.to_path_buf(),
        reason,
    };
    if !dir.is_dir() {
        return Err(discovery_error("not a directory".to_owned()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|err| discovery_error(err.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let ext = path.extension().and_then(|e| e.to_str());
        if !matches!(ext, Some(MANIFEST_EXTENSION) | Some(SCHEMA_EXTENSION)) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            files.push((stem.to_owned(), path.to_path_buf()));
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::LifecycleState;
    use std::fs;

    #[test]
    fn ignores_unrelated_files_and_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("fw.toml"), "").unwrap();
        fs::write(dir.path().join("README.md"), "").unwrap();
        fs::create_dir(dir.path().join("nested.sql")).unwrap();
        let mut registry = AppRegistry::new(vec![dir.path().to_path_buf()]);
        let report = registry.discover();
        assert_eq!(report.created, vec!["fw".to_owned()]);
        assert_eq!(registry.get("fw").map(|a| a.state()), Some(LifecycleState::Initialized));
    }

    #[test]
    fn missing_directory_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("rt.sql"), "").unwrap();
        let mut registry =
            AppRegistry::new(vec![dir.path().join("absent"), dir.path().to_path_buf()]);
        let report = registry.discover();
        assert_eq!(report.errors.len(), 1);
        assert!(matches!(report.errors[0], AppError::Discovery { .. }));
        assert!(registry.contains("rt"));
    }
}
