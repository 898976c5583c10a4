//! ---
//! ncs_section: "01-core-functionality"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Application discovery, consoles, and lifecycle management."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
//! Load/unload bookkeeping over the registry.
//!
//! `loaded` maps every routing key (canonical name or shortcut) to the
//! canonical name of the descriptor it resolves to. A shortcut already in use
//! keeps resolving to the application that registered it first.

use indexmap::{IndexMap, IndexSet};
use r_ncs_db::Database;
use r_ncs_logging::{ncs_info, ncs_warn, LogContext};

use crate::descriptor::{AppDescriptor, LifecycleState};
use crate::error::{AppError, Result};
use crate::registry::{AppRegistry, DiscoveryReport};

/// Result of a successful `load` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The key was already routed; nothing changed.
    AlreadyLoaded,
    /// The application is now routed under its name (and shortcut, unless
    /// `shortcut_conflict` names the shortcut that was already taken).
    Loaded { shortcut_conflict: Option<String> },
    /// The load routine ran but the application has no runnable logic.
    NotLoadable,
}

#[derive(Debug)]
pub struct LifecycleManager {
    registry: AppRegistry,
    loaded: IndexMap<String, String>,
    protected: IndexSet<String>,
}

impl LifecycleManager {
    pub fn new(registry: AppRegistry) -> Self {
        Self {
            registry,
            loaded: IndexMap::new(),
            protected: IndexSet::new(),
        }
    }

    pub fn registry(&self) -> &AppRegistry {
        &self.registry
    }

    pub fn discover(&mut self) -> DiscoveryReport {
        self.registry.discover()
    }

    /// Load `name`. A no-op for keys that are already routed.
    pub fn load(&mut self, name: &str, db: &mut dyn Database) -> Result<LoadOutcome> {
        if self.loaded.contains_key(name) {
            return Ok(LoadOutcome::AlreadyLoaded);
        }

        self.registry.discover();

        let app = self
            .registry
            .get_mut(name)
            .ok_or_else(|| AppError::UnknownApplication(name.to_owned()))?;
        app.load(db)?;
        if !app.is_loadable() {
            return Ok(LoadOutcome::NotLoadable);
        }
        app.set_state(LifecycleState::Loaded);

        let canonical = app.name().to_owned();
        let shortcut = app.shortcut().map(str::to_owned);
        self.loaded.insert(canonical.clone(), canonical.clone());

        let mut shortcut_conflict = None;
        if let Some(shortcut) = shortcut.filter(|s| *s != canonical) {
            if let Some(owner) = self.loaded.get(&shortcut) {
                ncs_warn!(
                    context = LogContext::new().with_app(&canonical),
                    "shortcut {shortcut} for {canonical} already in use by {owner}"
                );
                shortcut_conflict = Some(shortcut);
            } else {
                self.loaded.insert(shortcut, canonical.clone());
            }
        }
        ncs_info!(context = LogContext::new().with_app(&canonical), "application loaded");
        Ok(LoadOutcome::Loaded { shortcut_conflict })
    }

    /// Unload the application routed under `name`. Core applications are
    /// refused; names that are known but not loaded are a no-op.
    pub fn unload(&mut self, name: &str, db: &mut dyn Database) -> Result<()> {
        if self.protected.contains(name) {
            ncs_warn!(
                context = LogContext::new().with_app(name),
                "cannot unload core apps {:?}",
                self.protected
            );
            return Err(AppError::ProtectedApplication(name.to_owned()));
        }

        let canonical = match self.loaded.get(name) {
            Some(canonical) => canonical.clone(),
            None if self.registry.contains(name) => return Ok(()),
            None => return Err(AppError::UnknownApplication(name.to_owned())),
        };
        let app = self
            .registry
            .get_mut(&canonical)
            .ok_or_else(|| AppError::UnknownApplication(canonical.clone()))?;
        app.unload(db)?;
        app.set_state(LifecycleState::Initialized);

        self.loaded.retain(|_, owner| *owner != canonical);
        ncs_info!(context = LogContext::new().with_app(&canonical), "application unloaded");
        Ok(())
    }

    /// Add `name` to the set of keys that can never be unloaded.
    pub fn protect(&mut self, name: &str) {
        self.protected.insert(name.to_owned());
    }

    pub fn is_protected(&self, name: &str) -> bool {
        self.protected.contains(name)
    }

    pub fn protected(&self) -> impl Iterator<Item = &str> {
        self.protected.iter().map(String::as_str)
    }

    pub fn is_loaded(&self, key: &str) -> bool {
        self.loaded.contains_key(key)
    }

    /// Every routing key, names and shortcuts, in registration order.
    pub fn loaded_keys(&self) -> impl Iterator<Item = &str> {
        self.loaded.keys().map(String::as_str)
    }

    /// Canonical name routed under `key`.
    pub fn canonical(&self, key: &str) -> Option<&str> {
        self.loaded.get(key).map(String::as_str)
    }

    /// Descriptor routed under `key`.
    pub fn resolve(&self, key: &str) -> Option<&AppDescriptor> {
        self.canonical(key).and_then(|name| self.registry.get(name))
    }

    pub fn resolve_mut(&mut self, key: &str) -> Option<&mut AppDescriptor> {
        let name = self.loaded.get(key)?;
        self.registry.get_mut(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use r_ncs_db::{DbOp, DbState, MemoryDatabase};
    use r_ncs_testharness::AppDirFixture;

    fn manager(fixture: &AppDirFixture) -> LifecycleManager {
        let mut registry = AppRegistry::new(vec![fixture.path().to_path_buf()]);
        registry.discover();
        LifecycleManager::new(registry)
    }

    #[test]
    fn unknown_application_is_reported() {
        let fixture = AppDirFixture::new();
        let mut manager = manager(&fixture);
        let mut db = MemoryDatabase::new("ncs", "ncs", DbState::Fresh);
        assert!(matches!(
            manager.load("nope", &mut db),
            Err(AppError::UnknownApplication(_))
        ));
        assert!(matches!(
            manager.unload("nope", &mut db),
            Err(AppError::UnknownApplication(_))
        ));
    }

    #[test]
    fn unload_runs_unload_sql_and_drops_both_keys() {
        let fixture = AppDirFixture::new();
        fixture.manifest(
            "fw",
            "shortcut = \"f\"\nunload_sql = [\"DROP TABLE IF EXISTS fw_policy;\"]",
        );
        let mut manager = manager(&fixture);
        let mut db = MemoryDatabase::new("ncs", "ncs", DbState::Fresh);
        manager.load("fw", &mut db).unwrap();
        assert!(manager.is_loaded("f"));

        manager.unload("f", &mut db).unwrap();
        assert_eq!(manager.loaded_keys().count(), 0);
        assert_eq!(
            manager.registry().get("fw").map(|a| a.state()),
            Some(LifecycleState::Initialized)
        );
        assert_eq!(
            db.journal().last(),
            Some(&DbOp::Execute("DROP TABLE IF EXISTS fw_policy;".into()))
        );

        manager.unload("fw", &mut db).unwrap();
    }

    #[test]
    fn unload_keeps_shortcut_owned_by_another_app() {
        let fixture = AppDirFixture::new();
        fixture.manifest("aa", "shortcut = \"x\"");
        fixture.manifest("bb", "shortcut = \"x\"");
        let mut manager = manager(&fixture);
        let mut db = MemoryDatabase::new("ncs", "ncs", DbState::Fresh);
        manager.load("aa", &mut db).unwrap();
        manager.load("bb", &mut db).unwrap();
        manager.unload("bb", &mut db).unwrap();
        assert_eq!(manager.canonical("x"), Some("aa"));
    }

    #[test]
    fn schema_only_application_is_not_routed() {
        let fixture = AppDirFixture::new();
        fixture.schema("tables", "CREATE TABLE t (id int);");
        let mut manager = manager(&fixture);
        let mut db = MemoryDatabase::new("ncs", "ncs", DbState::Fresh);
        assert_eq!(manager.load("tables", &mut db).unwrap(), LoadOutcome::NotLoadable);
        assert!(!manager.is_loaded("tables"));
        assert_eq!(db.row_count("t"), Some(0));
    }
}
