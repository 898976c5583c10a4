//! ---
//! ncs_section: "11-testing"
//! ncs_subsection: "integration"
//! ncs_type: "test"
//! ncs_scope: "code"
//! ncs_description: "Discovery and load/unload behaviour of applications."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
use r_ncs_apps::{
    AppError, AppRegistry, LifecycleManager, LifecycleState, LoadOutcome,
};
use r_ncs_db::{Database, DbState, MemoryDatabase};
use r_ncs_testharness::AppDirFixture;

fn manager_for(fixture: &AppDirFixture) -> LifecycleManager {
    LifecycleManager::new(AppRegistry::new(vec![fixture.path().to_path_buf()]))
}

#[test]
fn discover_is_idempotent() {
    let fixture = AppDirFixture::new();
    fixture.manifest("fw", "shortcut = \"f\"");
    fixture.schema("fw", "CREATE TABLE fw_policy (src int, dst int);");
    fixture.manifest("rt", "");
    fixture.schema("tables", "CREATE TABLE t (id int);");

    let mut registry = AppRegistry::new(vec![fixture.path().to_path_buf()]);
    let first = registry.discover();
    assert_eq!(first.created.len(), 3);
    assert_eq!(registry.len(), 3);

    let second = registry.discover();
    assert!(second.created.is_empty());
    assert_eq!(registry.len(), 3);
    assert!(registry
        .iter()
        .all(|app| app.state() == LifecycleState::Initialized));
    assert_eq!(registry.get("fw").map(|app| app.source_paths().count()), Some(2));
}

#[test]
fn rediscovery_links_files_added_later() {
    let fixture = AppDirFixture::new();
    fixture.schema("fw", "CREATE TABLE fw_policy (src int);");
    let mut registry = AppRegistry::new(vec![fixture.path().to_path_buf()]);
    registry.discover();
    assert_eq!(registry.get("fw").map(|app| app.is_loadable()), Some(false));

    fixture.manifest("fw", "shortcut = \"f\"\ndescription = \"Firewall\"");
    let report = registry.discover();
    assert!(report.created.is_empty());
    let fw = registry.get("fw").expect("fw discovered");
    assert!(fw.is_loadable());
    assert_eq!(fw.shortcut(), Some("f"));
    assert_eq!(fw.description(), Some("Firewall"));
}

#[test]
fn load_picks_up_new_files_and_is_idempotent() {
    let fixture = AppDirFixture::new();
    let mut manager = manager_for(&fixture);
    let mut db = MemoryDatabase::new("ncs", "ncs", DbState::Fresh);

    fixture.manifest("fw", "shortcut = \"f\"");
    fixture.schema("fw", "CREATE TABLE fw_policy (src int, dst int);");
    assert_eq!(
        manager.load("fw", &mut db).unwrap(),
        LoadOutcome::Loaded {
            shortcut_conflict: None
        }
    );
    let keys: Vec<String> = manager.loaded_keys().map(str::to_owned).collect();
    assert_eq!(keys, vec!["fw".to_owned(), "f".to_owned()]);
    let statements = db.statements_issued();

    assert_eq!(manager.load("fw", &mut db).unwrap(), LoadOutcome::AlreadyLoaded);
    assert_eq!(manager.load("f", &mut db).unwrap(), LoadOutcome::AlreadyLoaded);
    let after: Vec<String> = manager.loaded_keys().map(str::to_owned).collect();
    assert_eq!(after, keys);
    assert_eq!(db.statements_issued(), statements);
}

#[test]
fn protected_applications_cannot_be_unloaded() {
    let fixture = AppDirFixture::with_core_apps();
    let mut manager = manager_for(&fixture);
    let mut db = MemoryDatabase::new("ncs", "ncs", DbState::Fresh);
    for core in ["psql", "mn", "orch"] {
        manager.load(core, &mut db).unwrap();
        manager.protect(core);
    }
    manager.protect("o");
    let before: Vec<String> = manager.loaded_keys().map(str::to_owned).collect();

    for name in ["psql", "mn", "orch", "o"] {
        let err = manager.unload(name, &mut db).unwrap_err();
        assert!(matches!(err, AppError::ProtectedApplication(ref n) if n == name));
    }
    let after: Vec<String> = manager.loaded_keys().map(str::to_owned).collect();
    assert_eq!(before, after);
}

#[test]
fn shortcut_collision_keeps_first_registration() {
    let fixture = AppDirFixture::new();
    fixture.manifest("bravo", "shortcut = \"x\"");
    fixture.manifest("alpha", "shortcut = \"x\"");
    let mut manager = manager_for(&fixture);
    let mut db = MemoryDatabase::new("ncs", "ncs", DbState::Fresh);

    manager.load("bravo", &mut db).unwrap();
    let outcome = manager.load("alpha", &mut db).unwrap();
    assert_eq!(
        outcome,
        LoadOutcome::Loaded {
            shortcut_conflict: Some("x".to_owned())
        }
    );
    assert!(manager.is_loaded("alpha"));
    assert_eq!(manager.canonical("x"), Some("bravo"));
    assert_eq!(
        manager.resolve("alpha").map(|app| app.state()),
        Some(LifecycleState::Loaded)
    );
}

#[test]
fn failed_load_leaves_application_initialized() {
    let fixture = AppDirFixture::new();
    fixture.manifest("broken", "description = \"schema cannot be read\"");
    fixture.write("broken.sql", &[0xff, 0xfe, 0x00, 0xc3]);
    let mut manager = manager_for(&fixture);
    let mut db = MemoryDatabase::new("ncs", "ncs", DbState::Fresh);

    let err = manager.load("broken", &mut db).unwrap_err();
    assert!(matches!(err, AppError::ApplicationLoad { ref name, .. } if name == "broken"));
    assert!(!manager.is_loaded("broken"));
    assert_eq!(
        manager.registry().get("broken").map(|app| app.state()),
        Some(LifecycleState::Initialized)
    );
}

#[test]
fn invalid_manifest_fails_load() {
    let fixture = AppDirFixture::new();
    fixture.manifest("bad", "shortcut = [");
    let mut manager = manager_for(&fixture);
    let mut db = MemoryDatabase::new("ncs", "ncs", DbState::Fresh);
    assert!(matches!(
        manager.load("bad", &mut db),
        Err(AppError::Manifest { .. })
    ));
    assert!(!manager.is_loaded("bad"));
}
