//! ---
//! ncs_section: "11-testing"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Test fixtures shared across the workspace."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
//! Fixtures shared by the workspace's tests.
//!
//! [`AppDirFixture`] lays out application files in a scratch directory,
//! [`SchemaFixture`] writes flow/topology trigger templates, and
//! [`RecordingProvider`] is a network provider whose lifecycle calls can be
//! inspected after it has been handed to an environment.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use r_ncs_net::{NetworkProvider, Topology, TopologySpec};
use tempfile::TempDir;
use tracing::debug;

/// Placeholder replaced by the resolved resource directory in schema templates.
pub const RESOURCE_PLACEHOLDER: &str = "__RESOURCE_DIR__";

/// Statement executed by the fixture orchestration app's `run` command.
pub const ORCH_RUN_SQL: &str = "UPDATE p_spv SET status = 'on';";

/// Scratch directory holding application files.
#[derive(Debug)]
pub struct AppDirFixture {
    dir: TempDir,
}

impl Default for AppDirFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl AppDirFixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create app fixture dir");
        Self { dir }
    }

    /// Fixture with the `psql`, `mn` and `orch` core applications. The
    /// orchestration app uses shortcut `o`, the others have none.
    pub fn with_core_apps() -> Self {
        let fixture = Self::new();
        fixture.manifest(
            "psql",
            "description = \"PostgreSQL console\"\nhandler = \"psql\"",
        );
        fixture.manifest(
            "mn",
            "description = \"Network topology inspection\"\nhandler = \"mn\"",
        );
        fixture.manifest(
            "orch",
            &format!(
                "shortcut = \"o\"\ndescription = \"Orchestration\"\nhandler = \"orch\"\n\n\
                 [commands.run]\nsql = \"{ORCH_RUN_SQL}\"\nhelp = \"orchestrate pending updates\"\n"
            ),
        );
        fixture.schema("orch", "CREATE TABLE IF NOT EXISTS p_spv (status text);");
        fixture
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `<name>.toml` and return its path.
    pub fn manifest(&self, name: &str, body: &str) -> PathBuf {
        self.write(&format!("{name}.toml"), body.as_bytes())
    }

    /// Write `<name>.sql` and return its path.
    pub fn schema(&self, name: &str, body: &str) -> PathBuf {
        self.write(&format!("{name}.sql"), body.as_bytes())
    }

    /// Write an arbitrary file, for content that is not valid UTF-8 or uses
    /// an unrelated extension.
    pub fn write(&self, file_name: &str, body: &[u8]) -> PathBuf {
        let path = self.dir.path().join(file_name);
        fs::write(&path, body).expect("write app fixture file");
        debug!(path = %path.display(), "fixture file written");
        path
    }

    pub fn remove(&self, file_name: &str) {
        fs::remove_file(self.dir.path().join(file_name)).expect("remove app fixture file");
    }
}

/// Resource tree with flow and topology trigger templates.
#[derive(Debug)]
pub struct SchemaFixture {
    dir: TempDir,
}

impl Default for SchemaFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaFixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create schema fixture dir");
        let fixture = Self { dir };
        fs::create_dir_all(fixture.schema_dir()).expect("create schema dir");
        fixture.write_schema(
            "base.sql",
            "CREATE TABLE IF NOT EXISTS switches (sid integer, name text);\n\
             CREATE TABLE IF NOT EXISTS hosts (hid integer, name text);\n\
             CREATE TABLE IF NOT EXISTS tp (sid text, nid text);\n",
        );
        fixture.write_schema(
            "flow.sql",
            &format!(
                "CREATE TABLE IF NOT EXISTS cf (fid integer, sid integer);\n\
                 -- {RESOURCE_PLACEHOLDER}/flow_handler.sh\n\
                 CREATE TRIGGER cf_ins AFTER INSERT ON cf FOR EACH ROW EXECUTE PROCEDURE flow_fun();\n"
            ),
        );
        fixture.write_schema(
            "topo.sql",
            &format!(
                "-- {RESOURCE_PLACEHOLDER}/topo_handler.sh\n\
                 CREATE TRIGGER tp_ins AFTER INSERT ON tp FOR EACH ROW EXECUTE PROCEDURE topo_fun();\n\
                 CREATE TRIGGER switches_ins AFTER INSERT ON switches FOR EACH ROW EXECUTE PROCEDURE topo_fun();\n"
            ),
        );
        fixture
    }

    /// Resource directory root.
    pub fn resource_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Directory holding the schema templates.
    pub fn schema_dir(&self) -> PathBuf {
        self.dir.path().join("sql")
    }

    /// Directory rendered schemas may be written to.
    pub fn render_dir(&self) -> PathBuf {
        self.dir.path().join("rendered")
    }

    pub fn base_schema(&self) -> PathBuf {
        self.schema_dir().join("base.sql")
    }

    pub fn write_schema(&self, file_name: &str, body: &str) -> PathBuf {
        let path = self.schema_dir().join(file_name);
        fs::write(&path, body).expect("write schema fixture");
        path
    }
}

/// Calls observed by a [`RecordingProvider`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProviderCalls {
    pub starts: u32,
    pub stops: u32,
}

/// Offline provider that records its lifecycle calls and can be told to fail
/// on start or to panic when its topology is read.
#[derive(Debug)]
pub struct RecordingProvider {
    topology: Topology,
    running: bool,
    fail_start: bool,
    panic_on_topology: bool,
    calls: Arc<Mutex<ProviderCalls>>,
}

impl RecordingProvider {
    pub fn new(spec: &str) -> Self {
        let topology = spec
            .parse::<TopologySpec>()
            .expect("valid topology spec")
            .build();
        Self {
            topology,
            running: false,
            fail_start: false,
            panic_on_topology: false,
            calls: Arc::new(Mutex::new(ProviderCalls::default())),
        }
    }

    pub fn failing(spec: &str) -> Self {
        Self {
            fail_start: true,
            ..Self::new(spec)
        }
    }

    /// Provider whose topology snapshot panics, for exercising crash recovery.
    /// Only usable with reconnected databases, which skip the bulk load.
    pub fn panicking(spec: &str) -> Self {
        Self {
            panic_on_topology: true,
            ..Self::new(spec)
        }
    }

    /// Shared handle to the call counters.
    pub fn calls(&self) -> Arc<Mutex<ProviderCalls>> {
        Arc::clone(&self.calls)
    }
}

impl NetworkProvider for RecordingProvider {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn start(&mut self) -> r_ncs_net::Result<()> {
        self.calls.lock().starts += 1;
        if self.fail_start {
            return Err(r_ncs_net::NetError::Command {
                command: "recording".to_owned(),
                reason: "start refused".to_owned(),
            });
        }
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> r_ncs_net::Result<()> {
        self.calls.lock().stops += 1;
        self.running = false;
        Ok(())
    }

    fn topology(&self) -> &Topology {
        if self.panic_on_topology {
            panic!("topology snapshot unavailable");
        }
        &self.topology
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_app_fixture_lays_out_files() {
        let fixture = AppDirFixture::with_core_apps();
        for file in ["psql.toml", "mn.toml", "orch.toml", "orch.sql"] {
            assert!(fixture.path().join(file).is_file(), "{file} missing");
        }
    }

    #[test]
    fn recording_provider_counts_calls() {
        let mut provider = RecordingProvider::new("single,2");
        let calls = provider.calls();
        provider.start().unwrap();
        provider.stop().unwrap();
        assert_eq!(*calls.lock(), ProviderCalls { starts: 1, stops: 1 });

        let mut failing = RecordingProvider::failing("single,1");
        assert!(failing.start().is_err());
        assert!(!failing.is_running());
    }
}
