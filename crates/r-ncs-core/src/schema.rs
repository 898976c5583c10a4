//! ---
//! ncs_section: "01-core-functionality"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Session environment and startup orchestration."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
//! Two-phase schema installation around network startup.
//!
//! Order: start the provider, bulk-load the topology (fresh databases only),
//! install the flow schema, then install the topology schema. Topology
//! triggers must not exist while the bulk load runs.

use std::fs;
use std::path::{Path, PathBuf};

use r_ncs_common::config::ResourceConfig;
use r_ncs_db::{Database, DbState};
use r_ncs_logging::{log_system_event, LogContext, SystemEventOutcome};
use r_ncs_net::NetworkProvider;
use strum::Display;
use tracing::{debug, info};

use crate::error::{EnvError, Result};

/// Marker in trigger templates replaced by the resolved resource directory.
pub const RESOURCE_PLACEHOLDER: &str = "__RESOURCE_DIR__";

const FLOW_SCHEMA: &str = "flow.sql";
const TOPO_SCHEMA: &str = "topo.sql";

/// A completed installation step, in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum SchemaStep {
    #[strum(serialize = "provider start")]
    ProviderStarted,
    #[strum(serialize = "topology bulk load")]
    TopologyLoaded,
    #[strum(serialize = "existing topology kept")]
    TopologyKept,
    #[strum(serialize = "flow schema")]
    FlowSchema(PathBuf),
    #[strum(serialize = "topology schema")]
    TopologySchema(PathBuf),
}

/// Copy `template` into `render_dir`, replacing [`RESOURCE_PLACEHOLDER`]
/// with `resource_dir`. Returns the rendered file's path.
pub fn render_schema(template: &Path, render_dir: &Path, resource_dir: &Path) -> std::io::Result<PathBuf> {
    let contents = fs::read_to_string(template)?;
    let rendered = contents.replace(RESOURCE_PLACEHOLDER, &resource_dir.display().to_string());
    fs::create_dir_all(render_dir)?;
    let file_name = template.file_name().unwrap_or(template.as_os_str());
    let target = render_dir.join(file_name);
    fs::write(&target, rendered)?;
    debug!(template = %template.display(), target = %target.display(), "schema rendered");
    Ok(target)
}

/// Drives the schema installation sequence.
#[derive(Debug, Clone)]
pub struct SchemaOrchestrator {
    schema_dir: PathBuf,
    render_dir: PathBuf,
    resource_dir: PathBuf,
}

impl SchemaOrchestrator {
    pub fn new(schema_dir: PathBuf, render_dir: PathBuf, resource_dir: PathBuf) -> Self {
        Self {
            schema_dir,
            render_dir,
            resource_dir,
        }
    }

    pub fn from_config(resources: &ResourceConfig) -> Result<Self> {
        let resource_dir = resources
            .resolved_directory()
            .map_err(|err| EnvError::schema("resource directory", format!("{err:#}")))?;
        Ok(Self::new(
            resources.schema_dir.clone(),
            resources.render_dir.clone(),
            resource_dir,
        ))
    }

    pub fn resource_dir(&self) -> &Path {
        &self.resource_dir
    }

    /// Run the full sequence. Any failure is fatal to startup.
    pub fn install(
        &self,
        db: &mut dyn Database,
        provider: &mut dyn NetworkProvider,
    ) -> Result<Vec<SchemaStep>> {
        let ctx = LogContext::new().with_phase("startup");
        let result = self.run_steps(db, provider);
        match &result {
            Ok(steps) => log_system_event(
                Some(&ctx),
                "schema.install",
                &format!("{} steps completed", steps.len()),
                SystemEventOutcome::Success,
            ),
            Err(err) => log_system_event(
                Some(&ctx),
                "schema.install",
                &err.to_string(),
                SystemEventOutcome::Fault,
            ),
        }
        result
    }

    fn run_steps(
        &self,
        db: &mut dyn Database,
        provider: &mut dyn NetworkProvider,
    ) -> Result<Vec<SchemaStep>> {
        let mut steps = Vec::with_capacity(4);

        provider.start().map_err(EnvError::ProviderStart)?;
        steps.push(SchemaStep::ProviderStarted);

        match db.state() {
            DbState::Fresh => {
                db.load_topo(provider)
                    .map_err(|err| EnvError::schema(SchemaStep::TopologyLoaded.to_string(), err))?;
                steps.push(SchemaStep::TopologyLoaded);
            }
            DbState::Reconnected => {
                info!(database = db.name(), "connecting to existing database, skipping topology load");
                steps.push(SchemaStep::TopologyKept);
            }
        }

        let flow = self.install_one(db, FLOW_SCHEMA, "flow schema")?;
        steps.push(SchemaStep::FlowSchema(flow));

        let topo = self.install_one(db, TOPO_SCHEMA, "topology schema")?;
        steps.push(SchemaStep::TopologySchema(topo));

        Ok(steps)
    }

    fn install_one(&self, db: &mut dyn Database, file: &str, step: &str) -> Result<PathBuf> {
        let template = self.schema_dir.join(file);
        let rendered = render_schema(&template, &self.render_dir, &self.resource_dir)
            .map_err(|err| EnvError::schema(step, format!("{}: {err}", template.display())))?;
        db.load_schema(&rendered)
            .map_err(|err| EnvError::schema(step, err))?;
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use r_ncs_db::{DbOp, MemoryDatabase};
    use r_ncs_testharness::{RecordingProvider, SchemaFixture};

    fn orchestrator(fixture: &SchemaFixture) -> SchemaOrchestrator {
        SchemaOrchestrator::new(
            fixture.schema_dir(),
            fixture.render_dir(),
            fixture.resource_dir().to_path_buf(),
        )
    }

    #[test]
    fn render_replaces_placeholder() {
        let fixture = SchemaFixture::new();
        let rendered = render_schema(
            &fixture.schema_dir().join("flow.sql"),
            &fixture.render_dir(),
            Path::new("/opt/ncs/resources"),
        )
        .unwrap();
        let body = fs::read_to_string(rendered).unwrap();
        assert!(body.contains("/opt/ncs/resources/flow_handler.sh"));
        assert!(!body.contains(RESOURCE_PLACEHOLDER));
    }

    #[test]
    fn fresh_database_loads_topology_before_triggers() {
        let fixture = SchemaFixture::new();
        let mut db = MemoryDatabase::new("ncs", "ncs", DbState::Fresh);
        let mut provider = RecordingProvider::new("linear,3");
        let steps = orchestrator(&fixture).install(&mut db, &mut provider).unwrap();

        assert_eq!(steps[0], SchemaStep::ProviderStarted);
        assert_eq!(steps[1], SchemaStep::TopologyLoaded);
        assert!(matches!(steps[2], SchemaStep::FlowSchema(_)));
        assert!(matches!(steps[3], SchemaStep::TopologySchema(_)));

        let journal = db.journal();
        assert!(matches!(journal[0], DbOp::LoadTopo { switches: 3, hosts: 3, .. }));
        assert_eq!(journal[1], DbOp::LoadSchema(fixture.render_dir().join("flow.sql")));
        assert_eq!(journal[2], DbOp::LoadSchema(fixture.render_dir().join("topo.sql")));
        assert!(db.fired_triggers().is_empty());
        assert_eq!(db.triggers().len(), 3);
    }

    #[test]
    fn reconnected_database_keeps_existing_topology() {
        let fixture = SchemaFixture::new();
        let mut db = MemoryDatabase::new("ncs", "ncs", DbState::Reconnected);
        let mut provider = RecordingProvider::new("single,2");
        let steps = orchestrator(&fixture).install(&mut db, &mut provider).unwrap();
        assert_eq!(steps[1], SchemaStep::TopologyKept);
        assert!(!db
            .journal()
            .iter()
            .any(|op| matches!(op, DbOp::LoadTopo { .. })));
    }

    #[test]
    fn missing_template_aborts_before_topology_schema() {
        let fixture = SchemaFixture::new();
        fs::remove_file(fixture.schema_dir().join("flow.sql")).unwrap();
        let mut db = MemoryDatabase::new("ncs", "ncs", DbState::Fresh);
        let mut provider = RecordingProvider::new("single,2");
        let err = orchestrator(&fixture).install(&mut db, &mut provider).unwrap_err();
        assert!(matches!(err, EnvError::SchemaInstall { ref step, .. } if step == "flow schema"));
        assert_eq!(db.journal().len(), 1);
    }

    #[test]
    fn provider_failure_is_fatal() {
        let fixture = SchemaFixture::new();
        let mut db = MemoryDatabase::new("ncs", "ncs", DbState::Fresh);
        let mut provider = RecordingProvider::failing("single,2");
        let err = orchestrator(&fixture).install(&mut db, &mut provider).unwrap_err();
        assert!(matches!(err, EnvError::ProviderStart(_)));
        assert!(db.journal().is_empty());
    }
}
