//! ---
//! ncs_section: "01-core-functionality"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Session environment and startup orchestration."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
use std::env;

use r_ncs_apps::{AppContext, AppError, AppRegistry, LifecycleManager, LifecycleState, LoadOutcome};
use r_ncs_common::config::AppConfig;
use r_ncs_db::Database;
use r_ncs_logging::{log_system_event, ncs_warn, LogContext, SystemEventOutcome};
use r_ncs_net::{ControllerProbe, NetworkProvider};
use tracing::{debug, info, warn};

use crate::error::{EnvError, Result};
use crate::process::{ProcessPool, TeardownReport};
use crate::schema::{SchemaOrchestrator, SchemaStep};
use crate::watch::{WatchCommand, WatchTarget};

/// Applications loaded unconditionally at startup and never unloadable.
pub const CORE_APPS: [&str; 3] = ["psql", "mn", "orch"];

/// Everything a console session acts on.
pub struct Environment {
    config: AppConfig,
    db: Box<dyn Database>,
    provider: Box<dyn NetworkProvider>,
    apps: LifecycleManager,
    schema: SchemaOrchestrator,
    processes: ProcessPool,
    controller: Option<ControllerProbe>,
    stopped: bool,
}

impl Environment {
    /// Compose the environment and run an initial discovery pass.
    pub fn new(
        config: AppConfig,
        db: Box<dyn Database>,
        provider: Box<dyn NetworkProvider>,
    ) -> Result<Self> {
        let schema = SchemaOrchestrator::from_config(&config.resources)?;
        let mut apps = LifecycleManager::new(AppRegistry::new(config.apps.directories.clone()));
        let report = apps.discover();
        for err in &report.errors {
            ncs_warn!(context = LogContext::new().with_phase("discovery"), "{err}");
        }
        let controller = config
            .controller
            .enabled
            .then(|| ControllerProbe::new(config.controller.pid_file.clone()));
        Ok(Self {
            config,
            db,
            provider,
            apps,
            schema,
            processes: ProcessPool::new(),
            controller,
            stopped: false,
        })
    }

    /// Install schemas around provider startup, then load the core apps.
    pub fn start(&mut self) -> Result<Vec<SchemaStep>> {
        if let Some(pid) = self.controller.as_ref().and_then(ControllerProbe::running_pid) {
            return Err(EnvError::ControllerRunning { pid });
        }

        let steps = self
            .schema
            .install(self.db.as_mut(), self.provider.as_mut())?;

        for name in CORE_APPS {
            self.apps.protect(name);
        }
        for name in CORE_APPS {
            match self.apps.load(name, self.db.as_mut())? {
                LoadOutcome::Loaded { .. } | LoadOutcome::AlreadyLoaded => {}
                LoadOutcome::NotLoadable => {
                    return Err(EnvError::CoreAppNotLoadable(name.to_owned()))
                }
            }
            if self.apps.resolve(name).map(|app| app.state()) != Some(LifecycleState::Loaded) {
                return Err(EnvError::CoreAppNotLoadable(name.to_owned()));
            }
            let shortcut = self
                .apps
                .resolve(name)
                .and_then(|app| app.shortcut())
                .map(str::to_owned);
            if let Some(shortcut) = shortcut {
                self.apps.protect(&shortcut);
            }
        }

        log_system_event(
            Some(&LogContext::new().with_phase("startup")),
            "environment.start",
            &format!("core applications loaded: {}", CORE_APPS.join(", ")),
            SystemEventOutcome::Success,
        );
        Ok(steps)
    }

    /// Stop the provider and reap supervised processes. Runs once; later
    /// calls return `None`.
    pub fn stop(&mut self) -> Option<TeardownReport> {
        if self.stopped {
            return None;
        }
        self.stopped = true;
        let ctx = LogContext::new().with_phase("teardown");
        if let Err(err) = self.provider.stop() {
            log_system_event(
                Some(&ctx),
                "provider.stop",
                &err.to_string(),
                SystemEventOutcome::Fault,
            );
        }
        let report = self.processes.teardown();
        log_system_event(
            Some(&ctx),
            "environment.stop",
            &format!(
                "{} processes reaped, {} temp files removed",
                report.reaped, report.files_removed
            ),
            SystemEventOutcome::Success,
        );
        Some(report)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn apps(&self) -> &LifecycleManager {
        &self.apps
    }

    pub fn db(&self) -> &dyn Database {
        self.db.as_ref()
    }

    pub fn provider(&self) -> &dyn NetworkProvider {
        self.provider.as_ref()
    }

    pub fn processes(&self) -> &ProcessPool {
        &self.processes
    }

    pub fn load_app(&mut self, name: &str) -> std::result::Result<LoadOutcome, AppError> {
        self.apps.load(name, self.db.as_mut())
    }

    pub fn unload_app(&mut self, name: &str) -> std::result::Result<(), AppError> {
        self.apps.unload(name, self.db.as_mut())
    }

    /// Forward `line` to the console of the application routed under `key`.
    pub fn execute_app(&mut self, key: &str, line: &str) -> std::result::Result<String, AppError> {
        let app = self
            .apps
            .resolve_mut(key)
            .ok_or_else(|| AppError::UnknownApplication(key.to_owned()))?;
        let name = app.name().to_owned();
        let console = app.console_mut().ok_or_else(|| AppError::Command {
            app: name,
            reason: "application has no console".to_owned(),
        })?;
        let mut ctx = AppContext {
            db: self.db.as_mut(),
            provider: self.provider.as_ref(),
        };
        console.execute(&mut ctx, line)
    }

    /// Auto-orchestration flag of the application routed under `key`.
    pub fn app_auto(&self, key: &str) -> Option<bool> {
        self.apps
            .resolve(key)
            .and_then(|app| app.console())
            .and_then(|console| console.auto())
    }

    /// Description followed by the console's help for `topic`.
    pub fn app_help(&self, key: &str, topic: &str) -> Option<String> {
        let app = self.apps.resolve(key)?;
        let mut out = Vec::new();
        if topic.trim().is_empty() {
            if let Some(description) = app.description() {
                out.push(description.to_owned());
            }
        }
        if let Some(console) = app.console() {
            out.push(console.help(topic));
        }
        Some(out.join("\n"))
    }

    /// Delete all data except topology.
    pub fn reinit(&mut self) -> Result<()> {
        self.db.truncate()?;
        Ok(())
    }

    /// Spawn a supervised process.
    pub fn spawn_supervised(
        &mut self,
        command: &str,
        temp_file: Option<std::path::PathBuf>,
    ) -> Result<u32> {
        self.processes.spawn(command, temp_file)
    }

    /// Open a terminal watching the given `<table>[,<max_rows>]` targets.
    pub fn watch(&mut self, args: &[&str]) -> Result<u32> {
        if self.stopped {
            return Err(EnvError::SessionClosed);
        }
        let targets = args
            .iter()
            .map(|arg| arg.parse::<WatchTarget>())
            .collect::<Result<Vec<_>>>()?;
        let watch = WatchCommand::build(
            &self.config.console.terminal,
            self.db.name(),
            self.db.user(),
            &targets,
            &env::temp_dir(),
        )?;
        debug!(command = %watch.command, "launching watch terminal");
        self.processes.spawn(&watch.command, Some(watch.query_file))
    }

    /// Startup parameters as shown by `stat`.
    pub fn pprint(&self) -> String {
        self.config.pprint()
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        if !self.stopped {
            warn!("environment dropped without stop; tearing down");
            self.stop();
        } else {
            info!("environment released");
        }
    }
}
