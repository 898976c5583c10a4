//! ---
//! ncs_section: "06-user-interfaces"
//! ncs_subsection: "binary"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Binary entrypoint for the R-NCS console."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use r_ncs_common::config::{AppConfig, DatabaseBackend};
use r_ncs_common::logging::init_tracing;
use r_ncs_console::{run_session, run_terminal_session};
use r_ncs_core::Environment;
use r_ncs_db::open_database;
use r_ncs_net::provider_from_config;
use tracing::info;

#[derive(Debug, Parser)]
#[command(author, version, about = "R-NCS network control shell", long_about = None)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "SPEC", help = "Override the topology, e.g. fattree,4")]
    topo: Option<String>,

    #[arg(long, help = "Keep existing database contents instead of starting clean")]
    reconnect: bool,

    #[arg(long, value_enum, help = "Override the database backend")]
    backend: Option<CliBackend>,

    #[arg(long = "db", value_name = "NAME", help = "Override the database name")]
    db_name: Option<String>,

    #[arg(long = "user", value_name = "USER", help = "Override the database user")]
    db_user: Option<String>,

    #[arg(
        long = "app-dir",
        value_name = "DIR",
        help = "Application search path; repeat to add several"
    )]
    app_dirs: Vec<PathBuf>,

    #[arg(long, help = "Start with the command logger enabled")]
    cmdlog: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliBackend {
    Memory,
    Psql,
}

impl From<CliBackend> for DatabaseBackend {
    fn from(value: CliBackend) -> Self {
        match value {
            CliBackend::Memory => DatabaseBackend::Memory,
            CliBackend::Psql => DatabaseBackend::Psql,
        }
    }
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(topo) = &self.topo {
            config.network.topology = topo.clone();
        }
        if self.reconnect {
            config.database.reconnect = true;
        }
        if let Some(backend) = self.backend {
            config.database.backend = backend.into();
        }
        if let Some(name) = &self.db_name {
            config.database.name = name.clone();
        }
        if let Some(user) = &self.db_user {
            config.database.user = user.clone();
        }
        if !self.app_dirs.is_empty() {
            config.apps.directories = self.app_dirs.clone();
        }
        if self.cmdlog {
            config.console.command_log_enabled = true;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/r-ncs.toml"));
    candidates.push(PathBuf::from("configs/r-ncs.example.toml"));

    let loaded = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded.config;
    cli.apply(&mut config);
    config.validate().context("invalid configuration after overrides")?;

    init_tracing("r-ncs", &config.logging)?;
    info!(config_path = %loaded.source.display(), "configuration loaded");

    let db = open_database(&config.database).context("failed to open database")?;
    let provider = provider_from_config(&config.network).context("invalid network configuration")?;
    let mut env = Environment::new(config, db, provider)?;
    env.start().context("startup aborted")?;

    let stdin = io::stdin();
    let summary = if stdin.is_terminal() {
        run_terminal_session(&mut env)?
    } else {
        run_session(&mut env, stdin.lock(), io::stdout().lock())?
    };
    info!(
        commands = summary.commands,
        restarts = summary.restarts,
        auto_runs = summary.auto_runs,
        "session ended"
    );
    Ok(())
}
