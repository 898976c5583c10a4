//! ---
//! ncs_section: "05-networking-external-interfaces"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Network provider interface and topology model."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
use std::process::{Child, Command, Stdio};

use r_ncs_common::config::{NetworkConfig, NetworkMode};
use tracing::{debug, info, warn};

use crate::topology::{Topology, TopologySpec};
use crate::{NetError, Result};

/// Packet-forwarding backend whose topology the console mirrors into the database.
pub trait NetworkProvider {
    /// Short label used in logs and `stat` output.
    fn name(&self) -> &'static str;

    /// Bring the backend up.
    fn start(&mut self) -> Result<()>;

    /// Tear the backend down. Calling it on a stopped provider is a no-op.
    fn stop(&mut self) -> Result<()>;

    /// Current topology snapshot.
    fn topology(&self) -> &Topology;

    /// Whether `start` succeeded and `stop` has not run since.
    fn is_running(&self) -> bool;
}

/// Provider that performs no real networking.
#[derive(Debug)]
pub struct OfflineProvider {
    topology: Topology,
    running: bool,
}

impl OfflineProvider {
    pub fn new(topology: Topology) -> Self {
        Self {
            topology,
            running: false,
        }
    }
}

impl NetworkProvider for OfflineProvider {
    fn name(&self) -> &'static str {
        "offline"
    }

    fn start(&mut self) -> Result<()> {
        debug!(
            switches = self.topology.switches.len(),
            hosts = self.topology.hosts.len(),
            "offline provider started"
        );
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.running = false;
        Ok(())
    }

    fn topology(&self) -> &Topology {
        &self.topology
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

/// Provider driving an external emulation backend through shell commands.
#[derive(Debug)]
pub struct CommandProvider {
    topology: Topology,
    start_command: String,
    stop_command: Option<String>,
    child: Option<Child>,
}

impl CommandProvider {
    pub fn new(topology: Topology, start_command: String, stop_command: Option<String>) -> Self {
        Self {
            topology,
            start_command,
            stop_command,
            child: None,
        }
    }
}

impl NetworkProvider for CommandProvider {
    fn name(&self) -> &'static str {
        "command"
    }

    fn start(&mut self) -> Result<()> {
        if self.child.is_some() {
            return Ok(());
        }
        let child = Command::new("sh")
            .arg("-c")
            .arg(&self.start_command)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|err| NetError::Command {
                command: self.start_command.clone(),
                reason: err.to_string(),
            })?;
        info!(pid = child.id(), command = %self.start_command, "network backend launched");
        self.child = Some(child);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        if let Some(stop) = &self.stop_command {
            let status = Command::new("sh").arg("-c").arg(stop).status()?;
            if !status.success() {
                warn!(command = %stop, %status, "network stop command failed");
            }
        }
        if child.try_wait()?.is_none() {
            child.kill()?;
        }
        let status = child.wait()?;
        info!(%status, "network backend stopped");
        Ok(())
    }

    fn topology(&self) -> &Topology {
        &self.topology
    }

    fn is_running(&self) -> bool {
        self.child.is_some()
    }
}

impl Drop for CommandProvider {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            warn!(error = %err, "network backend cleanup failed");
        }
    }
}

/// Build the provider selected by configuration.
pub fn provider_from_config(config: &NetworkConfig) -> Result<Box<dyn NetworkProvider>> {
    let topology = config.topology.parse::<TopologySpec>()?.build();
    match config.mode {
        NetworkMode::Offline => Ok(Box::new(OfflineProvider::new(topology))),
        NetworkMode::Command => {
            let start = config.start_command.clone().ok_or_else(|| NetError::Command {
                command: String::new(),
                reason: "no start_command configured".to_owned(),
            })?;
            Ok(Box::new(CommandProvider::new(
                topology,
                start,
                config.stop_command.clone(),
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_provider_tracks_running_state() {
        let mut provider = provider_from_config(&NetworkConfig::default()).unwrap();
        assert_eq!(provider.name(), "offline");
        assert!(!provider.is_running());
        provider.start().unwrap();
        assert!(provider.is_running());
        assert_eq!(provider.topology().hosts.len(), 3);
        provider.stop().unwrap();
        provider.stop().unwrap();
        assert!(!provider.is_running());
    }

    #[cfg(unix)]
    #[test]
    fn command_provider_spawns_and_reaps_backend() {
        let topology = "single,1".parse::<TopologySpec>().unwrap().build();
        let mut provider = CommandProvider::new(topology, "sleep 30".to_owned(), None);
        provider.start().unwrap();
        assert!(provider.is_running());
        provider.stop().unwrap();
        assert!(!provider.is_running());
    }

    #[test]
    fn command_mode_requires_start_command() {
        let config = NetworkConfig {
            mode: NetworkMode::Command,
            ..NetworkConfig::default()
        };
        assert!(provider_from_config(&config).is_err());
    }
}
