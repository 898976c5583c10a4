//! ---
//! ncs_section: "01-core-functionality"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Application discovery, consoles, and lifecycle management."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
use super::{split_command, AppConsole, AppContext};
use crate::error::{AppError, Result};

const COMMANDS: &[(&str, &str)] = &[
    ("nodes", "list switches and hosts"),
    ("links", "list links"),
    ("dump", "print the topology snapshot as JSON"),
];

/// Read-only view of the network provider's topology.
#[derive(Debug, Default, Clone, Copy)]
pub struct MnConsole;

impl AppConsole for MnConsole {
    fn execute(&mut self, ctx: &mut AppContext<'_>, line: &str) -> Result<String> {
        let topology = ctx.provider.topology();
        match split_command(line).0 {
            "nodes" => Ok(topology
                .switches
                .iter()
                .chain(topology.hosts.iter())
                .map(|node| node.name.as_str())
                .collect::<Vec<_>>()
                .join(" ")),
            "links" => Ok(topology
                .links
                .iter()
                .map(|link| format!("{} <-> {}", link.a, link.b))
                .collect::<Vec<_>>()
                .join("\n")),
            "dump" => serde_json::to_string_pretty(topology)
                .map_err(|err| AppError::command("mn", err.to_string())),
            "" => Err(AppError::command("mn", "missing command")),
            other => Err(AppError::command("mn", format!("unknown command '{other}'"))),
        }
    }

    fn help(&self, topic: &str) -> String {
        let topic = topic.trim();
        COMMANDS
            .iter()
            .filter(|(name, _)| topic.is_empty() || *name == topic)
            .map(|(name, help)| format!("  {name}: {help}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use r_ncs_db::{DbState, MemoryDatabase};
    use r_ncs_net::{OfflineProvider, TopologySpec};

    #[test]
    fn lists_nodes_and_links() {
        let mut db = MemoryDatabase::new("ncs", "ncs", DbState::Fresh);
        let provider = OfflineProvider::new("single,2".parse::<TopologySpec>().unwrap().build());
        let mut ctx = AppContext {
            db: &mut db,
            provider: &provider,
        };
        let mut console = MnConsole;
        assert_eq!(console.execute(&mut ctx, "nodes").unwrap(), "s1 h1 h2");
        assert_eq!(
            console.execute(&mut ctx, "links").unwrap(),
            "s1 <-> h1\ns1 <-> h2"
        );
        assert!(console.execute(&mut ctx, "dump").unwrap().contains("\"switches\""));
        assert!(console.execute(&mut ctx, "pingall").is_err());
        assert_eq!(console.help("links"), "  links: list links");
    }
}
