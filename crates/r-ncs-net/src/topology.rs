//! ---
//! ncs_section: "05-networking-external-interfaces"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Network provider interface and topology model."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
use std::str::FromStr;

use indexmap::IndexSet;
use serde::Serialize;

use crate::{NetError, Result};

/// A switch or host in the topology snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Node {
    /// Name as known to the emulator (`s3`, `h12`).
    pub name: String,
    /// Numeric identifier parsed from the name.
    pub id: u32,
}

impl Node {
    fn switch(id: u32) -> Self {
        Self {
            name: format!("s{id}"),
            id,
        }
    }

    fn host(id: u32) -> Self {
        Self {
            name: format!("h{id}"),
            id,
        }
    }

    /// True when the node is a host rather than a switch.
    pub fn is_host(&self) -> bool {
        self.name.starts_with('h')
    }
}

/// Bidirectional link between two named nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Link {
    /// First endpoint.
    pub a: String,
    /// Second endpoint.
    pub b: String,
}

/// Snapshot of the provider's topology, used for the bulk load.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Topology {
    /// Switches in insertion order.
    pub switches: Vec<Node>,
    /// Hosts in insertion order.
    pub hosts: Vec<Node>,
    /// Links in insertion order.
    pub links: Vec<Link>,
}

#[derive(Default)]
struct TopologyBuilder {
    switches: IndexSet<Node>,
    hosts: IndexSet<Node>,
    links: Vec<Link>,
}

impl TopologyBuilder {
    fn add_switch(&mut self, id: u32) -> String {
        let node = Node::switch(id);
        let name = node.name.clone();
        self.switches.insert(node);
        name
    }

    fn add_host(&mut self, id: u32) -> String {
        let node = Node::host(id);
        let name = node.name.clone();
        self.hosts.insert(node);
        name
    }

    fn add_link(&mut self, a: &str, b: &str) {
        self.links.push(Link {
            a: a.to_owned(),
            b: b.to_owned(),
        });
    }

    fn finish(self) -> Topology {
        Topology {
            switches: self.switches.into_iter().collect(),
            hosts: self.hosts.into_iter().collect(),
            links: self.links,
        }
    }
}

/// Parsed topology description such as `fattree,4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologySpec {
    /// One switch with `n` hosts.
    Single(u32),
    /// `n` switches in a chain, one host per switch.
    Linear(u32),
    /// Complete tree of switches with hosts at the leaves.
    Tree {
        /// Switch levels.
        depth: u32,
        /// Children per switch.
        fanout: u32,
    },
    /// Three-tier fat tree with `k` pods.
    FatTree(u32),
}

impl FromStr for TopologySpec {
    type Err = NetError;

    fn from_str(spec: &str) -> Result<Self> {
        let invalid = |reason: &str| NetError::InvalidTopology {
            spec: spec.to_owned(),
            reason: reason.to_owned(),
        };
        let mut parts = spec.split(',').map(str::trim);
        let kind = parts.next().unwrap_or_default();
        let args = parts
            .map(|p| p.parse::<i64>().map_err(|_| invalid("arguments must be integers")))
            .collect::<Result<Vec<_>>>()?;
        let arg = |index: usize, default: i64| args.get(index).copied().unwrap_or(default);
        let positive = |value: i64, what: &str| {
            u32::try_from(value)
                .ok()
                .filter(|v| *v > 0)
                .ok_or_else(|| invalid(&format!("{what} must be positive")))
        };

        match kind {
            "single" => Ok(Self::Single(positive(arg(0, 2), "host count")?)),
            "linear" => Ok(Self::Linear(positive(arg(0, 2), "switch count")?)),
            "tree" => Ok(Self::Tree {
                depth: positive(arg(0, 1), "depth")?,
                fanout: positive(arg(1, 2), "fanout")?,
            }),
            "fattree" => {
                u32::try_from(arg(0, 4))
                    .ok()
                    .filter(|k| *k > 0 && k % 2 == 0)
                    .map(Self::FatTree)
                    .ok_or_else(|| {
                        invalid("the pod number of a fat tree must be a positive even number")
                    })
            }
            other => Err(invalid(&format!("unknown topology kind '{other}'"))),
        }
    }
}

impl TopologySpec {
    /// Build the topology snapshot described by this spec.
    pub fn build(&self) -> Topology {
        let mut builder = TopologyBuilder::default();
        match *self {
            Self::Single(hosts) => {
                let switch = builder.add_switch(1);
                for h in 1..=hosts {
                    let host = builder.add_host(h);
                    builder.add_link(&switch, &host);
                }
            }
            Self::Linear(count) => {
                let mut previous: Option<String> = None;
                for i in 1..=count {
                    let switch = builder.add_switch(i);
                    let host = builder.add_host(i);
                    builder.add_link(&host, &switch);
                    if let Some(prev) = previous.take() {
                        builder.add_link(&switch, &prev);
                    }
                    previous = Some(switch);
                }
            }
            Self::Tree { depth, fanout } => {
                let mut next_switch = 1;
                let mut next_host = 1;
                add_tree(&mut builder, depth, fanout, &mut next_switch, &mut next_host);
            }
            Self::FatTree(k) => build_fattree(&mut builder, k),
        }
        builder.finish()
    }
}

fn add_tree(
    builder: &mut TopologyBuilder,
    depth: u32,
    fanout: u32,
    next_switch: &mut u32,
    next_host: &mut u32,
) -> String {
    if depth == 0 {
        let name = builder.add_host(*next_host);
        *next_host += 1;
        return name;
    }
    let switch = builder.add_switch(*next_switch);
    *next_switch += 1;
    for _ in 0..fanout {
        let child = add_tree(builder, depth - 1, fanout, next_switch, next_host);
        builder.add_link(&switch, &child);
    }
    switch
}

fn build_fattree(builder: &mut TopologyBuilder, k: u32) {
    let half = k / 2;
    let cores = half * half;
    let aggs = half * k;
    let edges = half * k;

    for pod in 0..k {
        let agg_offset = cores + half * pod;
        let edge_offset = cores + aggs + half * pod;
        let host_offset = cores + aggs + edges + half * half * pod;

        for agg in 0..half {
            let core_offset = agg * half;
            let agg_sw = builder.add_switch(agg_offset + agg);

            for core in 0..half {
                let core_sw = builder.add_switch(core_offset + core);
                builder.add_link(&agg_sw, &core_sw);
            }

            for edge in 0..half {
                let edge_sw = builder.add_switch(edge_offset + edge);
                builder.add_link(&agg_sw, &edge_sw);
            }
        }

        for edge in 0..half {
            let edge_sw = Node::switch(edge_offset + edge).name;
            for h in 0..half {
                let host = builder.add_host(host_offset + half * edge + h);
                builder.add_link(&edge_sw, &host);
            }
        }
    }
}
