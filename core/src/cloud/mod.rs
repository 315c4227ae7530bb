//! The cloud inventory — the fleet's current known state.
//!
//! `Cloud` aggregates the node and container lists for one stage. It is
//! loaded from and saved to a flat YAML cache file (`store`), optionally
//! refreshed from an external provider API (`provider`).

pub mod provider;
pub mod store;

use serde::{Deserialize, Serialize};

use crate::types::config::HOST_ROLE;
use crate::types::container::Container;
use crate::types::node::Node;

/// The aggregate inventory for one stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cloud {
    #[serde(skip)]
    pub stage: String,
    #[serde(default, rename = "hosts")]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub containers: Vec<Container>,
}

impl Cloud {
    pub fn new(stage: &str) -> Self {
        Cloud {
            stage: stage.to_string(),
            nodes: Vec::new(),
            containers: Vec::new(),
        }
    }

    /// Nodes tagged with the given role, in inventory order.
    pub fn nodes_with_role(&self, role: &str) -> Vec<&Node> {
        self.nodes.iter().filter(|n| n.has_role(role)).collect()
    }

    /// Nodes that run containers.
    pub fn host_nodes(&self) -> Vec<&Node> {
        self.nodes_with_role(HOST_ROLE)
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// One-line per-host summary for end-of-pass reporting: container count
    /// and free-resource status.
    pub fn summary(&self) -> Vec<String> {
        let mut lines = Vec::new();
        lines.push(format!(
            "{}: {} host(s), {} container(s)",
            self.stage,
            self.host_nodes().len(),
            self.containers.len()
        ));
        for node in self.host_nodes() {
            let count = self
                .containers
                .iter()
                .filter(|c| c.host == node.name)
                .count();
            let mem = node
                .status
                .get("free_mem")
                .map(|m| format!("{} MB free", m))
                .unwrap_or_else(|| "mem unknown".into());
            let disk = node
                .status
                .get("free_disk")
                .map(|d| format!(", {} disk free", d))
                .unwrap_or_default();
            lines.push(format!(
                "  {} ({}): {} container(s), {}{}",
                node.name,
                node.internal_ip(),
                count,
                mem,
                disk
            ));
        }
        lines
    }
}
