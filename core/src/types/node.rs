//! Node — a physical or virtual host in the fleet.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A host capable of running containers. `name` is the unique identifier
/// within one stage and the join key for containers.
///
/// All attributes are declared fields; the one free-form map is `status`,
/// which holds facts refreshed during observation passes (free memory, free
/// disk). Nodes are never deleted automatically — removal is an explicit
/// inventory edit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub name: String,
    pub external_ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_ip: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    /// Observation-time facts, e.g. `free_mem` (MB) and `free_disk`.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub status: HashMap<String, String>,
}

impl Node {
    pub fn new(name: &str, external_ip: &str) -> Self {
        Node {
            name: name.to_string(),
            external_ip: external_ip.to_string(),
            internal_ip: None,
            roles: Vec::new(),
            user: None,
            os: None,
            status: HashMap::new(),
        }
    }

    /// The address other fleet members should use. Falls back to the
    /// external IP when no internal address is recorded.
    pub fn internal_ip(&self) -> &str {
        self.internal_ip.as_deref().unwrap_or(&self.external_ip)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Whether any of the given identifiers matches this node's name or
    /// one of its addresses.
    pub fn has_id(&self, ids: &[String]) -> bool {
        ids.iter().any(|id| {
            id == &self.name || id == &self.external_ip || id == self.internal_ip()
        })
    }

    /// Parsed `status.free_mem` in megabytes; absent or malformed reads as 0.
    pub fn free_mem(&self) -> u64 {
        self.status
            .get("free_mem")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }
}
