//! Container — one running or intended-to-run workload instance.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metadata key under which the observed image creation token is stored.
pub const META_IMAGE_ID: &str = "image_id";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContainerState {
    /// Described by desired state, not yet started.
    Ready,
    /// Reconstructed from a runtime introspection pass.
    Running,
}

/// One numbered unit of a workload type on a host.
///
/// The derived name `app_key.type.instance` is the wire-level identifier:
/// it is both the container runtime's `--name` and the reconciliation key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Container {
    /// Owning node, by name.
    pub host: String,
    /// Workload type identifier.
    #[serde(rename = "type")]
    pub ctype: String,
    /// Positive instance number; uniqueness scope depends on placement mode.
    pub instance: u32,
    pub app_key: String,
    /// Fully-qualified image reference.
    pub image: String,
    pub state: ContainerState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// Runtime-observed facts, e.g. the underlying image's creation token.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub meta: HashMap<String, String>,
}

impl Container {
    /// Derived identity: `app_key.type.instance`.
    pub fn name(&self) -> String {
        format!("{}.{}.{}", self.app_key, self.ctype, self.instance)
    }

    /// Composite key used by the diff engine to match desired against actual.
    pub fn match_key(&self) -> String {
        format!("{}+{}+{}", self.host, self.ctype, self.instance)
    }

    /// Observed image identity token, if the collector recorded one.
    pub fn image_id(&self) -> Option<&str> {
        self.meta.get(META_IMAGE_ID).map(|s| s.as_str())
    }

    /// Parse a runtime container name of the form `app_key.type.instance`.
    ///
    /// Returns `None` for names that do not belong to this application
    /// (wrong key, missing segments, non-numeric instance) so foreign
    /// containers on shared hosts are ignored rather than reconciled away.
    pub fn parse_name(name: &str, app_key: &str) -> Option<(String, u32)> {
        let rest = name.strip_prefix(app_key)?.strip_prefix('.')?;
        let (ctype, instance) = rest.rsplit_once('.')?;
        if ctype.is_empty() {
            return None;
        }
        let instance: u32 = instance.parse().ok()?;
        Some((ctype.to_string(), instance))
    }
}
