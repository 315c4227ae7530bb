//! The declarative fleet configuration document.
//!
//! Workload types, image templates and stage settings are declared in a
//! single YAML file (`caravel.yml` by default) and parsed into the typed
//! structs below. Nothing in here is executable — templating and image
//! building belong to external pipelines.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Role tag identifying nodes that run containers.
pub const HOST_ROLE: &str = "host";

/// Top-level configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Application key prefixed to every container name.
    pub app_key: String,
    /// Stage (environment) identifier; selects the inventory cache file.
    #[serde(default = "default_stage")]
    pub stage: String,
    /// Image registry prepended to image references when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    /// Directory for inventory cache files.
    #[serde(default = "default_cloud_dir")]
    pub cloud_dir: String,
    /// Root for synthesized per-instance volume host paths.
    #[serde(default = "default_volume_root")]
    pub volume_root: String,
    /// Seconds to wait after each container start before the next action.
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,
    /// SSH user for hosts that do not declare their own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_user: Option<String>,
    /// Optional external inventory API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderConfig>,
    /// Image templates by image id.
    #[serde(default)]
    pub images: HashMap<String, ImageDef>,
    /// Workload types by type id.
    #[serde(default)]
    pub containers: HashMap<String, ContainerType>,
    /// Ambient values referenced by `env_from` indirections.
    #[serde(default)]
    pub lookups: HashMap<String, String>,
}

fn default_stage() -> String {
    "production".into()
}

fn default_cloud_dir() -> String {
    "config/cloud".into()
}

fn default_volume_root() -> String {
    "/volumes".into()
}

fn default_settle_secs() -> u64 {
    5
}

/// External inventory provider endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub url: String,
    pub token: String,
}

/// Instance numbering and counting scope for a workload type.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InstanceScope {
    /// One shared set of instance numbers across all candidate hosts.
    #[default]
    Global,
    /// `count` instances on every candidate host, numbered from 1 per host.
    PerHost,
}

/// A declared workload type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerType {
    /// Image id this type runs (must exist in `images`).
    pub image: String,
    /// Desired instance count (per the numbering scope).
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub scope: InstanceScope,
    /// Explicit candidate host filter; defaults to all role-`host` nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosts: Option<Vec<String>>,
    /// Statically declared environment.
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Indirect environment: env var name -> `lookups` key.
    #[serde(default)]
    pub env_from: HashMap<String, String>,
    /// Free-form extra arguments appended to the start command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_args: Option<String>,
}

fn default_count() -> u32 {
    1
}

/// A declared container image template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageDef {
    /// Image name within the registry.
    pub name: String,
    #[serde(default = "default_tag")]
    pub tag: String,
    /// Host allowlist consulted by the placement selector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosts: Option<Vec<String>>,
    /// Port interfaces by interface name.
    #[serde(default)]
    pub ports: HashMap<String, PortDef>,
    /// Volumes by volume name.
    #[serde(default)]
    pub volumes: HashMap<String, VolumeDef>,
}

fn default_tag() -> String {
    "latest".into()
}

/// One declared port interface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortDef {
    /// Container-side port.
    pub cport: u16,
    /// Host-side base port; defaults to `cport`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hport: Option<u16>,
    /// When set, the host port is not offset by the instance number.
    #[serde(default)]
    pub no_range: bool,
}

/// One declared volume mapping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VolumeDef {
    /// Container-side mount path.
    pub cpath: String,
    /// Host-side path; synthesized per instance when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hpath: Option<String>,
}

impl FleetConfig {
    /// Load and validate a configuration document.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parse and validate a configuration document from a string.
    pub fn parse(content: &str) -> Result<Self> {
        let cfg: FleetConfig = serde_yaml::from_str(content)
            .map_err(|e| Error::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Configuration errors are fatal: never continue with partial config.
    fn validate(&self) -> Result<()> {
        if self.app_key.is_empty() {
            return Err(Error::Config("app_key must not be empty".into()));
        }
        for (ctype, ct) in &self.containers {
            if !self.images.contains_key(&ct.image) {
                return Err(Error::Config(format!(
                    "container type '{}' references unknown image '{}'",
                    ctype, ct.image
                )));
            }
            for (var, key) in &ct.env_from {
                if !self.lookups.contains_key(key) {
                    return Err(Error::Config(format!(
                        "container type '{}' env_from '{}' references unknown lookup '{}'",
                        ctype, var, key
                    )));
                }
            }
        }
        Ok(())
    }

    /// The image definition for a workload type. Validation guarantees
    /// existence for parsed configs.
    pub fn image_for(&self, ctype: &ContainerType) -> Result<&ImageDef> {
        self.images.get(&ctype.image).ok_or_else(|| {
            Error::Config(format!("unknown image '{}'", ctype.image))
        })
    }

    /// Fully-qualified image reference: `{registry}/{name}:{tag}`.
    pub fn image_ref(&self, image: &ImageDef) -> String {
        match &self.registry {
            Some(reg) => format!("{}/{}:{}", reg, image.name, image.tag),
            None => format!("{}:{}", image.name, image.tag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
app_key: cp
stage: staging
registry: reg.example.com:5000
images:
  web:
    name: cp-web
    ports:
      http: { cport: 8080 }
      admin: { cport: 9090, hport: 9100, no_range: true }
    volumes:
      logs: { cpath: /var/log/app }
containers:
  web:
    image: web
    count: 2
    hosts: [h1, h2]
    env: { RAILS_ENV: production }
    env_from: { APP_TOKEN: app_token }
lookups:
  app_token: xyz
"#;

    #[test]
    fn parses_full_document() {
        let cfg = FleetConfig::parse(DOC).unwrap();
        assert_eq!(cfg.app_key, "cp");
        assert_eq!(cfg.stage, "staging");
        let web = &cfg.containers["web"];
        assert_eq!(web.count, 2);
        assert_eq!(web.scope, InstanceScope::Global);
        let img = cfg.image_for(web).unwrap();
        assert_eq!(cfg.image_ref(img), "reg.example.com:5000/cp-web:latest");
        assert!(img.ports["admin"].no_range);
        assert_eq!(img.ports["http"].hport, None);
    }

    #[test]
    fn defaults_apply() {
        let cfg = FleetConfig::parse("app_key: cp\n").unwrap();
        assert_eq!(cfg.stage, "production");
        assert_eq!(cfg.volume_root, "/volumes");
        assert_eq!(cfg.settle_secs, 5);
        assert_eq!(cfg.cloud_dir, "config/cloud");
    }

    #[test]
    fn unknown_image_is_fatal() {
        let doc = "app_key: cp\ncontainers:\n  web: { image: nope }\n";
        let err = FleetConfig::parse(doc).unwrap_err();
        assert!(err.to_string().contains("unknown image 'nope'"));
    }

    #[test]
    fn unknown_lookup_is_fatal() {
        let doc = r#"
app_key: cp
images:
  web: { name: cp-web }
containers:
  web:
    image: web
    env_from: { TOKEN: missing }
"#;
        let err = FleetConfig::parse(doc).unwrap_err();
        assert!(err.to_string().contains("unknown lookup 'missing'"));
    }

    #[test]
    fn per_host_scope_parses() {
        let doc = r#"
app_key: cp
images:
  worker: { name: cp-worker }
containers:
  worker:
    image: worker
    scope: per_host
"#;
        let cfg = FleetConfig::parse(doc).unwrap();
        assert_eq!(cfg.containers["worker"].scope, InstanceScope::PerHost);
        assert_eq!(cfg.containers["worker"].count, 1);
    }

    #[test]
    fn image_ref_without_registry() {
        let cfg = FleetConfig::parse("app_key: cp\nimages:\n  w: { name: cp-w }\n").unwrap();
        assert_eq!(cfg.image_ref(&cfg.images["w"]), "cp-w:latest");
    }
}
