//! Docker command synthesis.
//!
//! `DockerCommandBuilder` turns a container instance plus its type and image
//! templates into executable `docker run` / `docker stop` command strings.
//! It builds strings only and never spawns processes — the remote runner is
//! responsible for execution, which keeps everything here unit-testable
//! without a live host.

use std::collections::HashMap;

use crate::types::config::{ContainerType, FleetConfig, ImageDef, PortDef};
use crate::types::container::Container;
use crate::types::node::Node;

/// Prefix for synthesized container-identity environment variables.
const ENV_PREFIX: &str = "CNTR";

/// Builds container lifecycle command strings.
pub struct DockerCommandBuilder {
    app_key: String,
    volume_root: String,
}

impl DockerCommandBuilder {
    pub fn new(cfg: &FleetConfig) -> Self {
        DockerCommandBuilder {
            app_key: cfg.app_key.clone(),
            volume_root: cfg.volume_root.clone(),
        }
    }

    /// The effective host port for one interface of one instance.
    ///
    /// `hport` defaults to `cport`; unless the interface is flagged
    /// `no_range`, the port is offset by the instance number so concurrent
    /// instances of a type never collide. This is the sole port-collision
    /// avoidance mechanism.
    pub fn host_port(port: &PortDef, instance: u32) -> u32 {
        let base = u32::from(port.hport.unwrap_or(port.cport));
        if port.no_range {
            base
        } else {
            base + instance
        }
    }

    /// Host path for a volume: the declared one, or a synthesized
    /// per-instance path `{volume_root}/{name}.{instance}`.
    pub fn volume_host_path(&self, name: &str, hpath: Option<&str>, instance: u32) -> String {
        match hpath {
            Some(p) => p.to_string(),
            None => format!("{}/{}.{}", self.volume_root, name, instance),
        }
    }

    /// The merged environment for a container, later layers overriding
    /// earlier ones: synthesized identity metadata, then the type's static
    /// env, then indirect lookups.
    pub fn container_env(
        &self,
        container: &Container,
        ctype: &ContainerType,
        image: &ImageDef,
        node: &Node,
        lookups: &HashMap<String, String>,
    ) -> Vec<(String, String)> {
        let mut env: Vec<(String, String)> = Vec::new();

        let mut set = |key: String, value: String| {
            if let Some(slot) = env.iter_mut().find(|(k, _)| *k == key) {
                slot.1 = value;
            } else {
                env.push((key, value));
            }
        };

        // Layer 1: identity metadata under the namespaced prefix.
        set(format!("{}_NAME", ENV_PREFIX), container.name());
        set(format!("{}_TYPE", ENV_PREFIX), container.ctype.clone());
        set(
            format!("{}_INSTANCE", ENV_PREFIX),
            container.instance.to_string(),
        );
        set(format!("{}_IMAGE", ENV_PREFIX), container.image.clone());
        set(format!("{}_HOST", ENV_PREFIX), node.name.clone());
        set(
            format!("{}_HOST_IP", ENV_PREFIX),
            node.internal_ip().to_string(),
        );
        let mut if_names: Vec<&String> = image.ports.keys().collect();
        if_names.sort();
        set(
            format!("{}_PORTS", ENV_PREFIX),
            if_names
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(","),
        );
        for name in if_names {
            let port = &image.ports[name];
            let upper = name.to_uppercase();
            set(
                format!("{}_PORT_{}_C", ENV_PREFIX, upper),
                port.cport.to_string(),
            );
            set(
                format!("{}_PORT_{}_H", ENV_PREFIX, upper),
                Self::host_port(port, container.instance).to_string(),
            );
        }

        // Layer 2: statically declared environment.
        let mut static_keys: Vec<&String> = ctype.env.keys().collect();
        static_keys.sort();
        for key in static_keys {
            set(key.clone(), ctype.env[key].clone());
        }

        // Layer 3: indirect lookups against ambient configuration.
        let mut from_keys: Vec<&String> = ctype.env_from.keys().collect();
        from_keys.sort();
        for var in from_keys {
            if let Some(value) = lookups.get(&ctype.env_from[var]) {
                set(var.clone(), value.clone());
            }
        }

        env
    }

    /// The single `docker run` invocation that starts a container.
    pub fn start_command(
        &self,
        container: &Container,
        ctype: &ContainerType,
        image: &ImageDef,
        node: &Node,
        lookups: &HashMap<String, String>,
    ) -> String {
        let mut parts: Vec<String> = vec![
            "docker run -d".into(),
            format!("--name {}", shell_escape(&container.name())),
            "--restart=always".into(),
        ];

        let mut port_names: Vec<&String> = image.ports.keys().collect();
        port_names.sort();
        for name in port_names {
            let port = &image.ports[name];
            parts.push(format!(
                "-p {}:{}",
                Self::host_port(port, container.instance),
                port.cport
            ));
        }

        let mut volume_names: Vec<&String> = image.volumes.keys().collect();
        volume_names.sort();
        for name in volume_names {
            let vol = &image.volumes[name];
            let hpath = self.volume_host_path(name, vol.hpath.as_deref(), container.instance);
            parts.push(format!(
                "-v {}:{}",
                shell_escape(&hpath),
                shell_escape(&vol.cpath)
            ));
        }

        for (key, value) in self.container_env(container, ctype, image, node, lookups) {
            parts.push(format!("-e {}={}", key, shell_escape(&value)));
        }

        if let Some(extra) = ctype.extra_args.as_deref() {
            if !extra.is_empty() {
                parts.push(extra.to_string());
            }
        }

        parts.push(container.image.clone());
        parts.join(" ")
    }

    /// Compound command that stops, then removes, a named container.
    pub fn stop_command(&self, name: &str) -> String {
        let escaped = shell_escape(name);
        format!("docker stop {} && docker rm {}", escaped, escaped)
    }

    pub fn app_key(&self) -> &str {
        &self.app_key
    }
}

/// Escape a value for safe literal inclusion in a shell command line.
pub fn shell_escape(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }
    if s.chars().all(|c| {
        c.is_ascii_alphanumeric()
            || c == '-'
            || c == '_'
            || c == '.'
            || c == '/'
            || c == ':'
            || c == ','
            || c == '='
            || c == '@'
    }) {
        return s.to_string();
    }
    let escaped = s.replace('\'', "'\\''");
    format!("'{}'", escaped)
}
