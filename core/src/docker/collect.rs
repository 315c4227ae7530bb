//! Observed-state collection.
//!
//! Asks each host for its running containers through the remote runner and
//! reconstructs `Container` records from `docker inspect` JSON. Also
//! refreshes per-node status facts (free memory, free disk) and derives the
//! latest-known image identity tokens used for staleness comparison.

use std::collections::HashMap;

use log::debug;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::infrastructure::RemoteRunner;
use crate::types::config::FleetConfig;
use crate::types::container::{Container, ContainerState, META_IMAGE_ID};
use crate::types::node::Node;

/// Metadata key for the observed image digest.
pub const META_IMAGE_SHA: &str = "image_sha";

#[derive(Debug, Deserialize)]
struct InspectRecord {
    #[serde(rename = "Name")]
    name: String,
    /// Digest of the image the container was created from.
    #[serde(rename = "Image")]
    image_sha: String,
    #[serde(rename = "Config")]
    config: InspectConfig,
    #[serde(rename = "NetworkSettings", default)]
    network: Option<NetworkSettings>,
}

#[derive(Debug, Deserialize)]
struct InspectConfig {
    #[serde(rename = "Image")]
    image: String,
}

#[derive(Debug, Default, Deserialize)]
struct NetworkSettings {
    #[serde(rename = "IPAddress", default)]
    ip_address: String,
}

#[derive(Debug, Deserialize)]
struct ImageRecord {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Created")]
    created: String,
}

/// Collect the running containers on one node.
///
/// Containers whose names do not parse as `app_key.type.instance` belong to
/// other applications and are ignored.
pub fn collect_node(
    runner: &dyn RemoteRunner,
    node: &Node,
    app_key: &str,
) -> Result<Vec<Container>> {
    let ids = runner.run(node, "docker ps -q --no-trunc")?;
    let ids: Vec<&str> = ids.split_whitespace().collect();
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let inspect = runner.run(node, &format!("docker inspect {}", ids.join(" ")))?;
    let shas = image_shas(&inspect, &node.name)?;
    let created = if shas.is_empty() {
        HashMap::new()
    } else {
        let out = runner.run(node, &format!("docker image inspect {}", shas.join(" ")))?;
        parse_image_created(&out, &node.name)?
    };
    parse_containers(&node.name, app_key, &inspect, &created)
}

/// Pure parser for a `docker inspect` JSON array.
pub fn parse_containers(
    host: &str,
    app_key: &str,
    inspect_json: &str,
    image_created: &HashMap<String, String>,
) -> Result<Vec<Container>> {
    let records: Vec<InspectRecord> = serde_json::from_str(inspect_json).map_err(|e| {
        Error::Parse {
            host: host.to_string(),
            message: format!("docker inspect: {}", e),
        }
    })?;

    let mut containers = Vec::new();
    for record in records {
        let name = record.name.trim_start_matches('/');
        let Some((ctype, instance)) = Container::parse_name(name, app_key) else {
            debug!("[{}] ignoring foreign container {}", host, name);
            continue;
        };
        let mut meta = HashMap::new();
        meta.insert(META_IMAGE_SHA.to_string(), record.image_sha.clone());
        if let Some(created) = image_created.get(&record.image_sha) {
            meta.insert(META_IMAGE_ID.to_string(), created.clone());
        }
        let ip = record
            .network
            .map(|n| n.ip_address)
            .filter(|ip| !ip.is_empty());
        containers.push(Container {
            host: host.to_string(),
            ctype,
            instance,
            app_key: app_key.to_string(),
            image: record.config.image,
            state: ContainerState::Running,
            ip_address: ip,
            meta,
        });
    }
    Ok(containers)
}

fn image_shas(inspect_json: &str, host: &str) -> Result<Vec<String>> {
    let records: Vec<InspectRecord> =
        serde_json::from_str(inspect_json).map_err(|e| Error::Parse {
            host: host.to_string(),
            message: format!("docker inspect: {}", e),
        })?;
    let mut shas: Vec<String> = records.into_iter().map(|r| r.image_sha).collect();
    shas.sort();
    shas.dedup();
    Ok(shas)
}

/// Pure parser for a `docker image inspect` JSON array: digest -> created.
pub fn parse_image_created(json: &str, host: &str) -> Result<HashMap<String, String>> {
    let records: Vec<ImageRecord> = serde_json::from_str(json).map_err(|e| Error::Parse {
        host: host.to_string(),
        message: format!("docker image inspect: {}", e),
    })?;
    Ok(records.into_iter().map(|r| (r.id, r.created)).collect())
}

/// Refresh a node's observed status: available memory in MB and free root
/// disk space.
pub fn refresh_status(runner: &dyn RemoteRunner, node: &mut Node) -> Result<()> {
    let mem = runner.run(node, "free -m | awk '/^Mem:/{print $7}'")?;
    let mem = mem.trim();
    if !mem.is_empty() {
        node.status.insert("free_mem".into(), mem.to_string());
    }
    let disk = runner.run(node, "df -Ph / | awk 'NR==2{print $4}'")?;
    let disk = disk.trim();
    if !disk.is_empty() {
        node.status.insert("free_disk".into(), disk.to_string());
    }
    Ok(())
}

/// The latest-known image identity token per declared image.
///
/// Queries every host for each image's creation timestamp and keeps the
/// newest one seen anywhere in the fleet. Hosts that do not have the image
/// yet contribute nothing.
pub fn fetch_image_ids(
    runner: &dyn RemoteRunner,
    nodes: &[&Node],
    cfg: &FleetConfig,
) -> Result<HashMap<String, String>> {
    let mut ids: HashMap<String, String> = HashMap::new();
    let mut image_keys: Vec<&String> = cfg.images.keys().collect();
    image_keys.sort();
    for key in image_keys {
        let image_ref = cfg.image_ref(&cfg.images[key]);
        for node in nodes {
            let cmd = format!(
                "docker image inspect --format '{{{{.Created}}}}' {} 2>/dev/null || true",
                image_ref
            );
            let out = runner.run(node, &cmd)?;
            let token = out.trim();
            if token.is_empty() {
                continue;
            }
            // RFC 3339 timestamps order lexicographically; keep the newest.
            match ids.get(key.as_str()) {
                Some(existing) if existing.as_str() >= token => {}
                _ => {
                    ids.insert(key.clone(), token.to_string());
                }
            }
        }
    }
    Ok(ids)
}
