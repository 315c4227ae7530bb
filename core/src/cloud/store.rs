//! Per-stage inventory cache.
//!
//! One YAML document per stage under the configured cloud directory, holding
//! the node and container lists. The cache is rewritten wholesale after every
//! successful update; a missing file is the empty inventory, never an error.
//! There is no locking — concurrent updates against one stage must be
//! serialized by the operator.

use std::fs;
use std::path::{Path, PathBuf};

use crate::cloud::Cloud;
use crate::error::Result;

/// Loads and saves `Cloud` snapshots.
pub struct CloudStore {
    dir: PathBuf,
}

impl CloudStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CloudStore { dir: dir.into() }
    }

    /// `<dir>/<stage>.yml`
    pub fn cache_path(&self, stage: &str) -> PathBuf {
        self.dir.join(format!("{}.yml", stage))
    }

    /// Load the cached inventory for a stage. An absent cache file yields an
    /// empty inventory.
    pub fn load(&self, stage: &str) -> Result<Cloud> {
        let path = self.cache_path(stage);
        if !path.exists() {
            return Ok(Cloud::new(stage));
        }
        let content = fs::read_to_string(&path)?;
        let mut cloud: Cloud = serde_yaml::from_str(&content)?;
        cloud.stage = stage.to_string();
        Ok(cloud)
    }

    /// Rewrite the cache file for the cloud's stage, creating the directory
    /// on demand.
    pub fn save(&self, cloud: &Cloud) -> Result<()> {
        if !self.dir.is_dir() {
            fs::create_dir_all(&self.dir)?;
        }
        let content = serde_yaml::to_string(cloud)?;
        fs::write(self.cache_path(&cloud.stage), content)?;
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::container::{Container, ContainerState};
    use crate::types::node::Node;
    use std::collections::HashMap;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("caravel-store-{}-{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn sample_cloud() -> Cloud {
        let mut cloud = Cloud::new("staging");
        let mut node = Node::new("h1", "10.0.0.1");
        node.internal_ip = Some("192.168.1.1".into());
        node.roles = vec!["host".into()];
        node.status.insert("free_mem".into(), "2048".into());
        cloud.nodes.push(node);
        cloud.containers.push(Container {
            host: "h1".into(),
            ctype: "web".into(),
            instance: 1,
            app_key: "cp".into(),
            image: "reg/cp-web:latest".into(),
            state: ContainerState::Running,
            ip_address: Some("172.17.0.2".into()),
            meta: HashMap::from([("image_id".into(), "2024-05-01T10:00:00Z".into())]),
        });
        cloud
    }

    #[test]
    fn missing_cache_is_empty_inventory() {
        let store = CloudStore::new(temp_dir("missing"));
        let cloud = store.load("staging").unwrap();
        assert_eq!(cloud.stage, "staging");
        assert!(cloud.nodes.is_empty());
        assert!(cloud.containers.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = temp_dir("roundtrip");
        let store = CloudStore::new(&dir);
        let cloud = sample_cloud();
        store.save(&cloud).unwrap();

        let back = store.load("staging").unwrap();
        assert_eq!(back.nodes, cloud.nodes);
        assert_eq!(back.containers, cloud.containers);
        assert_eq!(back.containers[0].name(), "cp.web.1");

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn save_rewrites_wholesale() {
        let dir = temp_dir("rewrite");
        let store = CloudStore::new(&dir);
        store.save(&sample_cloud()).unwrap();

        let mut emptied = Cloud::new("staging");
        emptied.nodes = sample_cloud().nodes;
        store.save(&emptied).unwrap();

        let back = store.load("staging").unwrap();
        assert_eq!(back.nodes.len(), 1);
        assert!(back.containers.is_empty());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn stages_use_separate_files() {
        let store = CloudStore::new(temp_dir("stages"));
        assert_ne!(store.cache_path("staging"), store.cache_path("production"));
        assert!(store
            .cache_path("production")
            .to_string_lossy()
            .ends_with("production.yml"));
    }
}
