//! Change execution.
//!
//! Applies a planned change list one action at a time through the remote
//! runner: no parallel dispatch, no rollback, no retry. A remote failure
//! aborts the pass; placement exhaustion only skips the affected create.

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use log::{info, warn};

use crate::cloud::Cloud;
use crate::convergence::placement;
use crate::convergence::planner::Change;
use crate::docker::DockerCommandBuilder;
use crate::error::{Error, Result};
use crate::infrastructure::RemoteRunner;
use crate::types::config::FleetConfig;
use crate::types::container::{Container, ContainerState, META_IMAGE_ID};

/// Outcome of one execution pass, by container name.
#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
    /// Creates skipped because no host satisfied the placement filters.
    pub skipped: Vec<String>,
}

impl ApplyReport {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
            && self.updated.is_empty()
            && self.deleted.is_empty()
            && self.skipped.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} created, {} updated, {} deleted, {} skipped",
            self.created.len(),
            self.updated.len(),
            self.deleted.len(),
            self.skipped.len()
        )
    }
}

/// Applies change lists sequentially, updating the inventory as it goes.
pub struct ChangeExecutor<'a> {
    cfg: &'a FleetConfig,
    builder: DockerCommandBuilder,
    settle: Duration,
    dry_run: bool,
}

impl<'a> ChangeExecutor<'a> {
    pub fn new(cfg: &'a FleetConfig, dry_run: bool) -> Self {
        ChangeExecutor {
            cfg,
            builder: DockerCommandBuilder::new(cfg),
            settle: Duration::from_secs(cfg.settle_secs),
            dry_run,
        }
    }

    /// Apply every change in order. The inventory reflects the actions that
    /// actually ran; in dry-run mode commands are logged but nothing
    /// executes or mutates.
    pub fn execute(
        &self,
        changes: Vec<Change>,
        cloud: &mut Cloud,
        runner: &dyn RemoteRunner,
    ) -> Result<ApplyReport> {
        let mut report = ApplyReport::default();

        for change in changes {
            match change {
                Change::Create { desired } => {
                    let name = desired.name(&self.cfg.app_key);
                    let ct = self.cfg.containers.get(&desired.ctype).ok_or_else(|| {
                        Error::Config(format!("unknown container type '{}'", desired.ctype))
                    })?;
                    let image = self.cfg.image_for(ct)?;

                    let node = {
                        let hosts = cloud.host_nodes();
                        placement::select_host(
                            &hosts,
                            image.hosts.as_deref(),
                            Some(&desired.hosts),
                        )
                        .cloned()
                    };
                    let Some(node) = node else {
                        warn!("no host available for {}, skipping", name);
                        report.skipped.push(name);
                        continue;
                    };

                    let mut meta = HashMap::new();
                    if let Some(id) = &desired.image_id {
                        meta.insert(META_IMAGE_ID.to_string(), id.clone());
                    }
                    let mut container = Container {
                        host: node.name.clone(),
                        ctype: desired.ctype.clone(),
                        instance: desired.instance,
                        app_key: self.cfg.app_key.clone(),
                        image: desired.image.clone(),
                        state: ContainerState::Ready,
                        ip_address: None,
                        meta,
                    };
                    let cmd = self.builder.start_command(
                        &container,
                        ct,
                        image,
                        &node,
                        &self.cfg.lookups,
                    );
                    if self.dry_run {
                        info!("(dry-run) [{}] {}", node.name, cmd);
                    } else {
                        info!("starting {} on {}", name, node.name);
                        runner.run(&node, &cmd)?;
                        container.state = ContainerState::Running;
                        cloud.containers.push(container);
                        // Let the workload initialize before the next
                        // placement decision sees this host.
                        if !self.settle.is_zero() {
                            thread::sleep(self.settle);
                        }
                    }
                    report.created.push(name);
                }

                Change::Update { actual } => {
                    let name = actual.name();
                    let ct = self.cfg.containers.get(&actual.ctype).ok_or_else(|| {
                        Error::Config(format!("unknown container type '{}'", actual.ctype))
                    })?;
                    let image = self.cfg.image_for(ct)?;
                    let node = cloud.node(&actual.host).cloned().ok_or_else(|| {
                        Error::Config(format!("host '{}' not in inventory", actual.host))
                    })?;

                    let replacement = Container {
                        image: self.cfg.image_ref(image),
                        state: ContainerState::Running,
                        ip_address: None,
                        meta: HashMap::new(),
                        ..actual.clone()
                    };
                    let stop = self.builder.stop_command(&name);
                    let start = self.builder.start_command(
                        &replacement,
                        ct,
                        image,
                        &node,
                        &self.cfg.lookups,
                    );
                    if self.dry_run {
                        info!("(dry-run) [{}] {}", node.name, stop);
                        info!("(dry-run) [{}] {}", node.name, start);
                    } else {
                        info!("recreating {} on {}", name, node.name);
                        runner.run(&node, &stop)?;
                        runner.run(&node, &start)?;
                        cloud
                            .containers
                            .retain(|c| !(c.host == actual.host && c.name() == name));
                        cloud.containers.push(replacement);
                    }
                    report.updated.push(name);
                }

                Change::Delete { actual } => {
                    let name = actual.name();
                    let Some(node) = cloud.node(&actual.host).cloned() else {
                        warn!(
                            "host '{}' for {} not in inventory, skipping delete",
                            actual.host, name
                        );
                        report.skipped.push(name);
                        continue;
                    };
                    let stop = self.builder.stop_command(&name);
                    if self.dry_run {
                        info!("(dry-run) [{}] {}", node.name, stop);
                    } else {
                        info!("stopping {} on {}", name, node.name);
                        runner.run(&node, &stop)?;
                        cloud
                            .containers
                            .retain(|c| !(c.host == actual.host && c.name() == name));
                    }
                    report.deleted.push(name);
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convergence::compiler::DesiredInstance;
    use crate::infrastructure::MockRunner;
    use crate::types::node::Node;

    fn cfg() -> FleetConfig {
        FleetConfig::parse(
            r#"
app_key: cp
settle_secs: 0
images:
  web:
    name: cp-web
    ports:
      http: { cport: 8080 }
containers:
  web: { image: web, count: 2 }
"#,
        )
        .unwrap()
    }

    fn cloud_with_hosts(mems: &[(&str, u64)]) -> Cloud {
        let mut cloud = Cloud::new("test");
        for (name, mem) in mems {
            let mut n = Node::new(name, "10.0.0.1");
            n.roles = vec!["host".into()];
            n.status.insert("free_mem".into(), mem.to_string());
            cloud.nodes.push(n);
        }
        cloud
    }

    fn create_change(instance: u32, hosts: &[&str]) -> Change {
        Change::Create {
            desired: DesiredInstance {
                ctype: "web".into(),
                instance,
                hosts: hosts.iter().map(|h| h.to_string()).collect(),
                image: "cp-web:latest".into(),
                image_id: Some("v2".into()),
            },
        }
    }

    fn running(instance: u32, host: &str) -> Container {
        Container {
            host: host.into(),
            ctype: "web".into(),
            instance,
            app_key: "cp".into(),
            image: "cp-web:latest".into(),
            state: ContainerState::Running,
            ip_address: None,
            meta: HashMap::new(),
        }
    }

    #[test]
    fn create_starts_on_best_host_and_records_inventory() {
        let cfg = cfg();
        let executor = ChangeExecutor::new(&cfg, false);
        let mut cloud = cloud_with_hosts(&[("h1", 500), ("h2", 900)]);
        let runner = MockRunner::new();

        let report = executor
            .execute(vec![create_change(1, &["h1", "h2"])], &mut cloud, &runner)
            .unwrap();

        assert_eq!(report.created, vec!["cp.web.1"]);
        let cmds = runner.executed_commands();
        assert_eq!(cmds.len(), 1);
        assert!(cmds[0].starts_with("h2: docker run -d --name cp.web.1"));
        assert_eq!(cloud.containers.len(), 1);
        assert_eq!(cloud.containers[0].host, "h2");
        assert_eq!(cloud.containers[0].state, ContainerState::Running);
        assert_eq!(cloud.containers[0].image_id(), Some("v2"));
    }

    #[test]
    fn placement_exhaustion_skips_with_warning_and_continues() {
        let cfg = cfg();
        let executor = ChangeExecutor::new(&cfg, false);
        let mut cloud = cloud_with_hosts(&[("h1", 500)]);
        let runner = MockRunner::new();

        let changes = vec![create_change(1, &["h9"]), create_change(2, &["h1"])];
        let report = executor.execute(changes, &mut cloud, &runner).unwrap();

        assert_eq!(report.skipped, vec!["cp.web.1"]);
        assert_eq!(report.created, vec!["cp.web.2"]);
        assert_eq!(runner.executed_commands().len(), 1);
    }

    #[test]
    fn update_stops_then_starts_in_place() {
        let cfg = cfg();
        let executor = ChangeExecutor::new(&cfg, false);
        let mut cloud = cloud_with_hosts(&[("h1", 500)]);
        cloud.containers.push(running(1, "h1"));
        let runner = MockRunner::new();

        let report = executor
            .execute(
                vec![Change::Update {
                    actual: running(1, "h1"),
                }],
                &mut cloud,
                &runner,
            )
            .unwrap();

        assert_eq!(report.updated, vec!["cp.web.1"]);
        let cmds = runner.executed_commands();
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[0], "h1: docker stop cp.web.1 && docker rm cp.web.1");
        assert!(cmds[1].starts_with("h1: docker run -d --name cp.web.1"));
        assert_eq!(cloud.containers.len(), 1);
    }

    #[test]
    fn delete_stops_and_forgets() {
        let cfg = cfg();
        let executor = ChangeExecutor::new(&cfg, false);
        let mut cloud = cloud_with_hosts(&[("h1", 500)]);
        cloud.containers.push(running(1, "h1"));
        let runner = MockRunner::new();

        let report = executor
            .execute(
                vec![Change::Delete {
                    actual: running(1, "h1"),
                }],
                &mut cloud,
                &runner,
            )
            .unwrap();

        assert_eq!(report.deleted, vec!["cp.web.1"]);
        assert_eq!(
            runner.executed_commands(),
            vec!["h1: docker stop cp.web.1 && docker rm cp.web.1"]
        );
        assert!(cloud.containers.is_empty());
    }

    #[test]
    fn remote_failure_aborts_the_pass() {
        let cfg = cfg();
        let executor = ChangeExecutor::new(&cfg, false);
        let mut cloud = cloud_with_hosts(&[("h1", 500)]);
        let runner = MockRunner::with_responses(vec![Err("docker: not found".into())]);

        let changes = vec![create_change(1, &["h1"]), create_change(2, &["h1"])];
        let err = executor.execute(changes, &mut cloud, &runner).unwrap_err();
        assert!(err.to_string().contains("docker: not found"));
        // The second change never ran.
        assert_eq!(runner.executed_commands().len(), 1);
    }

    #[test]
    fn dry_run_executes_nothing() {
        let cfg = cfg();
        let executor = ChangeExecutor::new(&cfg, true);
        let mut cloud = cloud_with_hosts(&[("h1", 500)]);
        cloud.containers.push(running(2, "h1"));
        let runner = MockRunner::new();

        let report = executor
            .execute(
                vec![
                    create_change(1, &["h1"]),
                    Change::Delete {
                        actual: running(2, "h1"),
                    },
                ],
                &mut cloud,
                &runner,
            )
            .unwrap();

        assert_eq!(report.created.len(), 1);
        assert_eq!(report.deleted.len(), 1);
        assert!(runner.executed_commands().is_empty());
        assert_eq!(cloud.containers.len(), 1);
    }
}
