//! Engine — the operator-level operations.
//!
//! Wires the inventory store, provider, collector and convergence pipeline
//! together behind three operations: `update`, `status` and `converge`.
//! Every dependency is passed in explicitly; there is no ambient context.

use log::{info, warn};

use crate::cloud::provider::{InventoryProvider, RestProvider};
use crate::cloud::store::CloudStore;
use crate::cloud::Cloud;
use crate::convergence::executor::{ApplyReport, ChangeExecutor};
use crate::convergence::{compiler, planner};
use crate::docker::collect;
use crate::error::Result;
use crate::infrastructure::RemoteRunner;
use crate::types::config::{FleetConfig, HOST_ROLE};

/// Filters and switches for a converge pass.
#[derive(Debug, Clone, Default)]
pub struct ConvergeOptions {
    /// Restrict the pass to these workload types.
    pub types: Option<Vec<String>>,
    /// Restrict the pass to these hosts.
    pub hosts: Option<Vec<String>>,
    /// Plan and log commands without executing anything.
    pub dry_run: bool,
}

pub struct Engine<'a> {
    cfg: &'a FleetConfig,
    store: CloudStore,
    runner: &'a dyn RemoteRunner,
    provider: Option<Box<dyn InventoryProvider>>,
}

impl<'a> Engine<'a> {
    /// Build an engine from configuration. A configured provider endpoint
    /// becomes a live REST provider; otherwise node lists come from the
    /// cache file.
    pub fn new(cfg: &'a FleetConfig, runner: &'a dyn RemoteRunner) -> Self {
        let provider: Option<Box<dyn InventoryProvider>> = cfg
            .provider
            .clone()
            .map(|p| Box::new(RestProvider::new(p)) as Box<dyn InventoryProvider>);
        Engine {
            cfg,
            store: CloudStore::new(&cfg.cloud_dir),
            runner,
            provider,
        }
    }

    /// Replace the inventory provider (used by tests and alternative APIs).
    pub fn with_provider(mut self, provider: Box<dyn InventoryProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Refresh the inventory: fetch nodes (provider or cache), observe the
    /// running containers and node status on every host, rewrite the cache.
    pub fn update(&self) -> Result<Cloud> {
        let mut cloud = Cloud::new(&self.cfg.stage);
        cloud.nodes = match &self.provider {
            // A requested live fetch never falls back to the cache.
            Some(provider) => provider.fetch_nodes()?,
            None => self.store.load(&self.cfg.stage)?.nodes,
        };

        for i in 0..cloud.nodes.len() {
            if !cloud.nodes[i].has_role(HOST_ROLE) {
                continue;
            }
            let mut node = cloud.nodes[i].clone();
            collect::refresh_status(self.runner, &mut node)?;
            let containers = collect::collect_node(self.runner, &node, &self.cfg.app_key)?;
            info!(
                "{}: {} running container(s)",
                node.name,
                containers.len()
            );
            cloud.containers.extend(containers);
            cloud.nodes[i] = node;
        }

        self.store.save(&cloud)?;
        Ok(cloud)
    }

    /// The cached inventory, untouched.
    pub fn status(&self) -> Result<Cloud> {
        self.store.load(&self.cfg.stage)
    }

    /// One full reconciliation pass: update, compile, plan, execute,
    /// persist. Returns the apply report and the post-apply inventory.
    pub fn converge(&self, opts: &ConvergeOptions) -> Result<(ApplyReport, Cloud)> {
        let mut cloud = self.update()?;

        let host_nodes = cloud.host_nodes();
        if host_nodes.is_empty() {
            warn!("no hosts with role '{}' in inventory", HOST_ROLE);
        }
        let image_ids = collect::fetch_image_ids(self.runner, &host_nodes, self.cfg)?;
        let mut desired = compiler::compile(self.cfg, &host_nodes, &image_ids)?;
        let mut actual = cloud.containers.clone();

        if let Some(types) = &opts.types {
            desired.retain(|d| types.contains(&d.ctype));
            actual.retain(|c| types.contains(&c.ctype));
        }
        if let Some(hosts) = &opts.hosts {
            for d in &mut desired {
                d.hosts.retain(|h| hosts.contains(h));
            }
            desired.retain(|d| !d.hosts.is_empty());
            actual.retain(|c| hosts.contains(&c.host));
        }

        let changes = planner::plan(&desired, &actual);
        info!("planned {} change(s)", changes.len());

        let executor = ChangeExecutor::new(self.cfg, opts.dry_run);
        let report = executor.execute(changes, &mut cloud, self.runner)?;

        if !opts.dry_run {
            self.store.save(&cloud)?;
        }
        Ok((report, cloud))
    }
}
