//! Desired-state compilation.
//!
//! Expands the declared workload types into the concrete list of container
//! instances that should exist, ready for diffing against observed state.

use std::collections::HashMap;

use crate::error::Result;
use crate::types::config::{FleetConfig, InstanceScope};
use crate::types::node::Node;

/// One expected container instance.
///
/// `hosts` is the candidate set: for per-host types a singleton, for global
/// types every host the instance is allowed to land on.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredInstance {
    pub ctype: String,
    pub instance: u32,
    pub hosts: Vec<String>,
    /// Fully-qualified image reference.
    pub image: String,
    /// Latest-known image build identity, for staleness comparison.
    pub image_id: Option<String>,
}

impl DesiredInstance {
    pub fn name(&self, app_key: &str) -> String {
        format!("{}.{}.{}", app_key, self.ctype, self.instance)
    }
}

/// Expand every declared workload type into expected instances.
///
/// Candidate hosts are the type's explicit filter when present, else all
/// role-`host` nodes. Per-host types number their instances 1..count on
/// every candidate host independently; global types share one 1..count
/// numbering across the whole candidate set. Types are processed in sorted
/// order so the output is deterministic.
pub fn compile(
    cfg: &FleetConfig,
    host_nodes: &[&Node],
    image_ids: &HashMap<String, String>,
) -> Result<Vec<DesiredInstance>> {
    let all_hosts: Vec<String> = host_nodes.iter().map(|n| n.name.clone()).collect();

    let mut desired = Vec::new();
    let mut type_ids: Vec<&String> = cfg.containers.keys().collect();
    type_ids.sort();

    for type_id in type_ids {
        let ct = &cfg.containers[type_id];
        let image = cfg.image_for(ct)?;
        let image_ref = cfg.image_ref(image);
        let image_id = image_ids.get(&ct.image).cloned();
        let candidates: Vec<String> = match &ct.hosts {
            Some(filter) => filter.clone(),
            None => all_hosts.clone(),
        };

        match ct.scope {
            InstanceScope::PerHost => {
                for host in &candidates {
                    for instance in 1..=ct.count {
                        desired.push(DesiredInstance {
                            ctype: type_id.clone(),
                            instance,
                            hosts: vec![host.clone()],
                            image: image_ref.clone(),
                            image_id: image_id.clone(),
                        });
                    }
                }
            }
            InstanceScope::Global => {
                for instance in 1..=ct.count {
                    desired.push(DesiredInstance {
                        ctype: type_id.clone(),
                        instance,
                        hosts: candidates.clone(),
                        image: image_ref.clone(),
                        image_id: image_id.clone(),
                    });
                }
            }
        }
    }
    Ok(desired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn hosts() -> Vec<Node> {
        ["h1", "h2"]
            .iter()
            .map(|name| {
                let mut n = Node::new(name, "10.0.0.1");
                n.roles = vec!["host".into()];
                n
            })
            .collect()
    }

    fn cfg(doc: &str) -> FleetConfig {
        FleetConfig::parse(doc).unwrap()
    }

    #[test]
    fn global_numbering_shares_candidate_hosts() {
        let cfg = cfg(r#"
app_key: cp
images:
  web: { name: cp-web }
containers:
  web: { image: web, count: 2 }
"#);
        let nodes = hosts();
        let refs: Vec<&Node> = nodes.iter().collect();
        let desired = compile(&cfg, &refs, &HashMap::new()).unwrap();
        assert_eq!(desired.len(), 2);
        assert_eq!(desired[0].instance, 1);
        assert_eq!(desired[1].instance, 2);
        for d in &desired {
            assert_eq!(d.hosts, vec!["h1".to_string(), "h2".to_string()]);
            assert_eq!(d.image, "cp-web:latest");
        }
    }

    #[test]
    fn per_host_numbering_restarts_per_host() {
        let cfg = cfg(r#"
app_key: cp
images:
  worker: { name: cp-worker }
containers:
  worker: { image: worker, count: 2, scope: per_host }
"#);
        let nodes = hosts();
        let refs: Vec<&Node> = nodes.iter().collect();
        let desired = compile(&cfg, &refs, &HashMap::new()).unwrap();
        assert_eq!(desired.len(), 4);

        // Never two descriptors with the same (host, type, instance), and
        // never more than `count` per host.
        let mut seen = HashSet::new();
        for d in &desired {
            assert_eq!(d.hosts.len(), 1);
            assert!(d.instance >= 1 && d.instance <= 2);
            assert!(seen.insert((d.hosts[0].clone(), d.ctype.clone(), d.instance)));
        }
        assert_eq!(
            desired.iter().filter(|d| d.hosts[0] == "h1").count(),
            2
        );
    }

    #[test]
    fn explicit_host_filter_wins() {
        let cfg = cfg(r#"
app_key: cp
images:
  web: { name: cp-web }
containers:
  web: { image: web, hosts: [h2] }
"#);
        let nodes = hosts();
        let refs: Vec<&Node> = nodes.iter().collect();
        let desired = compile(&cfg, &refs, &HashMap::new()).unwrap();
        assert_eq!(desired.len(), 1);
        assert_eq!(desired[0].hosts, vec!["h2".to_string()]);
    }

    #[test]
    fn image_identity_is_attached() {
        let cfg = cfg(r#"
app_key: cp
images:
  web: { name: cp-web }
containers:
  web: { image: web }
"#);
        let nodes = hosts();
        let refs: Vec<&Node> = nodes.iter().collect();
        let ids = HashMap::from([("web".to_string(), "2024-06-01T00:00:00Z".to_string())]);
        let desired = compile(&cfg, &refs, &ids).unwrap();
        assert_eq!(desired[0].image_id.as_deref(), Some("2024-06-01T00:00:00Z"));

        let without = compile(&cfg, &refs, &HashMap::new()).unwrap();
        assert_eq!(without[0].image_id, None);
    }

    #[test]
    fn types_compile_in_sorted_order() {
        let cfg = cfg(r#"
app_key: cp
images:
  a: { name: cp-a }
  b: { name: cp-b }
containers:
  zeta: { image: a }
  alpha: { image: b }
"#);
        let nodes = hosts();
        let refs: Vec<&Node> = nodes.iter().collect();
        let desired = compile(&cfg, &refs, &HashMap::new()).unwrap();
        assert_eq!(desired[0].ctype, "alpha");
        assert_eq!(desired[1].ctype, "zeta");
    }
}
