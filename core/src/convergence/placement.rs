//! Placement selection for new container instances.
//!
//! A greedy, memory-only heuristic: intersect the image's host allowlist
//! with any additional filter, then pick the candidate with the most free
//! memory. CPU, disk and existing container counts are not considered.

use log::debug;

use crate::types::node::Node;

/// Choose a host for a new instance.
///
/// Returns `None` when no host satisfies both filters — a warning condition
/// for the caller, not an error. Ties on free memory resolve to the
/// lexicographically smaller node name, so selection is deterministic.
pub fn select_host<'a>(
    nodes: &[&'a Node],
    allowlist: Option<&[String]>,
    filter: Option<&[String]>,
) -> Option<&'a Node> {
    let allowed = |node: &Node, list: Option<&[String]>| match list {
        Some(names) => names.iter().any(|n| n == &node.name),
        None => true,
    };

    let selected = nodes
        .iter()
        .filter(|n| allowed(n, allowlist) && allowed(n, filter))
        .max_by(|a, b| {
            a.free_mem()
                .cmp(&b.free_mem())
                .then_with(|| b.name.cmp(&a.name))
        })
        .copied();

    if let Some(node) = selected {
        debug!(
            "placed on {} ({} MB free)",
            node.name,
            node.free_mem()
        );
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, free_mem: u64) -> Node {
        let mut n = Node::new(name, "10.0.0.1");
        n.roles = vec!["host".into()];
        n.status.insert("free_mem".into(), free_mem.to_string());
        n
    }

    #[test]
    fn picks_most_free_memory() {
        let h1 = node("h1", 500);
        let h2 = node("h2", 900);
        let picked = select_host(&[&h1, &h2], None, None).unwrap();
        assert_eq!(picked.name, "h2");
    }

    #[test]
    fn ties_resolve_to_smaller_name() {
        let b = node("hb", 500);
        let a = node("ha", 500);
        let picked = select_host(&[&b, &a], None, None).unwrap();
        assert_eq!(picked.name, "ha");
    }

    #[test]
    fn allowlist_and_filter_intersect() {
        let h1 = node("h1", 900);
        let h2 = node("h2", 500);
        let h3 = node("h3", 100);
        let nodes = [&h1, &h2, &h3];
        let allow = vec!["h2".to_string(), "h3".to_string()];
        let filter = vec!["h1".to_string(), "h2".to_string()];
        let picked = select_host(&nodes, Some(&allow), Some(&filter)).unwrap();
        assert_eq!(picked.name, "h2");
    }

    #[test]
    fn empty_intersection_is_no_host() {
        let h1 = node("h1", 900);
        let allow = vec!["h2".to_string()];
        assert!(select_host(&[&h1], Some(&allow), None).is_none());
    }

    #[test]
    fn missing_status_reads_as_zero() {
        let mut h1 = node("h1", 0);
        h1.status.clear();
        let h2 = node("h2", 1);
        let picked = select_host(&[&h1, &h2], None, None).unwrap();
        assert_eq!(picked.name, "h2");
    }
}
