//! Reconciliation diff engine.
//!
//! The planner is pure: it takes the expected instance list and the observed
//! container list and returns the change list that converges them. It never
//! performs I/O, and identical inputs always produce the identical output.

use std::collections::HashMap;

use crate::convergence::compiler::DesiredInstance;
use crate::types::container::Container;

/// One corrective action. Ephemeral — lives for a single reconciliation pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Desired but not present anywhere it is allowed to run.
    Create { desired: DesiredInstance },
    /// Present and desired, but running a stale image; must be recreated.
    Update { actual: Container },
    /// Present but no longer desired.
    Delete { actual: Container },
}

/// Diff expected against actual.
///
/// Matching walks each descriptor's candidate host list in order and claims
/// the first unaccounted actual record under the `host+type+instance` key.
/// First-match-wins is a deterministic, order-sensitive tie-break — a known
/// design choice. Matched pairs with a differing image identity become
/// updates; unmatched descriptors become creates; unclaimed actual records
/// become deletes.
pub fn plan(desired: &[DesiredInstance], actual: &[Container]) -> Vec<Change> {
    let mut index: HashMap<String, usize> = HashMap::new();
    for (i, c) in actual.iter().enumerate() {
        index.insert(c.match_key(), i);
    }

    let mut actual_accounted = vec![false; actual.len()];
    let mut desired_accounted = vec![false; desired.len()];
    let mut matches: Vec<(usize, usize)> = Vec::new();

    for (di, d) in desired.iter().enumerate() {
        for host in &d.hosts {
            let key = format!("{}+{}+{}", host, d.ctype, d.instance);
            if let Some(&ai) = index.get(&key) {
                if !actual_accounted[ai] {
                    actual_accounted[ai] = true;
                    desired_accounted[di] = true;
                    matches.push((di, ai));
                    break;
                }
            }
        }
    }

    let mut changes = Vec::new();

    for (di, ai) in &matches {
        if let Some(want) = desired[*di].image_id.as_deref() {
            if actual[*ai].image_id() != Some(want) {
                changes.push(Change::Update {
                    actual: actual[*ai].clone(),
                });
            }
        }
    }

    for (di, d) in desired.iter().enumerate() {
        if !desired_accounted[di] {
            changes.push(Change::Create { desired: d.clone() });
        }
    }

    for (ai, c) in actual.iter().enumerate() {
        if !actual_accounted[ai] {
            changes.push(Change::Delete { actual: c.clone() });
        }
    }

    changes
}
