//! Convergence verification for the gossip protocol.
//!
//! After gossiping, nodes can check they have converged by comparing their
//! value sets. Since values are only ever added, two nodes have converged
//! exactly when neither holds a value the other lacks.

use std::collections::{BTreeMap, BTreeSet};

use murmur_core::{NodeId, Value};

/// Difference between a local and a remote snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    /// Values the remote has and we don't.
    pub missing_locally: BTreeSet<Value>,
    /// Values we have and the remote doesn't.
    pub missing_remotely: BTreeSet<Value>,
}

impl SnapshotDiff {
    /// Check if both sides hold the same set.
    pub fn is_empty(&self) -> bool {
        self.missing_locally.is_empty() && self.missing_remotely.is_empty()
    }
}

/// Compare two snapshots. Order and duplicates are irrelevant.
pub fn diff(local: &[Value], remote: &[Value]) -> SnapshotDiff {
    let local: BTreeSet<Value> = local.iter().copied().collect();
    let remote: BTreeSet<Value> = remote.iter().copied().collect();

    SnapshotDiff {
        missing_locally: remote.difference(&local).copied().collect(),
        missing_remotely: local.difference(&remote).copied().collect(),
    }
}

/// Result of convergence verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvergenceResult {
    /// Every node holds the same value set.
    Converged {
        /// The agreed set.
        values: BTreeSet<Value>,
    },
    /// Some nodes are still missing values (may need more gossip rounds).
    NotConverged {
        /// For each lagging node, what it is missing from the union.
        missing: BTreeMap<NodeId, BTreeSet<Value>>,
    },
}

impl ConvergenceResult {
    /// Check if nodes have converged.
    pub fn is_converged(&self) -> bool {
        matches!(self, ConvergenceResult::Converged { .. })
    }
}

/// Verify a group of nodes agree on their value sets.
///
/// Each node is compared against the union of everything any node has;
/// with no nodes, the (empty) group is trivially converged.
pub fn verify_convergence<'a, I>(snapshots: I) -> ConvergenceResult
where
    I: IntoIterator<Item = (&'a NodeId, &'a [Value])>,
{
    let views: Vec<(&NodeId, BTreeSet<Value>)> = snapshots
        .into_iter()
        .map(|(node, values)| (node, values.iter().copied().collect()))
        .collect();

    let union: BTreeSet<Value> = views
        .iter()
        .flat_map(|(_, values)| values.iter().copied())
        .collect();

    let missing: BTreeMap<NodeId, BTreeSet<Value>> = views
        .into_iter()
        .filter_map(|(node, values)| {
            let lacking: BTreeSet<Value> = union.difference(&values).copied().collect();
            (!lacking.is_empty()).then(|| (node.clone(), lacking))
        })
        .collect();

    if missing.is_empty() {
        ConvergenceResult::Converged { values: union }
    } else {
        ConvergenceResult::NotConverged { missing }
    }
}
