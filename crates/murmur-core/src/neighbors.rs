//! The neighbor set: peers this node gossips to.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

use crate::types::NodeId;

/// Set of peer node ids.
///
/// Usually written once when the topology is installed and then read on
/// every gossip tick, but correct under concurrent writes as well.
#[derive(Debug, Default)]
pub struct NeighborSet {
    inner: RwLock<HashSet<NodeId>>,
}

impl NeighborSet {
    /// Create a new empty neighbor set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a neighbor.
    ///
    /// Returns `true` if the neighbor was not already known.
    pub fn add(&self, id: NodeId) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.insert(id)
    }

    /// Every known neighbor, in unspecified order.
    pub fn list(&self) -> Vec<NodeId> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.iter().cloned().collect()
    }

    /// Check whether a peer is a neighbor.
    pub fn contains(&self, id: &NodeId) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.contains(id)
    }

    /// Number of neighbors.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no neighbor has been registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
