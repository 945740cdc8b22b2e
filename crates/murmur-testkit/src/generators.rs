//! Proptest generators for property-based testing.

use proptest::prelude::*;
use proptest::sample::Index;

use murmur_core::Value;

use crate::topology::Topology;

/// Generate a random value.
pub fn value() -> impl Strategy<Value = Value> {
    any::<i64>().prop_map(Value)
}

/// Generate values from a small range, so duplicates are common.
pub fn clustered_value() -> impl Strategy<Value = Value> {
    (0i64..32).prop_map(Value)
}

/// Generate up to `max_len` values, duplicates allowed.
pub fn values(max_len: usize) -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(clustered_value(), 0..=max_len)
}

/// Where a value enters a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// A client `broadcast`.
    Client(Value),
    /// A peer `propagate` batch.
    Peer(Vec<Value>),
}

impl Delivery {
    /// Every value this delivery carries.
    pub fn values(&self) -> Vec<Value> {
        match self {
            Delivery::Client(value) => vec![*value],
            Delivery::Peer(batch) => batch.clone(),
        }
    }
}

/// Generate a mix of client broadcasts and peer batches.
pub fn deliveries(max_len: usize) -> impl Strategy<Value = Vec<Delivery>> {
    let delivery = prop_oneof![
        clustered_value().prop_map(Delivery::Client),
        values(8).prop_map(Delivery::Peer),
    ];
    prop::collection::vec(delivery, 0..=max_len)
}

/// Generate a random spanning tree over `2..=max_nodes` nodes.
pub fn spanning_tree(max_nodes: usize) -> impl Strategy<Value = Topology> {
    (2..=max_nodes.max(2)).prop_flat_map(|count| {
        prop::collection::vec(any::<Index>(), count - 1).prop_map(move |parents| {
            // Node i + 1 hangs off some node already in the tree.
            let edges = parents
                .iter()
                .enumerate()
                .map(|(i, parent)| (parent.index(i + 1), i + 1));
            Topology::from_edges(count, edges)
        })
    })
}

/// Generate a connected topology of one of the standard shapes, or a
/// random spanning tree.
pub fn connected_topology(max_nodes: usize) -> impl Strategy<Value = Topology> {
    let max_nodes = max_nodes.max(2);
    prop_oneof![
        (1..=max_nodes).prop_map(Topology::line),
        (1..=max_nodes).prop_map(Topology::ring),
        (1..=max_nodes).prop_map(Topology::grid),
        (1..=max_nodes, 1usize..4).prop_map(|(count, fanout)| Topology::tree(count, fanout)),
        spanning_tree(max_nodes),
    ]
}
