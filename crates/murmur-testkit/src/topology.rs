//! Topology builders.
//!
//! Every builder produces an undirected graph over nodes `n0..n{count-1}`:
//! if `a` lists `b` as a neighbor, `b` lists `a`.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use murmur_core::NodeId;
use murmur_sync::TopologyRequest;

/// Node id for the `index`-th node of a generated topology.
pub fn node_id(index: usize) -> NodeId {
    NodeId::new(format!("n{}", index))
}

/// A cluster topology: every node and its direct neighbors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    adjacency: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl Topology {
    /// Nodes with no edges.
    pub fn isolated(count: usize) -> Self {
        let adjacency = (0..count).map(|i| (node_id(i), BTreeSet::new())).collect();
        Self { adjacency }
    }

    /// `n0 - n1 - ... - n{count-1}`.
    pub fn line(count: usize) -> Self {
        let mut topology = Self::isolated(count);
        for i in 1..count {
            topology.connect(i - 1, i);
        }
        topology
    }

    /// A line whose ends are joined.
    pub fn ring(count: usize) -> Self {
        let mut topology = Self::line(count);
        if count > 2 {
            topology.connect(count - 1, 0);
        }
        topology
    }

    /// Nodes laid out row by row on a square-ish grid, linked to the
    /// nodes directly right and below.
    pub fn grid(count: usize) -> Self {
        let mut topology = Self::isolated(count);
        let width = (1..=count).find(|w| w * w >= count).unwrap_or(1);
        for i in 0..count {
            if (i + 1) % width != 0 && i + 1 < count {
                topology.connect(i, i + 1);
            }
            if i + width < count {
                topology.connect(i, i + width);
            }
        }
        topology
    }

    /// A tree where node `i` is the parent of `fanout * i + 1 ..= fanout * i + fanout`.
    pub fn tree(count: usize, fanout: usize) -> Self {
        let mut topology = Self::isolated(count);
        let fanout = fanout.max(1);
        for child in 1..count {
            topology.connect((child - 1) / fanout, child);
        }
        topology
    }

    /// Every node linked to every other node.
    pub fn complete(count: usize) -> Self {
        let mut topology = Self::isolated(count);
        for a in 0..count {
            for b in (a + 1)..count {
                topology.connect(a, b);
            }
        }
        topology
    }

    /// Build from explicit edges over nodes `n0..n{count-1}`.
    ///
    /// Edges naming an out-of-range node or a self-loop are ignored.
    pub fn from_edges(count: usize, edges: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let mut topology = Self::isolated(count);
        for (a, b) in edges {
            if a != b && a < count && b < count {
                topology.connect(a, b);
            }
        }
        topology
    }

    fn connect(&mut self, a: usize, b: usize) {
        let (a, b) = (node_id(a), node_id(b));
        self.adjacency.entry(a.clone()).or_default().insert(b.clone());
        self.adjacency.entry(b).or_default().insert(a);
    }

    /// Every node, sorted.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.adjacency.keys().cloned().collect()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    /// Whether the topology has no nodes.
    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Direct neighbors of `node`, sorted. Empty for unknown nodes.
    pub fn neighbors(&self, node: &NodeId) -> Vec<NodeId> {
        self.adjacency
            .get(node)
            .map(|peers| peers.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Longest shortest path between any two nodes, in hops.
    ///
    /// `None` if the graph is disconnected; `Some(0)` for zero or one node.
    pub fn diameter(&self) -> Option<usize> {
        let mut diameter = 0;
        for start in self.adjacency.keys() {
            let distances = self.distances_from(start);
            if distances.len() != self.adjacency.len() {
                return None;
            }
            diameter = diameter.max(distances.values().copied().max().unwrap_or(0));
        }
        Some(diameter)
    }

    /// Check that every node can reach every other.
    pub fn is_connected(&self) -> bool {
        self.diameter().is_some()
    }

    fn distances_from(&self, start: &NodeId) -> HashMap<NodeId, usize> {
        let mut distances = HashMap::new();
        let mut queue = VecDeque::new();
        distances.insert(start.clone(), 0);
        queue.push_back(start.clone());

        while let Some(node) = queue.pop_front() {
            let next = distances[&node] + 1;
            for peer in self.adjacency.get(&node).into_iter().flatten() {
                if !distances.contains_key(peer) {
                    distances.insert(peer.clone(), next);
                    queue.push_back(peer.clone());
                }
            }
        }
        distances
    }

    /// The `topology` request installing this graph.
    pub fn to_request(&self) -> TopologyRequest {
        let topology = self
            .adjacency
            .iter()
            .map(|(node, peers)| (node.clone(), peers.iter().cloned().collect()))
            .collect();
        TopologyRequest { topology }
    }
}
