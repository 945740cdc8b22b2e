//! Test fixtures and helpers.
//!
//! A [`Cluster`] runs one real [`Node`] per topology entry over a shared
//! [`MemoryNetwork`], plus a client transport that talks to the nodes the
//! way an external test harness would.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use murmur::{Node, NodeConfig};
use murmur_core::{NodeId, Value};
use murmur_sync::messages::{BroadcastRequest, Message, Payload, ReadOk};
use murmur_sync::{
    verify_convergence, ConvergenceResult, GossipEngine, MemoryNetwork, MemoryTransport,
    Result, SyncError,
};

use crate::topology::Topology;

/// Node id of the cluster's client.
pub const CLIENT_ID: &str = "c0";

/// How long the client waits for any single reply.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

struct RunningNode {
    engine: Arc<GossipEngine<MemoryTransport>>,
    stop: oneshot::Sender<()>,
    task: JoinHandle<murmur::Result<()>>,
}

/// A set of running nodes sharing one in-memory network.
pub struct Cluster {
    network: Arc<MemoryNetwork>,
    client: MemoryTransport,
    nodes: BTreeMap<NodeId, RunningNode>,
    period: Duration,
}

impl Cluster {
    /// Start one node per topology entry on a lossless network and install
    /// the topology on every node.
    pub async fn start(topology: &Topology, config: NodeConfig) -> Result<Self> {
        Self::start_on(MemoryNetwork::new(), topology, config).await
    }

    /// Like [`Cluster::start`], over a caller-provided network.
    pub async fn start_on(
        network: Arc<MemoryNetwork>,
        topology: &Topology,
        config: NodeConfig,
    ) -> Result<Self> {
        let period = config.gossip.period;
        let mut nodes = BTreeMap::new();

        for id in topology.nodes() {
            let transport = network.create_transport(id.clone()).await;
            let node = Node::new(transport, config.clone()).map_err(|e| {
                SyncError::InvalidConfig(format!("cannot start node {}: {}", id, e))
            })?;
            let engine = node.engine();

            let (stop, stopped) = oneshot::channel::<()>();
            let task = tokio::spawn(node.run_until(async move {
                let _ = stopped.await;
            }));
            nodes.insert(id, RunningNode { engine, stop, task });
        }

        let client = network.create_client_transport(NodeId::from(CLIENT_ID)).await;
        let cluster = Self {
            network,
            client,
            nodes,
            period,
        };
        cluster.install_topology(topology).await?;

        tracing::debug!(nodes = cluster.nodes.len(), "cluster started");
        Ok(cluster)
    }

    /// The shared network.
    pub fn network(&self) -> &Arc<MemoryNetwork> {
        &self.network
    }

    /// The gossip period every node runs with.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Every node id, sorted.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().cloned().collect()
    }

    /// Send a request from the client and wait for its reply.
    pub async fn request(&self, node: &NodeId, payload: &Payload) -> Result<Payload> {
        let reply: Message = self
            .client
            .request(node, payload, REQUEST_TIMEOUT)
            .await?
            .ok_or_else(|| SyncError::TransportError(format!("no reply from {}", node)))?;

        match reply.body.to_payload()? {
            Payload::Error(error) => Err(SyncError::TransportError(format!(
                "{} failed ({:?}): {}",
                node, error.code, error.text
            ))),
            payload => Ok(payload),
        }
    }

    /// Install `topology` on every node.
    pub async fn install_topology(&self, topology: &Topology) -> Result<()> {
        let payload = Payload::Topology(topology.to_request());
        for id in self.nodes.keys() {
            expect_reply(id, self.request(id, &payload).await?, Payload::TopologyOk)?;
        }
        Ok(())
    }

    /// Broadcast `value` through `node`.
    pub async fn broadcast(&self, node: &NodeId, value: Value) -> Result<()> {
        let payload = Payload::Broadcast(BroadcastRequest { message: value });
        expect_reply(node, self.request(node, &payload).await?, Payload::BroadcastOk)
    }

    /// Read `node`'s values through the protocol, exactly as returned.
    pub async fn read(&self, node: &NodeId) -> Result<Vec<Value>> {
        match self.request(node, &Payload::Read).await? {
            Payload::ReadOk(ReadOk { messages }) => Ok(messages),
            other => Err(SyncError::TransportError(format!(
                "{} answered read with {}",
                node,
                other.kind()
            ))),
        }
    }

    /// `node`'s values, read directly from its store.
    pub fn snapshot(&self, node: &NodeId) -> BTreeSet<Value> {
        self.nodes
            .get(node)
            .map(|running| running.engine.values().snapshot().into_iter().collect())
            .unwrap_or_default()
    }

    /// `node`'s neighbors, read directly from its neighbor set.
    pub fn neighbors(&self, node: &NodeId) -> BTreeSet<NodeId> {
        self.nodes
            .get(node)
            .map(|running| running.engine.neighbors().list().into_iter().collect())
            .unwrap_or_default()
    }

    /// Compare every node's current value set.
    pub fn convergence(&self) -> ConvergenceResult {
        let snapshots: Vec<(&NodeId, Vec<Value>)> = self
            .nodes
            .iter()
            .map(|(id, running)| (id, running.engine.values().snapshot()))
            .collect();
        verify_convergence(snapshots.iter().map(|(id, values)| (*id, values.as_slice())))
    }

    /// Wait, one gossip period at a time, until every node holds `value`.
    ///
    /// Returns the number of periods waited, or `None` if `max_ticks`
    /// elapsed first.
    pub async fn wait_for_value(&self, value: Value, max_ticks: usize) -> Option<usize> {
        self.wait_for(max_ticks, |cluster| {
            cluster
                .nodes
                .values()
                .all(|running| running.engine.values().contains(&value))
        })
        .await
    }

    /// Wait, one gossip period at a time, until all nodes hold the same set.
    pub async fn wait_for_convergence(&self, max_ticks: usize) -> Option<usize> {
        self.wait_for(max_ticks, |cluster| cluster.convergence().is_converged())
            .await
    }

    async fn wait_for<F>(&self, max_ticks: usize, done: F) -> Option<usize>
    where
        F: Fn(&Self) -> bool,
    {
        for tick in 0..=max_ticks {
            if done(self) {
                return Some(tick);
            }
            tokio::time::sleep(self.period).await;
        }
        None
    }

    /// Stop every node and wait for it to finish.
    pub async fn shutdown(self) -> Result<()> {
        for (id, running) in self.nodes {
            let _ = running.stop.send(());
            match running.task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    return Err(SyncError::TransportError(format!("node {} failed: {}", id, e)))
                }
                Err(e) => {
                    return Err(SyncError::TaskFailed(format!("node {} panicked: {}", id, e)))
                }
            }
        }
        Ok(())
    }
}

fn expect_reply(node: &NodeId, got: Payload, expected: Payload) -> Result<()> {
    if got == expected {
        Ok(())
    } else {
        Err(SyncError::TransportError(format!(
            "{} answered with {}, expected {}",
            node,
            got.kind(),
            expected.kind()
        )))
    }
}
