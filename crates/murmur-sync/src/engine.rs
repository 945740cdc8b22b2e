//! The gossip engine: inbound handlers and one round of outbound gossip.
//!
//! Handlers only ever touch the local stores, so they return immediately;
//! all network fan-out happens in [`GossipEngine::gossip_once`], driven by
//! the periodic [`GossipTask`](crate::gossip::GossipTask).

use std::sync::Arc;
use std::time::Duration;

use murmur_core::{NeighborSet, NodeId, ValueStore};

use crate::error::{Result, SyncError};
use crate::gossip::GossipRound;
use crate::messages::{
    kinds, Body, BroadcastRequest, Message, Payload, PropagateRequest, ReadOk, TopologyRequest,
};
use crate::transport::Transport;

/// Default interval between gossip rounds.
pub const DEFAULT_GOSSIP_PERIOD: Duration = Duration::from_millis(200);

/// Configuration for gossip behavior.
#[derive(Debug, Clone)]
pub struct GossipConfig {
    /// Time between two full-state pushes. Shorter converges faster at
    /// the cost of bandwidth.
    pub period: Duration,
}

impl GossipConfig {
    /// Create a config with the given period.
    pub fn new(period: Duration) -> Result<Self> {
        let config = Self { period };
        config.validate()?;
        Ok(config)
    }

    /// Check the config is usable.
    pub fn validate(&self) -> Result<()> {
        if self.period.is_zero() {
            return Err(SyncError::InvalidConfig("gossip period must be non-zero".into()));
        }
        Ok(())
    }
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_GOSSIP_PERIOD,
        }
    }
}

/// Bridges inbound protocol events to the stores and drives outbound
/// anti-entropy.
pub struct GossipEngine<T: Transport> {
    /// This node's identity, fixed at construction.
    node_id: NodeId,
    transport: Arc<T>,
    values: Arc<ValueStore>,
    neighbors: Arc<NeighborSet>,
    config: GossipConfig,
}

impl<T: Transport> GossipEngine<T> {
    /// Create an engine with fresh, empty stores.
    pub fn new(transport: Arc<T>, config: GossipConfig) -> Self {
        Self::with_stores(
            transport,
            Arc::new(ValueStore::new()),
            Arc::new(NeighborSet::new()),
            config,
        )
    }

    /// Create an engine over existing stores.
    pub fn with_stores(
        transport: Arc<T>,
        values: Arc<ValueStore>,
        neighbors: Arc<NeighborSet>,
        config: GossipConfig,
    ) -> Self {
        Self {
            node_id: transport.local_node_id(),
            transport,
            values,
            neighbors,
            config,
        }
    }

    /// This node's identity.
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// The value store.
    pub fn values(&self) -> &Arc<ValueStore> {
        &self.values
    }

    /// The neighbor set.
    pub fn neighbors(&self) -> &Arc<NeighborSet> {
        &self.neighbors
    }

    /// The gossip configuration.
    pub fn config(&self) -> &GossipConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inbound
    // ─────────────────────────────────────────────────────────────────────────

    /// Route an inbound message to its handler.
    ///
    /// Returns the reply payload, or `None` for messages that are never
    /// answered (`propagate`).
    pub fn handle(&self, message: &Message) -> Result<Option<Payload>> {
        let body = &message.body;
        match body.kind.as_str() {
            kinds::TOPOLOGY => self.install_topology(body.decode()?).map(Some),
            kinds::BROADCAST => Ok(Some(self.broadcast(body.decode()?))),
            kinds::PROPAGATE => {
                self.propagate(body.decode()?);
                Ok(None)
            }
            kinds::READ => Ok(Some(self.read())),
            other => Err(SyncError::NotSupported(other.to_string())),
        }
    }

    /// Register this node's neighbors from the cluster topology.
    ///
    /// Neighbors are added to whatever is already known. A topology with no
    /// entry for this node is rejected and leaves the neighbor set untouched.
    pub fn install_topology(&self, request: TopologyRequest) -> Result<Payload> {
        let mut topology = request.topology;
        let peers = topology
            .remove(&self.node_id)
            .ok_or_else(|| SyncError::MissingTopologyEntry(self.node_id.clone()))?;

        for peer in peers {
            if peer == self.node_id {
                tracing::debug!(node = %self.node_id, "ignoring self in topology");
                continue;
            }
            self.neighbors.add(peer);
        }

        tracing::info!(
            node = %self.node_id,
            neighbors = self.neighbors.len(),
            "topology installed"
        );
        Ok(Payload::TopologyOk)
    }

    /// Remember a client's value. Never fans out.
    pub fn broadcast(&self, request: BroadcastRequest) -> Payload {
        if self.values.add(request.message) {
            tracing::debug!(node = %self.node_id, value = %request.message, "new value");
        }
        Payload::BroadcastOk
    }

    /// Merge a neighbor's value set.
    pub fn propagate(&self, request: PropagateRequest) {
        let received = request.messages.len();
        let added = self.values.extend(request.messages);
        if added > 0 {
            tracing::debug!(
                node = %self.node_id,
                src = %request.src,
                received,
                added,
                "merged gossip"
            );
        }
    }

    /// Every value seen so far.
    pub fn read(&self) -> Payload {
        Payload::ReadOk(ReadOk {
            messages: self.values.snapshot(),
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Outbound
    // ─────────────────────────────────────────────────────────────────────────

    /// Push the full value set to every neighbor once.
    ///
    /// Send failures are logged and counted, never retried: the next round
    /// carries the same state again.
    pub async fn gossip_once(&self) -> Result<GossipRound> {
        let messages = self.values.snapshot();
        let neighbors = self.neighbors.list();

        let mut round = GossipRound {
            neighbors: neighbors.len(),
            values: messages.len(),
            failed: 0,
        };
        if messages.is_empty() || neighbors.is_empty() {
            return Ok(round);
        }

        let body = Body::from_payload(&Payload::Propagate(PropagateRequest {
            messages,
            src: self.node_id.clone(),
        }))?;

        for neighbor in &neighbors {
            if let Err(e) = self.transport.send(neighbor, body.clone()).await {
                round.failed += 1;
                tracing::debug!(node = %self.node_id, %neighbor, "gossip send failed: {}", e);
            }
        }

        Ok(round)
    }
}
