//! The Node: wires the gossip engine, the inbound server, and the gossip
//! loop around one transport.

use std::future::Future;
use std::sync::Arc;

use murmur_core::NodeId;
use murmur_sync::{GossipEngine, GossipTask, Server, Transport};

use crate::config::NodeConfig;
use crate::error::Result;

/// A running broadcast node.
///
/// Owns the process-scoped stores (through its engine) and the transport.
/// Nothing is global: two nodes in one process share nothing.
pub struct Node<T: Transport> {
    engine: Arc<GossipEngine<T>>,
    transport: Arc<T>,
}

impl<T: Transport + 'static> Node<T> {
    /// Create a node over `transport`.
    pub fn new(transport: T, config: NodeConfig) -> Result<Self> {
        config.validate()?;

        let transport = Arc::new(transport);
        let engine = Arc::new(GossipEngine::new(Arc::clone(&transport), config.gossip));
        Ok(Self { engine, transport })
    }

    /// This node's identity.
    pub fn node_id(&self) -> &NodeId {
        self.engine.node_id()
    }

    /// The engine, for inspecting the stores.
    pub fn engine(&self) -> Arc<GossipEngine<T>> {
        Arc::clone(&self.engine)
    }

    /// Serve until the transport closes or the process receives Ctrl-C.
    pub async fn run(self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Serve until the transport closes or `signal` completes.
    ///
    /// The gossip loop is stopped and joined before returning.
    pub async fn run_until<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(node = %self.node_id(), "node starting");

        let gossip = GossipTask::spawn(Arc::clone(&self.engine));
        let server = Server::new(Arc::clone(&self.engine), self.transport);

        let served = tokio::select! {
            result = server.run() => result,
            _ = signal => {
                tracing::info!(node = %self.engine.node_id(), "shutdown requested");
                Ok(())
            }
        };

        gossip.shutdown().await?;
        tracing::info!(
            node = %self.engine.node_id(),
            values = self.engine.values().len(),
            "node stopped"
        );
        Ok(served?)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
