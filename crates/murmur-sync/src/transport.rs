//! Transport abstraction for the gossip protocol.
//!
//! The transport owns node identity, envelope framing, and delivery.
//! Implementations may use stdin/stdout, sockets, or in-process channels;
//! the engine only ever sees [`Message`]s and [`Body`]s.

use std::time::Duration;

use async_trait::async_trait;

use murmur_core::NodeId;

use crate::error::Result;
use crate::messages::{Body, Message};

/// Transport trait for sending and receiving protocol messages.
///
/// Implementations must be thread-safe (Send + Sync). Delivery is
/// best-effort: a successful `send` only means the message was handed off.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Get the local node's identity.
    fn local_node_id(&self) -> NodeId;

    /// Send a body to a specific node, without waiting for any response.
    async fn send(&self, dest: &NodeId, body: Body) -> Result<()>;

    /// Receive the next inbound message.
    ///
    /// Returns [`SyncError::Closed`](crate::SyncError::Closed) once no more
    /// messages can arrive.
    async fn recv(&self) -> Result<Message>;

    /// Reply to an inbound request.
    ///
    /// The reply goes back to the request's sender and is correlated via
    /// `in_reply_to`.
    async fn reply(&self, request: &Message, body: Body) -> Result<()> {
        let body = body.in_reply_to(request.body.msg_id);
        self.send(&request.src, body).await
    }

    /// Receive with timeout.
    ///
    /// Returns None if timeout expires before a message arrives.
    async fn recv_timeout(&self, timeout: Duration) -> Result<Option<Message>> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }
}

/// An in-process network for tests and simulation.
///
/// Uses bounded channels to pass messages between transports, and can drop
/// a configurable fraction of node-to-node traffic to exercise recovery.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    use rand::Rng;
    use tokio::sync::mpsc::error::TrySendError;
    use tokio::sync::{mpsc, Mutex, RwLock};

    use crate::error::SyncError;
    use crate::messages::Payload;

    /// Per-node inbox capacity. Messages beyond this are dropped.
    pub const INBOX_CAPACITY: usize = 1000;

    struct Link {
        sender: mpsc::Sender<Message>,
        /// Clients are never subject to simulated loss.
        reliable: bool,
    }

    /// Shared state for the memory transport network.
    pub struct MemoryNetwork {
        links: RwLock<HashMap<NodeId, Link>>,
        /// Probability of dropping a node-to-node message.
        loss_rate: f64,
        delivered: AtomicU64,
        dropped: AtomicU64,
    }

    impl MemoryNetwork {
        /// Create a new lossless memory network.
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Create a network that drops each node-to-node message with
        /// probability `loss_rate` (clamped to `0.0..=1.0`).
        pub fn with_loss(loss_rate: f64) -> Arc<Self> {
            Arc::new(Self {
                loss_rate: loss_rate.clamp(0.0, 1.0),
                ..Self::default()
            })
        }

        /// Create a node transport connected to this network.
        pub async fn create_transport(self: &Arc<Self>, node_id: NodeId) -> MemoryTransport {
            self.attach(node_id, false).await
        }

        /// Create a client transport. Traffic to and from clients is never
        /// dropped, so requests and replies always arrive.
        pub async fn create_client_transport(self: &Arc<Self>, node_id: NodeId) -> MemoryTransport {
            self.attach(node_id, true).await
        }

        /// Messages handed to an inbox so far.
        pub fn delivered(&self) -> u64 {
            self.delivered.load(Ordering::Relaxed)
        }

        /// Messages lost to simulated loss or full inboxes so far.
        pub fn dropped(&self) -> u64 {
            self.dropped.load(Ordering::Relaxed)
        }

        async fn attach(self: &Arc<Self>, node_id: NodeId, reliable: bool) -> MemoryTransport {
            let (tx, rx) = mpsc::channel(INBOX_CAPACITY);

            self.links
                .write()
                .await
                .insert(node_id.clone(), Link { sender: tx, reliable });

            MemoryTransport {
                node_id,
                network: Arc::clone(self),
                receiver: Mutex::new(rx),
                next_msg_id: AtomicU64::new(1),
            }
        }

        async fn deliver(&self, message: Message) -> Result<()> {
            let links = self.links.read().await;
            let link = links.get(&message.dest).ok_or_else(|| {
                SyncError::TransportError(format!("node not found: {}", message.dest))
            })?;

            let exempt = link.reliable || links.get(&message.src).map_or(false, |l| l.reliable);
            if !exempt && self.should_drop() {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(src = %message.src, dest = %message.dest, "dropped message");
                return Ok(());
            }

            match link.sender.try_send(message) {
                Ok(()) => {
                    self.delivered.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                }
                Err(TrySendError::Full(message)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(dest = %message.dest, "inbox full, dropped message");
                    Ok(())
                }
                Err(TrySendError::Closed(_)) => {
                    Err(SyncError::TransportError("peer disconnected".into()))
                }
            }
        }

        fn should_drop(&self) -> bool {
            self.loss_rate > 0.0 && rand::thread_rng().gen_bool(self.loss_rate)
        }
    }

    impl Default for MemoryNetwork {
        fn default() -> Self {
            Self {
                links: RwLock::new(HashMap::new()),
                loss_rate: 0.0,
                delivered: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            }
        }
    }

    /// In-memory transport implementation.
    pub struct MemoryTransport {
        node_id: NodeId,
        network: Arc<MemoryNetwork>,
        receiver: Mutex<mpsc::Receiver<Message>>,
        next_msg_id: AtomicU64,
    }

    impl MemoryTransport {
        /// Send a request and wait for its correlated reply.
        ///
        /// Unrelated inbound messages received meanwhile are discarded, so
        /// this is meant for client transports. Returns `Ok(None)` on timeout.
        pub async fn request(
            &self,
            dest: &NodeId,
            payload: &Payload,
            timeout: Duration,
        ) -> Result<Option<Message>> {
            let msg_id = self.next_msg_id.fetch_add(1, Ordering::Relaxed);
            let body = Body::from_payload(payload)?.with_msg_id(msg_id);
            self.send(dest, body).await?;

            let deadline = tokio::time::Instant::now() + timeout;
            loop {
                let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
                match self.recv_timeout(remaining).await? {
                    Some(reply) if reply.body.in_reply_to == Some(msg_id) => return Ok(Some(reply)),
                    Some(_) => continue,
                    None => return Ok(None),
                }
            }
        }
    }

    #[async_trait]
    impl Transport for MemoryTransport {
        fn local_node_id(&self) -> NodeId {
            self.node_id.clone()
        }

        async fn send(&self, dest: &NodeId, body: Body) -> Result<()> {
            let message = Message {
                src: self.node_id.clone(),
                dest: dest.clone(),
                body,
            };
            self.network.deliver(message).await
        }

        async fn recv(&self) -> Result<Message> {
            let mut rx = self.receiver.lock().await;
            rx.recv().await.ok_or(SyncError::Closed)
        }
    }
}
