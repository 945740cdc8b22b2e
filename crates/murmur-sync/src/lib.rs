//! # Murmur Sync
//!
//! Full-state push gossip for converging value sets between nodes.
//!
//! ## Overview
//!
//! The sync module implements an anti-entropy protocol: every node
//! periodically pushes its whole [`ValueStore`](murmur_core::ValueStore)
//! snapshot to each neighbor. A dropped message is compensated by the next
//! tick, so connected nodes converge without acknowledgments or retries.
//!
//! ## Key Properties
//!
//! - **Idempotent**: receiving the same value twice changes nothing
//! - **Commutative**: message order doesn't affect final state
//! - **Self-healing**: loss is repaired by the next gossip round
//! - **Decoupled**: client broadcasts never wait on network fan-out
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use murmur_sync::{GossipConfig, GossipEngine, GossipTask, MemoryNetwork, Server};
//!
//! async fn example() {
//!     let network = MemoryNetwork::new();
//!     let transport = Arc::new(network.create_transport("n1".into()).await);
//!
//!     let engine = Arc::new(GossipEngine::new(Arc::clone(&transport), GossipConfig::default()));
//!     let gossip = GossipTask::spawn(Arc::clone(&engine));
//!
//!     // Serve inbound requests until the transport closes.
//!     let _ = Server::new(engine, transport).run().await;
//!     let _ = gossip.shutdown().await;
//! }
//! ```
//!
//! ## Message Flow
//!
//! ```text
//! Client            Node A                      Node B
//!   |-- broadcast -->|                            |
//!   |<- broadcast_ok-|                            |
//!   |                |--- propagate (tick) ------>|
//!   |                |<-- propagate (tick) -------|
//!   |-- read ------------------------------------>|
//!   |<- read_ok ----------------------------------|
//! ```

pub mod convergence;
pub mod engine;
pub mod error;
pub mod gossip;
pub mod messages;
pub mod server;
pub mod transport;

pub use convergence::{diff, verify_convergence, ConvergenceResult, SnapshotDiff};
pub use engine::{GossipConfig, GossipEngine, DEFAULT_GOSSIP_PERIOD};
pub use error::{Result, SyncError};
pub use gossip::{GossipRound, GossipTask};
pub use messages::{
    kinds, Body, BroadcastRequest, ErrorBody, ErrorCode, InitRequest, Message, Payload,
    PropagateRequest, ReadOk, TopologyRequest,
};
pub use server::Server;
pub use transport::{memory::MemoryNetwork, memory::MemoryTransport, Transport};
