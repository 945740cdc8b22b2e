//! # Murmur
//!
//! A node in an eventually-consistent broadcast network. Clients hand any
//! node a value; every node remembers every value it has seen and pushes
//! its whole set to its neighbors on a fixed period, so connected nodes
//! converge despite lost, duplicated, or reordered messages.
//!
//! ## Overview
//!
//! - **Broadcast**: a client submits a value; the node stores it and acks
//! - **Read**: a client asks for every value the node has seen
//! - **Topology**: an operator tells each node who its neighbors are
//! - **Gossip**: every period, each node pushes its full set to its neighbors
//!
//! ## Usage
//!
//! ```rust,no_run
//! use murmur::{Node, NodeConfig, StdioTransport};
//!
//! async fn example() -> murmur::Result<()> {
//!     // Wait for the `init` handshake on stdin.
//!     let transport = StdioTransport::connect().await?;
//!
//!     // Serve until stdin closes or Ctrl-C.
//!     Node::new(transport, NodeConfig::default())?.run().await
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `murmur::core` - values, node ids, and the shared stores
//! - `murmur::sync` - wire messages, transports, and the gossip engine

pub mod config;
pub mod error;
pub mod node;
pub mod stdio;

// Re-export component crates
pub use murmur_core as core;
pub use murmur_sync as sync;

// Re-export main types for convenience
pub use config::NodeConfig;
pub use error::{NodeError, Result};
pub use node::Node;
pub use stdio::StdioTransport;

pub use murmur_core::{NeighborSet, NodeId, Value, ValueStore};
pub use murmur_sync::{GossipConfig, GossipEngine, MemoryNetwork, MemoryTransport, Transport};
