//! # Murmur Core
//!
//! Core primitives for a murmur node: the broadcast [`Value`], the peer
//! [`NodeId`], and the two shared stores the gossip engine is built around.
//!
//! ## Overview
//!
//! - [`ValueStore`] - every distinct value this node has ever seen
//! - [`NeighborSet`] - the peers this node pushes its state to
//!
//! Both stores are process-scoped, grow monotonically and are safe to share
//! across tasks behind an `Arc`. Each carries its own lock; no operation ever
//! needs both at once.
//!
//! ## Usage
//!
//! ```rust
//! use murmur_core::{NeighborSet, NodeId, Value, ValueStore};
//!
//! let values = ValueStore::new();
//! assert!(values.add(Value(42)));
//! assert!(!values.add(Value(42)));
//! assert_eq!(values.snapshot(), vec![Value(42)]);
//!
//! let neighbors = NeighborSet::new();
//! neighbors.add(NodeId::from("n2"));
//! assert!(neighbors.contains(&NodeId::from("n2")));
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent inserts**: adding a value or neighbor twice is a no-op
//! - **Commutative**: the final set does not depend on insertion order
//! - **Atomic snapshots**: a snapshot never observes a partially applied add

pub mod neighbors;
pub mod types;
pub mod values;

pub use neighbors::NeighborSet;
pub use types::{NodeId, Value};
pub use values::ValueStore;
