//! # Murmur Testkit
//!
//! Testing utilities for murmur.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Topologies**: builders for line, ring, grid, tree, and complete graphs,
//!   with diameter computation for convergence bounds
//! - **Generators**: Proptest strategies for values and connected topologies
//! - **Fixtures**: a [`Cluster`] of real nodes over an in-memory network,
//!   driven by a client the way an external test harness would
//!
//! ## Cluster
//!
//! ```rust,no_run
//! use murmur::{NodeConfig, Value};
//! use murmur_testkit::{Cluster, Topology};
//!
//! async fn example() -> murmur::sync::Result<()> {
//!     let topology = Topology::line(3);
//!     let cluster = Cluster::start(&topology, NodeConfig::default()).await?;
//!
//!     cluster.broadcast(&"n0".into(), Value(42)).await?;
//!     let ticks = cluster.wait_for_value(Value(42), 10).await;
//!     assert!(ticks.is_some());
//!
//!     cluster.shutdown().await
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use murmur_testkit::generators::connected_topology;
//!
//! proptest! {
//!     #[test]
//!     fn topology_is_connected(topology in connected_topology(8)) {
//!         prop_assert!(topology.diameter().is_some());
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod topology;

pub use fixtures::{Cluster, CLIENT_ID, REQUEST_TIMEOUT};
pub use topology::Topology;
