//! Property tests for the stores and topology generators.

use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;

use murmur::{GossipConfig, GossipEngine, MemoryNetwork, MemoryTransport, NodeId, Value};
use murmur_sync::messages::{BroadcastRequest, PropagateRequest, ReadOk};
use murmur_sync::Payload;
use murmur_testkit::generators::{connected_topology, deliveries, spanning_tree, Delivery};

/// Build an engine outside of any async test; the memory transport only
/// needs a runtime while attaching to the network.
fn engine(id: &str) -> GossipEngine<MemoryTransport> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let network = MemoryNetwork::new();
    let transport = runtime.block_on(network.create_transport(NodeId::from(id)));
    GossipEngine::new(Arc::new(transport), GossipConfig::default())
}

fn apply(engine: &GossipEngine<MemoryTransport>, delivery: &Delivery) {
    match delivery {
        Delivery::Client(value) => {
            engine.broadcast(BroadcastRequest { message: *value });
        }
        Delivery::Peer(batch) => engine.propagate(PropagateRequest {
            messages: batch.clone(),
            src: NodeId::from("peer"),
        }),
    }
}

fn read(engine: &GossipEngine<MemoryTransport>) -> Vec<Value> {
    match engine.read() {
        Payload::ReadOk(ReadOk { messages }) => messages,
        other => panic!("unexpected reply {:?}", other),
    }
}

proptest! {
    #[test]
    fn prop_delivery_order_is_irrelevant(inputs in deliveries(24)) {
        let forward = engine("n1");
        let backward = engine("n2");

        for d in &inputs {
            apply(&forward, d);
        }
        for d in inputs.iter().rev() {
            apply(&backward, d);
        }

        let expected: BTreeSet<Value> = inputs.iter().flat_map(Delivery::values).collect();
        let forward_read = read(&forward);
        let backward_read = read(&backward);

        // Exactly the delivered set: no duplicates, no omissions.
        prop_assert_eq!(forward_read.len(), expected.len());
        prop_assert_eq!(forward_read.into_iter().collect::<BTreeSet<_>>(), expected.clone());
        prop_assert_eq!(backward_read.into_iter().collect::<BTreeSet<_>>(), expected);
    }

    #[test]
    fn prop_redelivery_changes_nothing(inputs in deliveries(16)) {
        let once = engine("n1");
        let twice = engine("n2");

        for d in &inputs {
            apply(&once, d);
            apply(&twice, d);
            apply(&twice, d);
        }

        let a: BTreeSet<Value> = read(&once).into_iter().collect();
        let b: BTreeSet<Value> = read(&twice).into_iter().collect();
        prop_assert_eq!(a, b);
        prop_assert_eq!(once.values().len(), twice.values().len());
    }

    #[test]
    fn prop_generated_topologies_are_connected_and_symmetric(topology in connected_topology(12)) {
        prop_assert!(topology.is_connected());
        for node in topology.nodes() {
            for peer in topology.neighbors(&node) {
                prop_assert_ne!(&peer, &node);
                prop_assert!(topology.neighbors(&peer).contains(&node));
            }
        }
    }

    #[test]
    fn prop_spanning_tree_has_one_edge_less_than_nodes(topology in spanning_tree(12)) {
        let degree_sum: usize = topology
            .nodes()
            .iter()
            .map(|node| topology.neighbors(node).len())
            .sum();
        prop_assert_eq!(degree_sum / 2, topology.len() - 1);
        prop_assert!(topology.is_connected());
    }
}
