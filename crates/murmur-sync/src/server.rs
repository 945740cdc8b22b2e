//! Inbound dispatch: receive, route to the engine, reply.

use std::sync::Arc;

use crate::engine::GossipEngine;
use crate::error::{Result, SyncError};
use crate::messages::{kinds, Body, ErrorBody, Message, Payload};
use crate::transport::Transport;

/// Serves inbound messages from a transport until it closes.
///
/// Each message is handled on its own task, so a slow reply never holds up
/// the next request.
pub struct Server<T: Transport> {
    engine: Arc<GossipEngine<T>>,
    transport: Arc<T>,
}

impl<T: Transport + 'static> Server<T> {
    /// Create a server for `engine`, reading from `transport`.
    pub fn new(engine: Arc<GossipEngine<T>>, transport: Arc<T>) -> Self {
        Self { engine, transport }
    }

    /// Receive and dispatch until the transport reports [`SyncError::Closed`].
    ///
    /// Any other receive error is returned to the caller.
    pub async fn run(&self) -> Result<()> {
        loop {
            let message = match self.transport.recv().await {
                Ok(message) => message,
                Err(SyncError::Closed) => {
                    tracing::info!(node = %self.engine.node_id(), "transport closed");
                    return Ok(());
                }
                Err(e) => return Err(e),
            };

            let engine = Arc::clone(&self.engine);
            let transport = Arc::clone(&self.transport);
            tokio::spawn(async move {
                respond(&engine, transport.as_ref(), message).await;
            });
        }
    }
}

/// Whether `body` answers an earlier request rather than asking for work.
///
/// Replies are never answered, so two nodes cannot trade error replies.
fn is_reply(body: &Body) -> bool {
    body.in_reply_to.is_some() || body.kind == kinds::ERROR || body.kind.ends_with("_ok")
}

/// Handle one message and send whatever reply it calls for.
async fn respond<T: Transport>(engine: &GossipEngine<T>, transport: &T, message: Message) {
    tracing::debug!(
        node = %engine.node_id(),
        src = %message.src,
        kind = %message.body.kind,
        "received"
    );

    if is_reply(&message.body) {
        tracing::debug!(
            node = %engine.node_id(),
            src = %message.src,
            kind = %message.body.kind,
            in_reply_to = ?message.body.in_reply_to,
            "dropping unsolicited reply"
        );
        return;
    }

    let reply = match engine.handle(&message) {
        Ok(Some(payload)) => payload,
        Ok(None) => return,
        Err(e) => {
            tracing::warn!(
                node = %engine.node_id(),
                src = %message.src,
                kind = %message.body.kind,
                "request failed: {}",
                e
            );
            // Only requests that can be correlated get an error back, and
            // propagate is never answered.
            if message.body.msg_id.is_none() || message.body.kind == kinds::PROPAGATE {
                return;
            }
            Payload::Error(ErrorBody::from(&e))
        }
    };

    let sent = match Body::from_payload(&reply) {
        Ok(body) => transport.reply(&message, body).await,
        Err(e) => Err(e),
    };
    if let Err(e) = sent {
        tracing::debug!(node = %engine.node_id(), dest = %message.src, "reply failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::GossipConfig;
    use crate::messages::{kinds, BroadcastRequest, ErrorCode, PropagateRequest, ReadOk};
    use crate::transport::memory::MemoryNetwork;
    use murmur_core::{NodeId, Value};
    use serde_json::json;
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(1);

    async fn serve(network: &Arc<MemoryNetwork>, id: &str) -> Arc<GossipEngine<crate::MemoryTransport>> {
        let transport = Arc::new(network.create_transport(id.into()).await);
        let engine = Arc::new(GossipEngine::new(Arc::clone(&transport), GossipConfig::default()));
        let server = Server::new(Arc::clone(&engine), transport);
        tokio::spawn(async move { server.run().await });
        engine
    }

    #[tokio::test]
    async fn test_broadcast_then_read() {
        let network = MemoryNetwork::new();
        let _n1 = serve(&network, "n1").await;
        let client = network.create_client_transport("c1".into()).await;
        let n1 = NodeId::from("n1");

        let ack = client
            .request(&n1, &Payload::Broadcast(BroadcastRequest { message: Value(42) }), TIMEOUT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ack.body.kind, kinds::BROADCAST_OK);

        let reply = client.request(&n1, &Payload::Read, TIMEOUT).await.unwrap().unwrap();
        assert_eq!(
            reply.body.to_payload().unwrap(),
            Payload::ReadOk(ReadOk { messages: vec![Value(42)] })
        );
    }

    #[tokio::test]
    async fn test_missing_topology_entry_is_reported() {
        let network = MemoryNetwork::new();
        let engine = serve(&network, "n1").await;
        let client = network.create_client_transport("c1".into()).await;

        let body = Body {
            kind: kinds::TOPOLOGY.into(),
            msg_id: Some(1),
            in_reply_to: None,
            fields: serde_json::from_value(json!({"topology": {"n2": ["n3"]}})).unwrap(),
        };
        client.send(&"n1".into(), body).await.unwrap();

        let reply = client.recv_timeout(TIMEOUT).await.unwrap().unwrap();
        assert_eq!(reply.body.in_reply_to, Some(1));
        let Payload::Error(error) = reply.body.to_payload().unwrap() else {
            panic!("expected error reply");
        };
        assert_eq!(error.code, ErrorCode::MalformedRequest);
        assert!(engine.neighbors().is_empty());
    }

    #[tokio::test]
    async fn test_propagate_gets_no_reply() {
        let network = MemoryNetwork::new();
        let engine = serve(&network, "n1").await;
        let peer = network.create_transport("n2".into()).await;

        let body = Body::from_payload(&Payload::Propagate(PropagateRequest {
            messages: vec![Value(1), Value(2)],
            src: "n2".into(),
        }))
        .unwrap();
        peer.send(&"n1".into(), body).await.unwrap();

        let nothing = peer.recv_timeout(Duration::from_millis(50)).await.unwrap();
        assert!(nothing.is_none());
        assert_eq!(engine.values().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_type_reports_not_supported() {
        let network = MemoryNetwork::new();
        let _n1 = serve(&network, "n1").await;
        let client = network.create_client_transport("c1".into()).await;

        let body = Body {
            kind: "txn".into(),
            msg_id: Some(4),
            in_reply_to: None,
            fields: Default::default(),
        };
        client.send(&"n1".into(), body).await.unwrap();

        let reply = client.recv_timeout(TIMEOUT).await.unwrap().unwrap();
        assert_eq!(reply.body.fields.get("code"), Some(&json!(10)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_replies_are_not_answered() {
        let network = MemoryNetwork::new();
        let _n1 = serve(&network, "n1").await;

        let transport = Arc::new(network.create_transport("n2".into()).await);
        let n2 = Arc::new(GossipEngine::new(Arc::clone(&transport), GossipConfig::default()));
        let server = Server::new(n2, Arc::clone(&transport));
        tokio::spawn(async move { server.run().await });

        // n1 cannot handle this; its error reply must end the exchange at n2.
        let body = Body {
            kind: "txn".into(),
            msg_id: Some(1),
            in_reply_to: None,
            fields: Default::default(),
        };
        transport.send(&"n1".into(), body).await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        let settled = network.delivered();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(settled, 2);
        assert_eq!(network.delivered(), settled);
    }

    #[tokio::test]
    async fn test_malformed_propagate_gets_no_reply() {
        let network = MemoryNetwork::new();
        let engine = serve(&network, "n1").await;
        let peer = network.create_transport("n2".into()).await;

        let body = Body {
            kind: kinds::PROPAGATE.into(),
            msg_id: Some(3),
            in_reply_to: None,
            fields: serde_json::from_value(json!({"messages": ["x"], "src": "n2"})).unwrap(),
        };
        peer.send(&"n1".into(), body).await.unwrap();

        let nothing = peer.recv_timeout(Duration::from_millis(50)).await.unwrap();
        assert!(nothing.is_none());
        assert!(engine.values().is_empty());
    }

    #[tokio::test]
    async fn test_unsolicited_error_is_dropped() {
        let network = MemoryNetwork::new();
        let _n1 = serve(&network, "n1").await;
        let peer = network.create_transport("n2".into()).await;

        let body = Body::from_payload(&Payload::Error(ErrorBody {
            code: ErrorCode::NotSupported,
            text: "txn".into(),
        }))
        .unwrap()
        .with_msg_id(5);
        peer.send(&"n1".into(), body).await.unwrap();

        let nothing = peer.recv_timeout(Duration::from_millis(50)).await.unwrap();
        assert!(nothing.is_none());
    }
}
