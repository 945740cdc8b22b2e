//! Line-delimited JSON transport over stdin/stdout.
//!
//! Each line is one envelope `{"src", "dest", "body"}`. The first inbound
//! line must be an `init` message, which assigns this node its identity;
//! it is answered with `init_ok` before any other traffic is served.
//! Logs must go to stderr, since stdout carries the protocol.

use async_trait::async_trait;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines, Stdin, Stdout,
};
use tokio::sync::Mutex;

use murmur_core::NodeId;
use murmur_sync::messages::{kinds, Body, InitRequest, Message, Payload};
use murmur_sync::{SyncError, Transport};

use crate::error::{NodeError, Result};

/// Transport reading envelopes from `R` and writing them to `W`, one per line.
pub struct StdioTransport<R = BufReader<Stdin>, W = Stdout> {
    node_id: NodeId,
    node_ids: Vec<NodeId>,
    lines: Mutex<Lines<R>>,
    writer: Mutex<W>,
}

impl StdioTransport {
    /// Perform the `init` handshake on the process's stdin/stdout.
    pub async fn connect() -> Result<Self> {
        Self::handshake(BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
    }
}

impl<R, W> StdioTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Wait for `init` on `reader`, answer it on `writer`, and return a
    /// transport bound to the assigned identity.
    pub async fn handshake(reader: R, writer: W) -> Result<Self> {
        let mut lines = reader.lines();

        let line = loop {
            match lines.next_line().await? {
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => break line,
                None => return Err(NodeError::Handshake("input closed before init".into())),
            }
        };

        let message: Message = serde_json::from_str(&line)
            .map_err(|e| NodeError::Handshake(format!("invalid envelope: {}", e)))?;
        if message.body.kind != kinds::INIT {
            return Err(NodeError::Handshake(format!(
                "expected {}, got {}",
                kinds::INIT,
                message.body.kind
            )));
        }
        let init: InitRequest = message.body.decode()?;

        let transport = Self {
            node_id: init.node_id,
            node_ids: init.node_ids,
            lines: Mutex::new(lines),
            writer: Mutex::new(writer),
        };
        transport
            .reply(&message, Body::from_payload(&Payload::InitOk)?)
            .await?;

        tracing::info!(
            node = %transport.node_id,
            cluster = transport.node_ids.len(),
            "initialized"
        );
        Ok(transport)
    }

    /// Every node in the cluster, as announced by `init`.
    pub fn node_ids(&self) -> &[NodeId] {
        &self.node_ids
    }

    async fn write_message(&self, message: &Message) -> murmur_sync::Result<()> {
        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer
            .write_all(&line)
            .await
            .map_err(|e| SyncError::TransportError(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| SyncError::TransportError(e.to_string()))
    }
}

#[async_trait]
impl<R, W> Transport for StdioTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    fn local_node_id(&self) -> NodeId {
        self.node_id.clone()
    }

    async fn send(&self, dest: &NodeId, body: Body) -> murmur_sync::Result<()> {
        let message = Message {
            src: self.node_id.clone(),
            dest: dest.clone(),
            body,
        };
        self.write_message(&message).await
    }

    async fn recv(&self) -> murmur_sync::Result<Message> {
        let mut lines = self.lines.lock().await;
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return Err(SyncError::Closed),
                Err(e) => return Err(SyncError::TransportError(e.to_string())),
            };
            if line.trim().is_empty() {
                continue;
            }

            // Without a parseable envelope there is nobody to reply to.
            match serde_json::from_str(&line) {
                Ok(message) => return Ok(message),
                Err(e) => tracing::warn!(node = %self.node_id, "skipping invalid envelope: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::DuplexStream;

    fn lines(messages: &[serde_json::Value]) -> Vec<u8> {
        let mut out = Vec::new();
        for m in messages {
            out.extend_from_slice(m.to_string().as_bytes());
            out.push(b'\n');
        }
        out
    }

    fn init() -> serde_json::Value {
        json!({
            "src": "c0",
            "dest": "n1",
            "body": {"type": "init", "msg_id": 1, "node_id": "n1", "node_ids": ["n1", "n2"]}
        })
    }

    async fn next_output(output: &mut Lines<BufReader<DuplexStream>>) -> serde_json::Value {
        let line = output.next_line().await.unwrap().unwrap();
        serde_json::from_str(&line).unwrap()
    }

    #[tokio::test]
    async fn test_handshake_replies_init_ok() {
        let input = lines(&[init()]);
        let (writer, output) = tokio::io::duplex(4096);
        let mut output = BufReader::new(output).lines();

        let transport = StdioTransport::handshake(input.as_slice(), writer).await.unwrap();
        assert_eq!(transport.local_node_id(), NodeId::from("n1"));
        assert_eq!(transport.node_ids(), &[NodeId::from("n1"), NodeId::from("n2")]);

        assert_eq!(
            next_output(&mut output).await,
            json!({"src": "n1", "dest": "c0", "body": {"type": "init_ok", "in_reply_to": 1}})
        );
    }

    #[tokio::test]
    async fn test_handshake_requires_init() {
        let input = lines(&[json!({
            "src": "c0",
            "dest": "n1",
            "body": {"type": "read", "msg_id": 1}
        })]);
        let (writer, _output) = tokio::io::duplex(4096);

        let result = StdioTransport::handshake(input.as_slice(), writer).await;
        assert!(matches!(result, Err(NodeError::Handshake(_))));

        let (writer, _output) = tokio::io::duplex(4096);
        let result = StdioTransport::handshake(&b""[..], writer).await;
        assert!(matches!(result, Err(NodeError::Handshake(_))));
    }

    #[tokio::test]
    async fn test_recv_skips_garbage_and_closes() {
        let mut input = lines(&[init()]);
        input.extend_from_slice(b"\nnot json\n");
        input.extend_from_slice(&lines(&[json!({
            "src": "c1",
            "dest": "n1",
            "body": {"type": "broadcast", "msg_id": 2, "message": 42}
        })]));
        let (writer, _output) = tokio::io::duplex(4096);

        let transport = StdioTransport::handshake(input.as_slice(), writer).await.unwrap();

        let message = transport.recv().await.unwrap();
        assert_eq!(message.src, NodeId::from("c1"));
        assert_eq!(message.body.kind, kinds::BROADCAST);

        assert!(matches!(transport.recv().await, Err(SyncError::Closed)));
    }

    #[tokio::test]
    async fn test_send_writes_one_line_per_message() {
        let input = lines(&[init()]);
        let (writer, output) = tokio::io::duplex(4096);
        let mut output = BufReader::new(output).lines();

        let transport = StdioTransport::handshake(input.as_slice(), writer).await.unwrap();
        let _init_ok = next_output(&mut output).await;

        let body = Body::from_payload(&Payload::Propagate(murmur_sync::PropagateRequest {
            messages: vec![murmur_core::Value(9)],
            src: "n1".into(),
        }))
        .unwrap();
        transport.send(&"n2".into(), body).await.unwrap();

        assert_eq!(
            next_output(&mut output).await,
            json!({
                "src": "n1",
                "dest": "n2",
                "body": {"type": "propagate", "messages": [9], "src": "n1"}
            })
        );
    }
}
