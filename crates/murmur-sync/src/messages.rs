//! Wire message types.
//!
//! Every message is an envelope `{"src", "dest", "body"}`. The body always
//! carries a `type` tag and optional `msg_id` / `in_reply_to` correlation
//! ids; the remaining fields depend on the type and are decoded strictly
//! into the typed request structs below.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Map;

use murmur_core::{NodeId, Value};

use crate::error::{Result, SyncError};

/// Message type tags, as they appear in `body.type`.
pub mod kinds {
    pub const INIT: &str = "init";
    pub const INIT_OK: &str = "init_ok";
    pub const TOPOLOGY: &str = "topology";
    pub const TOPOLOGY_OK: &str = "topology_ok";
    pub const BROADCAST: &str = "broadcast";
    pub const BROADCAST_OK: &str = "broadcast_ok";
    pub const PROPAGATE: &str = "propagate";
    pub const READ: &str = "read";
    pub const READ_OK: &str = "read_ok";
    pub const ERROR: &str = "error";
}

/// A routed message between two nodes (or a client and a node).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Sender.
    pub src: NodeId,
    /// Recipient.
    pub dest: NodeId,
    /// Typed payload plus correlation ids.
    pub body: Body,
}

/// Message body as received off the wire.
///
/// The payload fields are kept undecoded until a handler asks for the
/// shape it expects with [`Body::decode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Message type tag (see [`kinds`]).
    #[serde(rename = "type")]
    pub kind: String,
    /// Sender-assigned id, unique per sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<u64>,
    /// `msg_id` of the request this body answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<u64>,
    /// Remaining type-specific fields.
    #[serde(flatten)]
    pub fields: Map<String, serde_json::Value>,
}

impl Body {
    /// Encode a typed payload into a body without correlation ids.
    pub fn from_payload(payload: &Payload) -> Result<Self> {
        let value = serde_json::to_value(payload)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Decode the type-specific fields into `T`.
    ///
    /// Any mismatch is a [`SyncError::MalformedRequest`].
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(serde_json::Value::Object(self.fields.clone()))
            .map_err(|e| SyncError::MalformedRequest(format!("{}: {}", self.kind, e)))
    }

    /// Decode the whole body, type tag included, into a [`Payload`].
    pub fn to_payload(&self) -> Result<Payload> {
        let mut object = self.fields.clone();
        object.insert("type".into(), serde_json::Value::String(self.kind.clone()));
        serde_json::from_value(serde_json::Value::Object(object))
            .map_err(|e| SyncError::MalformedRequest(format!("{}: {}", self.kind, e)))
    }

    /// Set the message id.
    pub fn with_msg_id(mut self, msg_id: u64) -> Self {
        self.msg_id = Some(msg_id);
        self
    }

    /// Mark this body as a reply to `msg_id`.
    pub fn in_reply_to(mut self, msg_id: Option<u64>) -> Self {
        self.in_reply_to = msg_id;
        self
    }
}

/// Every payload this protocol speaks, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    /// Transport handshake: tells a node who it is.
    Init(InitRequest),
    InitOk,

    /// Install the cluster topology.
    Topology(TopologyRequest),
    TopologyOk,

    /// Client submits a new value.
    Broadcast(BroadcastRequest),
    BroadcastOk,

    /// Peer pushes its full value set. Never answered.
    Propagate(PropagateRequest),

    /// Client asks for every value seen so far.
    Read,
    ReadOk(ReadOk),

    /// A request failed.
    Error(ErrorBody),
}

impl Payload {
    /// The `type` tag this payload is sent with.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Init(_) => kinds::INIT,
            Payload::InitOk => kinds::INIT_OK,
            Payload::Topology(_) => kinds::TOPOLOGY,
            Payload::TopologyOk => kinds::TOPOLOGY_OK,
            Payload::Broadcast(_) => kinds::BROADCAST,
            Payload::BroadcastOk => kinds::BROADCAST_OK,
            Payload::Propagate(_) => kinds::PROPAGATE,
            Payload::Read => kinds::READ,
            Payload::ReadOk(_) => kinds::READ_OK,
            Payload::Error(_) => kinds::ERROR,
        }
    }
}

/// `init` fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitRequest {
    /// Identity assigned to the receiving node.
    pub node_id: NodeId,
    /// Every node in the cluster, including the receiver.
    pub node_ids: Vec<NodeId>,
}

/// `topology` fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyRequest {
    /// Node id to its direct neighbors, for the whole cluster.
    pub topology: HashMap<NodeId, Vec<NodeId>>,
}

/// `broadcast` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastRequest {
    /// The value to remember.
    pub message: Value,
}

/// `propagate` fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagateRequest {
    /// The sender's full value set at its last tick.
    pub messages: Vec<Value>,
    /// The sending node.
    pub src: NodeId,
}

/// `read_ok` fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadOk {
    /// Every value the node has seen, in no particular order.
    pub messages: Vec<Value>,
}

/// `error` fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable description.
    pub text: String,
}

impl From<&SyncError> for ErrorBody {
    fn from(err: &SyncError) -> Self {
        Self {
            code: err.code(),
            text: err.to_string(),
        }
    }
}

/// Error codes reported in `error` replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    /// Request timed out.
    Timeout = 0,
    /// Destination node does not exist.
    NodeNotFound = 1,
    /// Message type has no handler.
    NotSupported = 10,
    /// Transient failure; the request may be retried.
    TemporarilyUnavailable = 11,
    /// Payload did not parse into the expected shape.
    MalformedRequest = 12,
    /// Internal failure on the node.
    Crash = 13,
    /// Request was aborted.
    Abort = 14,
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code as u16
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = String;

    fn try_from(raw: u16) -> std::result::Result<Self, Self::Error> {
        match raw {
            0 => Ok(ErrorCode::Timeout),
            1 => Ok(ErrorCode::NodeNotFound),
            10 => Ok(ErrorCode::NotSupported),
            11 => Ok(ErrorCode::TemporarilyUnavailable),
            12 => Ok(ErrorCode::MalformedRequest),
            13 => Ok(ErrorCode::Crash),
            14 => Ok(ErrorCode::Abort),
            other => Err(format!("unknown error code {}", other)),
        }
    }
}
