//! Strong type definitions for murmur.
//!
//! Values and node identities are newtypes so a peer id can never be
//! broadcast as data and vice versa.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// A broadcast value.
///
/// Values are opaque to the protocol: they are compared by equality, never
/// mutated, and never removed once stored. On the wire a value is a bare
/// JSON integer.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Value(pub i64);

impl Value {
    /// Get the raw integer.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({})", self.0)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Value {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

/// Identity of a node in the network, e.g. `"n1"` or `"c3"`.
///
/// Assigned externally (by the transport) and read-only for the lifetime
/// of the process.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a node id from any string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_value_is_bare_json_integer() {
        let json = serde_json::to_string(&Value(42)).unwrap();
        assert_eq!(json, "42");

        let parsed: Value = serde_json::from_str("-7").unwrap();
        assert_eq!(parsed, Value(-7));
    }

    #[test]
    fn test_value_rejects_non_integers() {
        assert!(serde_json::from_str::<Value>("1.5").is_err());
        assert!(serde_json::from_str::<Value>("\"42\"").is_err());
    }

    #[test]
    fn test_node_id_as_map_key() {
        let topology: HashMap<NodeId, Vec<NodeId>> =
            serde_json::from_str(r#"{"n1": ["n2", "n3"]}"#).unwrap();
        let neighbors = topology.get("n1").unwrap();
        assert_eq!(neighbors, &vec![NodeId::from("n2"), NodeId::from("n3")]);
    }

    #[test]
    fn test_node_id_display() {
        let id = NodeId::new("n7");
        assert_eq!(format!("{}", id), "n7");
        assert_eq!(format!("{:?}", id), "NodeId(n7)");
    }
}
