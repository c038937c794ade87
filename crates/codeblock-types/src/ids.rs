//! Node identifiers.
//!
//! Hosts write node ids either as strings or as numbers. Both are normalised
//! to a string-backed [`NodeId`] so they can key maps and compare cheaply.
//! An empty string is never a valid id; it reads back as "no id".

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Identifier of a page-tree node.
///
/// Unique within a tree by convention only; nothing here enforces it.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read an id out of a JSON value.
    ///
    /// Accepts non-empty strings and numbers; everything else (including
    /// `null` and `""`) means the node has no id.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
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

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::String(s) => Ok(Self(s)),
            Value::Number(n) => Ok(Self(n.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "node id must be a string or number, got {other}"
            ))),
        }
    }
}

/// Deserialize an optional node id, mapping `null`, `""` and non-scalars to `None`.
pub(crate) fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<NodeId>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(NodeId::from_value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_accepts_strings_and_numbers() {
        assert_eq!(NodeId::from_value(&json!("page_1")), Some(NodeId::new("page_1")));
        assert_eq!(NodeId::from_value(&json!(42)), Some(NodeId::new("42")));
    }

    #[test]
    fn test_from_value_rejects_empty_and_null() {
        assert_eq!(NodeId::from_value(&json!("")), None);
        assert_eq!(NodeId::from_value(&Value::Null), None);
        assert_eq!(NodeId::from_value(&json!({"id": "x"})), None);
    }

    #[test]
    fn test_borrow_lookup() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(NodeId::new("btn"), 1);
        assert_eq!(map.get("btn"), Some(&1));
        assert_eq!(map.remove("btn"), Some(1));
    }

    #[test]
    fn test_serde_roundtrip_numeric() {
        let id: NodeId = serde_json::from_value(json!(7)).unwrap();
        assert_eq!(id.as_str(), "7");
        assert_eq!(serde_json::to_value(&id).unwrap(), json!("7"));
    }
}
