//! Page-tree nodes.
//!
//! A node is an `id`, ordered child `items`, and an open bag of fields. Field
//! values stay as JSON: hosts attach arbitrary configuration, and any of it
//! may hide a hook binding or a node-shaped sub-structure.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::hook::HookBinding;
use crate::ids::{self, NodeId};

/// A page-tree element.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "ids::deserialize_optional"
    )]
    pub id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Node>,
    /// Every other field, in document order.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// A node with no id. Hooks on its own fields cannot be attributed.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.items.push(child);
        self
    }

    /// Find the subtree rooted at `id`, searching `items` depth-first.
    pub fn find(&self, id: &str) -> Option<&Node> {
        if self.id.as_ref().is_some_and(|own| own.as_str() == id) {
            return Some(self);
        }
        self.items.iter().find_map(|child| child.find(id))
    }

    /// Every id in this subtree, pre-order. Nodes without an id are skipped
    /// but their children are not.
    pub fn subtree_ids(&self) -> Vec<&NodeId> {
        let mut out = Vec::new();
        self.collect_ids(&mut out);
        out
    }

    fn collect_ids<'a>(&'a self, out: &mut Vec<&'a NodeId>) {
        if let Some(id) = &self.id {
            out.push(id);
        }
        for child in &self.items {
            child.collect_ids(out);
        }
    }
}

/// What a field value is, decided once before traversal dispatches on it.
#[derive(Clone, Copy, Debug)]
pub enum FieldValue<'a> {
    /// A code hook. Not descended into.
    HookBinding(HookBinding<'a>),
    /// Any other object; may describe a sub-node.
    Nested(&'a Map<String, Value>),
    Sequence(&'a [Value]),
    /// Strings, numbers, booleans and null.
    Scalar(&'a Value),
}

impl<'a> FieldValue<'a> {
    pub fn classify(value: &'a Value) -> Self {
        match value {
            Value::Object(map) => match HookBinding::from_map(map) {
                Some(binding) => Self::HookBinding(binding),
                None => Self::Nested(map),
            },
            Value::Array(seq) => Self::Sequence(seq),
            scalar => Self::Scalar(scalar),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page() -> Node {
        serde_json::from_value(json!({
            "id": "page",
            "type": "page",
            "items": [
                {"id": "container", "items": [{"id": "button"}, {"text": "no id"}]},
                {"id": 12, "type": "text"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_deserialize_splits_id_items_fields() {
        let node = page();
        assert_eq!(node.id, Some(NodeId::new("page")));
        assert_eq!(node.items.len(), 2);
        assert_eq!(node.fields.len(), 1);
        assert_eq!(node.fields["type"], json!("page"));
        assert!(!node.fields.contains_key("id"));
        assert!(!node.fields.contains_key("items"));
    }

    #[test]
    fn test_empty_id_reads_as_none() {
        let node: Node = serde_json::from_value(json!({"id": "", "name": "x"})).unwrap();
        assert_eq!(node.id, None);
    }

    #[test]
    fn test_find_subtree() {
        let node = page();
        let container = node.find("container").unwrap();
        assert_eq!(container.items.len(), 2);
        assert!(node.find("12").is_some());
        assert!(node.find("missing").is_none());
    }

    #[test]
    fn test_subtree_ids_skips_anonymous() {
        let node = page();
        let ids: Vec<&str> = node.subtree_ids().into_iter().map(NodeId::as_str).collect();
        assert_eq!(ids, vec!["page", "container", "button", "12"]);
    }

    #[test]
    fn test_classify() {
        let hook = json!({"hookType": "code", "hookData": [{"codeId": "c"}]});
        assert!(matches!(FieldValue::classify(&hook), FieldValue::HookBinding(_)));

        let nested = json!({"style": {"color": "red"}});
        assert!(matches!(FieldValue::classify(&nested), FieldValue::Nested(_)));

        let empty_hook = json!({"hookType": "code", "hookData": []});
        assert!(matches!(FieldValue::classify(&empty_hook), FieldValue::Nested(_)));

        assert!(matches!(FieldValue::classify(&json!([1, 2])), FieldValue::Sequence(_)));
        assert!(matches!(FieldValue::classify(&json!("x")), FieldValue::Scalar(_)));
        assert!(matches!(FieldValue::classify(&Value::Null), FieldValue::Scalar(_)));
    }

    #[test]
    fn test_builder() {
        let node = Node::new("root")
            .with_field("name", json!("Root"))
            .with_child(Node::anonymous().with_child(Node::new("leaf")));
        assert_eq!(node.subtree_ids().len(), 2);
        assert!(node.find("leaf").is_some());
    }
}
