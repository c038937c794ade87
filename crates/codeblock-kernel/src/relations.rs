//! Reverse index from code blocks to the nodes that bind them.
//!
//! Every field of every node is classified once ([`FieldValue`]) and then
//! dispatched:
//!
//! - a code hook records `relations[code_id][node_id] += field key`
//! - a nested object is walked as a synthetic node that keeps the enclosing
//!   node's id (unless it carries its own `id`)
//! - sequences and scalars are ignored; only `items` hold children
//!
//! After a node's own fields, its `items` are walked, each child under its
//! own id. Hooks found where no id is in scope are dropped.

use serde_json::{Map, Value};

use codeblock_types::{CodeRelation, FieldValue, HookBinding, Node, NodeId};

/// Build the reverse index for the tree rooted at `root`.
///
/// Pure and deterministic: the same tree always yields an equal index.
pub fn compute_relations(root: &Node) -> CodeRelation {
    let mut relations = CodeRelation::new();
    walk_node(root, &mut relations);
    relations
}

fn walk_node(node: &Node, relations: &mut CodeRelation) {
    walk_fields(node.id.as_ref(), node.fields.iter(), relations);
    for child in &node.items {
        walk_node(child, relations);
    }
}

/// Walk an object value as if it were a node owned by `owner`.
fn walk_nested(owner: Option<&NodeId>, map: &Map<String, Value>, relations: &mut CodeRelation) {
    let own_id = map.get("id").and_then(NodeId::from_value);
    let owner = own_id.as_ref().or(owner);

    let fields = map.iter().filter(|(key, value)| !is_structural(key, value));
    walk_fields(owner, fields, relations);

    if let Some(Value::Array(items)) = map.get("items") {
        for item in items {
            if let Value::Object(child) = item {
                walk_nested(None, child, relations);
            }
        }
    }
}

fn walk_fields<'a>(
    owner: Option<&NodeId>,
    fields: impl Iterator<Item = (&'a String, &'a Value)>,
    relations: &mut CodeRelation,
) {
    for (key, value) in fields {
        match FieldValue::classify(value) {
            FieldValue::HookBinding(binding) => {
                if let Some(owner) = owner {
                    record(relations, owner, key, binding);
                }
            }
            FieldValue::Nested(map) => walk_nested(owner, map, relations),
            FieldValue::Sequence(_) | FieldValue::Scalar(_) => {}
        }
    }
}

fn record(relations: &mut CodeRelation, owner: &NodeId, key: &str, binding: HookBinding<'_>) {
    for code_id in binding.code_ids() {
        relations
            .entry(code_id.to_string())
            .or_default()
            .entry(owner.clone())
            .or_default()
            .push(key.to_string());
    }
}

/// `id`, and `items` when it holds children. Any other `items` value is an
/// ordinary field.
fn is_structural(key: &str, value: &Value) -> bool {
    key == "id" || (key == "items" && value.is_array())
}
