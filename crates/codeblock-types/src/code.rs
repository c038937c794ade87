//! Code blocks, the forward mapping, and the reverse index.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::ids::NodeId;

/// Code-block identifier, e.g. `code_1234`.
pub type CodeId = String;

/// Per-node binding registry of a code block: which nodes may invoke it,
/// with whatever metadata the host attaches.
pub type CompBindings = BTreeMap<NodeId, Value>;

/// Forward mapping: the single source of truth for code-block content.
pub type CodeBlockDsl = BTreeMap<CodeId, CodeBlockContent>;

/// Reverse index: code id → node id → hook keys, in discovery order.
///
/// Derived from a page tree; never serialized by the graph itself.
pub type CodeRelation = BTreeMap<CodeId, BTreeMap<NodeId, Vec<String>>>;

/// Opaque executable produced by a compiler collaborator.
///
/// The graph never runs it; it only carries it alongside the source.
pub trait Executable: fmt::Debug + Send + Sync {
    /// Downcast hook for whoever eventually executes the block.
    fn as_any(&self) -> &dyn Any;
}

/// Source text of a code block plus its compiled form, once compiled.
///
/// Serializes as the bare source string; deserialized content is uncompiled.
#[derive(Clone)]
pub struct CodeContent {
    source: String,
    compiled: Option<Arc<dyn Executable>>,
}

impl CodeContent {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            compiled: None,
        }
    }

    pub fn compiled(source: impl Into<String>, executable: Arc<dyn Executable>) -> Self {
        Self {
            source: source.into(),
            compiled: Some(executable),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn executable(&self) -> Option<&Arc<dyn Executable>> {
        self.compiled.as_ref()
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled.is_some()
    }
}

impl fmt::Debug for CodeContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeContent")
            .field("source", &self.source)
            .field("compiled", &self.compiled.is_some())
            .finish()
    }
}

/// Executables are opaque, so equality is source plus compiled-ness.
impl PartialEq for CodeContent {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.is_compiled() == other.is_compiled()
    }
}

impl Serialize for CodeContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for CodeContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

/// One entry of the forward mapping.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeBlockContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<CodeContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comps: Option<CompBindings>,
    /// Host fields the graph does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CodeBlockContent {
    pub fn with_comps<I, K>(mut self, node_ids: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<NodeId>,
    {
        self.comps = Some(
            node_ids
                .into_iter()
                .map(|id| (id.into(), Value::Object(Map::new())))
                .collect(),
        );
        self
    }

    /// Whether `node_id` is registered in `comps`.
    pub fn is_bound_to(&self, node_id: &str) -> bool {
        self.comps
            .as_ref()
            .is_some_and(|comps| comps.contains_key(node_id))
    }
}

/// Partial update for a code block. Present fields overwrite, absent fields
/// are left alone.
///
/// `content` is raw source; it is compiled before it is merged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeBlockPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comps: Option<CompBindings>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CodeBlockPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }

    pub fn content(mut self, source: impl Into<String>) -> Self {
        self.content = Some(source.into());
        self
    }

    pub fn params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    pub fn comps(mut self, comps: CompBindings) -> Self {
        self.comps = Some(comps);
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}
