//! Host collaborators: where the page tree and the code mapping come from.
//!
//! The graph reads the tree and never writes it. The document source is the
//! system of record for the mapping; the graph is a cache in front of it.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use codeblock_types::{CodeBlockDsl, Node};

use crate::error::GraphResult;

/// Supplies the current page-tree root.
pub trait TreeSource: Send + Sync {
    fn root(&self) -> Option<Arc<Node>>;
}

/// Authoritative load/persist of the forward mapping.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// The mapping stored in the host document, `None` if it has none.
    async fn current_dsl(&self) -> GraphResult<Option<CodeBlockDsl>>;

    /// Store a new mapping in the host document.
    async fn persist_dsl(&self, dsl: &CodeBlockDsl) -> GraphResult<()>;
}

/// Tree source backed by a swappable root.
#[derive(Debug, Default)]
pub struct StaticTreeSource {
    root: RwLock<Option<Arc<Node>>>,
}

impl StaticTreeSource {
    pub fn new(root: Node) -> Self {
        Self {
            root: RwLock::new(Some(Arc::new(root))),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn set_root(&self, root: Option<Node>) {
        *self.root.write() = root.map(Arc::new);
    }
}

impl TreeSource for StaticTreeSource {
    fn root(&self) -> Option<Arc<Node>> {
        self.root.read().clone()
    }
}

/// In-memory document source.
#[derive(Debug, Default)]
pub struct MemoryDocumentSource {
    dsl: RwLock<Option<CodeBlockDsl>>,
    persist_count: RwLock<usize>,
}

impl MemoryDocumentSource {
    pub fn new(dsl: Option<CodeBlockDsl>) -> Self {
        Self {
            dsl: RwLock::new(dsl),
            persist_count: RwLock::new(0),
        }
    }

    /// Simulate an edit made to the document outside the graph.
    pub fn replace_externally(&self, dsl: Option<CodeBlockDsl>) {
        *self.dsl.write() = dsl;
    }

    pub fn stored(&self) -> Option<CodeBlockDsl> {
        self.dsl.read().clone()
    }

    pub fn persist_count(&self) -> usize {
        *self.persist_count.read()
    }
}

#[async_trait]
impl DocumentSource for MemoryDocumentSource {
    async fn current_dsl(&self) -> GraphResult<Option<CodeBlockDsl>> {
        Ok(self.dsl.read().clone())
    }

    async fn persist_dsl(&self, dsl: &CodeBlockDsl) -> GraphResult<()> {
        *self.dsl.write() = Some(dsl.clone());
        *self.persist_count.write() += 1;
        Ok(())
    }
}
