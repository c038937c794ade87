//! Code-block state container.
//!
//! Holds the forward mapping and the editor-side state around it. The mapping
//! lives behind an `Arc` that writers replace wholesale; a reader holding a
//! snapshot never sees a half-applied mutation.
//!
//! # Concurrency Model
//!
//! - parking_lot `RwLock` around the whole state, held only for field swaps
//! - `Arc` snapshots handed out to readers

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::RwLock;

use codeblock_types::{CodeBlockDsl, CodeId, CodeRelation};

#[derive(Debug)]
struct CodeState {
    /// `None` until the host document is loaded.
    dsl: Option<Arc<CodeBlockDsl>>,
    /// Selected code block; empty means no selection.
    selected_id: CodeId,
    editable: bool,
    /// Code ids bound to the current multi-selection.
    combine_ids: Vec<CodeId>,
    /// Ids the host forbids deleting.
    undeletable: BTreeSet<CodeId>,
    relations: Arc<CodeRelation>,
}

impl Default for CodeState {
    fn default() -> Self {
        Self {
            dsl: None,
            selected_id: CodeId::new(),
            editable: true,
            combine_ids: Vec::new(),
            undeletable: BTreeSet::new(),
            relations: Arc::new(CodeRelation::new()),
        }
    }
}

/// Thread-safe holder for the forward mapping and auxiliary state.
#[derive(Debug, Default)]
pub struct CodeBlockStore {
    state: RwLock<CodeState>,
}

impl CodeBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Forward mapping
    // ========================================================================

    /// Snapshot of the current mapping, `None` if not loaded.
    pub fn dsl(&self) -> Option<Arc<CodeBlockDsl>> {
        self.state.read().dsl.clone()
    }

    /// Replace the whole mapping and return the installed snapshot.
    pub fn replace_dsl(&self, dsl: CodeBlockDsl) -> Arc<CodeBlockDsl> {
        let dsl = Arc::new(dsl);
        self.state.write().dsl = Some(dsl.clone());
        dsl
    }

    /// Forget the mapping, back to "not loaded".
    pub fn clear_dsl(&self) {
        self.state.write().dsl = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.state.read().dsl.is_some()
    }

    // ========================================================================
    // Selection and editability
    // ========================================================================

    pub fn selected_id(&self) -> CodeId {
        self.state.read().selected_id.clone()
    }

    /// Select a code block. An empty id is ignored.
    pub fn set_selected_id(&self, id: &str) {
        if id.is_empty() {
            return;
        }
        self.state.write().selected_id = id.to_string();
    }

    pub fn editable(&self) -> bool {
        self.state.read().editable
    }

    pub fn set_editable(&self, editable: bool) {
        self.state.write().editable = editable;
    }

    pub fn combine_ids(&self) -> Vec<CodeId> {
        self.state.read().combine_ids.clone()
    }

    pub fn set_combine_ids(&self, ids: Vec<CodeId>) {
        self.state.write().combine_ids = ids;
    }

    // ========================================================================
    // Non-deletable ids
    // ========================================================================

    pub fn undeletable(&self) -> BTreeSet<CodeId> {
        self.state.read().undeletable.clone()
    }

    pub fn set_undeletable<I>(&self, ids: I)
    where
        I: IntoIterator<Item = CodeId>,
    {
        self.state.write().undeletable = ids.into_iter().collect();
    }

    pub fn is_undeletable(&self, id: &str) -> bool {
        self.state.read().undeletable.contains(id)
    }

    // ========================================================================
    // Relation cache
    // ========================================================================

    pub fn relations(&self) -> Arc<CodeRelation> {
        self.state.read().relations.clone()
    }

    pub fn set_relations(&self, relations: CodeRelation) -> Arc<CodeRelation> {
        let relations = Arc::new(relations);
        self.state.write().relations = relations.clone();
        relations
    }

    /// Back to the freshly-constructed state.
    pub fn reset(&self) {
        *self.state.write() = CodeState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeblock_types::CodeBlockContent;

    fn one_block() -> CodeBlockDsl {
        let mut dsl = CodeBlockDsl::new();
        dsl.insert("code_1".into(), CodeBlockContent::default());
        dsl
    }

    #[test]
    fn test_initial_state() {
        let store = CodeBlockStore::new();
        assert!(store.dsl().is_none());
        assert!(!store.is_loaded());
        assert_eq!(store.selected_id(), "");
        assert!(store.editable());
        assert!(store.combine_ids().is_empty());
        assert!(store.undeletable().is_empty());
        assert!(store.relations().is_empty());
    }

    #[test]
    fn test_replace_leaves_old_snapshot_intact() {
        let store = CodeBlockStore::new();
        store.replace_dsl(one_block());
        let before = store.dsl().unwrap();

        store.replace_dsl(CodeBlockDsl::new());

        assert_eq!(before.len(), 1);
        assert!(store.dsl().unwrap().is_empty());
    }

    #[test]
    fn test_empty_selection_ignored() {
        let store = CodeBlockStore::new();
        store.set_selected_id("code_1");
        store.set_selected_id("");
        assert_eq!(store.selected_id(), "code_1");
    }

    #[test]
    fn test_undeletable() {
        let store = CodeBlockStore::new();
        store.set_undeletable(vec!["code_1".to_string(), "code_2".to_string()]);
        assert!(store.is_undeletable("code_2"));
        assert!(!store.is_undeletable("code_3"));
    }

    #[test]
    fn test_reset() {
        let store = CodeBlockStore::new();
        store.replace_dsl(one_block());
        store.set_selected_id("code_1");
        store.set_editable(false);
        store.set_combine_ids(vec!["code_1".into()]);
        store.set_undeletable(vec!["code_1".to_string()]);
        let mut relations = CodeRelation::new();
        relations.insert("code_1".into(), Default::default());
        store.set_relations(relations);

        store.reset();

        assert!(store.dsl().is_none());
        assert_eq!(store.selected_id(), "");
        assert!(store.editable());
        assert!(store.combine_ids().is_empty());
        assert!(store.undeletable().is_empty());
        assert!(store.relations().is_empty());
    }
}
