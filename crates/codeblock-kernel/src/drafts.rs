//! Scratch storage for unsaved code edits.
//!
//! Entirely separate from the forward mapping: a draft never becomes block
//! content unless the host saves it through the graph service.

use std::collections::HashMap;

use parking_lot::RwLock;

/// Key-value store for draft text.
pub trait DraftStore: Send + Sync {
    fn set(&self, key: &str, text: &str);
    fn get(&self, key: &str) -> Option<String>;
    fn remove(&self, key: &str);
}

/// Draft key for a code block: `<prefix>_<code id>`.
pub fn draft_key(prefix: &str, code_id: &str) -> String {
    format!("{prefix}_{code_id}")
}

/// In-memory [`DraftStore`].
#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    drafts: RwLock<HashMap<String, String>>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.drafts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.read().is_empty()
    }
}

impl DraftStore for MemoryDraftStore {
    fn set(&self, key: &str, text: &str) {
        self.drafts.write().insert(key.to_string(), text.to_string());
    }

    fn get(&self, key: &str) -> Option<String> {
        self.drafts.read().get(key).cloned()
    }

    fn remove(&self, key: &str) {
        self.drafts.write().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        assert_eq!(draft_key("code_draft", "code_1234"), "code_draft_code_1234");
    }

    #[test]
    fn test_set_get_remove() {
        let store = MemoryDraftStore::new();
        assert!(store.is_empty());

        store.set("k", "fn a() {}");
        store.set("k", "fn b() {}");
        assert_eq!(store.get("k").as_deref(), Some("fn b() {}"));
        assert_eq!(store.len(), 1);

        store.remove("k");
        store.remove("k");
        assert!(store.get("k").is_none());
    }
}
