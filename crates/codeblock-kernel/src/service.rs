//! Code-block graph service.
//!
//! Ties the store, the relation indexer and the cascade cleaner to the host's
//! collaborators. Every change to the forward mapping follows the same path:
//! copy the current mapping, edit the copy, persist it through the document
//! source, swap it into the store, and publish one `code.dsl_changed` event
//! carrying the whole new mapping.
//!
//! Mapping mutations are serialized by an async write gate, so two callers
//! editing different blocks at once cannot lose each other's update.

use std::sync::Arc;

use rand::Rng;
use tokio::sync::Mutex;
use tracing::{debug, info};

use codeblock_types::{
    CodeBlockContent, CodeBlockDsl, CodeBlockPatch, CodeContent, CodeId, CodeRelation, Node,
};

use crate::cascade::purge_node;
use crate::compiler::{CodeCompiler, RhaiCompiler};
use crate::config::GraphConfig;
use crate::drafts::{DraftStore, MemoryDraftStore, draft_key};
use crate::error::{GraphError, GraphResult};
use crate::flows::{CodeFlow, SharedCodeFlowBus, Subscription, shared_code_flow_bus};
use crate::relations::compute_relations;
use crate::sources::{DocumentSource, TreeSource};
use crate::store::CodeBlockStore;

/// Shallow merge of a patch into a block.
///
/// Present patch fields overwrite, absent ones keep the old value. `comps` is
/// replaced wholesale when supplied, never merged key by key. Unknown fields
/// overwrite per key.
pub fn merge_patch(
    mut base: CodeBlockContent,
    patch: CodeBlockPatch,
    content: Option<CodeContent>,
) -> CodeBlockContent {
    if let Some(name) = patch.name {
        base.name = Some(name);
    }
    if let Some(desc) = patch.desc {
        base.desc = Some(desc);
    }
    if let Some(content) = content {
        base.content = Some(content);
    }
    if let Some(params) = patch.params {
        base.params = Some(params);
    }
    if let Some(comps) = patch.comps {
        base.comps = Some(comps);
    }
    base.extra.extend(patch.extra);
    base
}

/// Builder for [`CodeBlockGraphService`].
pub struct GraphServiceBuilder {
    tree: Arc<dyn TreeSource>,
    document: Arc<dyn DocumentSource>,
    compiler: Option<Arc<dyn CodeCompiler>>,
    drafts: Option<Arc<dyn DraftStore>>,
    config: GraphConfig,
}

impl GraphServiceBuilder {
    pub fn compiler(mut self, compiler: Arc<dyn CodeCompiler>) -> Self {
        self.compiler = Some(compiler);
        self
    }

    pub fn drafts(mut self, drafts: Arc<dyn DraftStore>) -> Self {
        self.drafts = Some(drafts);
        self
    }

    pub fn config(mut self, config: GraphConfig) -> Self {
        self.config = config;
        self
    }

    /// Defaults: [`RhaiCompiler`], [`MemoryDraftStore`].
    ///
    /// Fails with [`GraphError::Config`] when the config is out of range.
    pub fn build(self) -> GraphResult<CodeBlockGraphService> {
        self.config.validate()?;
        Ok(CodeBlockGraphService {
            store: CodeBlockStore::new(),
            tree: self.tree,
            document: self.document,
            compiler: self
                .compiler
                .unwrap_or_else(|| Arc::new(RhaiCompiler::new())),
            drafts: self
                .drafts
                .unwrap_or_else(|| Arc::new(MemoryDraftStore::new())),
            flows: shared_code_flow_bus(self.config.flow_capacity),
            config: self.config,
            write_gate: Mutex::new(()),
        })
    }
}

/// The code-block graph for one host document.
pub struct CodeBlockGraphService {
    store: CodeBlockStore,
    tree: Arc<dyn TreeSource>,
    document: Arc<dyn DocumentSource>,
    compiler: Arc<dyn CodeCompiler>,
    drafts: Arc<dyn DraftStore>,
    flows: SharedCodeFlowBus,
    config: GraphConfig,
    write_gate: Mutex<()>,
}

impl CodeBlockGraphService {
    pub fn builder(
        tree: Arc<dyn TreeSource>,
        document: Arc<dyn DocumentSource>,
    ) -> GraphServiceBuilder {
        GraphServiceBuilder {
            tree,
            document,
            compiler: None,
            drafts: None,
            config: GraphConfig::default(),
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn store(&self) -> &CodeBlockStore {
        &self.store
    }

    /// Subscribe to change notifications, e.g. `"code.dsl_changed"` or
    /// `"code.*"`. Drop the subscription to unsubscribe.
    pub fn subscribe(&self, pattern: &str) -> Subscription<CodeFlow> {
        self.flows.subscribe(pattern)
    }

    pub fn flows(&self) -> SharedCodeFlowBus {
        self.flows.clone()
    }

    // ========================================================================
    // Forward mapping
    // ========================================================================

    /// Replace the whole mapping.
    pub async fn set_dsl(&self, dsl: CodeBlockDsl) -> GraphResult<Arc<CodeBlockDsl>> {
        let _gate = self.write_gate.lock().await;
        self.commit(dsl).await
    }

    /// The cached mapping, fetched from the document source when absent or
    /// when `force_refresh` is set.
    ///
    /// A fetch holds the write gate, so it cannot install a mapping older
    /// than one a concurrent mutation just committed.
    pub async fn get_dsl(&self, force_refresh: bool) -> GraphResult<Option<Arc<CodeBlockDsl>>> {
        if !force_refresh {
            if let Some(dsl) = self.store.dsl() {
                return Ok(Some(dsl));
            }
        }

        let _gate = self.write_gate.lock().await;
        self.load_locked(force_refresh).await
    }

    /// Fetch-and-install behind [`Self::get_dsl`]. Callers hold the write gate.
    async fn load_locked(&self, force_refresh: bool) -> GraphResult<Option<Arc<CodeBlockDsl>>> {
        if !force_refresh {
            if let Some(dsl) = self.store.dsl() {
                return Ok(Some(dsl));
            }
        }

        let fetched = self.document.current_dsl().await?;
        debug!(
            force_refresh,
            blocks = fetched.as_ref().map_or(0, |d| d.len()),
            "fetched code dsl from document"
        );
        Ok(match fetched {
            Some(dsl) => Some(self.store.replace_dsl(dsl)),
            None => {
                self.store.clear_dsl();
                None
            }
        })
    }

    /// Content of block `id`. Empty or unknown ids yield `None`.
    pub async fn get_content_by_id(&self, id: &str) -> GraphResult<Option<CodeBlockContent>> {
        if id.is_empty() {
            return Ok(None);
        }
        Ok(self
            .get_dsl(false)
            .await?
            .and_then(|dsl| dsl.get(id).cloned()))
    }

    /// Content of the selected block.
    pub async fn get_current_content(&self) -> GraphResult<Option<CodeBlockContent>> {
        let id = self.store.selected_id();
        self.get_content_by_id(&id).await
    }

    /// Create or update block `id`.
    ///
    /// Source in `patch.content` is compiled first; a compile error is
    /// returned and the mapping is left untouched. An empty id is a no-op.
    pub async fn set_content_by_id(&self, id: &str, patch: CodeBlockPatch) -> GraphResult<()> {
        if id.is_empty() {
            debug!("ignoring code block update with empty id");
            return Ok(());
        }

        let content = match patch.content.as_deref() {
            Some(source) => {
                let executable =
                    self.compiler
                        .compile(source)
                        .map_err(|message| GraphError::Compile {
                            code_id: id.to_string(),
                            message,
                        })?;
                Some(CodeContent::compiled(source, executable))
            }
            None => None,
        };

        let _gate = self.write_gate.lock().await;
        let mut dsl = self.current_or_empty().await?;
        let existing = dsl.remove(id).unwrap_or_default();
        dsl.insert(id.to_string(), merge_patch(existing, patch, content));

        info!(code_id = %id, "code block saved");
        self.commit(dsl).await?;
        Ok(())
    }

    /// The blocks among `ids` that exist. Unknown ids are omitted.
    pub async fn get_by_ids<S: AsRef<str>>(&self, ids: &[S]) -> GraphResult<CodeBlockDsl> {
        let Some(dsl) = self.get_dsl(false).await? else {
            return Ok(CodeBlockDsl::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| {
                let id = id.as_ref();
                dsl.get(id).map(|block| (id.to_string(), block.clone()))
            })
            .collect())
    }

    /// Remove blocks by id and return the resulting mapping. Unknown ids are
    /// ignored.
    pub async fn delete_by_ids<S: AsRef<str>>(&self, ids: &[S]) -> GraphResult<Arc<CodeBlockDsl>> {
        let _gate = self.write_gate.lock().await;
        let mut dsl = self.current_or_empty().await?;
        let before = dsl.len();
        for id in ids {
            dsl.remove(id.as_ref());
        }
        info!(removed = before - dsl.len(), "code blocks deleted");
        self.commit(dsl).await
    }

    /// A `<prefix>_<digits>` id not present in the current mapping.
    ///
    /// Gives up with [`GraphError::IdSpaceExhausted`] after
    /// `max_id_attempts` collisions.
    pub async fn generate_unique_id(&self) -> GraphResult<CodeId> {
        let dsl = self.get_dsl(false).await?;
        let space = self.config.id_space();
        let width = self.config.id_digits as usize;
        let mut rng = rand::thread_rng();

        for _ in 0..self.config.max_id_attempts {
            let candidate = format!(
                "{}_{:0width$}",
                self.config.id_prefix,
                rng.gen_range(0..space),
                width = width
            );
            if !dsl.as_ref().is_some_and(|d| d.contains_key(&candidate)) {
                return Ok(candidate);
            }
        }

        Err(GraphError::IdSpaceExhausted {
            attempts: self.config.max_id_attempts,
        })
    }

    /// Unbind a removed subtree from every block's `comps`.
    ///
    /// Works on a copy and installs it as a whole. No-op when no mapping is
    /// loaded.
    pub async fn delete_node_and_cascade(&self, node: &Node) -> GraphResult<()> {
        let _gate = self.write_gate.lock().await;
        let Some(current) = self.load_locked(false).await? else {
            return Ok(());
        };

        let mut dsl = (*current).clone();
        let removed = purge_node(node, &mut dsl);
        info!(
            node_id = node.id.as_ref().map_or("", |id| id.as_str()),
            removed, "purged node subtree from code bindings"
        );
        self.commit(dsl).await?;
        Ok(())
    }

    // ========================================================================
    // Relations
    // ========================================================================

    /// Rebuild the relation cache from the tree source's root. `None` when
    /// the host has no tree.
    pub fn refresh_relations(&self) -> Option<Arc<CodeRelation>> {
        let root = self.tree.root()?;
        let relations = self.store.set_relations(compute_relations(&root));
        debug!(codes = relations.len(), "relations refreshed");
        self.flows.publish(CodeFlow::RelationsRefreshed {
            relations: relations.clone(),
        });
        Some(relations)
    }

    /// The cached relations from the last refresh.
    pub fn relations(&self) -> Arc<CodeRelation> {
        self.store.relations()
    }

    // ========================================================================
    // Editor state
    // ========================================================================

    pub fn selected_id(&self) -> CodeId {
        self.store.selected_id()
    }

    pub fn set_selected_id(&self, id: &str) {
        self.store.set_selected_id(id);
    }

    pub fn editable(&self) -> bool {
        self.store.editable()
    }

    pub fn set_editable(&self, editable: bool) {
        self.store.set_editable(editable);
    }

    pub fn combine_ids(&self) -> Vec<CodeId> {
        self.store.combine_ids()
    }

    pub fn set_combine_ids(&self, ids: Vec<CodeId>) {
        self.store.set_combine_ids(ids);
    }

    /// Ids the host forbids deleting. Business input; `delete_by_ids` does
    /// not consult it.
    pub fn undeletable(&self) -> Vec<CodeId> {
        self.store.undeletable().into_iter().collect()
    }

    pub fn set_undeletable(&self, ids: Vec<CodeId>) {
        self.store.set_undeletable(ids);
    }

    pub fn is_undeletable(&self, id: &str) -> bool {
        self.store.is_undeletable(id)
    }

    // ========================================================================
    // Drafts
    // ========================================================================

    pub fn set_draft(&self, code_id: &str, text: &str) {
        self.drafts
            .set(&draft_key(&self.config.draft_key_prefix, code_id), text);
    }

    pub fn get_draft(&self, code_id: &str) -> Option<String> {
        self.drafts
            .get(&draft_key(&self.config.draft_key_prefix, code_id))
    }

    pub fn remove_draft(&self, code_id: &str) {
        self.drafts
            .remove(&draft_key(&self.config.draft_key_prefix, code_id));
    }

    /// Drop all cached state. Drafts and subscribers are kept.
    pub fn reset(&self) {
        self.store.reset();
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Callers hold the write gate.
    async fn current_or_empty(&self) -> GraphResult<CodeBlockDsl> {
        Ok(self
            .load_locked(false)
            .await?
            .map(|dsl| (*dsl).clone())
            .unwrap_or_default())
    }

    /// Persist, install, announce. Callers hold the write gate.
    async fn commit(&self, dsl: CodeBlockDsl) -> GraphResult<Arc<CodeBlockDsl>> {
        self.document.persist_dsl(&dsl).await?;
        let dsl = self.store.replace_dsl(dsl);
        let receivers = self.flows.publish(CodeFlow::DslChanged { dsl: dsl.clone() });
        info!(blocks = dsl.len(), receivers, "code dsl changed");
        Ok(dsl)
    }
}

impl std::fmt::Debug for CodeBlockGraphService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeBlockGraphService")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::sources::{MemoryDocumentSource, StaticTreeSource};

    fn service(dsl: Option<CodeBlockDsl>) -> (CodeBlockGraphService, Arc<MemoryDocumentSource>) {
        let document = Arc::new(MemoryDocumentSource::new(dsl));
        let service =
            CodeBlockGraphService::builder(Arc::new(StaticTreeSource::empty()), document.clone())
                .build()
                .unwrap();
        (service, document)
    }

    fn dsl(value: serde_json::Value) -> CodeBlockDsl {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_merge_keeps_absent_fields() {
        let base: CodeBlockContent = serde_json::from_value(json!({
            "name": "old",
            "desc": "kept",
            "content": "fn a() {}",
            "comps": {"n1": {}},
            "timeout": 1,
            "retries": 2
        }))
        .unwrap();

        let merged = merge_patch(
            base,
            CodeBlockPatch::new().name("new").extra("timeout", json!(9)),
            None,
        );

        assert_eq!(merged.name.as_deref(), Some("new"));
        assert_eq!(merged.desc.as_deref(), Some("kept"));
        assert_eq!(merged.content.as_ref().unwrap().source(), "fn a() {}");
        assert!(merged.is_bound_to("n1"));
        assert_eq!(merged.extra["timeout"], json!(9));
        assert_eq!(merged.extra["retries"], json!(2));
    }

    #[test]
    fn test_merge_replaces_comps_wholesale() {
        let base = CodeBlockContent::default().with_comps(["a", "b"]);
        let mut comps = codeblock_types::CompBindings::new();
        comps.insert("c".into(), json!({}));

        let merged = merge_patch(base, CodeBlockPatch::new().comps(comps), None);

        assert!(!merged.is_bound_to("a"));
        assert!(!merged.is_bound_to("b"));
        assert!(merged.is_bound_to("c"));
    }

    #[tokio::test]
    async fn test_get_dsl_caches_until_forced() {
        let (service, document) = service(Some(dsl(json!({"a": {}}))));

        assert_eq!(service.get_dsl(false).await.unwrap().unwrap().len(), 1);

        document.replace_externally(Some(dsl(json!({"a": {}, "b": {}}))));
        assert_eq!(service.get_dsl(false).await.unwrap().unwrap().len(), 1);
        assert_eq!(service.get_dsl(true).await.unwrap().unwrap().len(), 2);

        document.replace_externally(None);
        assert!(service.get_dsl(true).await.unwrap().is_none());
        assert!(!service.store().is_loaded());
    }

    #[tokio::test]
    async fn test_get_content_by_id_empty_and_missing() {
        let (service, _) = service(Some(dsl(json!({"a": {"name": "A"}}))));
        assert!(service.get_content_by_id("").await.unwrap().is_none());
        assert!(service.get_content_by_id("zzz").await.unwrap().is_none());
        assert_eq!(
            service.get_content_by_id("a").await.unwrap().unwrap().name.as_deref(),
            Some("A")
        );
    }

    #[tokio::test]
    async fn test_current_content_follows_selection() {
        let (service, _) = service(Some(dsl(json!({"a": {"name": "A"}}))));
        assert!(service.get_current_content().await.unwrap().is_none());
        service.set_selected_id("a");
        assert!(service.get_current_content().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_empty_id_update_is_noop() {
        let (service, document) = service(None);
        service
            .set_content_by_id("", CodeBlockPatch::new().name("x"))
            .await
            .unwrap();
        assert_eq!(document.persist_count(), 0);
        assert!(service.get_dsl(false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_without_mapping_yields_empty() {
        let (service, document) = service(None);
        let result = service.delete_by_ids(&["a"]).await.unwrap();
        assert!(result.is_empty());
        assert_eq!(document.stored(), Some(CodeBlockDsl::new()));
    }

    #[tokio::test]
    async fn test_cascade_without_mapping_is_noop() {
        let (service, document) = service(None);
        service
            .delete_node_and_cascade(&Node::new("n"))
            .await
            .unwrap();
        assert_eq!(document.persist_count(), 0);
    }

    #[tokio::test]
    async fn test_refresh_relations_without_root() {
        let (service, _) = service(None);
        assert!(service.refresh_relations().is_none());
        assert!(service.relations().is_empty());
    }

    #[test]
    fn test_build_rejects_zero_flow_capacity() {
        let config = GraphConfig {
            flow_capacity: 0,
            ..GraphConfig::default()
        };
        let result = CodeBlockGraphService::builder(
            Arc::new(StaticTreeSource::empty()),
            Arc::new(MemoryDocumentSource::default()),
        )
        .config(config)
        .build();
        assert!(matches!(result, Err(GraphError::Config(_))));
    }

    #[test]
    fn test_drafts_use_prefixed_keys() {
        let drafts = Arc::new(MemoryDraftStore::new());
        let service = CodeBlockGraphService::builder(
            Arc::new(StaticTreeSource::empty()),
            Arc::new(MemoryDocumentSource::default()),
        )
        .drafts(drafts.clone())
        .build()
        .unwrap();

        service.set_draft("code_1", "fn draft() {}");
        assert_eq!(drafts.get("code_draft_code_1").as_deref(), Some("fn draft() {}"));
        assert_eq!(service.get_draft("code_1").as_deref(), Some("fn draft() {}"));

        service.remove_draft("code_1");
        assert!(service.get_draft("code_1").is_none());
    }
}
