//! # codeblock-kernel
//!
//! The code-block graph for one host document.
//!
//! - [`CodeBlockStore`] holds the forward mapping (code id → content) and the
//!   editor state around it, replaced wholesale on every write
//! - [`compute_relations`] derives the reverse index (code id → node id →
//!   hook keys) from a page tree
//! - [`purge_node`] removes a deleted subtree's ids from every block's `comps`
//! - [`CodeBlockGraphService`] orchestrates them against the host's tree,
//!   document, compiler and draft collaborators, and announces every mapping
//!   change on a [`FlowBus`]

pub mod cascade;
pub mod compiler;
pub mod config;
pub mod drafts;
pub mod error;
pub mod flows;
pub mod relations;
pub mod service;
pub mod sources;
pub mod store;

pub use cascade::purge_node;
pub use compiler::{CodeCompiler, RhaiCompiler, RhaiExecutable};
pub use config::GraphConfig;
pub use drafts::{DraftStore, MemoryDraftStore, draft_key};
pub use error::{GraphError, GraphResult};
pub use flows::{
    CodeFlow, FlowBus, FlowMessage, HasSubject, SharedCodeFlowBus, Subscription,
    matches_pattern, shared_code_flow_bus,
};
pub use relations::compute_relations;
pub use service::{CodeBlockGraphService, GraphServiceBuilder, merge_patch};
pub use sources::{DocumentSource, MemoryDocumentSource, StaticTreeSource, TreeSource};
pub use store::CodeBlockStore;
