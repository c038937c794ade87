//! Shared data model for the code-block graph.
//!
//! This crate is a pure leaf: it knows what a page-tree node looks like, how a
//! hook binding is spelled inside one, and what a code block carries. It does
//! no traversal beyond simple lookups; indexing and cascade cleanup live in
//! `codeblock-kernel`.
//!
//! # Relationships
//!
//! ```text
//! Node (NodeId) ← page-tree element, children under `items`
//!     └── field "onClick" = { hookType: "code", hookData: [{ codeId }] }
//!                                                        │
//! CodeBlockDsl ← code id → CodeBlockContent ◄────────────┘
//!     └── comps: NodeId → binding metadata (who may invoke the block)
//!
//! CodeRelation ← code id → NodeId → [hook key]   (derived from the tree)
//! ```
//!
//! # Key Types
//!
//! |----------------------|---------------------------------------------------|
//! | Type                 | Purpose                                           |
//! |----------------------|---------------------------------------------------|
//! | [`Node`]             | Page-tree element with open field set             |
//! | [`NodeId`]           | Node identifier (string or number on the wire)    |
//! | [`FieldValue`]       | Classification of a field before traversal        |
//! | [`HookBinding`]      | Borrowed view of a `{ hookType, hookData }` value |
//! | [`CodeBlockContent`] | One entry of the forward mapping                  |
//! | [`CodeBlockPatch`]   | Partial update for a code block                   |
//! | [`CodeBlockDsl`]     | Forward mapping: code id → content                |
//! | [`CodeRelation`]     | Reverse index: code id → node id → hook keys      |
//! |----------------------|---------------------------------------------------|

pub mod code;
pub mod hook;
pub mod ids;
pub mod node;

pub use code::{
    CodeBlockContent, CodeBlockDsl, CodeBlockPatch, CodeContent, CodeId, CodeRelation,
    CompBindings, Executable,
};
pub use hook::{Hook, HookBinding, HookData, HookType};
pub use ids::NodeId;
pub use node::{FieldValue, Node};
