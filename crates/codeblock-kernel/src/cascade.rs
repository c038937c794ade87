//! Cascade cleanup of `comps` when nodes leave the tree.
//!
//! Removing a node removes its whole subtree, so every id under it must drop
//! out of every code block's `comps` registry. Stale entries would otherwise
//! re-activate if a later node reused the id.
//!
//! Callers hand in a private copy of the mapping and install it afterwards;
//! the live mapping is never edited in place.

use codeblock_types::{CodeBlockDsl, Node};

/// Remove every id in the subtree at `subtree_root` from every block's
/// `comps`. Returns the number of entries removed.
///
/// Nodes without an id are skipped; their children are still purged. Blocks
/// without `comps` are left without `comps`.
pub fn purge_node(subtree_root: &Node, dsl: &mut CodeBlockDsl) -> usize {
    let mut removed = 0;

    if let Some(id) = &subtree_root.id {
        for block in dsl.values_mut() {
            if let Some(comps) = block.comps.as_mut() {
                if comps.remove(id.as_str()).is_some() {
                    removed += 1;
                }
            }
        }
    }

    for child in &subtree_root.items {
        removed += purge_node(child, dsl);
    }

    removed
}
