//! Command implementations. Each returns the JSON it would print.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde_json::Value;

use codeblock_kernel::{
    CodeBlockGraphService, GraphConfig, MemoryDocumentSource, StaticTreeSource,
};
use codeblock_types::{CodeBlockDsl, Node};

pub fn read_tree(path: &Path) -> Result<Node> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading page tree {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing page tree {}", path.display()))
}

pub fn read_dsl(path: &Path) -> Result<CodeBlockDsl> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading code dsl {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing code dsl {}", path.display()))
}

fn service(
    tree: Option<Node>,
    dsl: Option<CodeBlockDsl>,
    config: GraphConfig,
) -> Result<CodeBlockGraphService> {
    let tree = match tree {
        Some(root) => StaticTreeSource::new(root),
        None => StaticTreeSource::empty(),
    };
    let graph =
        CodeBlockGraphService::builder(Arc::new(tree), Arc::new(MemoryDocumentSource::new(dsl)))
            .config(config)
            .build()?;
    Ok(graph)
}

/// Reverse index of the tree at `tree_path`.
pub fn relations(tree_path: &Path, config: GraphConfig) -> Result<Value> {
    let root = read_tree(tree_path)?;
    let graph = service(Some(root), None, config)?;
    let relations = graph
        .refresh_relations()
        .context("page tree has no root")?;
    Ok(serde_json::to_value(&*relations)?)
}

/// The mapping at `dsl_path` after removing node `node_id` and its subtree.
pub async fn purge(
    tree_path: &Path,
    dsl_path: &Path,
    node_id: &str,
    config: GraphConfig,
) -> Result<Value> {
    let root = read_tree(tree_path)?;
    let Some(subtree) = root.find(node_id).cloned() else {
        bail!("node {node_id} not found in {}", tree_path.display());
    };
    let dsl = read_dsl(dsl_path)?;

    let graph = service(Some(root), Some(dsl), config)?;
    graph.delete_node_and_cascade(&subtree).await?;
    let purged = graph.get_dsl(false).await?.unwrap_or_default();
    Ok(serde_json::to_value(&*purged)?)
}

/// `count` fresh ids that collide neither with the mapping nor each other.
pub async fn unique_ids(dsl_path: &Path, count: usize, config: GraphConfig) -> Result<Value> {
    let dsl = read_dsl(dsl_path)?;
    let graph = service(None, Some(dsl), config)?;

    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        let id = graph.generate_unique_id().await?;
        // Reserve it so the next draw avoids it.
        graph
            .set_content_by_id(&id, Default::default())
            .await?;
        ids.push(Value::String(id));
    }
    Ok(Value::Array(ids))
}
