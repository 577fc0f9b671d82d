//! Area and iteration path sync. The source trees are read whole, then
//! every node is created on the destination, parents before children, with
//! paths rewritten to live under the destination project.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use crate::backend::azdo::AzdoClient;
use crate::backend::tfs::TfsClient;

/// One classification node as the source serves it, children nested.
#[derive(Debug, Clone, Deserialize)]
pub struct PathNode {
    pub name: String,
    #[serde(default)]
    pub attributes: Option<NodeDates>,
    #[serde(default)]
    pub children: Vec<PathNode>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDates {
    pub start_date: Option<DateTime<Utc>>,
    pub finish_date: Option<DateTime<Utc>>,
}

/// One node to create, addressed relative to the destination project root.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatNode {
    pub path: String,
    pub start: Option<DateTime<Utc>>,
    pub finish: Option<DateTime<Utc>>,
}

/// Flatten a tree into creation order: every parent before its children,
/// siblings in document order. The root node stands for the project itself
/// and is not emitted.
pub fn flatten(root: &PathNode) -> Vec<FlatNode> {
    let mut out = Vec::new();
    let mut stack: Vec<(&PathNode, String)> = Vec::new();
    for child in root.children.iter().rev() {
        stack.push((child, child.name.clone()));
    }
    while let Some((node, path)) = stack.pop() {
        let dates = node.attributes.as_ref();
        out.push(FlatNode {
            path: path.clone(),
            start: dates.and_then(|d| d.start_date),
            finish: dates.and_then(|d| d.finish_date),
        });
        for child in node.children.iter().rev() {
            stack.push((child, format!("{path}\\{}", child.name)));
        }
    }
    out
}

/// Copy both classification trees. A node that cannot be created is logged
/// and skipped so one bad node does not strand the rest of the tree.
pub async fn sync(source: &TfsClient, dest: &AzdoClient) -> Result<()> {
    info!("--Get all iterations in progress..");
    let iterations = source.classification_tree("iterations").await?;
    info!("--Create all iterations in progress..");
    create_all(dest, "iterations", &flatten(&iterations)).await;
    info!("--All iterations complete..");

    info!("--Get all area paths in progress..");
    let areas = source.classification_tree("areas").await?;
    info!("--Create all area paths in progress..");
    create_all(dest, "areas", &flatten(&areas)).await;
    info!("--Create all area paths complete..");
    Ok(())
}

async fn create_all(dest: &AzdoClient, group: &str, nodes: &[FlatNode]) {
    for node in nodes {
        if let Err(err) = dest
            .ensure_node(group, &node.path, node.start, node.finish)
            .await
        {
            warn!("Failed to create {group} node '{}': {err:#}", node.path);
        }
    }
}
