//! Debug export of the dependency graph
//!
//! Produces a structured document suitable for inspection tooling: metadata,
//! one entry per node with a short content preview, and parent/child edges.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::MessageGraph;

const PREVIEW_CHARS: usize = 80;

#[derive(Debug, Clone, Serialize)]
pub struct ExportMetadata {
    pub message_count: usize,
    pub root_count: usize,
    pub max_depth: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportNode {
    pub id: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub content_preview: String,
    pub child_count: usize,
    pub is_root: bool,
    pub marked_for_deletion: bool,
    pub preserved_by_dependency: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportEdge {
    pub parent: String,
    pub child: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphExport {
    pub metadata: ExportMetadata,
    pub nodes: Vec<ExportNode>,
    pub edges: Vec<ExportEdge>,
}

impl MessageGraph {
    /// Snapshot the graph as an export document
    pub fn export(&self) -> GraphExport {
        let nodes: Vec<ExportNode> = self
            .nodes()
            .map(|node| ExportNode {
                id: node.message.id.clone(),
                kind: node.message.kind.to_string(),
                timestamp: node.message.timestamp,
                content_preview: preview(&node.message.content),
                child_count: node.children.len(),
                is_root: self.is_root(&node.message.id),
                marked_for_deletion: node.marked_for_deletion,
                preserved_by_dependency: node.preserved_by_dependency,
            })
            .collect();

        let edges: Vec<ExportEdge> = self
            .nodes()
            .flat_map(|node| {
                node.children.iter().map(|child| ExportEdge {
                    parent: node.message.id.clone(),
                    child: child.clone(),
                })
            })
            .collect();

        GraphExport {
            metadata: ExportMetadata {
                message_count: self.len(),
                root_count: self.roots().len(),
                max_depth: self.max_depth(),
            },
            nodes,
            edges,
        }
    }
}

/// First PREVIEW_CHARS characters, single line, char-boundary safe
fn preview(text: &str) -> String {
    let flat = text.replace(['\n', '\r'], " ");
    let end = flat
        .char_indices()
        .nth(PREVIEW_CHARS)
        .map(|(i, _)| i)
        .unwrap_or(flat.len());
    flat[..end].to_string()
}
