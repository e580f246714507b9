//! Dependency graph over the messages of one log file
//!
//! Nodes are keyed by message id; parent/child links are id lookups into the
//! node table, never owning pointers. The graph is owned by a single pruning
//! pass and is never shared across files.

pub mod export;

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::record::Message;

/// A message plus derived graph state
#[derive(Debug, Clone)]
pub struct GraphNode {
    pub message: Message,
    /// Ids of messages whose `parent_id` resolves to this node (computed)
    pub children: BTreeSet<String>,
    pub marked_for_deletion: bool,
    pub preserved_by_dependency: bool,
}

impl GraphNode {
    fn new(message: Message) -> Self {
        GraphNode {
            message,
            children: BTreeSet::new(),
            marked_for_deletion: false,
            preserved_by_dependency: false,
        }
    }
}

/// Id-keyed node table with parent/child links and root identification
#[derive(Debug, Default)]
pub struct MessageGraph {
    nodes: BTreeMap<String, GraphNode>,
    roots: BTreeSet<String>,
    /// (child id, claimed parent id) pairs whose parent is absent from the table
    unresolved_parents: Vec<(String, String)>,
    /// Records dropped because an earlier record already used their id
    duplicate_ids: usize,
}

impl MessageGraph {
    /// Build the graph in two passes: id→node table, then children/roots.
    ///
    /// Duplicate ids keep the first occurrence; later ones are counted and
    /// dropped. Unresolved parent ids are recorded, not silently ignored.
    pub fn build(messages: Vec<Message>) -> Self {
        let mut nodes: BTreeMap<String, GraphNode> = BTreeMap::new();
        let mut duplicate_ids = 0usize;

        for message in messages {
            if nodes.contains_key(&message.id) {
                duplicate_ids += 1;
                continue;
            }
            nodes.insert(message.id.clone(), GraphNode::new(message));
        }

        let mut unresolved_parents = Vec::new();
        let mut edges: Vec<(String, String)> = Vec::new();
        for (id, node) in &nodes {
            if let Some(parent_id) = &node.message.parent_id {
                if nodes.contains_key(parent_id) {
                    edges.push((parent_id.clone(), id.clone()));
                } else {
                    unresolved_parents.push((id.clone(), parent_id.clone()));
                }
            }
        }
        for (parent_id, child_id) in edges {
            if let Some(parent) = nodes.get_mut(&parent_id) {
                parent.children.insert(child_id);
            }
        }

        let roots: BTreeSet<String> = nodes
            .iter()
            .filter(|(id, node)| match &node.message.parent_id {
                None => true,
                Some(parent_id) => {
                    !nodes.contains_key(parent_id) || parent_id.as_str() == id.as_str()
                }
            })
            .map(|(id, _)| id.clone())
            .collect();

        MessageGraph {
            nodes,
            roots,
            unresolved_parents,
            duplicate_ids,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
        self.nodes.get_mut(id)
    }

    /// Ids in deterministic (sorted) order
    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.nodes.keys()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn roots(&self) -> &BTreeSet<String> {
        &self.roots
    }

    pub fn unresolved_parents(&self) -> &[(String, String)] {
        &self.unresolved_parents
    }

    pub fn duplicate_ids(&self) -> usize {
        self.duplicate_ids
    }

    /// A node with no `parent_id`, or whose parent is absent from the table
    pub fn is_root(&self, id: &str) -> bool {
        self.roots.contains(id)
    }

    /// Walk the `parent_id` chain upward, collecting resolved ancestors in
    /// order. Iterative with a visited-set guard: an unresolved parent or a
    /// revisited id terminates the walk.
    pub fn ancestors(&self, id: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(id);

        let mut current = id;
        while let Some(node) = self.nodes.get(current) {
            let Some(parent_id) = node.message.parent_id.as_deref() else {
                break;
            };
            if !self.nodes.contains_key(parent_id) || !visited.insert(parent_id) {
                break;
            }
            chain.push(parent_id.to_string());
            current = parent_id;
        }

        chain
    }

    /// Distance from a message to its thread's root along parent links
    pub fn depth(&self, id: &str) -> usize {
        self.ancestors(id).len()
    }

    pub fn max_depth(&self) -> usize {
        self.nodes.keys().map(|id| self.depth(id)).max().unwrap_or(0)
    }

    /// Scan for cyclic parent chains, returning one representative id per
    /// cycle. Deterministic given the sorted node order.
    pub fn detect_cycles(&self) -> Vec<String> {
        let mut terminates: HashSet<&str> = HashSet::new();
        let mut cyclic: HashSet<&str> = HashSet::new();
        let mut representatives = Vec::new();

        for start in self.nodes.keys() {
            if terminates.contains(start.as_str()) || cyclic.contains(start.as_str()) {
                continue;
            }

            let mut path: Vec<&str> = Vec::new();
            let mut seen: HashSet<&str> = HashSet::new();
            let mut current: &str = start;
            let found_cycle = loop {
                if terminates.contains(current) {
                    break false;
                }
                if cyclic.contains(current) || !seen.insert(current) {
                    break true;
                }
                path.push(current);
                match self
                    .nodes
                    .get(current)
                    .and_then(|node| node.message.parent_id.as_deref())
                {
                    Some(parent_id) if self.nodes.contains_key(parent_id) => current = parent_id,
                    _ => break false,
                }
            };

            if found_cycle {
                if !cyclic.contains(current) {
                    representatives.push(current.to_string());
                }
                cyclic.extend(path);
            } else {
                terminates.extend(path);
            }
        }

        representatives
    }
}

#[cfg(test)]
pub(crate) fn test_message(id: &str, parent: Option<&str>) -> Message {
    use crate::record::MessageKind;

    Message {
        id: id.to_string(),
        parent_id: parent.map(str::to_string),
        kind: MessageKind::User,
        timestamp: None,
        content: String::new(),
        raw: format!(r#"{{"id":"{id}"}}"#),
        line: 0,
    }
}
