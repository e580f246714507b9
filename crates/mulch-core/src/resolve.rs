//! Dependency-aware deletion resolution
//!
//! Given a candidate-for-deletion set, computes the maximal subset that can
//! be removed without orphaning any surviving message. Two rules:
//!
//! 1. A marked message with a surviving child must itself survive, along
//!    with its entire ancestor chain.
//! 2. A message outside the candidate set keeps its entire ancestor chain.
//!
//! The fixpoint loop and all ancestor walks are bounded by graph size.

use std::collections::BTreeSet;

use crate::graph::MessageGraph;

/// Outcome of resolving one candidate set
#[derive(Debug)]
pub struct Resolution {
    /// The candidate subset that is safe to remove
    pub safe_deletions: BTreeSet<String>,
    /// Candidates kept because a surviving message needs them
    pub preserved: BTreeSet<String>,
    /// Fixpoint passes taken (including the final no-change pass)
    pub passes: usize,
}

/// Resolve a candidate set against the graph.
///
/// Candidate ids absent from the graph are ignored. Unresolved parent ids
/// terminate ancestor walks; whether such references are acceptable in the
/// final remaining set is the integrity validator's concern.
#[tracing::instrument(skip(graph, candidates), fields(nodes = graph.len(), candidates = candidates.len()))]
pub fn resolve_deletions(graph: &mut MessageGraph, candidates: &BTreeSet<String>) -> Resolution {
    let mut deletions: BTreeSet<String> = candidates
        .iter()
        .filter(|id| graph.contains(id))
        .cloned()
        .collect();
    let mut preserved: BTreeSet<String> = BTreeSet::new();

    for id in &deletions {
        if let Some(node) = graph.node_mut(id) {
            node.marked_for_deletion = true;
        }
    }

    let max_passes = graph.len() + 1;
    let mut passes = 0;
    loop {
        passes += 1;
        let mut changed = false;

        for id in deletions.clone() {
            if !deletions.contains(&id) {
                continue;
            }
            let has_staying_child = graph
                .node(&id)
                .map(|node| node.children.iter().any(|child| !deletions.contains(child)))
                .unwrap_or(false);
            if !has_staying_child {
                continue;
            }

            force_preserve(graph, &mut deletions, &mut preserved, &id);
            for ancestor in graph.ancestors(&id) {
                force_preserve(graph, &mut deletions, &mut preserved, &ancestor);
            }
            changed = true;
        }

        if !changed || passes >= max_passes {
            break;
        }
    }

    // Explicitly kept messages cannot lose their support structure.
    let kept: Vec<String> = graph
        .ids()
        .filter(|id| !candidates.contains(id.as_str()))
        .cloned()
        .collect();
    for id in kept {
        for ancestor in graph.ancestors(&id) {
            force_preserve(graph, &mut deletions, &mut preserved, &ancestor);
        }
    }

    tracing::debug!(
        safe = deletions.len(),
        preserved = preserved.len(),
        passes,
        "deletions_resolved"
    );

    Resolution {
        safe_deletions: deletions,
        preserved,
        passes,
    }
}

fn force_preserve(
    graph: &mut MessageGraph,
    deletions: &mut BTreeSet<String>,
    preserved: &mut BTreeSet<String>,
    id: &str,
) {
    if !deletions.remove(id) {
        return;
    }
    preserved.insert(id.to_string());
    if let Some(node) = graph.node_mut(id) {
        node.marked_for_deletion = false;
        node.preserved_by_dependency = true;
    }
}
