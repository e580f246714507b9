//! Integrity validation and orphan cleanup
//!
//! The validator is a pure check: every remaining message with a parent
//! reference must have that parent in the remaining set. Orphan cleanup
//! iteratively removes violating children, cascading through descendants,
//! under an iteration cap tied to graph size.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::graph::MessageGraph;

/// A remaining message whose parent is missing from the remaining set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub child: String,
    pub parent: String,
}

/// Result of one validation pass. No mutation happens here.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub violations: Vec<Violation>,
}

impl IntegrityReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Check that no id in `remaining` references a parent outside `remaining`.
///
/// Ids in `remaining` that are absent from the graph are skipped; they have
/// no parent reference to dangle.
pub fn validate(remaining: &BTreeSet<String>, graph: &MessageGraph) -> IntegrityReport {
    let mut violations = Vec::new();

    for id in remaining {
        let Some(node) = graph.node(id) else {
            continue;
        };
        if let Some(parent_id) = &node.message.parent_id {
            if !remaining.contains(parent_id) {
                violations.push(Violation {
                    child: id.clone(),
                    parent: parent_id.clone(),
                });
            }
        }
    }

    IntegrityReport { violations }
}

/// Outcome of an orphan cleanup sweep
#[derive(Debug, Clone, Serialize)]
pub struct OrphanSweep {
    /// Removed orphan ids, in removal order
    pub removed: Vec<String>,
    pub iterations: usize,
    /// The iteration cap was hit before the set became consistent
    pub cap_hit: bool,
}

/// Remove remaining messages whose parent is absent, cascading through
/// descendants, until the set validates or the iteration cap is hit.
#[tracing::instrument(skip(remaining, graph), fields(remaining = remaining.len()))]
pub fn cleanup_orphans(remaining: &mut BTreeSet<String>, graph: &MessageGraph) -> OrphanSweep {
    let cap = graph.len() + 1;
    let mut removed = Vec::new();
    let mut iterations = 0;
    let mut cap_hit = false;

    loop {
        let report = validate(remaining, graph);
        if report.is_valid() {
            break;
        }

        iterations += 1;
        if iterations > cap {
            cap_hit = true;
            tracing::warn!(
                iterations,
                remaining = remaining.len(),
                "orphan cleanup hit iteration cap; stopping"
            );
            break;
        }

        for violation in report.violations {
            if remaining.remove(&violation.child) {
                removed.push(violation.child);
            }
        }
    }

    tracing::debug!(removed = removed.len(), iterations, "orphan_sweep");

    OrphanSweep {
        removed,
        iterations,
        cap_hit,
    }
}
