//! Pruning orchestration for one log file
//!
//! Sequences load → graph build → scoring → candidate selection →
//! resolution → validation → orphan cleanup → write-back. A pass moves
//! through `Loaded → GraphBuilt → CandidatesSelected → Resolved →
//! Validated → Written`; any failure aborts that file with the original
//! (or its backup) intact.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::decay::{decay_factor, ContentClassifier, DecayConfig, VelocityAdjustment};
use crate::error::{MulchError, Result};
use crate::graph::MessageGraph;
use crate::integrity::{cleanup_orphans, validate, IntegrityReport};
use crate::record::{load_messages, LoadOptions};
use crate::resolve::{resolve_deletions, Resolution};
use crate::score::{importance, StructuralInfo};

/// Caller-supplied policy for one pruning run
#[derive(Debug, Clone)]
pub struct PrunePolicy {
    /// Age in days beyond which a message becomes a deletion candidate
    pub max_age_days: Option<f64>,
    /// Importance score below which a message becomes a deletion candidate
    pub min_importance: Option<f64>,
    /// Safety cap on deletions per run
    pub max_deletions: usize,
    /// Resolve dependencies before deleting (off = naive deletion)
    pub dependency_aware: bool,
    /// Defensively sweep orphans when deletions occurred
    pub orphan_cleanup: bool,
    pub dry_run: bool,
    pub timestamped_backup: bool,
    /// Write the debug graph export here
    pub export_graph: Option<PathBuf>,
    pub strict_load: bool,
    pub decay: DecayConfig,
    /// Fixed reference time; None uses the wall clock
    pub reference_time: Option<DateTime<Utc>>,
}

impl Default for PrunePolicy {
    fn default() -> Self {
        PrunePolicy {
            max_age_days: None,
            min_importance: None,
            max_deletions: 1000,
            dependency_aware: true,
            orphan_cleanup: true,
            dry_run: false,
            timestamped_backup: false,
            export_graph: None,
            strict_load: false,
            decay: DecayConfig::standard(),
            reference_time: None,
        }
    }
}

/// Progress of one file's pass. Terminal states are `Written` and (on the
/// error path) `Aborted`; a dry run stops at `Validated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PassState {
    Loaded,
    GraphBuilt,
    CandidatesSelected,
    Resolved,
    Validated,
    Written,
    Aborted,
}

impl std::fmt::Display for PassState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PassState::Loaded => "loaded",
            PassState::GraphBuilt => "graph-built",
            PassState::CandidatesSelected => "candidates-selected",
            PassState::Resolved => "resolved",
            PassState::Validated => "validated",
            PassState::Written => "written",
            PassState::Aborted => "aborted",
        };
        write!(f, "{name}")
    }
}

/// Output snapshot of one run, produced fresh per pass
#[derive(Debug, Clone, Serialize)]
pub struct PruningResult {
    pub path: PathBuf,
    /// Records parsed from the file (before duplicate-id dedup)
    pub scanned: usize,
    /// Malformed or duplicate records dropped
    pub invalid: usize,
    pub deleted: usize,
    /// Candidates kept because a surviving message depends on them
    pub preserved: usize,
    pub remaining: usize,
    pub bytes_before: u64,
    pub bytes_after: u64,
    pub removed_ids: Vec<String>,
    pub orphans_removed: Vec<String>,
    pub warnings: Vec<String>,
    pub state: PassState,
    pub dry_run: bool,
    pub elapsed_ms: u128,
}

/// One scored message during candidate selection
struct ScoredMessage {
    id: String,
    score: f64,
    timestamp: Option<DateTime<Utc>>,
}

/// Run a full pruning pass over one file.
#[tracing::instrument(skip(policy, classifier), fields(path = %path.display()))]
pub fn prune_file(
    path: &Path,
    policy: &PrunePolicy,
    classifier: &dyn ContentClassifier,
) -> Result<PruningResult> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    let loaded = load_messages(
        path,
        LoadOptions {
            strict: policy.strict_load,
        },
    )?;
    let scanned = loaded.messages.len();
    let bytes_before = loaded.bytes;
    tracing::debug!(state = %PassState::Loaded, scanned, "pass_state");

    let reference = policy.reference_time.unwrap_or_else(Utc::now);
    let velocity = VelocityAdjustment::compute(&loaded.messages);
    let decay_config = velocity.apply(&policy.decay);

    let mut graph = MessageGraph::build(loaded.messages);
    if graph.duplicate_ids() > 0 {
        warnings.push(format!(
            "{} duplicate id(s) dropped (first occurrence kept)",
            graph.duplicate_ids()
        ));
    }
    if let Some(id) = graph.detect_cycles().into_iter().next() {
        return Err(MulchError::CyclicParents {
            path: path.to_path_buf(),
            id,
        });
    }
    tracing::debug!(state = %PassState::GraphBuilt, nodes = graph.len(), "pass_state");

    let candidates = select_candidates(
        &graph,
        policy,
        &decay_config,
        classifier,
        reference,
        &mut warnings,
    );
    tracing::debug!(state = %PassState::CandidatesSelected, candidates = candidates.len(), "pass_state");

    let resolution = if policy.dependency_aware {
        resolve_deletions(&mut graph, &candidates)
    } else {
        naive_resolution(&mut graph, &candidates)
    };
    tracing::debug!(state = %PassState::Resolved, safe = resolution.safe_deletions.len(), "pass_state");

    if let Some(export_path) = &policy.export_graph {
        let doc = serde_json::to_string_pretty(&graph.export())?;
        fs::write(export_path, doc)?;
    }

    let mut remaining: BTreeSet<String> = graph
        .ids()
        .filter(|id| !resolution.safe_deletions.contains(id.as_str()))
        .cloned()
        .collect();

    let report = validate(&remaining, &graph);
    check_consistency(path, policy, &resolution, &report, &mut warnings)?;
    tracing::debug!(state = %PassState::Validated, violations = report.violations.len(), "pass_state");

    let orphans_removed = sweep_orphans(path, policy, &graph, &mut remaining, &resolution, &report)?;

    finish(
        path,
        policy,
        &graph,
        &remaining,
        resolution,
        orphans_removed,
        PassContext {
            scanned,
            invalid: loaded.invalid_lines + graph.duplicate_ids(),
            bytes_before,
            warnings,
            start,
        },
    )
}

struct PassContext {
    scanned: usize,
    invalid: usize,
    bytes_before: u64,
    warnings: Vec<String>,
    start: Instant,
}

/// Score every message and apply the policy's age/importance criteria.
/// When both knobs are set, both must flag a message. The deletion cap
/// truncates deterministically, lowest-importance/oldest first.
fn select_candidates(
    graph: &MessageGraph,
    policy: &PrunePolicy,
    decay_config: &DecayConfig,
    classifier: &dyn ContentClassifier,
    reference: DateTime<Utc>,
    warnings: &mut Vec<String>,
) -> BTreeSet<String> {
    let mut selected: Vec<ScoredMessage> = Vec::new();

    for node in graph.nodes() {
        let message = &node.message;
        let decay = message
            .timestamp
            .map(|ts| decay_factor(&message.content, ts, reference, decay_config, classifier))
            .unwrap_or(1.0);
        let info = StructuralInfo::of(graph, &message.id).unwrap_or(StructuralInfo {
            is_root: false,
            child_count: 0,
            chain_depth: 0,
        });
        let score = importance(&message.content, decay, &info, decay_config);

        let age_days = message
            .timestamp
            .map(|ts| (reference - ts).num_seconds() as f64 / 86_400.0);

        // Absent timestamp = maximally recent, never an age candidate.
        let too_old = policy
            .max_age_days
            .map(|cutoff| age_days.is_some_and(|age| age > cutoff));
        let unimportant = policy.min_importance.map(|threshold| score < threshold);

        let is_candidate = match (too_old, unimportant) {
            (None, None) => false,
            (Some(old), None) => old,
            (None, Some(low)) => low,
            (Some(old), Some(low)) => old && low,
        };

        if is_candidate {
            selected.push(ScoredMessage {
                id: message.id.clone(),
                score,
                timestamp: message.timestamp,
            });
        }
    }

    if selected.len() > policy.max_deletions {
        let total = selected.len();
        selected.sort_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| match (a.timestamp, b.timestamp) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                })
                .then_with(|| a.id.cmp(&b.id))
        });
        selected.truncate(policy.max_deletions);
        warnings.push(format!(
            "deletion cap: kept {} of {} candidates",
            policy.max_deletions, total
        ));
    }

    selected.into_iter().map(|s| s.id).collect()
}

/// Naive deletion: the candidate set passes through unresolved. Orphan
/// cleanup afterwards is mandatory so the written file still validates.
fn naive_resolution(graph: &mut MessageGraph, candidates: &BTreeSet<String>) -> Resolution {
    let safe_deletions: BTreeSet<String> = candidates
        .iter()
        .filter(|id| graph.contains(id))
        .cloned()
        .collect();
    for id in &safe_deletions {
        if let Some(node) = graph.node_mut(id) {
            node.marked_for_deletion = true;
        }
    }
    Resolution {
        safe_deletions,
        preserved: BTreeSet::new(),
        passes: 0,
    }
}

/// A violation whose parent was deleted this run means the resolver's
/// contract was broken: abort before writing anything. Violations already
/// present in the input are only warnings.
fn check_consistency(
    path: &Path,
    policy: &PrunePolicy,
    resolution: &Resolution,
    report: &IntegrityReport,
    warnings: &mut Vec<String>,
) -> Result<()> {
    for violation in &report.violations {
        if resolution.safe_deletions.contains(&violation.parent) {
            if policy.dependency_aware {
                return Err(MulchError::IntegrityFailure {
                    path: path.to_path_buf(),
                    child: violation.child.clone(),
                    parent: violation.parent.clone(),
                });
            }
        } else {
            warnings.push(format!(
                "pre-existing dangling parent: {} -> {}",
                violation.child, violation.parent
            ));
        }
    }
    Ok(())
}

/// Defensive orphan sweep, run only when the kept set actually shrank.
fn sweep_orphans(
    path: &Path,
    policy: &PrunePolicy,
    graph: &MessageGraph,
    remaining: &mut BTreeSet<String>,
    resolution: &Resolution,
    report: &IntegrityReport,
) -> Result<Vec<String>> {
    let shrank = !resolution.safe_deletions.is_empty();
    let wanted = policy.orphan_cleanup || !policy.dependency_aware;
    if report.is_valid() || !shrank || !wanted {
        return Ok(Vec::new());
    }

    let sweep = cleanup_orphans(remaining, graph);
    let final_report = validate(remaining, graph);
    if let Some(violation) = final_report.violations.first() {
        return Err(MulchError::IntegrityFailure {
            path: path.to_path_buf(),
            child: violation.child.clone(),
            parent: violation.parent.clone(),
        });
    }
    Ok(sweep.removed)
}

/// Assemble the result and, unless dry-running, write survivors back.
fn finish(
    path: &Path,
    policy: &PrunePolicy,
    graph: &MessageGraph,
    remaining: &BTreeSet<String>,
    resolution: Resolution,
    orphans_removed: Vec<String>,
    ctx: PassContext,
) -> Result<PruningResult> {
    let lines = survivor_lines(graph, remaining);
    let bytes_after: u64 = lines.iter().map(|(_, raw)| raw.len() as u64 + 1).sum();

    let state = if policy.dry_run {
        PassState::Validated
    } else {
        write_survivors(path, graph, remaining, policy.timestamped_backup)?;
        PassState::Written
    };
    tracing::info!(state = %state, deleted = resolution.safe_deletions.len(), "pass_complete");

    let removed_ids: Vec<String> = resolution.safe_deletions.iter().cloned().collect();
    Ok(PruningResult {
        path: path.to_path_buf(),
        scanned: ctx.scanned,
        invalid: ctx.invalid,
        deleted: removed_ids.len() + orphans_removed.len(),
        preserved: resolution.preserved.len(),
        remaining: remaining.len(),
        bytes_before: ctx.bytes_before,
        bytes_after,
        removed_ids,
        orphans_removed,
        warnings: ctx.warnings,
        state,
        dry_run: policy.dry_run,
        elapsed_ms: ctx.start.elapsed().as_millis(),
    })
}

/// Surviving raw lines in original file order
fn survivor_lines<'a>(graph: &'a MessageGraph, remaining: &BTreeSet<String>) -> Vec<(usize, &'a str)> {
    let mut lines: Vec<(usize, &str)> = remaining
        .iter()
        .filter_map(|id| graph.node(id))
        .map(|node| (node.message.line, node.message.raw.as_str()))
        .collect();
    lines.sort_by_key(|(line, _)| *line);
    lines
}

/// Backup the original, then write the remaining messages' raw lines to a
/// temp file in the same directory and atomically rename it over the
/// original. Survivors keep byte-for-byte fidelity and file order.
pub fn write_survivors(
    path: &Path,
    graph: &MessageGraph,
    remaining: &BTreeSet<String>,
    timestamped: bool,
) -> Result<()> {
    let lines = survivor_lines(graph, remaining);
    let backup = backup_path(path, timestamped);
    fs::copy(path, &backup)?;

    let mut content = String::new();
    for (_, raw) in &lines {
        content.push_str(raw);
        content.push('\n');
    }

    let tmp = temp_path(path);
    fs::write(&tmp, &content)?;
    fs::rename(&tmp, path)?;

    tracing::debug!(backup = %backup.display(), bytes = content.len(), "survivors_written");
    Ok(())
}

/// `<name>.backup`, or `<stem>.backup-<unix-seconds>.<ext>` when a
/// collision-free timestamped backup is requested.
pub fn backup_path(path: &Path, timestamped: bool) -> PathBuf {
    if !timestamped {
        let mut name = path.as_os_str().to_os_string();
        name.push(".backup");
        return PathBuf::from(name);
    }

    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "log".to_string());
    let ext = path
        .extension()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "jsonl".to_string());
    path.with_file_name(format!("{stem}.backup-{secs}.{ext}"))
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "log.jsonl".to_string());
    path.with_file_name(format!(".{name}.tmp-{}", std::process::id()))
}
