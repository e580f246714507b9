//! Importance scoring
//!
//! Combines a content-keyword base score with structural signals and the
//! decay factor into a 0-100 score. Pure and side-effect free; also used
//! for reporting independently of pruning.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::decay::{DecayConfig, DecayFold};
use crate::graph::MessageGraph;

const BASE_SCORE: f64 = 30.0;
const ERROR_BOOST: f64 = 15.0;
const HELP_BOOST: f64 = 10.0;
const GRATITUDE_BOOST: f64 = 5.0;
const ROOT_BONUS: f64 = 15.0;
const CHILDREN_BONUS: f64 = 10.0;
const DEPTH_BONUS_CAP: f64 = 10.0;
const ADDITIVE_DECAY_WEIGHT: f64 = 20.0;

/// Structural signals for one message
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StructuralInfo {
    /// Message starts a conversation thread
    pub is_root: bool,
    /// Other messages depend on it
    pub child_count: usize,
    /// Distance to the thread root along parent links
    pub chain_depth: usize,
}

impl StructuralInfo {
    pub fn of(graph: &MessageGraph, id: &str) -> Option<Self> {
        let node = graph.node(id)?;
        Some(StructuralInfo {
            is_root: graph.is_root(id),
            child_count: node.children.len(),
            chain_depth: graph.depth(id),
        })
    }
}

/// Score a message's importance on a 0-100 scale.
///
/// The decay factor folds in multiplicatively or additively per config.
pub fn importance(
    content: &str,
    decay: f64,
    info: &StructuralInfo,
    config: &DecayConfig,
) -> f64 {
    let mut score = BASE_SCORE;

    if error_re().is_match(content) {
        score += ERROR_BOOST;
    }
    if help_re().is_match(content) {
        score += HELP_BOOST;
    }
    if gratitude_re().is_match(content) {
        score += GRATITUDE_BOOST;
    }

    if info.is_root {
        score += ROOT_BONUS;
    }
    if info.child_count > 0 {
        score += CHILDREN_BONUS;
    }
    score += (info.chain_depth as f64).min(DEPTH_BONUS_CAP);

    let total = match config.fold {
        DecayFold::Multiplicative => score * decay,
        DecayFold::Additive => score + decay * ADDITIVE_DECAY_WEIGHT,
    };

    total.clamp(0.0, 100.0)
}

fn error_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r"(?i)\b(error|exception|fail(?:ed|ure)?|panic|crash)\b"))
}

fn help_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r"(?i)\b(help|how do i|how to|why does|what is|stuck)\b"))
}

fn gratitude_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r"(?i)\b(thanks|thank you|appreciated|perfect|great work)\b"))
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to compile scoring pattern");
        Regex::new("$^").unwrap()
    })
}
