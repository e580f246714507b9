//! Score command - per-message decay and importance report

use std::path::Path;

use chrono::Utc;
use serde::Serialize;

use crate::cli::{Cli, OutputFormat};
use mulch_core::config::GlobalConfig;
use mulch_core::decay::{
    decay_factor, ContentClassifier, KeywordClassifier, VelocityAdjustment,
};
use mulch_core::error::Result;
use mulch_core::graph::MessageGraph;
use mulch_core::record::{load_messages, LoadOptions};
use mulch_core::score::{importance, StructuralInfo};

#[derive(Debug, Serialize)]
struct ScoreRow {
    id: String,
    kind: String,
    category: String,
    decay: f64,
    score: f64,
}

pub fn execute(cli: &Cli, path: &Path, limit: Option<usize>, preset: Option<&str>) -> Result<()> {
    let config = GlobalConfig::load()?;
    let base_decay = config.decay_config(preset)?;

    let loaded = load_messages(path, LoadOptions::default())?;
    let velocity = VelocityAdjustment::compute(&loaded.messages);
    let decay_config = velocity.apply(&base_decay);
    let graph = MessageGraph::build(loaded.messages);

    let classifier = KeywordClassifier::new();
    let reference = Utc::now();

    let mut rows: Vec<ScoreRow> = graph
        .nodes()
        .map(|node| {
            let message = &node.message;
            let decay = message
                .timestamp
                .map(|ts| {
                    decay_factor(&message.content, ts, reference, &decay_config, &classifier)
                })
                .unwrap_or(1.0);
            let info = StructuralInfo::of(&graph, &message.id).unwrap_or(StructuralInfo {
                is_root: false,
                child_count: 0,
                chain_depth: 0,
            });
            ScoreRow {
                id: message.id.clone(),
                kind: message.kind.to_string(),
                category: classifier.classify(&message.content).to_string(),
                decay,
                score: importance(&message.content, decay, &info, &decay_config),
            }
        })
        .collect();

    // Lowest scores first: these are the next deletion candidates.
    rows.sort_by(|a, b| {
        a.score
            .partial_cmp(&b.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    if let Some(n) = limit {
        rows.truncate(n);
    }

    print_rows(cli, &rows);
    Ok(())
}

fn print_rows(cli: &Cli, rows: &[ScoreRow]) {
    if cli.format == OutputFormat::Json {
        if let Ok(doc) = serde_json::to_string_pretty(rows) {
            println!("{doc}");
        }
        return;
    }

    if cli.quiet {
        return;
    }

    println!("{:>7}  {:>6}  {:12}  {:9}  id", "score", "decay", "category", "kind");
    for row in rows {
        println!(
            "{:>7.1}  {:>6.3}  {:12}  {:9}  {}",
            row.score, row.decay, row.category, row.kind, row.id
        );
    }
}
