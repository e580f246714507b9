//! Check command - validate parent references, optionally fixing orphans

use std::collections::BTreeSet;
use std::path::Path;

use serde::Serialize;

use crate::cli::{Cli, OutputFormat};
use mulch_core::error::{MulchError, Result};
use mulch_core::graph::MessageGraph;
use mulch_core::integrity::{cleanup_orphans, validate, Violation};
use mulch_core::prune::write_survivors;
use mulch_core::record::{load_messages, LoadOptions};

#[derive(Debug, Serialize)]
struct CheckReport {
    path: String,
    messages: usize,
    invalid_lines: usize,
    violations: Vec<Violation>,
    orphans_removed: Vec<String>,
    fixed: bool,
}

pub fn execute(cli: &Cli, path: &Path, fix: bool) -> Result<()> {
    let loaded = load_messages(path, LoadOptions::default())?;
    let invalid_lines = loaded.invalid_lines;
    let graph = MessageGraph::build(loaded.messages);

    let mut remaining: BTreeSet<String> = graph.ids().cloned().collect();
    let report = validate(&remaining, &graph);

    let mut orphans_removed = Vec::new();
    let fixed = fix && !report.is_valid();
    if fixed {
        let sweep = cleanup_orphans(&mut remaining, &graph);
        orphans_removed = sweep.removed;
        write_survivors(path, &graph, &remaining, false)?;
    }

    let violation_count = report.violations.len();
    print_report(
        cli,
        CheckReport {
            path: path.display().to_string(),
            messages: graph.len(),
            invalid_lines,
            violations: report.violations,
            orphans_removed,
            fixed,
        },
    );

    if violation_count > 0 && !fixed {
        return Err(MulchError::InvalidLog {
            path: path.to_path_buf(),
            reason: format!("{violation_count} dangling parent reference(s)"),
        });
    }
    Ok(())
}

fn print_report(cli: &Cli, report: CheckReport) {
    if cli.format == OutputFormat::Json {
        if let Ok(doc) = serde_json::to_string_pretty(&report) {
            println!("{doc}");
        }
        return;
    }

    if cli.quiet {
        return;
    }

    if report.violations.is_empty() {
        println!("{}: ok ({} messages)", report.path, report.messages);
        return;
    }

    for violation in &report.violations {
        println!(
            "{}: message {} references missing parent {}",
            report.path, violation.child, violation.parent
        );
    }
    if report.fixed {
        println!(
            "{}: removed {} orphan(s)",
            report.path,
            report.orphans_removed.len()
        );
    }
}
