//! Prune command - run the pruning policy over one or more logs

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cli::{Cli, OutputFormat, PruneArgs};
use mulch_core::batch::{discover_logs, run_batch, FileOutcome};
use mulch_core::config::GlobalConfig;
use mulch_core::error::{MulchError, Result};
use mulch_core::prune::PrunePolicy;

const DEFAULT_MAX_DELETIONS: usize = 1000;

pub fn execute(cli: &Cli, args: &PruneArgs) -> Result<()> {
    let config = GlobalConfig::load()?;
    let policy = build_policy(args, &config)?;
    let files = collect_files(args)?;

    if args.export_graph.is_some() && files.len() > 1 {
        return Err(MulchError::UsageError(
            "--export-graph requires a single log file".to_string(),
        ));
    }

    // Ctrl-C finishes the in-flight files and stops picking up new ones.
    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&cancel);
    let _ = ctrlc::set_handler(move || handler_flag.store(true, Ordering::Relaxed));

    let total = files.len();
    let outcomes = run_batch(files, &policy, args.threads, &cancel);

    report(cli, &outcomes);

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    if failed > 0 {
        return Err(MulchError::Other(format!(
            "{failed} of {total} file(s) aborted"
        )));
    }
    Ok(())
}

fn build_policy(args: &PruneArgs, config: &GlobalConfig) -> Result<PrunePolicy> {
    let decay = config.decay_config(args.preset.as_deref())?;

    Ok(PrunePolicy {
        max_age_days: args.max_age_days.or(config.max_age_days),
        min_importance: args.min_importance.or(config.min_importance),
        max_deletions: args
            .max_deletions
            .or(config.max_deletions)
            .unwrap_or(DEFAULT_MAX_DELETIONS),
        dependency_aware: !args.naive,
        orphan_cleanup: !args.no_orphan_cleanup,
        dry_run: args.dry_run,
        timestamped_backup: args.timestamped_backup,
        export_graph: args.export_graph.clone(),
        strict_load: args.strict,
        decay,
        reference_time: None,
    })
}

fn collect_files(args: &PruneArgs) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in &args.paths {
        if !path.exists() {
            return Err(MulchError::LogNotFound { path: path.clone() });
        }
        files.extend(discover_logs(path, None));
    }
    files.sort();
    files.dedup();

    if files.is_empty() {
        return Err(MulchError::UsageError(
            "no .jsonl files found under the given paths".to_string(),
        ));
    }

    if let Some(cap) = args.max_files {
        if files.len() > cap {
            tracing::warn!(found = files.len(), cap, "file cap applied");
            files.truncate(cap);
        }
    }

    Ok(files)
}

fn report(cli: &Cli, outcomes: &[FileOutcome]) {
    if cli.format == OutputFormat::Json {
        if let Ok(doc) = serde_json::to_string_pretty(outcomes) {
            println!("{doc}");
        }
        return;
    }

    if cli.quiet {
        return;
    }

    for outcome in outcomes {
        let name = outcome.path.display();
        match (&outcome.result, &outcome.error) {
            (Some(result), _) => {
                let marker = if result.dry_run { " (dry run)" } else { "" };
                println!(
                    "{name}: deleted {} of {} ({} preserved, {} orphans), {} -> {} bytes{marker}",
                    result.deleted,
                    result.scanned,
                    result.preserved,
                    result.orphans_removed.len(),
                    result.bytes_before,
                    result.bytes_after,
                );
                for warning in &result.warnings {
                    println!("  warning: {warning}");
                }
            }
            (None, Some(error)) => println!("{name}: aborted: {error}"),
            (None, None) => {}
        }
    }
}
