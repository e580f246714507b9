//! Multi-file batch processing
//!
//! Files run through a bounded worker pool; every worker owns its own
//! graph and classifier, so there is no shared mutable state between
//! files. One file aborting never stops the batch. The cancel flag is
//! checked between files only.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread;

use serde::Serialize;
use walkdir::WalkDir;

use crate::decay::KeywordClassifier;
use crate::prune::{prune_file, PrunePolicy, PruningResult};

/// Outcome of one file's pass within a batch
#[derive(Debug, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<PruningResult>,
    /// Structured abort reason when the file failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Collect `.jsonl` files under `root` in deterministic order, capped at
/// `max_files`. A `root` that is itself a file is returned as-is.
pub fn discover_logs(root: &Path, max_files: Option<usize>) -> Vec<PathBuf> {
    if root.is_file() {
        return vec![root.to_path_buf()];
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "jsonl"))
        .collect();
    files.sort();

    if let Some(cap) = max_files {
        files.truncate(cap);
    }
    files
}

/// Run the policy over every file with up to `threads` workers.
///
/// Results come back sorted by path regardless of completion order.
pub fn run_batch(
    files: Vec<PathBuf>,
    policy: &PrunePolicy,
    threads: usize,
    cancel: &AtomicBool,
) -> Vec<FileOutcome> {
    let workers = threads.max(1).min(files.len().max(1));
    let queue: Mutex<VecDeque<PathBuf>> = Mutex::new(files.into());
    let outcomes: Mutex<Vec<FileOutcome>> = Mutex::new(Vec::new());

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                let classifier = KeywordClassifier::new();
                loop {
                    if cancel.load(Ordering::Relaxed) {
                        break;
                    }
                    let Some(path) = queue.lock().ok().and_then(|mut q| q.pop_front()) else {
                        break;
                    };
                    let outcome = match prune_file(&path, policy, &classifier) {
                        Ok(result) => FileOutcome {
                            path,
                            result: Some(result),
                            error: None,
                        },
                        Err(e) => {
                            tracing::warn!(path = %path.display(), error = %e, "file aborted");
                            FileOutcome {
                                path,
                                result: None,
                                error: Some(e.to_string()),
                            }
                        }
                    };
                    if let Ok(mut results) = outcomes.lock() {
                        results.push(outcome);
                    }
                }
            });
        }
    });

    let mut results = outcomes.into_inner().unwrap_or_default();
    results.sort_by(|a, b| a.path.cmp(&b.path));
    results
}
