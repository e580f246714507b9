//! Integration tests for pruning and integrity behavior

mod common;

use common::{mulch, record, write_log};
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_prune_keeps_ancestors_of_recent_messages() {
    // root -> child -> recent: the old ancestors are candidates but must
    // survive because the recent leaf depends on them.
    let dir = tempdir().unwrap();
    let log = write_log(
        dir.path(),
        "session.jsonl",
        &[
            record("root", None, 300, "start"),
            record("child", Some("root"), 299, "continue"),
            record("recent", Some("child"), 1, "latest"),
        ],
    );

    let output = mulch(dir.path())
        .args([
            "--format",
            "json",
            "prune",
            log.to_str().unwrap(),
            "--max-age-days",
            "200",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let doc: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert_eq!(doc[0]["result"]["deleted"], 0);
    assert_eq!(doc[0]["result"]["preserved"], 2);

    let content = fs::read_to_string(&log).unwrap();
    assert!(content.contains(r#""id":"root""#));
    assert!(content.contains(r#""id":"recent""#));
}

#[test]
fn test_prune_removes_independent_old_chain() {
    let dir = tempdir().unwrap();
    let log = write_log(
        dir.path(),
        "session.jsonl",
        &[
            record("a1", None, 300, "old thread"),
            record("a2", Some("a1"), 300, "old reply"),
            record("b1", None, 1, "new thread"),
            record("b2", Some("b1"), 0, "new reply"),
        ],
    );

    let output = mulch(dir.path())
        .args([
            "--format",
            "json",
            "prune",
            log.to_str().unwrap(),
            "--max-age-days",
            "200",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let doc: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert_eq!(doc[0]["result"]["deleted"], 2);
    assert_eq!(doc[0]["result"]["removed_ids"], serde_json::json!(["a1", "a2"]));

    let content = fs::read_to_string(&log).unwrap();
    assert!(!content.contains(r#""id":"a1""#));
    assert!(content.contains(r#""id":"b2""#));

    // The check command agrees the result is consistent.
    mulch(dir.path())
        .args(["check", log.to_str().unwrap()])
        .assert()
        .success();
}

#[test]
fn test_noop_prune_reproduces_input() {
    let dir = tempdir().unwrap();
    let log = write_log(
        dir.path(),
        "session.jsonl",
        &[
            record("a", None, 10, "hello"),
            record("b", Some("a"), 5, "world"),
        ],
    );
    let before = fs::read_to_string(&log).unwrap();

    mulch(dir.path())
        .args(["prune", log.to_str().unwrap()])
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&log).unwrap(), before);
}

#[test]
fn test_prune_creates_backup() {
    let dir = tempdir().unwrap();
    let log = write_log(
        dir.path(),
        "session.jsonl",
        &[record("old", None, 300, "bye"), record("new", None, 1, "hi")],
    );
    let before = fs::read_to_string(&log).unwrap();

    mulch(dir.path())
        .args(["prune", log.to_str().unwrap(), "--max-age-days", "100"])
        .assert()
        .success();

    let backup = dir.path().join("session.jsonl.backup");
    assert!(backup.exists());
    assert_eq!(fs::read_to_string(&backup).unwrap(), before);
    assert_ne!(fs::read_to_string(&log).unwrap(), before);
}

#[test]
fn test_dry_run_leaves_file_untouched() {
    let dir = tempdir().unwrap();
    let log = write_log(
        dir.path(),
        "session.jsonl",
        &[record("old", None, 300, "bye"), record("new", None, 1, "hi")],
    );
    let before = fs::read_to_string(&log).unwrap();

    let output = mulch(dir.path())
        .args([
            "--format",
            "json",
            "prune",
            log.to_str().unwrap(),
            "--max-age-days",
            "100",
            "--dry-run",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let doc: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert_eq!(doc[0]["result"]["deleted"], 1);
    assert_eq!(doc[0]["result"]["state"], "validated");

    assert_eq!(fs::read_to_string(&log).unwrap(), before);
    assert!(!dir.path().join("session.jsonl.backup").exists());
}

#[test]
fn test_idempotent_rerun_deletes_nothing() {
    let dir = tempdir().unwrap();
    let log = write_log(
        dir.path(),
        "session.jsonl",
        &[
            record("old1", None, 300, "a"),
            record("old2", Some("old1"), 299, "b"),
            record("keeproot", None, 250, "c"),
            record("recent", Some("keeproot"), 1, "d"),
        ],
    );

    let args = [
        "--format",
        "json",
        "prune",
        log.to_str().unwrap(),
        "--max-age-days",
        "200",
    ];

    let first = mulch(dir.path()).args(args).output().unwrap();
    let doc: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&first.stdout)).unwrap();
    assert_eq!(doc[0]["result"]["deleted"], 2);

    let second = mulch(dir.path()).args(args).output().unwrap();
    let doc: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&second.stdout)).unwrap();
    assert_eq!(doc[0]["result"]["deleted"], 0);
}

#[test]
fn test_max_deletions_cap_warns() {
    let dir = tempdir().unwrap();
    let lines: Vec<String> = (0..8)
        .map(|i| record(&format!("m{i}"), None, 300 + i, "old"))
        .collect();
    let log = write_log(dir.path(), "session.jsonl", &lines);

    let output = mulch(dir.path())
        .args([
            "--format",
            "json",
            "prune",
            log.to_str().unwrap(),
            "--max-age-days",
            "100",
            "--max-deletions",
            "3",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let doc: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert_eq!(doc[0]["result"]["deleted"], 3);
    let warnings = doc[0]["result"]["warnings"].as_array().unwrap();
    assert!(warnings.iter().any(|w| w.as_str().unwrap().contains("deletion cap")));
}

#[test]
fn test_naive_prune_cascades_orphans() {
    let dir = tempdir().unwrap();
    let log = write_log(
        dir.path(),
        "session.jsonl",
        &[
            record("root", None, 300, "old root"),
            record("mid", Some("root"), 300, "old mid"),
            record("recent", Some("mid"), 1, "fresh leaf"),
        ],
    );

    let output = mulch(dir.path())
        .args([
            "--format",
            "json",
            "prune",
            log.to_str().unwrap(),
            "--max-age-days",
            "200",
            "--naive",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let doc: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert_eq!(doc[0]["result"]["orphans_removed"], serde_json::json!(["recent"]));

    // Everything cascaded out; the file still validates.
    mulch(dir.path())
        .args(["check", log.to_str().unwrap()])
        .assert()
        .success();
}

#[test]
fn test_cyclic_log_aborts_with_data_error() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("session.jsonl");
    fs::write(
        &log,
        concat!(
            r#"{"id":"a","role":"user","content":"x","parent_id":"b"}"#,
            "\n",
            r#"{"id":"b","role":"user","content":"y","parent_id":"a"}"#,
            "\n",
        ),
    )
    .unwrap();
    let before = fs::read_to_string(&log).unwrap();

    mulch(dir.path())
        .args(["prune", log.to_str().unwrap(), "--max-age-days", "1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("aborted"));

    // The file was not touched.
    assert_eq!(fs::read_to_string(&log).unwrap(), before);
}

#[test]
fn test_check_reports_dangling_parent() {
    // Scenario: a message claims a parent that never existed.
    let dir = tempdir().unwrap();
    let log = write_log(
        dir.path(),
        "session.jsonl",
        &[
            record("a", None, 1, "fine"),
            record("b", Some("ghost"), 1, "points nowhere"),
        ],
    );

    let output = mulch(dir.path())
        .args(["--format", "json", "check", log.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let doc: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    let violations = doc["violations"].as_array().unwrap();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0]["child"], "b");
    assert_eq!(violations[0]["parent"], "ghost");
}

#[test]
fn test_check_fix_removes_orphans_and_cascades() {
    // Simulate an upstream bug: a parent line was deleted by hand.
    let dir = tempdir().unwrap();
    let log = write_log(
        dir.path(),
        "session.jsonl",
        &[
            record("kept", None, 1, "fine"),
            record("child", Some("gone"), 1, "orphan"),
            record("grandchild", Some("child"), 1, "cascades too"),
        ],
    );

    mulch(dir.path())
        .args(["check", log.to_str().unwrap(), "--fix"])
        .assert()
        .success();

    let content = fs::read_to_string(&log).unwrap();
    assert!(content.contains(r#""id":"kept""#));
    assert!(!content.contains(r#""id":"child""#));
    assert!(!content.contains(r#""id":"grandchild""#));

    // A second check passes with zero violations.
    mulch(dir.path())
        .args(["check", log.to_str().unwrap()])
        .assert()
        .success();
}

#[test]
fn test_directory_batch_prunes_all_logs() {
    let dir = tempdir().unwrap();
    let logs = dir.path().join("logs");
    fs::create_dir(&logs).unwrap();
    write_log(&logs, "one.jsonl", &[record("a", None, 300, "old")]);
    write_log(&logs, "two.jsonl", &[record("b", None, 300, "old")]);
    fs::write(logs.join("ignore.txt"), "not a log").unwrap();

    let output = mulch(dir.path())
        .args([
            "--format",
            "json",
            "prune",
            logs.to_str().unwrap(),
            "--max-age-days",
            "100",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let doc: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    let outcomes = doc.as_array().unwrap();
    assert_eq!(outcomes.len(), 2);
    for outcome in outcomes {
        assert_eq!(outcome["result"]["deleted"], 1);
    }
}

#[test]
fn test_batch_continues_past_bad_file() {
    let dir = tempdir().unwrap();
    let logs = dir.path().join("logs");
    fs::create_dir(&logs).unwrap();
    write_log(&logs, "good.jsonl", &[record("a", None, 300, "old")]);
    fs::write(
        logs.join("bad.jsonl"),
        concat!(
            r#"{"id":"x","parent_id":"y"}"#,
            "\n",
            r#"{"id":"y","parent_id":"x"}"#,
            "\n",
        ),
    )
    .unwrap();

    let output = mulch(dir.path())
        .args([
            "--format",
            "json",
            "prune",
            logs.to_str().unwrap(),
            "--max-age-days",
            "100",
        ])
        .output()
        .unwrap();
    // Batch exits non-zero because one unit failed...
    assert!(!output.status.success());

    // ...but the good file was still pruned.
    let doc: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    let outcomes = doc.as_array().unwrap();
    assert_eq!(outcomes.len(), 2);
    let good = outcomes.iter().find(|o| o["path"].as_str().unwrap().ends_with("good.jsonl")).unwrap();
    assert_eq!(good["result"]["deleted"], 1);
    let bad = outcomes.iter().find(|o| o["path"].as_str().unwrap().ends_with("bad.jsonl")).unwrap();
    assert!(bad["error"].as_str().unwrap().contains("cyclic"));
}

#[test]
fn test_export_graph_during_prune() {
    let dir = tempdir().unwrap();
    let log = write_log(
        dir.path(),
        "session.jsonl",
        &[record("a", None, 300, "old"), record("b", Some("a"), 1, "new")],
    );
    let export = dir.path().join("graph.json");

    mulch(dir.path())
        .args([
            "prune",
            log.to_str().unwrap(),
            "--max-age-days",
            "100",
            "--export-graph",
            export.to_str().unwrap(),
        ])
        .assert()
        .success();

    let doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&export).unwrap()).unwrap();
    assert_eq!(doc["metadata"]["message_count"], 2);
    // "a" was a candidate but is preserved for its recent child.
    let node_a = doc["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["id"] == "a")
        .unwrap();
    assert_eq!(node_a["preserved_by_dependency"], true);
}

#[test]
fn test_invalid_lines_are_dropped_and_counted() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("session.jsonl");
    let good = record("a", None, 1, "fine");
    fs::write(&log, format!("{good}\n{{broken json\n")).unwrap();

    let output = mulch(dir.path())
        .args(["--format", "json", "prune", log.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());

    let doc: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert_eq!(doc[0]["result"]["invalid"], 1);
    assert_eq!(doc[0]["result"]["scanned"], 1);

    let content = fs::read_to_string(&log).unwrap();
    assert_eq!(content, format!("{good}\n"));
}
