use assert_cmd::{cargo::cargo_bin_cmd, Command};
use chrono::{Duration, Utc};
use std::fs;
use std::path::{Path, PathBuf};

/// Get a Command for mulch with the config dir pinned to a scratch
/// location, so a developer's real config never leaks into tests.
pub fn mulch(config_dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("mulch");
    cmd.env("MULCH_CONFIG_DIR", config_dir);
    cmd
}

/// Serialize a record line with a timestamp `days_old` days in the past.
#[allow(dead_code)]
pub fn record(id: &str, parent: Option<&str>, days_old: i64, content: &str) -> String {
    let ts = (Utc::now() - Duration::days(days_old)).to_rfc3339();
    let parent_field = parent
        .map(|p| format!(r#","parent_id":"{p}""#))
        .unwrap_or_default();
    format!(r#"{{"id":"{id}","role":"user","content":"{content}","timestamp":"{ts}"{parent_field}}}"#)
}

#[allow(dead_code)]
pub fn write_log(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, lines.join("\n") + "\n").unwrap();
    path
}
