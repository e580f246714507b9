//! Conversation log records
//!
//! A log is a line-oriented file with one serialized JSON record per line.
//! Records carry an `id`, an optional `parent_id` linking them to an earlier
//! record, a kind/role, an optional timestamp, and a message payload. The
//! original line is preserved verbatim so surviving records can be written
//! back byte-for-byte.

use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use crate::error::Result;

/// Role of a message within a conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    User,
    Assistant,
    System,
    Other(String),
}

impl MessageKind {
    fn from_raw(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "user" | "human" => MessageKind::User,
            "assistant" | "ai" => MessageKind::Assistant,
            "system" => MessageKind::System,
            other => MessageKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::User => "user",
            MessageKind::Assistant => "assistant",
            MessageKind::System => "system",
            MessageKind::Other(s) => s.as_str(),
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single parsed record from a conversation log
#[derive(Debug, Clone)]
pub struct Message {
    /// Unique id within the file
    pub id: String,
    /// Lookup key into the same file's id space; presence is not guaranteed
    pub parent_id: Option<String>,
    pub kind: MessageKind,
    pub timestamp: Option<DateTime<Utc>>,
    /// Best-effort text extracted from the message payload
    pub content: String,
    /// Original serialized line, preserved verbatim for lossless rewrite
    pub raw: String,
    /// 1-based line number in the source file
    pub line: usize,
}

/// Loader behavior switches
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Require kind and a message payload in addition to `id`
    pub strict: bool,
}

/// Result of loading one log file
#[derive(Debug)]
pub struct LoadedLog {
    pub messages: Vec<Message>,
    /// Lines that failed to parse or (in strict mode) lacked required fields
    pub invalid_lines: usize,
    /// Size of the input in bytes
    pub bytes: u64,
}

/// Load a log file, dropping malformed lines.
///
/// Per-line malformation is counted and recovered; only an unreadable file
/// is an error.
pub fn load_messages(path: &Path, opts: LoadOptions) -> Result<LoadedLog> {
    let content = fs::read_to_string(path)?;
    let bytes = content.len() as u64;

    let mut messages = Vec::new();
    let mut invalid_lines = 0usize;

    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match parse_line(trimmed, idx + 1, opts.strict) {
            Some(message) => messages.push(message),
            None => invalid_lines += 1,
        }
    }

    tracing::debug!(
        path = %path.display(),
        messages = messages.len(),
        invalid = invalid_lines,
        "log_loaded"
    );

    Ok(LoadedLog {
        messages,
        invalid_lines,
        bytes,
    })
}

/// Parse a single trimmed, non-empty line into a Message.
///
/// Returns None when the line is not a JSON object, lacks an `id`, or (in
/// strict mode) lacks a recognizable kind or payload.
pub fn parse_line(line: &str, number: usize, strict: bool) -> Option<Message> {
    let value: Value = serde_json::from_str(line).ok()?;
    let obj = value.as_object()?;

    let id = obj.get("id").and_then(Value::as_str)?.to_string();
    if id.is_empty() {
        return None;
    }

    let raw_kind = ["kind", "type", "role"]
        .iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_str));
    let content = extract_content(&value);

    if strict && (raw_kind.is_none() || content.is_none()) {
        return None;
    }

    let parent_id = ["parent_id", "parentId"]
        .iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let timestamp = ["timestamp", "ts", "created_at"]
        .iter()
        .find_map(|key| obj.get(*key))
        .and_then(parse_timestamp);

    Some(Message {
        id,
        parent_id,
        kind: raw_kind.map(MessageKind::from_raw).unwrap_or_else(|| {
            MessageKind::Other("unknown".to_string())
        }),
        timestamp,
        content: content.unwrap_or_default(),
        raw: line.to_string(),
        line: number,
    })
}

/// Extract message text from the payload, trying the common layouts:
/// `content`, `text`, `message.content`, `message.text`, and
/// array-of-blocks content (`[{"type": "text", "text": ...}]`).
fn extract_content(value: &Value) -> Option<String> {
    let candidates = [
        &value["content"],
        &value["text"],
        &value["message"]["content"],
        &value["message"]["text"],
    ];

    for candidate in candidates {
        match candidate {
            Value::String(s) => return Some(s.clone()),
            Value::Array(blocks) => {
                let texts: Vec<&str> = blocks
                    .iter()
                    .filter_map(|block| block.get("text").and_then(Value::as_str))
                    .collect();
                if !texts.is_empty() {
                    return Some(texts.join("\n"));
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse a timestamp value in any of the accepted layouts.
///
/// Strings: ISO-8601 with or without offset/`Z`, with or without fractional
/// seconds, `T` or space separated. Numbers: unix epoch, seconds or
/// milliseconds disambiguated by magnitude.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_str(s),
        Value::Number(n) => {
            let n = n.as_f64()?;
            if !n.is_finite() || n < 0.0 {
                return None;
            }
            // Millisecond epochs are 13 digits; second epochs 10.
            let millis = if n >= 1e12 { n } else { n * 1000.0 };
            Utc.timestamp_millis_opt(millis as i64).single()
        }
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    const NAIVE_LAYOUTS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];
    for layout in NAIVE_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    None
}
