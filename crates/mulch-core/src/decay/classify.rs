//! Content classification
//!
//! Categories drive per-category decay constants. The classifier is a trait
//! so the rule-based keyword matcher here is just the default
//! implementation; scoring and decay code only see the trait.

use regex::RegexSet;
use serde::Serialize;

/// Content category of a message, in classification priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentCategory {
    Error,
    Debugging,
    Code,
    Status,
    Architecture,
    General,
}

impl ContentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentCategory::Error => "error",
            ContentCategory::Debugging => "debugging",
            ContentCategory::Code => "code",
            ContentCategory::Status => "status",
            ContentCategory::Architecture => "architecture",
            ContentCategory::General => "general",
        }
    }
}

impl std::fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Maps message text to a content category
pub trait ContentClassifier {
    fn classify(&self, text: &str) -> ContentCategory;
}

/// Default rule-based classifier backed by compiled keyword patterns.
///
/// Categories are checked in priority order: error/exception language wins
/// over debugging output, which wins over code-shaped text, and so on.
#[derive(Debug)]
pub struct KeywordClassifier {
    error: RegexSet,
    debugging: RegexSet,
    code: RegexSet,
    status: RegexSet,
    architecture: RegexSet,
}

impl KeywordClassifier {
    pub fn new() -> Self {
        KeywordClassifier {
            error: compile(&[
                r"(?i)\berror\b",
                r"(?i)\bexception\b",
                r"(?i)\bpanic(?:ked)?\b",
                r"(?i)\bfail(?:ed|ure|s)?\b",
                r"(?i)\btraceback\b",
                r"(?i)stack trace",
                r"(?i)\bfatal\b",
                r"(?i)\bcrash(?:ed|es)?\b",
            ]),
            debugging: compile(&[
                r"(?i)\bdebug(?:ging|ger)?\b",
                r"(?i)\bbreakpoint\b",
                r"(?i)\blog(?:s|ging| output| line)\b",
                r"(?i)\bprintln?\b",
                r"(?i)\bstderr\b",
                r"(?i)\bstdout\b",
                r"(?i)\bstepping through\b",
            ]),
            code: compile(&[
                r"```",
                r"(?i)\bfn \w+\(",
                r"(?i)\bdef \w+\(",
                r"(?i)\bclass \w+",
                r"(?i)\bfunction\b",
                r"(?i)\bimpl \w+",
                r"(?i)\bstruct \w+",
                r"(?i)\bimport \w+",
                r"(?i)\breturn\b",
            ]),
            status: compile(&[
                r"(?i)\bdone\b",
                r"(?i)\bcomplete(?:d)?\b",
                r"(?i)\bfinished\b",
                r"(?i)\bpass(?:ed|ing)\b",
                r"(?i)\bsuccess(?:ful|fully)?\b",
                r"(?i)\bresolved\b",
                r"(?i)\bfixed\b",
                r"(?i)\bworks now\b",
            ]),
            architecture: compile(&[
                r"(?i)\barchitecture\b",
                r"(?i)\bdesign\b",
                r"(?i)\bdecision\b",
                r"(?i)\bapproach\b",
                r"(?i)\btrade-?offs?\b",
                r"(?i)\brefactor(?:ing)?\b",
                r"(?i)\bmodule layout\b",
                r"(?i)\bplan\b",
            ]),
        }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> ContentCategory {
        if self.error.is_match(text) {
            ContentCategory::Error
        } else if self.debugging.is_match(text) {
            ContentCategory::Debugging
        } else if self.code.is_match(text) {
            ContentCategory::Code
        } else if self.status.is_match(text) {
            ContentCategory::Status
        } else if self.architecture.is_match(text) {
            ContentCategory::Architecture
        } else {
            ContentCategory::General
        }
    }
}

fn compile(patterns: &[&str]) -> RegexSet {
    RegexSet::new(patterns).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to compile classifier patterns");
        RegexSet::empty()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        let classifier = KeywordClassifier::new();
        // Error language wins even when debugging words are present.
        assert_eq!(
            classifier.classify("debugging this error in the parser"),
            ContentCategory::Error
        );
        assert_eq!(
            classifier.classify("stepping through with the debugger"),
            ContentCategory::Debugging
        );
        assert_eq!(
            classifier.classify("```\nfn main() {}\n```"),
            ContentCategory::Code
        );
        assert_eq!(
            classifier.classify("all tests passed, task complete"),
            ContentCategory::Status
        );
        assert_eq!(
            classifier.classify("the design decision for the cache layer"),
            ContentCategory::Architecture
        );
        assert_eq!(
            classifier.classify("what time is lunch"),
            ContentCategory::General
        );
    }

    #[test]
    fn test_case_insensitive() {
        let classifier = KeywordClassifier::new();
        assert_eq!(classifier.classify("FATAL ERROR"), ContentCategory::Error);
        assert_eq!(classifier.classify("Resolved it"), ContentCategory::Status);
    }
}
