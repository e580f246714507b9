//! Temporal decay engine
//!
//! Computes a [0,1] decay factor per message from its age and content
//! category. Config is constructed once per run and read-only thereafter;
//! the per-file velocity adjustment produces a scaled copy rather than
//! mutating the original.

pub mod classify;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

pub use classify::{ContentCategory, ContentClassifier, KeywordClassifier};

use crate::record::Message;

const HOURS_PER_DAY: f64 = 24.0;

/// Decay computation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecayMode {
    /// Always 1.0
    None,
    /// Single exponential per category constant
    Simple,
    /// Window-scaled exponential
    MultiStage,
    /// Multi-stage with content boosts/penalties
    #[default]
    ContentAware,
}

impl std::str::FromStr for DecayMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(DecayMode::None),
            "simple" => Ok(DecayMode::Simple),
            "multi-stage" | "multistage" => Ok(DecayMode::MultiStage),
            "content-aware" | "contentaware" => Ok(DecayMode::ContentAware),
            other => Err(format!(
                "unknown decay mode '{}' (expected: none, simple, multi-stage, content-aware)",
                other
            )),
        }
    }
}

/// How the decay factor folds into the importance score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecayFold {
    #[default]
    Multiplicative,
    Additive,
}

/// Per-category decay constants, in units of 1/hour
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryLambdas {
    pub error: f64,
    pub debugging: f64,
    pub code: f64,
    pub status: f64,
    pub architecture: f64,
    pub general: f64,
}

impl Default for CategoryLambdas {
    fn default() -> Self {
        CategoryLambdas {
            error: 0.005,
            debugging: 0.020,
            code: 0.008,
            status: 0.030,
            architecture: 0.003,
            general: 0.015,
        }
    }
}

impl CategoryLambdas {
    pub fn for_category(&self, category: ContentCategory) -> f64 {
        match category {
            ContentCategory::Error => self.error,
            ContentCategory::Debugging => self.debugging,
            ContentCategory::Code => self.code,
            ContentCategory::Status => self.status,
            ContentCategory::Architecture => self.architecture,
            ContentCategory::General => self.general,
        }
    }

    fn scaled(&self, factor: f64) -> Self {
        CategoryLambdas {
            error: self.error * factor,
            debugging: self.debugging * factor,
            code: self.code * factor,
            status: self.status * factor,
            architecture: self.architecture * factor,
            general: self.general * factor,
        }
    }
}

/// One time window of the multi-stage model. `end_hours` is exclusive;
/// `f64::INFINITY` marks the open-ended final window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_hours: f64,
    pub end_hours: f64,
    pub multiplier: f64,
}

/// Named, swappable bundle of decay constants, windows, and mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    pub preset: String,
    pub mode: DecayMode,
    pub fold: DecayFold,
    pub lambdas: CategoryLambdas,
    pub windows: Vec<TimeWindow>,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl DecayConfig {
    /// The `standard` preset: content-aware decay with default constants
    pub fn standard() -> Self {
        DecayConfig {
            preset: "standard".to_string(),
            mode: DecayMode::ContentAware,
            fold: DecayFold::Multiplicative,
            lambdas: CategoryLambdas::default(),
            windows: default_windows(),
        }
    }

    /// The `conservative` preset: halved constants, messages linger longer
    pub fn conservative() -> Self {
        DecayConfig {
            preset: "conservative".to_string(),
            lambdas: CategoryLambdas::default().scaled(0.5),
            ..Self::standard()
        }
    }

    /// The `aggressive` preset: doubled constants
    pub fn aggressive() -> Self {
        DecayConfig {
            preset: "aggressive".to_string(),
            lambdas: CategoryLambdas::default().scaled(2.0),
            ..Self::standard()
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "standard" => Some(Self::standard()),
            "conservative" => Some(Self::conservative()),
            "aggressive" => Some(Self::aggressive()),
            _ => None,
        }
    }

    pub fn preset_names() -> &'static [&'static str] {
        &["standard", "conservative", "aggressive"]
    }

    /// The window containing `age_hours`; falls back to the last window
    fn window_for(&self, age_hours: f64) -> Option<&TimeWindow> {
        self.windows
            .iter()
            .find(|w| age_hours >= w.start_hours && age_hours < w.end_hours)
            .or_else(|| self.windows.last())
    }
}

/// Default window boundaries: 0-1h, 1-24h, 1-7d, 1-4wk, 4wk+
fn default_windows() -> Vec<TimeWindow> {
    vec![
        TimeWindow {
            start_hours: 0.0,
            end_hours: 1.0,
            multiplier: 0.1,
        },
        TimeWindow {
            start_hours: 1.0,
            end_hours: HOURS_PER_DAY,
            multiplier: 0.5,
        },
        TimeWindow {
            start_hours: HOURS_PER_DAY,
            end_hours: 7.0 * HOURS_PER_DAY,
            multiplier: 1.0,
        },
        TimeWindow {
            start_hours: 7.0 * HOURS_PER_DAY,
            end_hours: 28.0 * HOURS_PER_DAY,
            multiplier: 1.5,
        },
        TimeWindow {
            start_hours: 28.0 * HOURS_PER_DAY,
            end_hours: f64::INFINITY,
            multiplier: 2.0,
        },
    ]
}

/// Compute the decay factor for a message with a known timestamp.
///
/// Messages without timestamps never reach this function; callers treat
/// them as maximally recent (factor 1.0).
pub fn decay_factor(
    content: &str,
    timestamp: DateTime<Utc>,
    reference: DateTime<Utc>,
    config: &DecayConfig,
    classifier: &dyn ContentClassifier,
) -> f64 {
    if config.mode == DecayMode::None {
        return 1.0;
    }

    let age_hours = (reference - timestamp).num_seconds().abs() as f64 / 3600.0;
    let category = classifier.classify(content);
    let lambda = config.lambdas.for_category(category);

    let factor = match config.mode {
        DecayMode::None => 1.0,
        DecayMode::Simple => (-lambda * age_hours).exp(),
        DecayMode::MultiStage => multi_stage(config, lambda, age_hours),
        DecayMode::ContentAware => {
            multi_stage(config, lambda, age_hours) * content_boost(category, content)
        }
    };

    factor.clamp(0.0, 1.0)
}

/// Window-scaled exponential, relative to the containing window's start
fn multi_stage(config: &DecayConfig, lambda: f64, age_hours: f64) -> f64 {
    let Some(window) = config.window_for(age_hours) else {
        return (-lambda * age_hours).exp();
    };
    let in_window = (age_hours - window.start_hours).max(0.0);
    (-lambda * window.multiplier * in_window).exp()
}

/// Multiplicative boost or penalty on top of the multi-stage result
fn content_boost(category: ContentCategory, content: &str) -> f64 {
    match category {
        ContentCategory::Error => 1.3,
        ContentCategory::Status => 1.2,
        ContentCategory::Code => 1.1,
        _ => {
            if routine_setup_re().is_match(content) {
                0.9
            } else {
                1.0
            }
        }
    }
}

fn routine_setup_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(setup|installing|installed|configuration|configuring|dependencies)\b")
            .unwrap_or_else(|_| Regex::new("$^").unwrap())
    })
}

/// Per-file scaling of the decay constants from conversation shape.
///
/// Denser conversations decay slower; very long conversations get mild
/// time-window compression. Computed once per file, never per message.
#[derive(Debug, Clone, Copy)]
pub struct VelocityAdjustment {
    pub lambda_scale: f64,
    pub window_compression: f64,
}

impl VelocityAdjustment {
    pub fn identity() -> Self {
        VelocityAdjustment {
            lambda_scale: 1.0,
            window_compression: 1.0,
        }
    }

    pub fn compute(messages: &[Message]) -> Self {
        let timestamps: Vec<DateTime<Utc>> =
            messages.iter().filter_map(|m| m.timestamp).collect();
        if timestamps.len() < 2 {
            return Self::identity();
        }

        let min = timestamps.iter().min().copied().unwrap_or_default();
        let max = timestamps.iter().max().copied().unwrap_or_default();
        let span_hours = ((max - min).num_seconds() as f64 / 3600.0).max(1.0 / 60.0);
        let per_hour = timestamps.len() as f64 / span_hours;

        let lambda_scale = if per_hour >= 30.0 {
            0.5
        } else if per_hour >= 10.0 {
            0.75
        } else {
            1.0
        };

        let window_compression = if messages.len() > 1000 {
            0.8
        } else if messages.len() > 500 {
            0.9
        } else {
            1.0
        };

        VelocityAdjustment {
            lambda_scale,
            window_compression,
        }
    }

    /// Scaled copy of the config; the input is left untouched
    pub fn apply(&self, config: &DecayConfig) -> DecayConfig {
        let mut adjusted = config.clone();
        adjusted.lambdas = adjusted.lambdas.scaled(self.lambda_scale);
        for window in &mut adjusted.windows {
            window.start_hours *= self.window_compression;
            if window.end_hours.is_finite() {
                window.end_hours *= self.window_compression;
            }
        }
        adjusted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hours_ago: f64) -> (DateTime<Utc>, DateTime<Utc>) {
        let reference = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let timestamp = reference - chrono::Duration::seconds((hours_ago * 3600.0) as i64);
        (timestamp, reference)
    }

    #[test]
    fn test_mode_none_is_always_one() {
        let config = DecayConfig {
            mode: DecayMode::None,
            ..DecayConfig::standard()
        };
        let classifier = KeywordClassifier::new();
        let (ts, reference) = at(10_000.0);
        assert_eq!(decay_factor("anything", ts, reference, &config, &classifier), 1.0);
    }

    #[test]
    fn test_simple_decay_decreases_with_age() {
        let config = DecayConfig {
            mode: DecayMode::Simple,
            ..DecayConfig::standard()
        };
        let classifier = KeywordClassifier::new();
        let (fresh_ts, reference) = at(1.0);
        let (old_ts, _) = at(500.0);
        let fresh = decay_factor("hello there", fresh_ts, reference, &config, &classifier);
        let old = decay_factor("hello there", old_ts, reference, &config, &classifier);
        assert!(fresh > old);
        assert!((0.0..=1.0).contains(&fresh));
        assert!((0.0..=1.0).contains(&old));
    }

    #[test]
    fn test_category_changes_rate() {
        let config = DecayConfig {
            mode: DecayMode::Simple,
            ..DecayConfig::standard()
        };
        let classifier = KeywordClassifier::new();
        let (ts, reference) = at(100.0);
        // Architecture decays slower than status at the same age.
        let arch = decay_factor(
            "the design decision we made",
            ts,
            reference,
            &config,
            &classifier,
        );
        let status = decay_factor("task complete", ts, reference, &config, &classifier);
        assert!(arch > status);
    }

    #[test]
    fn test_multi_stage_window_selection() {
        let config = DecayConfig {
            mode: DecayMode::MultiStage,
            ..DecayConfig::standard()
        };
        // Just inside the first window decay is near 1.0.
        let classifier = KeywordClassifier::new();
        let (ts, reference) = at(0.5);
        let factor = decay_factor("plain text", ts, reference, &config, &classifier);
        assert!(factor > 0.99);
    }

    #[test]
    fn test_content_aware_boost_and_clamp() {
        let config = DecayConfig {
            mode: DecayMode::ContentAware,
            ..DecayConfig::standard()
        };
        let classifier = KeywordClassifier::new();
        let (ts, reference) = at(0.1);
        // Boost on a near-fresh message must still clamp to 1.0.
        let factor = decay_factor("fatal error in worker", ts, reference, &config, &classifier);
        assert_eq!(factor, 1.0);

        let (old_ts, _) = at(48.0);
        let boosted = decay_factor("fatal error in worker", old_ts, reference, &config, &classifier);
        let plain = decay_factor("random chatter", old_ts, reference, &config, &classifier);
        assert!(boosted > plain);
    }

    #[test]
    fn test_routine_setup_penalty() {
        let (ts, reference) = at(48.0);
        let config = DecayConfig::standard();
        let classifier = KeywordClassifier::new();
        let routine = decay_factor(
            "installing dependencies and configuration",
            ts,
            reference,
            &config,
            &classifier,
        );
        let plain = decay_factor("random chatter", ts, reference, &config, &classifier);
        assert!(routine < plain);
    }

    #[test]
    fn test_presets() {
        let conservative = DecayConfig::by_name("conservative").unwrap();
        let aggressive = DecayConfig::by_name("AGGRESSIVE").unwrap();
        let standard = DecayConfig::standard();
        assert!(conservative.lambdas.general < standard.lambdas.general);
        assert!(aggressive.lambdas.general > standard.lambdas.general);
        assert!(DecayConfig::by_name("bogus").is_none());
    }

    #[test]
    fn test_velocity_identity_for_sparse_logs() {
        let adjustment = VelocityAdjustment::compute(&[]);
        assert_eq!(adjustment.lambda_scale, 1.0);
        assert_eq!(adjustment.window_compression, 1.0);
    }

    #[test]
    fn test_velocity_dense_conversation_slows_decay() {
        let reference = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let messages: Vec<Message> = (0..120)
            .map(|i| {
                let mut m = crate::graph::test_message(&format!("m{i}"), None);
                m.timestamp = Some(reference + chrono::Duration::seconds(i * 30));
                m
            })
            .collect();

        let adjustment = VelocityAdjustment::compute(&messages);
        assert!(adjustment.lambda_scale < 1.0);

        let config = DecayConfig::standard();
        let adjusted = adjustment.apply(&config);
        assert!(adjusted.lambdas.general < config.lambdas.general);
        // Original untouched.
        assert_eq!(config.lambdas.general, CategoryLambdas::default().general);
    }
}
