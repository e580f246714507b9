//! Global configuration for mulch (stored in ~/.config/mulch/config.toml)
//!
//! Holds default policy knobs and decay-preset overrides. A missing file
//! means defaults; a malformed file is an error, never silently ignored.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::decay::{DecayConfig, DecayFold, DecayMode};
use crate::error::{MulchError, Result};

const CONFIG_DIR: &str = "mulch";
const CONFIG_FILE: &str = "config.toml";
const CONFIG_DIR_ENV_VAR: &str = "MULCH_CONFIG_DIR";

/// Field-by-field overrides layered on top of a named preset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayOverrides {
    pub mode: Option<DecayMode>,
    pub fold: Option<DecayFold>,
    pub error: Option<f64>,
    pub debugging: Option<f64>,
    pub code: Option<f64>,
    pub status: Option<f64>,
    pub architecture: Option<f64>,
    pub general: Option<f64>,
}

impl DecayOverrides {
    fn apply(&self, config: &mut DecayConfig) {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(fold) = self.fold {
            config.fold = fold;
        }
        if let Some(v) = self.error {
            config.lambdas.error = v;
        }
        if let Some(v) = self.debugging {
            config.lambdas.debugging = v;
        }
        if let Some(v) = self.code {
            config.lambdas.code = v;
        }
        if let Some(v) = self.status {
            config.lambdas.status = v;
        }
        if let Some(v) = self.architecture {
            config.lambdas.architecture = v;
        }
        if let Some(v) = self.general {
            config.lambdas.general = v;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default decay preset name
    pub preset: Option<String>,
    /// Default age cutoff in days
    pub max_age_days: Option<f64>,
    /// Default importance threshold
    pub min_importance: Option<f64>,
    /// Default per-run deletion cap
    pub max_deletions: Option<usize>,
    pub decay: DecayOverrides,
}

impl GlobalConfig {
    fn config_path() -> Result<PathBuf> {
        // Allow environment variable override for testing
        let config_dir = if let Ok(env_dir) = std::env::var(CONFIG_DIR_ENV_VAR) {
            PathBuf::from(env_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| {
                    MulchError::Other("unable to determine config directory".to_string())
                })?
                .join(CONFIG_DIR)
        };

        Ok(config_dir.join(CONFIG_FILE))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            MulchError::Other(format!(
                "failed to read config from {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(MulchError::from)
    }

    /// Resolve the effective decay config: CLI preset wins over the config
    /// file's preset, then field overrides apply on top.
    pub fn decay_config(&self, cli_preset: Option<&str>) -> Result<DecayConfig> {
        let name = cli_preset
            .or(self.preset.as_deref())
            .unwrap_or("standard");
        let mut config = DecayConfig::by_name(name).ok_or_else(|| {
            MulchError::UsageError(format!(
                "unknown decay preset '{}' (expected: {})",
                name,
                DecayConfig::preset_names().join(", ")
            ))
        })?;
        self.decay.apply(&mut config);
        Ok(config)
    }
}
