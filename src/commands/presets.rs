//! Presets command - list the built-in decay presets

use crate::cli::{Cli, OutputFormat};
use mulch_core::decay::DecayConfig;
use mulch_core::error::Result;

pub fn execute(cli: &Cli) -> Result<()> {
    let presets: Vec<DecayConfig> = DecayConfig::preset_names()
        .iter()
        .filter_map(|name| DecayConfig::by_name(name))
        .collect();

    if cli.format == OutputFormat::Json {
        if let Ok(doc) = serde_json::to_string_pretty(&presets) {
            println!("{doc}");
        }
        return Ok(());
    }

    for preset in &presets {
        println!(
            "{}: mode {:?}, general λ {}/h, error λ {}/h, architecture λ {}/h",
            preset.preset,
            preset.mode,
            preset.lambdas.general,
            preset.lambdas.error,
            preset.lambdas.architecture
        );
    }
    Ok(())
}
