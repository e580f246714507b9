//! Command dispatch logic for mulch

use crate::cli::{Cli, Commands};
use crate::commands;
use mulch_core::error::Result;

pub fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Prune(args) => commands::prune::execute(cli, args),

        Commands::Check { path, fix } => commands::check::execute(cli, path, *fix),

        Commands::Graph { path, output } => {
            commands::graph::execute(cli, path, output.as_deref())
        }

        Commands::Score {
            path,
            limit,
            preset,
        } => commands::score::execute(cli, path, *limit, preset.as_deref()),

        Commands::Presets => commands::presets::execute(cli),
    }
}
