//! Graph command - export the dependency graph as a debug artifact

use std::fs;
use std::path::Path;

use crate::cli::Cli;
use mulch_core::error::Result;
use mulch_core::graph::MessageGraph;
use mulch_core::record::{load_messages, LoadOptions};

pub fn execute(cli: &Cli, path: &Path, output: Option<&Path>) -> Result<()> {
    let loaded = load_messages(path, LoadOptions::default())?;
    let graph = MessageGraph::build(loaded.messages);
    let doc = serde_json::to_string_pretty(&graph.export())?;

    match output {
        Some(target) => {
            fs::write(target, doc)?;
            if !cli.quiet {
                println!("graph written to {}", target.display());
            }
        }
        None => println!("{doc}"),
    }
    Ok(())
}
