//! Show the assembled graph

use anyhow::{Context, Result};
use tickflow_core::Config;

/// Run the show command
pub fn run(config_path: &str) -> Result<()> {
    let config = Config::load(config_path).context("Failed to load configuration")?;
    let graph = tickflow_runtime::assembly::check(&config)?;

    println!("Pipeline: {}", config.pipeline.name);
    if let Some(description) = &config.pipeline.description {
        println!("  {description}");
    }

    println!();
    println!("Nodes:");
    for node in graph.nodes() {
        println!("  {:<16} {}", node.name(), node.kind().label());
    }

    println!();
    println!("Connectors (execution order):");
    for (i, connector) in graph.connectors().enumerate() {
        let producer = &graph.nodes()[connector.producer().index()];
        let targets: Vec<String> = connector
            .targets()
            .iter()
            .map(|t| graph.target_name(t))
            .collect();
        println!(
            "  {:>3}. {:<8} {} -> {}",
            i + 1,
            connector.name(),
            producer.name(),
            targets.join(", ")
        );
    }
    Ok(())
}
