//! Validate configuration command

use anyhow::{Context, Result};
use tickflow_core::Config;

/// Run the validate command
pub fn run(config_path: &str) -> Result<()> {
    tracing::info!("Validating configuration: {}", config_path);

    let config = Config::load(config_path).context("Failed to load configuration")?;
    let pipeline = &config.pipeline;

    tracing::info!("✓ Pipeline: {}", pipeline.name);
    tracing::info!("✓ Nodes: {}", pipeline.nodes.len());
    tracing::info!("✓ Connectors: {}", pipeline.connectors.len());

    let graph = tickflow_runtime::assembly::check(&config)?;
    tracing::info!("✓ Execution order: {}", graph.execution_order().join(", "));

    tracing::info!("✓ Configuration is valid");
    Ok(())
}
