//! Run the pipeline

use anyhow::{Context, Result};
use tickflow_core::{Config, StopReason};
use tickflow_runtime::Runtime;

/// Run the run command
pub fn run(config_path: &str, max_cycles: Option<u64>, json: bool) -> Result<()> {
    let config = Config::load(config_path).context("Failed to load configuration")?;
    let runtime = Runtime::new(config).with_max_cycles(max_cycles);

    let report = runtime.run()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match &report.stop_reason {
        StopReason::Exhausted { connector } => tracing::info!(
            "✓ Completed {} cycle(s); '{}' found its producer exhausted on cycle {}",
            report.cycles_completed,
            connector,
            report.stopped_at_cycle.unwrap_or_default()
        ),
        StopReason::CycleLimit => tracing::info!(
            "✓ Completed {} cycle(s); cycle limit reached",
            report.cycles_completed
        ),
    }
    for connector in &report.connectors {
        tracing::debug!(
            connector = %connector.connector,
            transfers = connector.transfers,
            "transfer count"
        );
    }
    Ok(())
}
