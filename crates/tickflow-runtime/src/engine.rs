//! Pipeline execution engine

use anyhow::Context;
use tickflow_core::diagnostics::DiagnosticLog;
use tickflow_core::{Config, RunReport, Scheduler};

use crate::assembly;
use crate::error::Result;

/// Marker logged before a run starts
pub const START_MARKER: &str = "Program Started";

/// Marker logged after a run ends
pub const END_MARKER: &str = "Program Ended";

/// Runtime engine for executing a configured pipeline
pub struct Runtime {
    config: Config,
    max_cycles: Option<u64>,
}

impl Runtime {
    /// Create a runtime using the pipeline's own cycle limit
    pub fn new(config: Config) -> Self {
        let max_cycles = config.pipeline.max_cycles;
        Self { config, max_cycles }
    }

    /// Override the cycle limit; `None` keeps the configured one
    pub fn with_max_cycles(mut self, max_cycles: Option<u64>) -> Self {
        if max_cycles.is_some() {
            self.max_cycles = max_cycles;
        }
        self
    }

    /// The loaded configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Assemble the graph and run it until a producer is exhausted or the
    /// cycle limit is reached
    pub fn run(&self) -> Result<RunReport> {
        let pipeline = &self.config.pipeline;
        let mut diagnostics = match self.config.diagnostics_path() {
            Some(path) => Some(
                DiagnosticLog::open(&path)
                    .with_context(|| format!("Failed to open diagnostics {}", path.display()))?,
            ),
            None => None,
        };

        tracing::info!(pipeline = %pipeline.name, "{START_MARKER}");
        if let Some(log) = diagnostics.as_mut() {
            log.log(START_MARKER)?;
        }

        let graph = assembly::assemble(&self.config)?;
        let mut scheduler = Scheduler::new(graph).with_max_cycles(self.max_cycles);
        let report = scheduler
            .run()
            .with_context(|| format!("Pipeline '{}' failed", pipeline.name))?;

        tracing::info!(
            pipeline = %pipeline.name,
            cycles = report.cycles_completed,
            "{END_MARKER}"
        );
        if let Some(log) = diagnostics.as_mut() {
            log.log(END_MARKER)?;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tickflow_core::StopReason;

    fn project(max_cycles: Option<u64>) -> TempDir {
        let dir = TempDir::new().unwrap();
        let limit = max_cycles
            .map(|n| format!("max_cycles: {n}\n"))
            .unwrap_or_default();
        std::fs::write(
            dir.path().join("tickflow.yaml"),
            format!(
                r#"
name: scale
{limit}diagnostics: run.log
nodes:
  - {{ name: Src, type: csv_source, path: in.csv, column: 1 }}
  - {{ name: Scale, type: transform, functor: {{ kind: affine_scale, alpha: 2.0, beta: 1.0 }} }}
  - {{ name: Out, type: csv_sink, path: out.csv }}
connectors:
  - {{ name: c1, from: Src, to: [Scale.1], log: c1.txt }}
  - {{ name: c2, from: Scale, to: [Out] }}
"#
            ),
        )
        .unwrap();
        std::fs::write(dir.path().join("in.csv"), "0,1\n1,2\n2,3\n").unwrap();
        dir
    }

    #[test]
    fn test_run_to_exhaustion() {
        let dir = project(None);
        let runtime = Runtime::new(Config::load(dir.path()).unwrap());
        let report = runtime.run().unwrap();

        assert_eq!(report.cycles_completed, 3);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("out.csv")).unwrap(),
            "0, 0\n1, 2\n2, 4\n"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("c1.txt")).unwrap(),
            "0,1\n1,2\n2,3\n"
        );

        let diagnostics = std::fs::read_to_string(dir.path().join("run.log")).unwrap();
        let lines: Vec<&str> = diagnostics.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(START_MARKER));
        assert!(lines[1].ends_with(END_MARKER));
    }

    #[test]
    fn test_configured_cycle_limit() {
        let dir = project(Some(1));
        let report = Runtime::new(Config::load(dir.path()).unwrap()).run().unwrap();
        assert_eq!(report.stop_reason, StopReason::CycleLimit);
        assert_eq!(report.cycles_completed, 1);
    }

    #[test]
    fn test_cycle_limit_override() {
        let dir = project(Some(1));
        let runtime = Runtime::new(Config::load(dir.path()).unwrap()).with_max_cycles(Some(2));
        let report = runtime.run().unwrap();
        assert_eq!(report.cycles_completed, 2);

        let runtime = Runtime::new(Config::load(dir.path()).unwrap()).with_max_cycles(None);
        assert_eq!(runtime.run().unwrap().cycles_completed, 1);
    }

    #[test]
    fn test_missing_source_fails_with_context() {
        let dir = project(None);
        std::fs::remove_file(dir.path().join("in.csv")).unwrap();
        let err = Runtime::new(Config::load(dir.path()).unwrap())
            .run()
            .unwrap_err();
        assert!(format!("{err:#}").contains("node 'Src'"), "{err:#}");
    }
}
