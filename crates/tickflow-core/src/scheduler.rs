//! The cycle loop
//!
//! The scheduler drives a [`Graph`] one cycle at a time. Each cycle runs
//! every connector once in the graph's fixed execution order. As soon as any
//! connector finds its producer exhausted the whole run stops: the rest of
//! that cycle is skipped and no further cycle starts.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::Graph;

/// Scheduler lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// More cycles may run
    Running,
    /// The run is over; terminal
    Stopped,
}

/// Why a run stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StopReason {
    /// A connector's producer ran out of values
    Exhausted {
        /// The connector that observed exhaustion
        connector: String,
    },
    /// The configured cycle limit was reached
    CycleLimit,
}

/// Result of a single cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Every connector transferred a value
    Completed,
    /// The run stopped during or before this cycle
    Stopped(StopReason),
}

/// Number of values a connector delivered during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorTransfers {
    /// Connector name
    pub connector: String,
    /// Values delivered
    pub transfers: u64,
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Cycles in which every connector transferred a value
    pub cycles_completed: u64,
    /// Last cycle that ran, in full or in part; `None` if the run stopped
    /// before cycle 0
    pub stopped_at_cycle: Option<u64>,
    /// Why the run stopped
    pub stop_reason: StopReason,
    /// Per-connector transfer counts, in execution order
    pub connectors: Vec<ConnectorTransfers>,
}

/// Drives a graph cycle by cycle
#[derive(Debug)]
pub struct Scheduler {
    graph: Graph,
    cycle: u64,
    completed: u64,
    state: SchedulerState,
    max_cycles: Option<u64>,
    stop_reason: Option<StopReason>,
}

impl Scheduler {
    /// Create a scheduler starting at cycle 0
    pub fn new(graph: Graph) -> Self {
        Self {
            graph,
            cycle: 0,
            completed: 0,
            state: SchedulerState::Running,
            max_cycles: None,
            stop_reason: None,
        }
    }

    /// Stop after `max_cycles` complete cycles even if data remains
    pub fn with_max_cycles(mut self, max_cycles: Option<u64>) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    /// The next cycle number
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Current lifecycle state
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// The graph being driven
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Give the graph back
    pub fn into_graph(self) -> Graph {
        self.graph
    }

    /// Run one cycle.
    ///
    /// The cycle counter advances after every pass, including the one that
    /// stops the run. Faults stop the run and are returned as errors.
    pub fn step(&mut self) -> Result<CycleOutcome> {
        if let Some(reason) = &self.stop_reason {
            return Ok(CycleOutcome::Stopped(reason.clone()));
        }
        if self.max_cycles.is_some_and(|max| self.completed >= max) {
            tracing::info!(cycles = self.completed, "cycle limit reached");
            return Ok(self.stop(StopReason::CycleLimit));
        }

        let cycle = self.cycle;
        tracing::debug!(cycle, "running cycle");
        let result = self.graph.run_cycle(cycle);
        self.cycle += 1;

        match result {
            Ok(None) => {
                self.completed += 1;
                Ok(CycleOutcome::Completed)
            }
            Ok(Some(connector)) => {
                tracing::info!(cycle, connector = %connector, "producer exhausted, halting run");
                Ok(self.stop(StopReason::Exhausted { connector }))
            }
            Err(e) => {
                self.state = SchedulerState::Stopped;
                Err(e)
            }
        }
    }

    fn stop(&mut self, reason: StopReason) -> CycleOutcome {
        self.state = SchedulerState::Stopped;
        self.stop_reason = Some(reason.clone());
        CycleOutcome::Stopped(reason)
    }

    /// Run cycles until the run stops, then flush sinks and logs
    pub fn run(&mut self) -> Result<RunReport> {
        let outcome = loop {
            match self.step() {
                Ok(CycleOutcome::Completed) => continue,
                Ok(CycleOutcome::Stopped(reason)) => break Ok(reason),
                Err(e) => break Err(e),
            }
        };
        let flushed = self.graph.flush();
        let reason = outcome?;
        flushed?;

        Ok(RunReport {
            cycles_completed: self.completed,
            stopped_at_cycle: self.cycle.checked_sub(1),
            stop_reason: reason,
            connectors: self
                .graph
                .connectors()
                .map(|c| ConnectorTransfers {
                    connector: c.name().to_string(),
                    transfers: c.transfers(),
                })
                .collect(),
        })
    }
}
