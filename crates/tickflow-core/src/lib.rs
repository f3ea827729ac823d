//! Tickflow Core Library
//!
//! This crate provides the core of the Tickflow dataflow engine:
//! - Nodes, ports and the capability traits connectors drive
//! - Transform functors
//! - Connectors and graph assembly
//! - The cycle scheduler
//! - CSV and console adapters
//! - Pipeline configuration parsing and validation
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Source    │────▶│  Connector  │────▶│  Transform  │────▶│    Sink     │
//! │  (CSV col)  │     │ (fan-out)   │     │  (ports)    │     │ (CSV/stdout)│
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! Every cycle the [`Scheduler`] runs each connector once in a fixed order.
//! A connector pulls one value from its producer and pushes it to all of its
//! targets. The first connector to find its producer exhausted ends the run.
//!
//! # Example
//!
//! ```rust,ignore
//! use tickflow_core::{ExecutionOrder, Functor, GraphBuilder, Scheduler};
//! use tickflow_core::adapters::{CsvSink, CsvSource};
//! use tickflow_core::transforms::AffineScale;
//!
//! let mut b = GraphBuilder::new();
//! let src = b.source("Sensor", CsvSource::open("sensor.csv", 1)?)?;
//! let scale = b.transform("Scale", Functor::unary(AffineScale::new(2.0, 1.0)))?;
//! let out = b.sink("Out", CsvSink::create("out.csv")?)?;
//! b.connect("c1", src, [scale.port(0)], None)?;
//! b.connect("c2", scale, [out.input()], None)?;
//!
//! let report = Scheduler::new(b.build(ExecutionOrder::Derived)?).run()?;
//! println!("{} cycles", report.cycles_completed);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod config;
pub mod connector;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod node;
pub mod port;
pub mod scheduler;
pub mod transforms;

/// The scalar carried through a graph
pub type Value = f64;

pub use config::{Config, PipelineConfig};
pub use connector::{Connector, ConnectorId, ConnectorState, Transfer, TransferLog};
pub use error::{Error, Result};
pub use graph::{ExecutionOrder, Graph, GraphBuilder};
pub use node::{Consumer, Node, NodeId, NodeKind, Producer, Target};
pub use port::Port;
pub use scheduler::{RunReport, Scheduler, StopReason};
pub use transforms::{Functor, FunctorConfig};
