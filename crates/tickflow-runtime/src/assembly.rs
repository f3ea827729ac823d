//! Graph assembly from configuration
//!
//! Nodes are created in declaration order, then connectors are wired in
//! declaration order. Errors carry the name of the node or connector being
//! assembled.

use anyhow::{Context, bail};
use tickflow_core::Value;
use tickflow_core::adapters::{ConsoleSink, CsvSink, CsvSource, WriterLog};
use tickflow_core::config::{ConnectorConfig, LogTarget, NodeConfig, TargetRef};
use tickflow_core::transforms::{Functor, Functor2};
use tickflow_core::{Config, Consumer, Graph, GraphBuilder, NodeId, Producer, Target, TransferLog};

use crate::error::Result;

/// Whether adapters touch the filesystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Open sources, create sinks and logs
    Live,
    /// Check that sources exist; create nothing
    DryRun,
}

/// Build a runnable graph, opening every file the configuration names
pub fn assemble(config: &Config) -> Result<Graph> {
    build(config, Mode::Live)
}

/// Build the graph with inert adapters to check the wiring.
///
/// Source files must exist, but nothing is read and no output is created.
pub fn check(config: &Config) -> Result<Graph> {
    build(config, Mode::DryRun)
}

fn build(config: &Config, mode: Mode) -> Result<Graph> {
    let pipeline = &config.pipeline;
    let mut builder = GraphBuilder::new();

    for node in &pipeline.nodes {
        add_node(&mut builder, config, node, mode)
            .with_context(|| format!("Failed to create node '{}'", node.name()))?;
    }

    for connector in &pipeline.connectors {
        add_connector(&mut builder, config, connector, mode)
            .with_context(|| format!("Failed to wire connector '{}'", connector.name))?;
    }

    let graph = builder
        .build(pipeline.order)
        .with_context(|| format!("Invalid pipeline '{}'", pipeline.name))?;
    tracing::debug!(
        pipeline = %pipeline.name,
        order = ?graph.execution_order(),
        "assembled graph"
    );
    Ok(graph)
}

fn add_node(
    builder: &mut GraphBuilder,
    config: &Config,
    node: &NodeConfig,
    mode: Mode,
) -> Result<NodeId> {
    let id = match node {
        NodeConfig::CsvSource {
            name,
            path,
            column,
            delimiter,
        } => {
            let path = config.input_path(path);
            match mode {
                Mode::Live => {
                    let source = CsvSource::open_with_delimiter(&path, *column, *delimiter as u8)
                        .with_context(|| format!("Failed to open {}", path.display()))?;
                    builder.source(name, source)?
                }
                Mode::DryRun => {
                    if !path.is_file() {
                        bail!("Source file not found: {}", path.display());
                    }
                    builder.source(name, Idle)?
                }
            }
        }
        NodeConfig::CsvSink { name, path } => match mode {
            Mode::Live => {
                let path = config.output_path(path);
                let sink = CsvSink::create(&path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                builder.sink(name, sink)?
            }
            Mode::DryRun => builder.sink(name, Discard)?,
        },
        NodeConfig::ConsoleSink { name } => match mode {
            Mode::Live => builder.sink(name, ConsoleSink::new(name))?,
            Mode::DryRun => builder.sink(name, Discard)?,
        },
        NodeConfig::Transform { name, functor } => builder.transform(name, functor.build())?,
        NodeConfig::Stateful {
            name,
            seed,
            functor,
        } => match functor.build() {
            Functor::Binary(f) => {
                builder.stateful(name, *seed, move |prev: Value, x: Value| f.calc(prev, x))?
            }
            other => bail!(
                "Stateful nodes need a two-input functor, '{}' takes {}",
                functor.kind(),
                other.arity()
            ),
        },
    };
    Ok(id)
}

fn add_connector(
    builder: &mut GraphBuilder,
    config: &Config,
    connector: &ConnectorConfig,
    mode: Mode,
) -> Result<()> {
    let producer = lookup(builder, &connector.from)?;
    let targets = connector
        .to
        .iter()
        .map(|reference| resolve_target(builder, reference))
        .collect::<Result<Vec<_>>>()?;

    let log: Option<Box<dyn TransferLog>> = match (config.log_target(connector), mode) {
        (None, _) | (Some(_), Mode::DryRun) => None,
        (Some(LogTarget::Stdout), Mode::Live) => Some(Box::new(WriterLog::stdout())),
        (Some(LogTarget::File(path)), Mode::Live) => Some(Box::new(
            WriterLog::create(&path)
                .with_context(|| format!("Failed to create log {}", path.display()))?,
        )),
    };

    builder.connect(&connector.name, producer, targets, log)?;
    Ok(())
}

fn lookup(builder: &GraphBuilder, name: &str) -> Result<NodeId> {
    builder
        .node_id(name)
        .ok_or_else(|| tickflow_core::Error::UnknownNode {
            name: name.to_string(),
        })
        .map_err(Into::into)
}

fn resolve_target(builder: &GraphBuilder, reference: &str) -> Result<Target> {
    let target = TargetRef::parse(reference)?;
    let node = lookup(builder, &target.node)?;
    Ok(match target.port {
        Some(index) => node.port(index),
        None => node.input(),
    })
}

/// Dry-run source: always exhausted
struct Idle;

impl Producer for Idle {
    fn get(&mut self) -> tickflow_core::Result<Value> {
        Ok(Value::NAN)
    }

    fn is_eof(&self) -> bool {
        true
    }
}

/// Dry-run sink
struct Discard;

impl Consumer for Discard {
    fn put(&mut self, _value: Value) -> tickflow_core::Result<()> {
        Ok(())
    }
}
