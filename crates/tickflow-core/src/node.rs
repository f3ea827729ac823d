//! Nodes and their capabilities
//!
//! Every node in a graph is named and belongs to one of a closed set of
//! kinds. What a connector may do with a node is expressed by two
//! capability traits:
//!
//! - [`Producer`] - yields one value per `get` and reports exhaustion
//! - [`Consumer`] - accepts pushed values
//!
//! Sources are producers, sinks are consumers, transforms produce from the
//! values sitting in their input ports, and stateful transforms are both.

use crate::error::{Error, Result};
use crate::port::Port;
use crate::transforms::{Functor, Functor2};
use crate::Value;

/// Something a connector can pull values from
pub trait Producer {
    /// Produce the next value
    fn get(&mut self) -> Result<Value>;

    /// Whether the producer has no further values
    fn is_eof(&self) -> bool;
}

/// Something a connector can push values into
pub trait Consumer {
    /// Accept a value
    fn put(&mut self, value: Value) -> Result<()>;

    /// Flush any buffered output
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Index of a node in its graph's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Position in the arena
    pub fn index(self) -> usize {
        self.0
    }

    /// Target the zero-based input port `index` of this transform
    pub fn port(self, index: usize) -> Target {
        Target::Port { node: self, index }
    }

    /// Target this node itself (a sink or stateful transform)
    pub fn input(self) -> Target {
        Target::Node(self)
    }
}

/// Where a connector delivers its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// A transform's input port
    Port {
        /// The transform
        node: NodeId,
        /// Zero-based port index
        index: usize,
    },
    /// A consumer node
    Node(NodeId),
}

impl Target {
    /// The node that owns the target
    pub fn node(&self) -> NodeId {
        match *self {
            Self::Port { node, .. } | Self::Node(node) => node,
        }
    }
}

/// A transform of one to three input ports
#[derive(Debug)]
pub struct Transform {
    functor: Functor,
    ports: Vec<Port>,
}

impl Transform {
    /// Create a transform named `name`, with one port per functor input
    pub fn new(name: &str, functor: Functor) -> Self {
        let ports = (1..=functor.arity())
            .map(|n| Port::new(format!("{name} Port {n}")))
            .collect();
        Self { functor, ports }
    }

    /// Number of input ports
    pub fn arity(&self) -> usize {
        self.ports.len()
    }

    /// Input ports in order
    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Mutable access to a port
    pub fn port_mut(&mut self, index: usize) -> Option<&mut Port> {
        self.ports.get_mut(index)
    }
}

impl Producer for Transform {
    fn get(&mut self) -> Result<Value> {
        let mut inputs = [0.0; 3];
        for (slot, port) in inputs.iter_mut().zip(&self.ports) {
            *slot = port.value();
        }
        Ok(self.functor.apply(&inputs[..self.ports.len()]))
    }

    fn is_eof(&self) -> bool {
        false
    }
}

/// A transform that combines each pushed value with the one before it.
///
/// On `put(x)` the output becomes `f(previous, x)` and `x` becomes the new
/// previous value. `get` returns that cached output, so the node reports
/// `f(x[n-1], x[n])` for the cycle in which `x[n]` arrived.
pub struct StatefulTransform {
    functor: Box<dyn Functor2>,
    previous: Value,
    output: Value,
}

impl StatefulTransform {
    /// Create a stateful transform whose first `put` is paired with `seed`
    pub fn new(seed: Value, functor: impl Functor2 + 'static) -> Self {
        Self {
            functor: Box::new(functor),
            previous: seed,
            output: Value::NAN,
        }
    }

    /// The most recently pushed input (or the seed)
    pub fn previous(&self) -> Value {
        self.previous
    }
}

impl std::fmt::Debug for StatefulTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatefulTransform")
            .field("previous", &self.previous)
            .field("output", &self.output)
            .finish()
    }
}

impl Consumer for StatefulTransform {
    fn put(&mut self, value: Value) -> Result<()> {
        self.output = self.functor.calc(self.previous, value);
        self.previous = value;
        Ok(())
    }
}

impl Producer for StatefulTransform {
    fn get(&mut self) -> Result<Value> {
        Ok(self.output)
    }

    fn is_eof(&self) -> bool {
        false
    }
}

/// The closed set of node kinds
pub enum NodeKind {
    /// Produces values from an external record stream
    Source(Box<dyn Producer>),
    /// Consumes values with a side effect
    Sink(Box<dyn Consumer>),
    /// Computes from its input ports
    Transform(Transform),
    /// Combines consecutive pushed values
    Stateful(StatefulTransform),
}

impl NodeKind {
    /// Short label for diagnostics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Source(_) => "source",
            Self::Sink(_) => "sink",
            Self::Transform(_) => "transform",
            Self::Stateful(_) => "stateful",
        }
    }
}

/// A named node
pub struct Node {
    name: String,
    kind: NodeKind,
}

impl Node {
    /// Create a node
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Get the node name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the node kind
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Whether a connector may pull from this node
    pub fn is_producer(&self) -> bool {
        !matches!(self.kind, NodeKind::Sink(_))
    }

    /// The producer capability, if the node has one
    pub fn producer(&mut self) -> Option<&mut dyn Producer> {
        match &mut self.kind {
            NodeKind::Source(source) => Some(source.as_mut()),
            NodeKind::Transform(transform) => Some(transform),
            NodeKind::Stateful(stateful) => Some(stateful),
            NodeKind::Sink(_) => None,
        }
    }

    /// Resolve the consumer a target on this node refers to
    pub fn consumer(&mut self, target: &Target) -> Result<&mut dyn Consumer> {
        match (&mut self.kind, *target) {
            (NodeKind::Transform(transform), Target::Port { index, .. }) => {
                let arity = transform.arity();
                match transform.port_mut(index) {
                    Some(port) => Ok(port),
                    None => Err(Error::PortOutOfRange {
                        node: self.name.clone(),
                        port: index + 1,
                        arity,
                    }),
                }
            }
            (NodeKind::Sink(sink), Target::Node(_)) => Ok(sink.as_mut()),
            (NodeKind::Stateful(stateful), Target::Node(_)) => Ok(stateful),
            (NodeKind::Transform(_), Target::Node(_)) => Err(Error::NotAConsumer {
                target: self.name.clone(),
                message: "transforms are fed through their ports".to_string(),
            }),
            (kind, Target::Port { .. }) => Err(Error::NotAConsumer {
                target: self.name.clone(),
                message: format!("a {} has no input ports", kind.label()),
            }),
            (NodeKind::Source(_), Target::Node(_)) => Err(Error::NotAConsumer {
                target: self.name.clone(),
                message: "sources only produce".to_string(),
            }),
        }
    }

    /// Flush the node's side effects, if it has any
    pub fn flush(&mut self) -> Result<()> {
        match &mut self.kind {
            NodeKind::Sink(sink) => sink.flush(),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("kind", &self.kind.label())
            .finish()
    }
}
