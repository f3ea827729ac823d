//! Graph assembly
//!
//! A [`GraphBuilder`] collects nodes and connectors, checks the wiring, and
//! fixes the order in which connectors run each cycle. The resulting
//! [`Graph`] owns every node in one arena; connectors address nodes by
//! [`NodeId`].
//!
//! Connector `b` depends on connector `a` when `a` delivers into a node that
//! `b` pulls from. Every cycle must run `a` before `b`, so that a multi-stage
//! pipeline settles within one pass.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::connector::{Connector, ConnectorId, Transfer, TransferLog};
use crate::error::{Error, Result};
use crate::node::{Consumer, Node, NodeId, NodeKind, Producer, StatefulTransform, Target, Transform};
use crate::transforms::{Functor, Functor2};
use crate::Value;

/// How the per-cycle connector order is chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionOrder {
    /// Topologically sort the connectors, keeping declaration order where
    /// dependencies allow
    #[default]
    Derived,
    /// Run connectors exactly as declared, rejecting orders that violate a
    /// dependency
    Declared,
}

/// Incrementally assembles a [`Graph`]
#[derive(Default)]
pub struct GraphBuilder {
    nodes: Vec<Node>,
    names: HashMap<String, NodeId>,
    connectors: Vec<Connector>,
    connector_names: HashMap<String, ConnectorId>,
    /// producer node -> connector pulling from it
    pulled_by: HashMap<NodeId, ConnectorId>,
    /// input -> connector feeding it
    fed_by: HashMap<Target, ConnectorId>,
}

impl GraphBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source node
    pub fn source(
        &mut self,
        name: impl Into<String>,
        source: impl Producer + 'static,
    ) -> Result<NodeId> {
        self.add_node(name.into(), |_| NodeKind::Source(Box::new(source)))
    }

    /// Add a sink node
    pub fn sink(&mut self, name: impl Into<String>, sink: impl Consumer + 'static) -> Result<NodeId> {
        self.add_node(name.into(), |_| NodeKind::Sink(Box::new(sink)))
    }

    /// Add a transform with one input port per functor input
    pub fn transform(&mut self, name: impl Into<String>, functor: Functor) -> Result<NodeId> {
        self.add_node(name.into(), |name| {
            NodeKind::Transform(Transform::new(name, functor))
        })
    }

    /// Add a stateful transform seeded with `seed`
    pub fn stateful(
        &mut self,
        name: impl Into<String>,
        seed: Value,
        functor: impl Functor2 + 'static,
    ) -> Result<NodeId> {
        self.add_node(name.into(), |_| {
            NodeKind::Stateful(StatefulTransform::new(seed, functor))
        })
    }

    fn add_node(&mut self, name: String, kind: impl FnOnce(&str) -> NodeKind) -> Result<NodeId> {
        if name.trim().is_empty() {
            return Err(Error::InvalidNodeName {
                name,
                message: "name must not be empty".to_string(),
            });
        }
        if name.contains('.') {
            return Err(Error::InvalidNodeName {
                name,
                message: "'.' is reserved for port references".to_string(),
            });
        }
        if self.names.contains_key(&name) {
            return Err(Error::DuplicateNode { name });
        }

        let id = NodeId(self.nodes.len());
        let node = Node::new(name.clone(), kind(&name));
        tracing::debug!(node = %name, kind = node.kind().label(), "added node");
        self.nodes.push(node);
        self.names.insert(name, id);
        Ok(id)
    }

    /// Look up a node by name
    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    /// Bind `producer` to `targets`, optionally recording each transfer
    pub fn connect(
        &mut self,
        name: impl Into<String>,
        producer: NodeId,
        targets: impl IntoIterator<Item = Target>,
        log: Option<Box<dyn TransferLog>>,
    ) -> Result<ConnectorId> {
        let name = name.into();
        let targets: Vec<Target> = targets.into_iter().collect();

        if self.connector_names.contains_key(&name) {
            return Err(Error::DuplicateConnector { name });
        }
        if targets.is_empty() {
            return Err(Error::NoTargets { connector: name });
        }

        let producer_node = self.node(producer)?;
        if !producer_node.is_producer() {
            return Err(Error::NotAProducer {
                node: producer_node.name().to_string(),
            });
        }
        if let Some(existing) = self.pulled_by.get(&producer) {
            return Err(Error::ProducerAlreadyConnected {
                node: producer_node.name().to_string(),
                connector: self.connectors[existing.0].name().to_string(),
            });
        }

        for (i, target) in targets.iter().enumerate() {
            self.check_target(target)?;
            let already = self
                .fed_by
                .get(target)
                .map(|c| self.connectors[c.0].name().to_string())
                .or_else(|| targets[..i].contains(target).then(|| name.clone()));
            if let Some(connector) = already {
                return Err(Error::InputAlreadyBound {
                    input: self.input_name(target),
                    connector,
                });
            }
        }

        let id = ConnectorId(self.connectors.len());
        for target in &targets {
            self.fed_by.insert(*target, id);
        }
        self.pulled_by.insert(producer, id);
        self.connector_names.insert(name.clone(), id);
        tracing::debug!(
            connector = %name,
            producer = %self.nodes[producer.0].name(),
            fan_out = targets.len(),
            "added connector"
        );
        self.connectors
            .push(Connector::new(name, producer, targets, log));
        Ok(id)
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.0).ok_or_else(|| Error::UnknownNode {
            name: format!("#{}", id.0),
        })
    }

    fn check_target(&self, target: &Target) -> Result<()> {
        let node = self.node(target.node())?;
        match (node.kind(), target) {
            (NodeKind::Transform(transform), Target::Port { index, .. }) => {
                if *index >= transform.arity() {
                    return Err(Error::PortOutOfRange {
                        node: node.name().to_string(),
                        port: index + 1,
                        arity: transform.arity(),
                    });
                }
                Ok(())
            }
            (NodeKind::Sink(_) | NodeKind::Stateful(_), Target::Node(_)) => Ok(()),
            (NodeKind::Transform(_), Target::Node(_)) => Err(Error::NotAConsumer {
                target: node.name().to_string(),
                message: "transforms are fed through their ports".to_string(),
            }),
            (NodeKind::Source(_), _) => Err(Error::NotAConsumer {
                target: node.name().to_string(),
                message: "sources only produce".to_string(),
            }),
            (kind, Target::Port { .. }) => Err(Error::NotAConsumer {
                target: node.name().to_string(),
                message: format!("a {} has no input ports", kind.label()),
            }),
        }
    }

    fn input_name(&self, target: &Target) -> String {
        target_name(&self.nodes, target)
    }

    /// Validate the wiring and fix the execution order
    pub fn build(self, order: ExecutionOrder) -> Result<Graph> {
        for (i, node) in self.nodes.iter().enumerate() {
            let id = NodeId(i);
            match node.kind() {
                NodeKind::Transform(transform) => {
                    for index in 0..transform.arity() {
                        let target = id.port(index);
                        if !self.fed_by.contains_key(&target) {
                            return Err(Error::UnboundInput {
                                input: self.input_name(&target),
                            });
                        }
                    }
                }
                NodeKind::Stateful(_) if !self.fed_by.contains_key(&id.input()) => {
                    return Err(Error::UnboundInput {
                        input: node.name().to_string(),
                    });
                }
                NodeKind::Sink(_) if !self.fed_by.contains_key(&id.input()) => {
                    tracing::warn!(node = %node.name(), "sink is not fed by any connector");
                }
                _ => {}
            }
            if node.is_producer() && !self.pulled_by.contains_key(&id) {
                tracing::warn!(node = %node.name(), "producer is not pulled by any connector");
            }
        }

        let dependencies = self.dependency_graph();
        let derived = stable_toposort(&dependencies).map_err(|cycle| Error::DependencyCycle {
            connectors: cycle
                .into_iter()
                .map(|c| self.connectors[c].name().to_string())
                .collect(),
        })?;

        let order = match order {
            ExecutionOrder::Derived => derived,
            ExecutionOrder::Declared => {
                for edge in dependencies.raw_edges() {
                    let (before, after) = (edge.source().index(), edge.target().index());
                    if before > after {
                        return Err(Error::OrderViolation {
                            connector: self.connectors[after].name().to_string(),
                            depends_on: self.connectors[before].name().to_string(),
                        });
                    }
                }
                (0..self.connectors.len()).collect()
            }
        };

        tracing::debug!(
            order = ?order
                .iter()
                .map(|&c| self.connectors[c].name())
                .collect::<Vec<_>>(),
            "execution order fixed"
        );

        Ok(Graph {
            nodes: self.nodes,
            connectors: self.connectors,
            order,
        })
    }

    /// Edge `a -> b` when connector `a` feeds the node connector `b` pulls from.
    /// Graph node `i` is connector `i`.
    fn dependency_graph(&self) -> DiGraph<(), ()> {
        let mut graph = DiGraph::with_capacity(self.connectors.len(), self.fed_by.len());
        for _ in &self.connectors {
            graph.add_node(());
        }
        for (target, feeder) in &self.fed_by {
            if let Some(puller) = self.pulled_by.get(&target.node()) {
                graph.update_edge(NodeIndex::new(feeder.0), NodeIndex::new(puller.0), ());
            }
        }
        graph
    }
}

/// Kahn's algorithm, always releasing the lowest-indexed ready connector.
///
/// On failure returns the connectors of a dependency cycle.
fn stable_toposort(graph: &DiGraph<(), ()>) -> std::result::Result<Vec<usize>, Vec<usize>> {
    let count = graph.node_count();
    let mut in_degree: Vec<usize> = graph
        .node_indices()
        .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();
    let mut ready: BTreeSet<usize> = (0..count).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(count);

    while let Some(next) = ready.pop_first() {
        order.push(next);
        for child in graph.neighbors_directed(NodeIndex::new(next), Direction::Outgoing) {
            let child = child.index();
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                ready.insert(child);
            }
        }
    }

    if order.len() == count {
        return Ok(order);
    }

    let cycle = petgraph::algo::tarjan_scc(graph)
        .into_iter()
        .find(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .map(|mut scc| {
            scc.sort();
            scc.into_iter().map(|n| n.index()).collect()
        })
        .unwrap_or_else(|| (0..count).filter(|&i| in_degree[i] > 0).collect());
    Err(cycle)
}

/// Port name for port targets, node name otherwise
fn target_name(nodes: &[Node], target: &Target) -> String {
    let Some(node) = nodes.get(target.node().0) else {
        return format!("#{}", target.node().0);
    };
    match (node.kind(), target) {
        (NodeKind::Transform(transform), Target::Port { index, .. }) => transform
            .ports()
            .get(*index)
            .map(|p| p.name().to_string())
            .unwrap_or_else(|| node.name().to_string()),
        _ => node.name().to_string(),
    }
}

/// A fully wired graph with a fixed connector order
pub struct Graph {
    nodes: Vec<Node>,
    connectors: Vec<Connector>,
    order: Vec<usize>,
}

impl Graph {
    /// All nodes in insertion order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Look up a node by name
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name() == name)
    }

    /// Connectors in execution order
    pub fn connectors(&self) -> impl Iterator<Item = &Connector> {
        self.order.iter().map(|&i| &self.connectors[i])
    }

    /// Connector names in execution order
    pub fn execution_order(&self) -> Vec<&str> {
        self.connectors().map(|c| c.name()).collect()
    }

    /// Human-readable name of a connector target
    pub fn target_name(&self, target: &Target) -> String {
        target_name(&self.nodes, target)
    }

    /// Run every connector once, in execution order, stopping at the first
    /// connector whose producer is exhausted.
    ///
    /// Returns the name of that connector, if any.
    pub(crate) fn run_cycle(&mut self, cycle: u64) -> Result<Option<String>> {
        for &i in &self.order {
            let connector = &mut self.connectors[i];
            if connector.run(&mut self.nodes, cycle)? == Transfer::Exhausted {
                return Ok(Some(connector.name().to_string()));
            }
        }
        Ok(None)
    }

    /// Flush every sink and transfer log, reporting the first failure
    pub fn flush(&mut self) -> Result<()> {
        let mut first_err = None;
        for node in &mut self.nodes {
            if let Err(e) = node.flush() {
                first_err.get_or_insert(e);
            }
        }
        for connector in &mut self.connectors {
            if let Err(e) = connector.flush() {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes)
            .field("order", &self.execution_order())
            .finish()
    }
}
