//! Connectors
//!
//! A connector is the edge executor of the graph: it binds one producer to
//! one or more consumer targets and moves exactly one value per cycle. It is
//! a relay, never a buffer.
//!
//! ```text
//!                     ┌──▶ target 1
//!  producer ──get()──▶│
//!                     └──▶ target 2      (same value, declared order)
//!                │
//!                ▼
//!          transfer log  "cycle,value"
//! ```

use crate::error::{Error, Result};
use crate::node::{Node, NodeId, Target};
use crate::Value;

/// Per-connector record of transferred values
pub trait TransferLog {
    /// Record `value` as transferred on `cycle`
    fn record(&mut self, cycle: u64, value: Value) -> Result<()>;

    /// Flush any buffered records
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Index of a connector within its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectorId(pub(crate) usize);

impl ConnectorId {
    /// Position in declaration order
    pub fn index(self) -> usize {
        self.0
    }
}

/// Connector lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectorState {
    /// The producer still has values
    #[default]
    Active,
    /// The producer is exhausted; terminal
    Halted,
}

/// Outcome of running a connector for one cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transfer {
    /// A value was pulled and delivered to every target
    Delivered(Value),
    /// The producer is exhausted; nothing was moved
    Exhausted,
}

/// An edge from one producer to one or more consumers
pub struct Connector {
    name: String,
    producer: NodeId,
    targets: Vec<Target>,
    log: Option<Box<dyn TransferLog>>,
    state: ConnectorState,
    transfers: u64,
}

impl Connector {
    pub(crate) fn new(
        name: String,
        producer: NodeId,
        targets: Vec<Target>,
        log: Option<Box<dyn TransferLog>>,
    ) -> Self {
        Self {
            name,
            producer,
            targets,
            log,
            state: ConnectorState::Active,
            transfers: 0,
        }
    }

    /// Get the connector name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The node this connector pulls from
    pub fn producer(&self) -> NodeId {
        self.producer
    }

    /// Delivery targets in fan-out order
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectorState {
        self.state
    }

    /// Number of values delivered so far
    pub fn transfers(&self) -> u64 {
        self.transfers
    }

    /// Move one value from the producer to every target.
    ///
    /// Once the producer reports exhaustion the connector halts and every
    /// later call returns [`Transfer::Exhausted`] without touching the graph.
    pub fn run(&mut self, nodes: &mut [Node], cycle: u64) -> Result<Transfer> {
        self.transfer(nodes, cycle)
            .map_err(|source| Error::ConnectorFailed {
                connector: self.name.clone(),
                cycle,
                source: Box::new(source),
            })
    }

    fn transfer(&mut self, nodes: &mut [Node], cycle: u64) -> Result<Transfer> {
        if self.state == ConnectorState::Halted {
            return Ok(Transfer::Exhausted);
        }

        let producer_node = node_mut(nodes, self.producer)?;
        let producer_name = producer_node.name().to_string();
        let producer = producer_node
            .producer()
            .ok_or_else(|| Error::NotAProducer {
                node: producer_name.clone(),
            })?;

        if producer.is_eof() {
            tracing::debug!(
                connector = %self.name,
                producer = %producer_name,
                cycle,
                "producer exhausted"
            );
            self.state = ConnectorState::Halted;
            return Ok(Transfer::Exhausted);
        }

        let value = producer.get()?;
        tracing::trace!(connector = %self.name, cycle, value, "transfer");

        if let Some(log) = self.log.as_mut() {
            log.record(cycle, value)?;
        }

        for target in &self.targets {
            node_mut(nodes, target.node())?.consumer(target)?.put(value)?;
        }

        self.transfers += 1;
        Ok(Transfer::Delivered(value))
    }

    /// Flush the transfer log
    pub fn flush(&mut self) -> Result<()> {
        match self.log.as_mut() {
            Some(log) => log.flush(),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("name", &self.name)
            .field("producer", &self.producer)
            .field("targets", &self.targets)
            .field("logged", &self.log.is_some())
            .field("state", &self.state)
            .finish()
    }
}

fn node_mut(nodes: &mut [Node], id: NodeId) -> Result<&mut Node> {
    nodes.get_mut(id.index()).ok_or_else(|| Error::UnknownNode {
        name: format!("#{}", id.index()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Consumer, NodeKind, Producer, StatefulTransform, Transform};
    use crate::transforms::{Difference, Doubler, Functor};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Yields the queued values, counting every `get`
    struct Counting {
        values: Vec<Value>,
        gets: Rc<RefCell<usize>>,
    }

    impl Producer for Counting {
        fn get(&mut self) -> Result<Value> {
            *self.gets.borrow_mut() += 1;
            Ok(self.values.remove(0))
        }

        fn is_eof(&self) -> bool {
            self.values.is_empty()
        }
    }

    struct Collect(Rc<RefCell<Vec<Value>>>);

    impl Consumer for Collect {
        fn put(&mut self, value: Value) -> Result<()> {
            self.0.borrow_mut().push(value);
            Ok(())
        }
    }

    struct Recorded(Rc<RefCell<Vec<(u64, Value)>>>);

    impl TransferLog for Recorded {
        fn record(&mut self, cycle: u64, value: Value) -> Result<()> {
            self.0.borrow_mut().push((cycle, value));
            Ok(())
        }
    }

    struct Broken;

    impl Producer for Broken {
        fn get(&mut self) -> Result<Value> {
            Err(Error::MalformedRecord {
                source_name: "broken".to_string(),
                line: 1,
                message: "not a number".to_string(),
            })
        }

        fn is_eof(&self) -> bool {
            false
        }
    }

    fn counting(values: Vec<Value>) -> (Node, Rc<RefCell<usize>>) {
        let gets = Rc::new(RefCell::new(0));
        let node = Node::new(
            "P",
            NodeKind::Source(Box::new(Counting {
                values,
                gets: gets.clone(),
            })),
        );
        (node, gets)
    }

    fn collecting(name: &str) -> (Node, Rc<RefCell<Vec<Value>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let node = Node::new(name, NodeKind::Sink(Box::new(Collect(seen.clone()))));
        (node, seen)
    }

    #[test]
    fn test_fan_out_broadcasts_single_get() {
        let (producer, gets) = counting(vec![7.5]);
        let (c1, seen1) = collecting("C1");
        let (c2, seen2) = collecting("C2");
        let mut nodes = vec![producer, c1, c2];

        let mut connector = Connector::new(
            "fan".to_string(),
            NodeId(0),
            vec![NodeId(1).input(), NodeId(2).input()],
            None,
        );

        assert_eq!(connector.run(&mut nodes, 0).unwrap(), Transfer::Delivered(7.5));
        assert_eq!(*gets.borrow(), 1);
        assert_eq!(*seen1.borrow(), vec![7.5]);
        assert_eq!(*seen2.borrow(), vec![7.5]);
        assert_eq!(connector.transfers(), 1);
    }

    #[test]
    fn test_logs_cycle_and_value() {
        let (producer, _) = counting(vec![1.0, 2.0]);
        let (sink, _) = collecting("S");
        let mut nodes = vec![producer, sink];
        let records = Rc::new(RefCell::new(Vec::new()));

        let mut connector = Connector::new(
            "logged".to_string(),
            NodeId(0),
            vec![NodeId(1).input()],
            Some(Box::new(Recorded(records.clone()))),
        );

        connector.run(&mut nodes, 4).unwrap();
        connector.run(&mut nodes, 5).unwrap();
        assert_eq!(*records.borrow(), vec![(4, 1.0), (5, 2.0)]);
    }

    #[test]
    fn test_exhausted_producer_halts_without_side_effects() {
        let (producer, gets) = counting(vec![]);
        let (sink, seen) = collecting("S");
        let mut nodes = vec![producer, sink];
        let records = Rc::new(RefCell::new(Vec::new()));

        let mut connector = Connector::new(
            "c".to_string(),
            NodeId(0),
            vec![NodeId(1).input()],
            Some(Box::new(Recorded(records.clone()))),
        );

        assert_eq!(connector.run(&mut nodes, 0).unwrap(), Transfer::Exhausted);
        assert_eq!(connector.state(), ConnectorState::Halted);
        assert_eq!(*gets.borrow(), 0);
        assert!(seen.borrow().is_empty());
        assert!(records.borrow().is_empty());
    }

    #[test]
    fn test_halted_is_terminal() {
        let (producer, gets) = counting(vec![]);
        let (sink, _) = collecting("S");
        let mut nodes = vec![producer, sink];
        let mut connector =
            Connector::new("c".to_string(), NodeId(0), vec![NodeId(1).input()], None);

        assert_eq!(connector.run(&mut nodes, 0).unwrap(), Transfer::Exhausted);
        assert_eq!(connector.run(&mut nodes, 1).unwrap(), Transfer::Exhausted);
        assert_eq!(*gets.borrow(), 0);
    }

    #[test]
    fn test_delivers_into_ports_and_stateful_nodes() {
        let (producer, _) = counting(vec![3.0]);
        let doubler = Node::new(
            "Double",
            NodeKind::Transform(Transform::new("Double", Functor::unary(Doubler))),
        );
        let stateful = Node::new(
            "Delta",
            NodeKind::Stateful(StatefulTransform::new(1.0, Difference)),
        );
        let mut nodes = vec![producer, doubler, stateful];

        let mut connector = Connector::new(
            "c".to_string(),
            NodeId(0),
            vec![NodeId(1).port(0), NodeId(2).input()],
            None,
        );
        connector.run(&mut nodes, 0).unwrap();

        assert_eq!(nodes[1].producer().unwrap().get().unwrap(), 6.0);
        assert_eq!(nodes[2].producer().unwrap().get().unwrap(), 2.0);
    }

    #[test]
    fn test_fault_is_wrapped_with_connector_and_cycle() {
        let (sink, seen) = collecting("S");
        let mut nodes = vec![Node::new("Bad", NodeKind::Source(Box::new(Broken))), sink];
        let mut connector =
            Connector::new("c7".to_string(), NodeId(0), vec![NodeId(1).input()], None);

        let err = connector.run(&mut nodes, 12).unwrap_err();
        match &err {
            Error::ConnectorFailed {
                connector, cycle, ..
            } => {
                assert_eq!(connector, "c7");
                assert_eq!(*cycle, 12);
            }
            other => panic!("Expected ConnectorFailed, got {other:?}"),
        }
        assert!(err.to_string().contains("malformed record"));
        assert!(seen.borrow().is_empty());
    }
}
