//! Error types for tickflow-core

use thiserror::Error;

/// Result type alias for tickflow-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tickflow-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be found
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// Failed to parse YAML configuration
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Invalid configuration value
    #[error("invalid configuration: {message}")]
    ConfigInvalid {
        /// Description of what's invalid
        message: String,
    },

    /// Node name is empty or contains a reserved character
    #[error("invalid node name '{name}': {message}")]
    InvalidNodeName {
        /// The rejected name
        name: String,
        /// Why it was rejected
        message: String,
    },

    /// Two nodes share a name
    #[error("duplicate node name '{name}'")]
    DuplicateNode {
        /// The repeated name
        name: String,
    },

    /// Two connectors share a name
    #[error("duplicate connector name '{name}'")]
    DuplicateConnector {
        /// The repeated name
        name: String,
    },

    /// A referenced node does not exist
    #[error("unknown node '{name}'")]
    UnknownNode {
        /// The name that was looked up
        name: String,
    },

    /// A connector was asked to pull from a node that cannot produce
    #[error("node '{node}' cannot produce values")]
    NotAProducer {
        /// Name of the node
        node: String,
    },

    /// A connector was asked to deliver into a node or port that cannot consume
    #[error("'{target}' cannot consume values: {message}")]
    NotAConsumer {
        /// Name of the node or port
        target: String,
        /// Why it cannot consume
        message: String,
    },

    /// Port index beyond the transform's arity
    #[error("node '{node}' has {arity} input port(s), port {port} does not exist")]
    PortOutOfRange {
        /// Name of the transform
        node: String,
        /// 1-based port number requested
        port: usize,
        /// Number of ports the transform declares
        arity: usize,
    },

    /// Connector declared with no consumers
    #[error("connector '{connector}' has no targets")]
    NoTargets {
        /// Name of the connector
        connector: String,
    },

    /// A producer is already driven by another connector
    #[error("producer '{node}' is already connected by '{connector}'")]
    ProducerAlreadyConnected {
        /// Name of the producing node
        node: String,
        /// Connector that already pulls from it
        connector: String,
    },

    /// An input is already fed by another connector
    #[error("input '{input}' is already fed by connector '{connector}'")]
    InputAlreadyBound {
        /// Port or node name
        input: String,
        /// Connector that already feeds it
        connector: String,
    },

    /// An input is never fed by any connector
    #[error("input '{input}' is not fed by any connector")]
    UnboundInput {
        /// Port or node name
        input: String,
    },

    /// The connector dependency graph contains a cycle
    #[error("dependency cycle between connectors: {}", connectors.join(" -> "))]
    DependencyCycle {
        /// Connectors taking part in the cycle
        connectors: Vec<String>,
    },

    /// A declared execution order runs a connector before one it depends on
    #[error("connector '{connector}' is declared before '{depends_on}', which it depends on")]
    OrderViolation {
        /// Connector declared too early
        connector: String,
        /// Connector that must run first
        depends_on: String,
    },

    /// A record could not be decoded into a value
    #[error("malformed record in '{source_name}' at line {line}: {message}")]
    MalformedRecord {
        /// Name or path of the record stream
        source_name: String,
        /// 1-based line number of the record
        line: u64,
        /// What was wrong with it
        message: String,
    },

    /// A value was requested from a source that has no records left
    #[error("source '{source_name}' is exhausted")]
    SourceExhausted {
        /// Name or path of the record stream
        source_name: String,
    },

    /// A fault raised while a connector was transferring a value
    #[error("connector '{connector}' failed on cycle {cycle}: {source}")]
    ConnectorFailed {
        /// Name of the connector
        connector: String,
        /// Cycle on which it failed
        cycle: u64,
        /// Underlying fault
        #[source]
        source: Box<Error>,
    },

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
