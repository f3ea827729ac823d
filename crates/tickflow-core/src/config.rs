//! Pipeline configuration
//!
//! A pipeline can be assembled entirely in code with
//! [`GraphBuilder`](crate::graph::GraphBuilder). This module describes the
//! same graph as a YAML file so the CLI can load and run it.
//!
//! # Configuration Files
//!
//! - `tickflow.yaml` - Pipeline definition: nodes, connectors, run settings
//!
//! Source paths are relative to the directory holding `tickflow.yaml`;
//! sink, log and diagnostic paths are relative to `output_dir` inside it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::graph::ExecutionOrder;
use crate::transforms::FunctorConfig;
use crate::Value;

/// Default configuration file name
pub const CONFIG_FILE: &str = "tickflow.yaml";

/// Transfer log destination meaning standard output
pub const STDOUT_LOG: &str = "stdout";

/// Root pipeline configuration from `tickflow.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// How the per-cycle connector order is chosen
    #[serde(default)]
    pub order: ExecutionOrder,

    /// Stop after this many complete cycles
    #[serde(default)]
    pub max_cycles: Option<u64>,

    /// Directory for sink files, transfer logs and diagnostics
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// File receiving timestamped start/end markers
    #[serde(default)]
    pub diagnostics: Option<String>,

    /// Node definitions
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,

    /// Connector definitions, in declaration order
    #[serde(default)]
    pub connectors: Vec<ConnectorConfig>,
}

fn default_output_dir() -> String {
    ".".to_string()
}

/// Node configuration from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeConfig {
    /// One column of a delimited file
    CsvSource {
        /// Node name
        name: String,
        /// File path, relative to the project directory
        path: String,
        /// Zero-based field index
        column: usize,
        /// Field delimiter
        #[serde(default = "default_delimiter")]
        delimiter: char,
    },

    /// `index, value` lines written to a file
    CsvSink {
        /// Node name
        name: String,
        /// File path, relative to the output directory
        path: String,
    },

    /// `<name> received <value>` lines on standard output
    ConsoleSink {
        /// Node name
        name: String,
    },

    /// Applies a functor to its input ports
    Transform {
        /// Node name
        name: String,
        /// Functor; its arity sets the number of ports
        functor: FunctorConfig,
    },

    /// Combines each pushed value with the previous one
    Stateful {
        /// Node name
        name: String,
        /// Previous value paired with the first input
        seed: Value,
        /// Two-input functor
        functor: FunctorConfig,
    },
}

fn default_delimiter() -> char {
    ','
}

impl NodeConfig {
    /// Get the node name
    pub fn name(&self) -> &str {
        match self {
            Self::CsvSource { name, .. }
            | Self::CsvSink { name, .. }
            | Self::ConsoleSink { name }
            | Self::Transform { name, .. }
            | Self::Stateful { name, .. } => name,
        }
    }
}

/// Connector configuration from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Connector name
    pub name: String,

    /// Producing node
    pub from: String,

    /// Targets: `Node.N` for port N (1-based) of a transform, `Node` for a
    /// sink or stateful node
    pub to: Vec<String>,

    /// Transfer log: `stdout`, or a file path relative to the output directory
    #[serde(default)]
    pub log: Option<String>,
}

/// A parsed connector target reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRef {
    /// Node name
    pub node: String,
    /// Zero-based port index, for transform ports
    pub port: Option<usize>,
}

impl TargetRef {
    /// Parse `Node` or `Node.N`
    pub fn parse(reference: &str) -> Result<Self> {
        let Some((node, port)) = reference.split_once('.') else {
            return Ok(Self {
                node: reference.to_string(),
                port: None,
            });
        };
        let port: usize = port.parse().map_err(|_| Error::ConfigInvalid {
            message: format!("target '{reference}' must be 'node' or 'node.port'"),
        })?;
        if port == 0 {
            return Err(Error::ConfigInvalid {
                message: format!("target '{reference}': ports are numbered from 1"),
            });
        }
        Ok(Self {
            node: node.to_string(),
            port: Some(port - 1),
        })
    }
}

/// Where a connector's transfer log goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Standard output
    Stdout,
    /// A file
    File(PathBuf),
}

/// Main configuration container
#[derive(Debug, Clone)]
pub struct Config {
    /// Pipeline configuration
    pub pipeline: PipelineConfig,

    /// Directory holding the configuration file
    pub base_path: PathBuf,
}

impl Config {
    /// Load configuration from a directory or a YAML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the project directory or the `tickflow.yaml` file
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let config = Config::load("./my-pipeline")?;
    /// println!("Pipeline: {}", config.pipeline.name);
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let (config_path, base_path) = if path.is_dir() {
            (path.join(CONFIG_FILE), path.to_path_buf())
        } else {
            (
                path.to_path_buf(),
                path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            )
        };

        if !config_path.exists() {
            return Err(Error::ConfigNotFound {
                path: config_path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let pipeline = Self::parse(&contents)?;
        tracing::debug!(
            pipeline = %pipeline.name,
            nodes = pipeline.nodes.len(),
            connectors = pipeline.connectors.len(),
            "loaded configuration from {}",
            config_path.display()
        );

        Ok(Self {
            pipeline,
            base_path,
        })
    }

    /// Parse and check a pipeline definition
    pub fn parse(contents: &str) -> Result<PipelineConfig> {
        let pipeline: PipelineConfig = serde_yaml::from_str(contents)?;
        pipeline.validate()?;
        Ok(pipeline)
    }

    /// Resolve a source path against the project directory
    pub fn input_path(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }

    /// The directory outputs are written to
    pub fn output_dir(&self) -> PathBuf {
        self.base_path.join(&self.pipeline.output_dir)
    }

    /// Resolve a sink or log path against the output directory
    pub fn output_path(&self, path: &str) -> PathBuf {
        self.output_dir().join(path)
    }

    /// Resolve a connector's `log` setting
    pub fn log_target(&self, connector: &ConnectorConfig) -> Option<LogTarget> {
        connector.log.as_deref().map(|log| match log {
            STDOUT_LOG => LogTarget::Stdout,
            path => LogTarget::File(self.output_path(path)),
        })
    }

    /// Resolve the diagnostics file, if configured
    pub fn diagnostics_path(&self) -> Option<PathBuf> {
        self.pipeline
            .diagnostics
            .as_deref()
            .map(|p| self.output_path(p))
    }
}

impl PipelineConfig {
    /// Checks that do not need the graph: field values and reference syntax.
    /// Wiring is checked when the graph is built.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::ConfigInvalid {
                message: "pipeline name must not be empty".to_string(),
            });
        }

        for node in &self.nodes {
            match node {
                NodeConfig::CsvSource { name, delimiter, .. } if !delimiter.is_ascii() => {
                    return Err(Error::ConfigInvalid {
                        message: format!("node '{name}': delimiter must be a single ASCII character"),
                    });
                }
                NodeConfig::Stateful { name, functor, .. } if functor.arity() != 2 => {
                    return Err(Error::ConfigInvalid {
                        message: format!(
                            "node '{name}': stateful nodes need a two-input functor, '{}' is not",
                            functor.kind()
                        ),
                    });
                }
                _ => {}
            }
        }

        for connector in &self.connectors {
            for target in &connector.to {
                TargetRef::parse(target).map_err(|e| Error::ConfigInvalid {
                    message: format!("connector '{}': {e}", connector.name),
                })?;
            }
        }
        Ok(())
    }
}
