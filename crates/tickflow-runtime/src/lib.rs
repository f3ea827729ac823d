//! Tickflow Runtime
//!
//! This crate turns a pipeline configuration into a running graph.
//!
//! # Features
//!
//! - Graph assembly from `tickflow.yaml`, opening the CSV files it names
//! - Dry-run assembly that checks wiring without touching output files
//! - Run markers on the log and in an optional diagnostics file
//!
//! # Usage
//!
//! ```rust,ignore
//! use tickflow_core::Config;
//! use tickflow_runtime::Runtime;
//!
//! let runtime = Runtime::new(Config::load(".")?);
//! let report = runtime.run()?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod assembly;
pub mod engine;
pub mod error;

pub use engine::Runtime;
pub use error::{Error, Result};
