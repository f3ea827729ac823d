//! Input ports
//!
//! A port is the wiring point of a transform: a named slot holding exactly
//! one value. Each `put` overwrites the previous value; nothing is kept.

use crate::node::Consumer;
use crate::Value;

/// A named single-value slot owned by one transform node
#[derive(Debug, Clone)]
pub struct Port {
    name: String,
    value: Value,
}

impl Port {
    /// Create an empty port.
    ///
    /// Until the first `put` the port reads as `NaN`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Value::NAN,
        }
    }

    /// Get the port name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value of the port
    pub fn value(&self) -> Value {
        self.value
    }

    /// Overwrite the stored value
    pub fn set(&mut self, value: Value) {
        self.value = value;
    }
}

impl Consumer for Port {
    fn put(&mut self, value: Value) -> crate::Result<()> {
        self.set(value);
        Ok(())
    }
}
