//! Explicit controller memory.
//!
//! Observer estimates and integrator accumulators are stored by name. The map
//! is ordered so that iteration, serialization and equality are deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ControlError, ControlResult};

/// Named real-valued quantities persisted across controller steps.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ControllerMemory {
    values: BTreeMap<String, f64>,
}

impl ControllerMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: f64) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    /// Like [`get`](Self::get) but a missing key is an error.
    pub fn value(&self, key: &str) -> ControlResult<f64> {
        self.get(key).ok_or_else(|| ControlError::MissingMemory {
            key: key.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
