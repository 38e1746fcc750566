//! Graph configuration

use crate::log::DEFAULT_LOG_CAPACITY;
use cypherform_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Graph configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Name used in log lines
    pub name: String,

    /// Number of requests kept in the query log
    pub log_capacity: usize,

    /// Query the database for live schema before writing schema
    pub reflect_schema: bool,

    /// Include parameter tables in debug log lines
    pub log_parameters: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            log_capacity: DEFAULT_LOG_CAPACITY,
            reflect_schema: true,
            log_parameters: false,
        }
    }
}

impl GraphConfig {
    /// Create a new configuration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Create configuration for tests: no reflection, parameters logged
    pub fn for_testing() -> Self {
        Self {
            name: "test".to_string(),
            reflect_schema: false,
            log_parameters: true,
            ..Default::default()
        }
    }

    /// Parse a JSON configuration; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Configuration(e.to_string()))
    }

    /// Builder: set query log capacity
    pub fn log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    /// Builder: disable schema reflection
    pub fn without_reflection(mut self) -> Self {
        self.reflect_schema = false;
        self
    }

    /// Builder: log parameter tables
    pub fn log_parameters(mut self) -> Self {
        self.log_parameters = true;
        self
    }
}
