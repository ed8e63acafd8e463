//! Bridge configuration
//!
//! | variable                         | default            |
//! |----------------------------------|--------------------|
//! | `NXBRIDGE_DENIED_DRIVERS`        | `hip`              |
//! | `NXBRIDGE_CONTEXT_BOUND_DRIVERS` | `cuda`             |
//! | `NXBRIDGE_RUNTIME_NAME`          | `nxbridge runtime` |
//! | `NXBRIDGE_TYPE_CAPACITY`         | `64`               |
//!
//! Driver lists are comma-separated; an empty value clears the list.

use crate::error::{Error, Result};
use nxbridge_hal::vm::DEFAULT_TYPE_CAPACITY;
use std::env;

pub const DENIED_DRIVERS_ENV: &str = "NXBRIDGE_DENIED_DRIVERS";
pub const CONTEXT_BOUND_DRIVERS_ENV: &str = "NXBRIDGE_CONTEXT_BOUND_DRIVERS";
pub const RUNTIME_NAME_ENV: &str = "NXBRIDGE_RUNTIME_NAME";
pub const TYPE_CAPACITY_ENV: &str = "NXBRIDGE_TYPE_CAPACITY";

pub const DEFAULT_RUNTIME_NAME: &str = "nxbridge runtime";

/// Largest type capacity accepted from the environment
pub const MAX_TYPE_CAPACITY: usize = 65_536;

/// Settings shared by every bridge operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Drivers never reported by listings
    pub denied_drivers: Vec<String>,
    /// Drivers whose execution context must be bound to the calling thread
    pub context_bound_drivers: Vec<String>,
    /// Name used in status messages
    pub runtime_name: String,
    /// Type slots reserved in new VM instances
    pub type_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            denied_drivers: vec!["hip".to_string()],
            context_bound_drivers: vec!["cuda".to_string()],
            runtime_name: DEFAULT_RUNTIME_NAME.to_string(),
            type_capacity: DEFAULT_TYPE_CAPACITY,
        }
    }
}

impl BridgeConfig {
    /// Defaults overridden by the `NXBRIDGE_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(value) = env::var(DENIED_DRIVERS_ENV) {
            config.denied_drivers = parse_list(&value);
        }
        if let Ok(value) = env::var(CONTEXT_BOUND_DRIVERS_ENV) {
            config.context_bound_drivers = parse_list(&value);
        }
        if let Ok(value) = env::var(RUNTIME_NAME_ENV) {
            if !value.trim().is_empty() {
                config.runtime_name = value.trim().to_string();
            }
        }
        if let Ok(value) = env::var(TYPE_CAPACITY_ENV) {
            config.type_capacity = match value.trim().parse::<usize>() {
                Ok(capacity) if (1..=MAX_TYPE_CAPACITY).contains(&capacity) => capacity,
                _ => {
                    return Err(Error::Config(format!(
                        "{TYPE_CAPACITY_ENV} must be an integer in 1..={MAX_TYPE_CAPACITY}, got '{value}'"
                    )))
                }
            };
        }
        Ok(config)
    }

    pub fn is_denied(&self, driver_name: &str) -> bool {
        self.denied_drivers.iter().any(|d| d == driver_name)
    }

    pub fn requires_context_binding(&self, driver_name: &str) -> bool {
        self.context_bound_drivers.iter().any(|d| d == driver_name)
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
