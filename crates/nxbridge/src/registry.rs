//! Driver registry access
//!
//! The process-wide registry is created on first use. Embedders that manage
//! their own lifecycle construct a [`DriverRegistry`] directly and pass it
//! to the same functions.

use crate::config::BridgeConfig;
use crate::error::{Error, Result};
use nxbridge_hal::drivers::register_all_available_drivers;
use nxbridge_hal::{DriverFactory, DriverRegistry};
use std::sync::{Arc, OnceLock};

static DRIVER_REGISTRY: OnceLock<Arc<DriverRegistry>> = OnceLock::new();

/// Process-wide registry; every call returns the same `Arc`
pub fn get_driver_registry() -> Arc<DriverRegistry> {
    Arc::clone(DRIVER_REGISTRY.get_or_init(|| Arc::new(DriverRegistry::new())))
}

/// Driver descriptor reported by [`list_drivers`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Driver {
    pub name: String,
    pub full_name: String,
}

/// Register every compiled-in driver. Safe to call repeatedly.
pub fn register_all_drivers(registry: &DriverRegistry) -> Result<()> {
    match register_all_available_drivers(registry) {
        Ok(()) => Ok(()),
        Err(err) if err.is_already_exists() => {
            tracing::trace!("drivers already registered");
            Ok(())
        }
        Err(err) => Err(Error::Construction(err)),
    }
}

/// Register an additional back-end. Already registered is success.
pub fn register_driver_factory(registry: &DriverRegistry, factory: Arc<dyn DriverFactory>) -> Result<()> {
    match registry.register_factory(factory) {
        Err(err) if !err.is_already_exists() => Err(Error::Construction(err)),
        _ => Ok(()),
    }
}

pub fn list_drivers(registry: &DriverRegistry) -> Vec<Driver> {
    list_drivers_with_config(registry, &BridgeConfig::default())
}

/// Registered drivers, minus the configured deny-list
pub fn list_drivers_with_config(registry: &DriverRegistry, config: &BridgeConfig) -> Vec<Driver> {
    registry
        .enumerate()
        .into_iter()
        .filter(|info| !config.is_denied(&info.driver_name))
        .map(|info| Driver {
            name: info.driver_name,
            full_name: info.full_name,
        })
        .collect()
}
