//! Compiled-in drivers

pub mod local;
pub mod local_sync;
pub mod local_task;

pub use local::{LocalDevice, LocalDriver, DEFAULT_DEVICE_ID};
pub use local_sync::LocalSyncDriverFactory;
pub use local_task::LocalTaskDriverFactory;

use crate::driver::DriverFactory;
use crate::error::{HalError, Result};
use crate::registry::DriverRegistry;
use std::sync::Arc;

/// Factories for every driver built into this crate
pub fn available_driver_factories() -> Vec<Arc<dyn DriverFactory>> {
    vec![Arc::new(LocalSyncDriverFactory), Arc::new(LocalTaskDriverFactory)]
}

/// Register every compiled-in driver with `registry`.
///
/// All factories are attempted. If any was already registered the call
/// returns `ALREADY_EXISTS` after registering the rest; callers that only
/// need the drivers present treat that as success.
pub fn register_all_available_drivers(registry: &DriverRegistry) -> Result<()> {
    let mut already_registered = Vec::new();
    for factory in available_driver_factories() {
        match registry.register_factory(factory) {
            Ok(()) => {}
            Err(err) if err.is_already_exists() => already_registered.push(err.to_string()),
            Err(err) => return Err(err),
        }
    }
    if already_registered.is_empty() {
        Ok(())
    } else {
        Err(HalError::AlreadyExists(format!(
            "{} driver(s) already registered",
            already_registered.len()
        )))
    }
}
