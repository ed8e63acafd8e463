//! Driver registry
//!
//! Holds the registered [`DriverFactory`]s and resolves device URIs of the
//! form `<driver>://<path>` to devices.

use crate::device::DeviceRef;
use crate::driver::{Driver, DriverFactory, DriverInfo};
use crate::error::{HalError, Result};
use parking_lot::RwLock;
use std::sync::Arc;

/// Parsed `<driver>://<path>` device URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceUri<'a> {
    pub driver_name: &'a str,
    /// Empty when the URI names only a driver
    pub path: &'a str,
}

impl<'a> DeviceUri<'a> {
    /// Split a URI. A bare driver name (no `://`) selects its default device.
    pub fn parse(uri: &'a str) -> Result<Self> {
        let (driver_name, path) = match uri.split_once("://") {
            Some((driver_name, path)) => (driver_name, path),
            None => (uri, ""),
        };
        if driver_name.is_empty() {
            return Err(HalError::invalid_argument(format!("device URI '{uri}' has no driver name")));
        }
        Ok(Self { driver_name, path })
    }
}

/// Registry of driver factories
#[derive(Default)]
pub struct DriverRegistry {
    factories: RwLock<Vec<Arc<dyn DriverFactory>>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory`.
    ///
    /// Fails with `ALREADY_EXISTS` if any driver it advertises is already
    /// provided by a registered factory; the registry is left unchanged.
    pub fn register_factory(&self, factory: Arc<dyn DriverFactory>) -> Result<()> {
        let mut factories = self.factories.write();
        for info in factory.enumerate() {
            let taken = factories
                .iter()
                .any(|existing| existing.enumerate().iter().any(|e| e.driver_name == info.driver_name));
            if taken {
                return Err(HalError::AlreadyExists(format!(
                    "driver '{}' is already registered",
                    info.driver_name
                )));
            }
        }
        tracing::debug!(drivers = ?factory.enumerate(), "driver_factory_registered");
        factories.push(factory);
        Ok(())
    }

    /// Descriptors of every registered driver, in registration order
    pub fn enumerate(&self) -> Vec<DriverInfo> {
        self.factories.read().iter().flat_map(|f| f.enumerate()).collect()
    }

    /// Instantiate the driver called `driver_name`
    pub fn try_create(&self, driver_name: &str) -> Result<Arc<dyn Driver>> {
        let factory = self
            .factories
            .read()
            .iter()
            .find(|f| f.enumerate().iter().any(|info| info.driver_name == driver_name))
            .cloned();
        match factory {
            Some(factory) => factory.try_create(driver_name),
            None => Err(HalError::not_found(format!(
                "no driver registered with name '{driver_name}'"
            ))),
        }
    }

    /// Create the device named by `uri`
    pub fn create_device(&self, uri: &str) -> Result<DeviceRef> {
        let parsed = DeviceUri::parse(uri)?;
        let driver = self.try_create(parsed.driver_name)?;
        if parsed.path.is_empty() {
            driver.create_default_device()
        } else {
            driver.create_device_by_path(parsed.path)
        }
    }
}
