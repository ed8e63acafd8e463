//! Driver and driver-factory traits
//!
//! A factory advertises one or more drivers by name; a driver enumerates and
//! creates devices.

use crate::device::DeviceRef;
use crate::error::Result;
use std::sync::Arc;

/// Descriptor of a driver a factory can create
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DriverInfo {
    /// Short name used in device URIs, e.g. `local-sync`
    pub driver_name: String,
    /// Human-readable name
    pub full_name: String,
}

impl DriverInfo {
    pub fn new(driver_name: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            driver_name: driver_name.into(),
            full_name: full_name.into(),
        }
    }
}

/// Descriptor of a device a driver can create
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceInfo {
    pub device_id: u64,
    /// Driver-specific path accepted by [`Driver::create_device_by_path`]
    pub path: String,
    pub name: String,
}

/// An instantiated driver
pub trait Driver: Send + Sync {
    fn name(&self) -> &str;

    /// Create the device used when a URI carries no usable identifier
    fn create_default_device(&self) -> Result<DeviceRef>;

    fn query_available_devices(&self) -> Result<Vec<DeviceInfo>>;

    /// Create the device at `path`; unknown paths are `NOT_FOUND`
    fn create_device_by_path(&self, path: &str) -> Result<DeviceRef>;
}

/// Produces drivers on demand
pub trait DriverFactory: Send + Sync {
    fn enumerate(&self) -> Vec<DriverInfo>;

    /// Instantiate `driver_name`, one of the names from [`Self::enumerate`]
    fn try_create(&self, driver_name: &str) -> Result<Arc<dyn Driver>>;
}
