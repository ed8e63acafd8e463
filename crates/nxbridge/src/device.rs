//! Devices and device enumeration

use crate::config::BridgeConfig;
use crate::error::{Error, Result};
use nxbridge_hal::registry::DeviceUri;
use nxbridge_hal::{DeviceRef, DriverRegistry};
use std::fmt;

/// A device created from a URI.
///
/// Exclusively owned; the native device is released when this drops.
/// Creating two devices from one URI yields two independent devices.
pub struct Device {
    native: DeviceRef,
    uri: String,
    driver_name: String,
    id: u64,
}

impl Device {
    fn new(native: DeviceRef, uri: String, driver_name: impl Into<String>, id: u64) -> Self {
        Self {
            native,
            uri,
            driver_name: driver_name.into(),
            id,
        }
    }

    /// `<driver>://<path>`
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn driver_name(&self) -> &str {
        &self.driver_name
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn native(&self) -> &DeviceRef {
        &self.native
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("uri", &self.uri)
            .field("driver_name", &self.driver_name)
            .field("id", &self.id)
            .finish()
    }
}

/// Create the device named by `uri` (`<driver>://<path>`)
#[tracing::instrument(skip(registry))]
pub fn create_device(registry: &DriverRegistry, uri: &str) -> Result<Device> {
    let parsed = DeviceUri::parse(uri).map_err(Error::Resolution)?;
    let native = registry.create_device(uri).map_err(|err| {
        tracing::warn!(uri, error = %err, "device_creation_failed");
        Error::Resolution(err)
    })?;
    let id = parsed.path.parse::<u64>().unwrap_or(0);
    tracing::debug!(uri, driver = parsed.driver_name, id, "device_created");
    Ok(Device::new(native, uri.to_string(), parsed.driver_name, id))
}

pub fn list_devices(registry: &DriverRegistry) -> Result<Vec<Device>> {
    list_devices_with_config(registry, &BridgeConfig::default())
}

/// Devices of every non-denied driver.
///
/// Any failure aborts the enumeration; devices created before it are
/// released.
#[tracing::instrument(skip_all)]
pub fn list_devices_with_config(registry: &DriverRegistry, config: &BridgeConfig) -> Result<Vec<Device>> {
    let mut devices = Vec::new();
    for info in registry.enumerate() {
        if config.is_denied(&info.driver_name) {
            tracing::debug!(driver = %info.driver_name, "skipping denied driver");
            continue;
        }
        devices.extend(list_devices_for_driver_with_config(registry, &info.driver_name, config)?);
    }
    tracing::debug!(count = devices.len(), "devices_listed");
    Ok(devices)
}

pub fn list_devices_for_driver(registry: &DriverRegistry, driver_name: &str) -> Result<Vec<Device>> {
    list_devices_for_driver_with_config(registry, driver_name, &BridgeConfig::default())
}

/// The driver's default device followed by every device it enumerates.
///
/// A denied driver lists no devices.
#[tracing::instrument(skip(registry, config))]
pub fn list_devices_for_driver_with_config(
    registry: &DriverRegistry,
    driver_name: &str,
    config: &BridgeConfig,
) -> Result<Vec<Device>> {
    if config.is_denied(driver_name) {
        return Ok(Vec::new());
    }
    let driver = registry.try_create(driver_name).map_err(Error::Resolution)?;

    let default = driver.create_default_device().map_err(Error::Construction)?;
    let default_uri = format!("{driver_name}://{}", default.id());
    let mut devices = vec![Device::new(default, default_uri, driver_name, 0)];

    for info in driver.query_available_devices().map_err(Error::Resolution)? {
        let native = driver
            .create_device_by_path(&info.path)
            .map_err(Error::Construction)?;
        devices.push(Device::new(
            native,
            format!("{driver_name}://{}", info.path),
            driver_name,
            info.device_id,
        ));
    }
    Ok(devices)
}
