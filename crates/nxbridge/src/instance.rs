//! VM instance ownership

use crate::config::BridgeConfig;
use crate::error::{Error, Result};
use nxbridge_hal::vm::{register_all_hal_types, VmInstance};
use std::sync::Arc;

/// Shared handle to a VM instance with the HAL types registered.
///
/// Cloning shares the instance; it is released when the last clone drops.
#[derive(Debug, Clone)]
pub struct Instance {
    vm: Arc<VmInstance>,
}

impl Instance {
    pub fn vm(&self) -> &Arc<VmInstance> {
        &self.vm
    }
}

/// Create an instance with the default configuration
pub fn create_instance() -> Result<Instance> {
    create_instance_with_config(&BridgeConfig::default())
}

/// Create an instance and register every HAL type into it.
///
/// Either both steps succeed or no instance is returned.
#[tracing::instrument(skip_all, fields(type_capacity = config.type_capacity))]
pub fn create_instance_with_config(config: &BridgeConfig) -> Result<Instance> {
    let vm = VmInstance::create(config.type_capacity).map_err(Error::Construction)?;
    register_all_hal_types(&vm).map_err(Error::Construction)?;
    tracing::debug!(types = vm.registered_type_count(), "instance_created");
    Ok(Instance { vm })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_has_hal_types() {
        let instance = create_instance().unwrap();
        assert!(instance.vm().has_type("hal.buffer_view"));

        let shared = instance.clone();
        assert!(Arc::ptr_eq(instance.vm(), shared.vm()));
    }

    #[test]
    fn too_small_capacity_yields_no_instance() {
        let config = BridgeConfig {
            type_capacity: 2,
            ..BridgeConfig::default()
        };
        let err = create_instance_with_config(&config).unwrap_err();
        assert_eq!(err.status_code(), nxbridge_hal::StatusCode::ResourceExhausted);
    }

    #[test]
    fn unbounded_capacity_is_not_allocated_up_front() {
        let config = BridgeConfig {
            type_capacity: usize::MAX,
            ..BridgeConfig::default()
        };
        let result = std::panic::catch_unwind(|| create_instance_with_config(&config));
        let instance = result.expect("instance creation panicked").unwrap();
        assert!(instance.vm().has_type("hal.buffer_view"));
    }
}
