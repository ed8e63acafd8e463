//! VM instance and its type registry

use crate::error::{HalError, Result};
use parking_lot::RwLock;
use std::sync::Arc;

/// Default number of type slots in a new instance
pub const DEFAULT_TYPE_CAPACITY: usize = 64;

/// Reference types the HAL module needs registered before it can be created
pub const HAL_TYPE_NAMES: [&str; 8] = [
    "hal.allocator",
    "hal.buffer",
    "hal.buffer_view",
    "hal.command_buffer",
    "hal.device",
    "hal.executable",
    "hal.fence",
    "hal.semaphore",
];

/// Fixed-capacity set of registered reference type names
#[derive(Debug, Default)]
struct TypeRegistry {
    names: Vec<&'static str>,
    capacity: usize,
}

/// Process- or embedder-scoped VM state shared by every context
#[derive(Debug)]
pub struct VmInstance {
    types: RwLock<TypeRegistry>,
}

impl VmInstance {
    /// Create an instance with room for `type_capacity` registered types
    pub fn create(type_capacity: usize) -> Result<Arc<Self>> {
        if type_capacity == 0 {
            return Err(HalError::invalid_argument("type capacity must be at least 1"));
        }
        Ok(Arc::new(Self {
            types: RwLock::new(TypeRegistry {
                names: Vec::new(),
                capacity: type_capacity,
            }),
        }))
    }

    pub fn type_capacity(&self) -> usize {
        self.types.read().capacity
    }

    pub fn registered_type_count(&self) -> usize {
        self.types.read().names.len()
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.types.read().names.iter().any(|n| *n == name)
    }

    /// Register every name in `names` or none of them.
    ///
    /// Names already present are skipped. Fails with `RESOURCE_EXHAUSTED`
    /// if the new names do not all fit.
    pub fn register_types(&self, names: &[&'static str]) -> Result<()> {
        let mut types = self.types.write();
        let missing: Vec<&'static str> = names
            .iter()
            .copied()
            .filter(|name| !types.names.contains(name))
            .collect();
        if types.names.len() + missing.len() > types.capacity {
            return Err(HalError::ResourceExhausted(format!(
                "registering {} type(s) exceeds instance type capacity {} ({} in use)",
                missing.len(),
                types.capacity,
                types.names.len()
            )));
        }
        types.names.extend(missing);
        Ok(())
    }
}

/// Register the HAL reference types with `instance`
pub fn register_all_hal_types(instance: &VmInstance) -> Result<()> {
    instance.register_types(&HAL_TYPE_NAMES)
}
