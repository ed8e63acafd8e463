//! Device and driver shared by the `local-*` back-ends
//!
//! Both local back-ends keep buffers in host heap memory and run kernels on
//! the calling thread; `local-task` additionally splits element loops across
//! the rayon pool.

use crate::allocator::{Allocator, HeapAllocator, HeapStorage};
use crate::buffer::{Buffer, BufferView};
use crate::device::{Device, DeviceRef, Timeout};
use crate::driver::{DeviceInfo, Driver};
use crate::error::{HalError, Result};
use crate::kernels::{execute_elementwise, Kernel};
use std::sync::Arc;

/// Identifier of the device created when a URI names no device
pub const DEFAULT_DEVICE_ID: &str = "default";

/// Host-memory device
pub struct LocalDevice {
    id: String,
    driver_name: String,
    allocator: HeapAllocator,
    parallel: bool,
}

impl LocalDevice {
    pub fn new(driver_name: impl Into<String>, id: impl Into<String>, parallel: bool) -> Self {
        let driver_name = driver_name.into();
        Self {
            id: id.into(),
            allocator: HeapAllocator::new(driver_name.clone()),
            driver_name,
            parallel,
        }
    }

    fn validate_operands(&self, kernel: Kernel, inputs: &[&BufferView], output: &BufferView) -> Result<()> {
        let arity = match kernel {
            Kernel::Elementwise(op) => op.arity(),
            Kernel::Copy => 1,
        };
        if inputs.len() != arity {
            return Err(HalError::invalid_argument(format!(
                "{kernel:?} takes {arity} input(s), got {}",
                inputs.len()
            )));
        }
        for input in inputs {
            if input.element_type() != output.element_type() {
                return Err(HalError::type_mismatch(output.element_type(), input.element_type()));
            }
            if input.shape() != output.shape() {
                return Err(HalError::type_mismatch(
                    format!("shape {:?}", output.shape()),
                    format!("shape {:?}", input.shape()),
                ));
            }
        }
        Ok(())
    }
}

fn read_view(view: &BufferView) -> Result<Vec<u8>> {
    let mut bytes = vec![0u8; view.byte_length()];
    view.buffer().storage().read(0, &mut bytes)?;
    Ok(bytes)
}

impl Device for LocalDevice {
    fn id(&self) -> &str {
        &self.id
    }

    fn driver_name(&self) -> &str {
        &self.driver_name
    }

    fn allocator(&self) -> &dyn Allocator {
        &self.allocator
    }

    fn transfer_h2d(&self, source: &[u8], target: &Buffer, target_offset: usize, _timeout: Timeout) -> Result<()> {
        target.check_range(target_offset, source.len())?;
        target.storage().write(target_offset, source)
    }

    fn transfer_d2h(&self, source: &Buffer, source_offset: usize, target: &mut [u8], _timeout: Timeout) -> Result<()> {
        source.check_range(source_offset, target.len())?;
        source.storage().read(source_offset, target)
    }

    fn dispatch(&self, kernel: Kernel, inputs: &[&BufferView], output: &BufferView) -> Result<()> {
        self.validate_operands(kernel, inputs, output)?;

        // Operands are copied out first so an output aliasing an input never
        // has its lock held twice.
        let operands = inputs.iter().map(|view| read_view(view)).collect::<Result<Vec<_>>>()?;
        let operand_refs: Vec<&[u8]> = operands.iter().map(Vec::as_slice).collect();
        let out_len = output.byte_length();
        let element_type = output.element_type();
        let parallel = self.parallel;

        let run = |out: &mut [u8]| -> Result<()> {
            match kernel {
                Kernel::Elementwise(op) => execute_elementwise(op, element_type, &operand_refs, out, parallel),
                Kernel::Copy => {
                    out.copy_from_slice(&operand_refs[0][..out.len()]);
                    Ok(())
                }
            }
        };

        let storage = output.buffer().storage();
        match storage.as_any().downcast_ref::<HeapStorage>() {
            Some(heap) => heap.with_bytes_mut(|bytes| run(&mut bytes[..out_len])),
            None => {
                let mut scratch = vec![0u8; out_len];
                run(&mut scratch)?;
                storage.write(0, &scratch)
            }
        }
    }
}

/// Driver behind `local-sync` and `local-task`
pub struct LocalDriver {
    name: &'static str,
    parallel: bool,
}

impl LocalDriver {
    pub const fn new(name: &'static str, parallel: bool) -> Self {
        Self { name, parallel }
    }

    fn make_device(&self, id: &str) -> DeviceRef {
        tracing::debug!(driver = self.name, device_id = id, "local_device_created");
        Arc::new(LocalDevice::new(self.name, id, self.parallel))
    }
}

impl Driver for LocalDriver {
    fn name(&self) -> &str {
        self.name
    }

    fn create_default_device(&self) -> Result<DeviceRef> {
        Ok(self.make_device(DEFAULT_DEVICE_ID))
    }

    fn query_available_devices(&self) -> Result<Vec<DeviceInfo>> {
        Ok(vec![DeviceInfo {
            device_id: 0,
            path: "0".to_string(),
            name: "host CPU".to_string(),
        }])
    }

    fn create_device_by_path(&self, path: &str) -> Result<DeviceRef> {
        if path == DEFAULT_DEVICE_ID {
            return self.create_default_device();
        }
        let known = self.query_available_devices()?.into_iter().any(|info| info.path == path);
        if known {
            Ok(self.make_device(path))
        } else {
            Err(HalError::not_found(format!(
                "driver '{}' has no device at path '{path}'",
                self.name
            )))
        }
    }
}
