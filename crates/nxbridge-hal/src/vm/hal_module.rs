//! The `hal` native module
//!
//! Binds one device and exposes buffer-view operations to bytecode:
//!
//! | export                        | cconv   |
//! |-------------------------------|---------|
//! | `hal.elementwise.<binary op>` | `0rr_r` |
//! | `hal.elementwise.neg`/`abs`   | `0r_r`  |
//! | `hal.buffer_view.copy`        | `0r_r`  |
//! | `hal.buffer_view.rank`        | `0r_i`  |
//! | `hal.buffer_view.dim`         | `0ri_I` |
//!
//! Results are freshly allocated on the bound device.

use super::instance::VmInstance;
use super::module::NativeModule;
use super::signature::FunctionSignature;
use super::value::{Value, ValueKind};
use crate::buffer::{BufferParams, BufferView, BufferViewRef};
use crate::device::DeviceRef;
use crate::error::{HalError, Result};
use crate::kernels::{ElementwiseOp, Kernel};

pub const MODULE_NAME: &str = "hal";

/// How the module schedules device work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Every call completes before returning
    Synchronous,
    /// Calls return fences to wait on
    Asynchronous,
}

enum HalFunction {
    Elementwise(ElementwiseOp),
    Copy,
    Rank,
    Dim,
}

impl HalFunction {
    fn parse(name: &str) -> Option<Self> {
        if let Some(op) = name.strip_prefix("elementwise.") {
            return ElementwiseOp::from_name(op).map(HalFunction::Elementwise);
        }
        match name {
            "buffer_view.copy" => Some(HalFunction::Copy),
            "buffer_view.rank" => Some(HalFunction::Rank),
            "buffer_view.dim" => Some(HalFunction::Dim),
            _ => None,
        }
    }

    fn signature(&self) -> FunctionSignature {
        use ValueKind::{Ref, I32, I64};
        match self {
            HalFunction::Elementwise(op) if op.arity() == 2 => FunctionSignature::new(vec![Ref, Ref], vec![Ref]),
            HalFunction::Elementwise(_) | HalFunction::Copy => FunctionSignature::new(vec![Ref], vec![Ref]),
            HalFunction::Rank => FunctionSignature::new(vec![Ref], vec![I32]),
            HalFunction::Dim => FunctionSignature::new(vec![Ref, I32], vec![I64]),
        }
    }
}

/// HAL module bound to a single device
pub struct HalModule {
    device: DeviceRef,
}

impl HalModule {
    /// Create the module for `device`.
    ///
    /// The instance must have the HAL types registered. Only
    /// [`ExecutionMode::Synchronous`] is supported.
    pub fn create(instance: &VmInstance, device: DeviceRef, mode: ExecutionMode) -> Result<Self> {
        if !instance.has_type("hal.buffer_view") {
            return Err(HalError::FailedPrecondition(
                "HAL types are not registered with the VM instance".to_string(),
            ));
        }
        if mode != ExecutionMode::Synchronous {
            return Err(HalError::unimplemented(
                "only synchronous HAL execution is supported",
            ));
        }
        Ok(Self { device })
    }

    pub fn device(&self) -> &DeviceRef {
        &self.device
    }

    fn allocate_like(&self, view: &BufferView) -> Result<BufferViewRef> {
        let buffer = self
            .device
            .allocator()
            .allocate_buffer(BufferParams::default(), view.byte_length())?;
        BufferView::new(buffer, view.shape().to_vec(), view.element_type())
    }
}

fn ref_arg(args: &[Value], index: usize) -> Result<&BufferViewRef> {
    match args.get(index) {
        Some(Value::Ref(view)) => Ok(view),
        Some(other) => Err(HalError::type_mismatch(ValueKind::Ref, other.kind())),
        None => Err(HalError::invalid_argument(format!("missing argument {index}"))),
    }
}

impl NativeModule for HalModule {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn export_names(&self) -> Vec<String> {
        ElementwiseOp::ALL
            .iter()
            .map(|op| format!("elementwise.{}", op.name()))
            .chain(["buffer_view.copy", "buffer_view.rank", "buffer_view.dim"].map(String::from))
            .collect()
    }

    fn lookup_function(&self, function: &str) -> Option<FunctionSignature> {
        HalFunction::parse(function).map(|f| f.signature())
    }

    fn call(&self, function: &str, args: &[Value]) -> Result<Vec<Value>> {
        let target = HalFunction::parse(function)
            .ok_or_else(|| HalError::not_found(format!("'{MODULE_NAME}.{function}' is not exported")))?;

        match target {
            HalFunction::Elementwise(op) => {
                let inputs = (0..op.arity())
                    .map(|i| ref_arg(args, i).map(|view| &**view))
                    .collect::<Result<Vec<&BufferView>>>()?;
                let output = self.allocate_like(inputs[0])?;
                self.device.dispatch(Kernel::Elementwise(op), &inputs, &output)?;
                Ok(vec![Value::Ref(output)])
            }
            HalFunction::Copy => {
                let source = ref_arg(args, 0)?;
                let output = self.allocate_like(source)?;
                self.device.dispatch(Kernel::Copy, &[&**source], &output)?;
                Ok(vec![Value::Ref(output)])
            }
            HalFunction::Rank => {
                let view = ref_arg(args, 0)?;
                let rank = i32::try_from(view.rank())
                    .map_err(|_| HalError::OutOfRange(format!("rank {} does not fit in i32", view.rank())))?;
                Ok(vec![Value::I32(rank)])
            }
            HalFunction::Dim => {
                let view = ref_arg(args, 0)?;
                let index = match args.get(1) {
                    Some(Value::I32(index)) => *index,
                    Some(other) => return Err(HalError::type_mismatch(ValueKind::I32, other.kind())),
                    None => return Err(HalError::invalid_argument("missing argument 1")),
                };
                let dim = usize::try_from(index)
                    .ok()
                    .and_then(|i| view.shape().get(i).copied())
                    .ok_or_else(|| {
                        HalError::OutOfRange(format!(
                            "dimension {index} out of range for rank {}",
                            view.rank()
                        ))
                    })?;
                Ok(vec![Value::I64(dim)])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::allocate_buffer_copy;
    use crate::device::{Device, Timeout};
    use crate::drivers::LocalDevice;
    use crate::element_type::ElementType;
    use crate::vm::instance::{register_all_hal_types, DEFAULT_TYPE_CAPACITY};
    use std::sync::Arc;

    fn hal_module() -> HalModule {
        let instance = VmInstance::create(DEFAULT_TYPE_CAPACITY).unwrap();
        register_all_hal_types(&instance).unwrap();
        let device: DeviceRef = Arc::new(LocalDevice::new("local-sync", "default", false));
        HalModule::create(&instance, device, ExecutionMode::Synchronous).unwrap()
    }

    fn i32_view(module: &HalModule, shape: &[i64], values: &[i32]) -> BufferViewRef {
        allocate_buffer_copy(
            module.device().as_ref(),
            shape,
            ElementType::Int32,
            BufferParams::default(),
            bytemuck::cast_slice(values),
        )
        .unwrap()
    }

    #[test]
    fn requires_registered_types_and_sync_mode() {
        let instance = VmInstance::create(DEFAULT_TYPE_CAPACITY).unwrap();
        let device: DeviceRef = Arc::new(LocalDevice::new("local-sync", "default", false));
        assert!(HalModule::create(&instance, Arc::clone(&device), ExecutionMode::Synchronous).is_err());

        register_all_hal_types(&instance).unwrap();
        let err = HalModule::create(&instance, device, ExecutionMode::Asynchronous)
            .err()
            .unwrap();
        assert_eq!(err.code(), crate::error::StatusCode::Unimplemented);
    }

    #[test]
    fn elementwise_sub_allocates_result() {
        let module = hal_module();
        let a = i32_view(&module, &[3], &[10, 20, 30]);
        let b = i32_view(&module, &[3], &[1, 2, 3]);
        let results = module
            .call("elementwise.sub", &[Value::Ref(a.clone()), Value::Ref(b)])
            .unwrap();
        let out = results[0].as_buffer_view().unwrap();
        assert!(!Arc::ptr_eq(out, &a));

        let mut bytes = vec![0u8; out.byte_length()];
        module
            .device()
            .transfer_d2h(out.buffer(), 0, &mut bytes, Timeout::Infinite)
            .unwrap();
        assert_eq!(bytemuck::pod_collect_to_vec::<u8, i32>(&bytes), vec![9, 18, 27]);
    }

    #[test]
    fn rank_and_dim() {
        let module = hal_module();
        let view = i32_view(&module, &[2, 3], &[0; 6]);
        let rank = module.call("buffer_view.rank", &[Value::Ref(view.clone())]).unwrap();
        assert_eq!(rank[0].as_i64(), Some(2));

        let dim = module
            .call("buffer_view.dim", &[Value::Ref(view.clone()), Value::I32(1)])
            .unwrap();
        assert_eq!(dim[0].as_i64(), Some(3));

        assert!(module.call("buffer_view.dim", &[Value::Ref(view), Value::I32(2)]).is_err());
    }

    #[test]
    fn exports_resolve() {
        let module = hal_module();
        for name in module.export_names() {
            assert!(module.lookup_function(&name).is_some(), "{name}");
        }
        assert_eq!(
            module.lookup_function("elementwise.add").unwrap().to_cconv(),
            "0rr_r"
        );
        assert!(module.lookup_function("elementwise.pow").is_none());
    }
}
