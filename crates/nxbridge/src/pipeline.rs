//! The `call` pipeline: load, link, invoke, extract
//!
//! ```text
//!   bytes ──> BytecodeModule ─┐
//!                             ├─> Context ──> module.main ──> invoke ──> outputs
//!   device ──> HalModule ─────┘                  ^
//!                                                │
//!   inputs ──> buffer views (uploaded or retained)┘
//! ```
//!
//! Every step is fail-fast. Whatever an earlier step acquired is released
//! when it goes out of scope, on success and on error alike.

use crate::config::BridgeConfig;
use crate::context::ensure_context_bound;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::instance::Instance;
use crate::tensor::Tensor;
use nxbridge_hal::buffer::allocate_buffer_copy;
use nxbridge_hal::vm::{invoke, BytecodeModule, Context, ExecutionMode, HalModule, ModuleRef, VariantList};
use nxbridge_hal::{BufferParams, HalError};
use nxbridge_tracing::performance::record_invocation;
use std::sync::Arc;

/// Entry point every module must export
pub const ENTRY_POINT: &str = "module.main";

/// Run `module.main` of `module_bytes` on `device` with the default
/// configuration
pub fn call(
    instance: &Instance,
    device: &Device,
    driver_name: &str,
    module_bytes: &[u8],
    inputs: &[Tensor],
) -> Result<Vec<Tensor>> {
    call_with_config(instance, device, driver_name, module_bytes, inputs, &BridgeConfig::default())
}

/// Run `module.main` of `module_bytes` on `device`.
///
/// `driver_name` only decides whether the device's execution context gets
/// bound to the calling thread first. Inputs are passed positionally:
/// device-backed tensors hand over their buffer view, everything else is
/// uploaded. Results come back as device-backed tensors.
#[tracing::instrument(
    skip(instance, device, module_bytes, inputs, config),
    fields(uri = device.uri(), inputs = inputs.len(), outputs = tracing::field::Empty)
)]
pub fn call_with_config(
    instance: &Instance,
    device: &Device,
    driver_name: &str,
    module_bytes: &[u8],
    inputs: &[Tensor],
    config: &BridgeConfig,
) -> Result<Vec<Tensor>> {
    let bind_context = config.requires_context_binding(driver_name);
    ensure_context_bound(device.native().as_ref(), bind_context).map_err(Error::Execution)?;

    let hal = HalModule::create(instance.vm(), Arc::clone(device.native()), ExecutionMode::Synchronous)
        .map_err(Error::Construction)?;
    let module = BytecodeModule::from_bytes(module_bytes).map_err(Error::Execution)?;
    tracing::debug!(module = module.name(), bytes = module_bytes.len(), "module_loaded");

    let context = Context::create_with_modules(
        Arc::clone(instance.vm()),
        vec![ModuleRef::Native(Arc::new(hal)), ModuleRef::from(module)],
    )
    .map_err(Error::Resolution)?;
    let main = context.resolve_function(ENTRY_POINT).map_err(Error::Resolution)?;

    let arguments = build_arguments(device, inputs)?;
    let result_count = main.signature().result_count();
    let mut results = VariantList::with_capacity(result_count);

    {
        let span = nxbridge_tracing::perf_span!("invoke", function = ENTRY_POINT, arguments = arguments.len());
        let entered = span.enter();
        invoke(&context, &main, &arguments, &mut results).map_err(Error::Execution)?;
        drop(entered);
        record_invocation(ENTRY_POINT, arguments.len(), result_count, span.elapsed_us());
    }

    let outputs = (0..result_count)
        .map(|index| -> Result<Tensor> {
            let view = results.get_buffer_view(index).map_err(|err| {
                tracing::debug!(index, error = %err, "missing_output");
                Error::Execution(HalError::not_found(format!("can't get output buffer view [index={index}]")))
            })?;
            Ok(Tensor::from_device_view(view, Arc::clone(device.native()), bind_context))
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::Span::current().record("outputs", outputs.len());
    Ok(outputs)
}

/// Positional argument list for `inputs`, in order
fn build_arguments(device: &Device, inputs: &[Tensor]) -> Result<VariantList> {
    let mut arguments = VariantList::with_capacity(inputs.len());
    for (index, input) in inputs.iter().enumerate() {
        if let Some(view) = input.buffer_view() {
            arguments.push_buffer_view(view);
            continue;
        }
        let data = input.host_bytes().ok_or_else(|| {
            Error::construction(format!("input {index} has neither host data nor a buffer view"))
        })?;
        let view = allocate_buffer_copy(
            device.native().as_ref(),
            input.dims(),
            input.element_type(),
            BufferParams::default(),
            data,
        )
        .map_err(Error::Construction)?;
        tracing::trace!(index, bytes = data.len(), "input_uploaded");
        arguments.push_buffer_view(&view);
    }
    Ok(arguments)
}
