//! End-to-end `call` through the local drivers

mod common;

use common::{binary_module, empty_module, integer_module, module_without_main, registry};
use nxbridge::{
    call, call_with_config, create_device, create_instance, BackingKind, BridgeConfig, ElementType, ErrorKind,
    Status, Tensor,
};
use nxbridge_hal::StatusCode;

fn f32_tensor(values: &[f32]) -> Tensor {
    Tensor::from_slice(values, &[2, 2], ElementType::Float32).unwrap()
}

#[test]
fn add_on_local_sync_default() {
    let registry = registry();
    let instance = create_instance().unwrap();
    let device = create_device(&registry, "local-sync://default").unwrap();

    let inputs = [f32_tensor(&[1.0, 2.0, 3.0, 4.0]), f32_tensor(&[5.0, 6.0, 7.0, 8.0])];
    let mut outputs = call(&instance, &device, "local-sync", &binary_module("add"), &inputs).unwrap();

    assert_eq!(outputs.len(), 1);
    let result = &mut outputs[0];
    assert_eq!(result.backing_kind(), BackingKind::Device);
    assert_eq!(result.dims(), &[2, 2]);
    assert_eq!(result.element_type(), ElementType::Float32);
    assert_eq!(result.to_vec::<f32>().unwrap(), vec![6.0, 8.0, 10.0, 12.0]);
}

#[test]
fn multiply_on_local_task() {
    let registry = registry();
    let instance = create_instance().unwrap();
    let device = create_device(&registry, "local-task://0").unwrap();

    let inputs = [
        Tensor::from_slice(&[2i32, -3, 4, 5], &[4], ElementType::Int32).unwrap(),
        Tensor::from_code(bytemuck::cast_slice(&[10i32, 10, -1, 0]), &[4], "s32").unwrap(),
    ];
    let mut outputs = call(&instance, &device, "local-task", &binary_module("mul"), &inputs).unwrap();
    assert_eq!(outputs[0].to_vec::<i32>().unwrap(), vec![20, -30, -4, 0]);
}

#[test]
fn half_precision_inputs() {
    use half::f16;

    let registry = registry();
    let instance = create_instance().unwrap();
    let device = create_device(&registry, "local-sync://default").unwrap();

    let a: Vec<f16> = [1.0f32, 2.5].iter().map(|&v| f16::from_f32(v)).collect();
    let b: Vec<f16> = [0.5f32, 0.5].iter().map(|&v| f16::from_f32(v)).collect();
    let inputs = [
        Tensor::from_slice(&a, &[2], ElementType::Float16).unwrap(),
        Tensor::from_slice(&b, &[2], ElementType::Float16).unwrap(),
    ];
    let mut outputs = call(&instance, &device, "local-sync", &binary_module("sub"), &inputs).unwrap();
    let result: Vec<f32> = outputs[0].to_vec::<f16>().unwrap().into_iter().map(f16::to_f32).collect();
    assert_eq!(result, vec![0.5, 2.0]);
}

#[test]
fn zero_inputs_zero_results() {
    let registry = registry();
    let instance = create_instance().unwrap();
    let device = create_device(&registry, "local-sync://default").unwrap();

    let result = call(&instance, &device, "local-sync", &empty_module(), &[]);
    let status = Status::from_result(&result);
    assert!(status.is_ok());
    assert_eq!(status.to_string(), "OK");
    assert!(result.unwrap().is_empty());
}

#[test]
fn input_count_mismatch_is_an_execution_error() {
    let registry = registry();
    let instance = create_instance().unwrap();
    let device = create_device(&registry, "local-sync://default").unwrap();

    let inputs = [f32_tensor(&[1.0; 4])];
    let result = call(&instance, &device, "local-sync", &binary_module("add"), &inputs);
    let err = result.as_ref().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Execution);
    assert_eq!(err.status_code(), StatusCode::InvalidArgument);

    let message = Status::from_result(&result).into_message();
    assert!(
        message.starts_with("Failed to execute nxbridge runtime due to error: INVALID_ARGUMENT;"),
        "{message}"
    );
    assert!(message.contains("expects 2 argument(s), got 1"), "{message}");
}

#[test]
fn runtime_name_is_configurable() {
    let registry = registry();
    let instance = create_instance().unwrap();
    let device = create_device(&registry, "local-sync://default").unwrap();
    let config = BridgeConfig {
        runtime_name: "IREE runtime".to_string(),
        ..BridgeConfig::default()
    };

    let result = call_with_config(&instance, &device, "local-sync", &module_without_main(), &[], &config);
    let message = Status::from_result_with_config(&result, &config).into_message();
    assert!(message.starts_with("Failed to execute IREE runtime due to error: NOT_FOUND;"), "{message}");
}

#[test]
fn missing_main_is_a_resolution_error() {
    let registry = registry();
    let instance = create_instance().unwrap();
    let device = create_device(&registry, "local-sync://default").unwrap();

    let err = call(&instance, &device, "local-sync", &module_without_main(), &[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resolution);
    assert_eq!(err.status_code(), StatusCode::NotFound);
}

#[test]
fn unknown_import_is_a_resolution_error() {
    let registry = registry();
    let instance = create_instance().unwrap();
    let device = create_device(&registry, "local-sync://default").unwrap();

    let err = call(&instance, &device, "local-sync", &binary_module("pow"), &[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resolution);
}

#[test]
fn malformed_bytecode_is_an_execution_error() {
    let registry = registry();
    let instance = create_instance().unwrap();
    let device = create_device(&registry, "local-sync://default").unwrap();

    let truncated = binary_module("add");
    let cases: [&[u8]; 3] = [b"", b"not a module", &truncated[..10]];
    for bytes in cases {
        let err = call(&instance, &device, "local-sync", bytes, &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Execution, "{err}");
    }
}

#[test]
fn non_buffer_result_reports_its_slot() {
    let registry = registry();
    let instance = create_instance().unwrap();
    let device = create_device(&registry, "local-sync://default").unwrap();

    let result = call(&instance, &device, "local-sync", &integer_module(), &[]);
    let err = result.as_ref().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Execution);
    assert_eq!(err.status_code(), StatusCode::NotFound);
    assert_eq!(
        Status::from_result(&result).into_message(),
        "Failed to execute nxbridge runtime due to error: NOT_FOUND; can't get output buffer view [index=0]"
    );
}

#[test]
fn unbacked_input_is_a_construction_error() {
    let registry = registry();
    let instance = create_instance().unwrap();
    let device = create_device(&registry, "local-sync://default").unwrap();

    let inputs = [
        Tensor::placeholder(&[2, 2], ElementType::Float32).unwrap(),
        f32_tensor(&[1.0; 4]),
    ];
    let err = call(&instance, &device, "local-sync", &binary_module("add"), &inputs).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Construction);
}

#[test]
fn kernel_failures_surface_as_execution_errors() {
    let registry = registry();
    let instance = create_instance().unwrap();
    let device = create_device(&registry, "local-sync://default").unwrap();

    let inputs = [
        f32_tensor(&[1.0; 4]),
        Tensor::from_slice(&[1.0f32, 2.0], &[2], ElementType::Float32).unwrap(),
    ];
    let err = call(&instance, &device, "local-sync", &binary_module("add"), &inputs).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Execution);
    assert_eq!(err.status_code(), StatusCode::InvalidArgument);
}

#[test]
fn device_inputs_are_retained_not_uploaded() {
    let registry = registry();
    let instance = create_instance().unwrap();
    let device = create_device(&registry, "local-sync://default").unwrap();
    let allocator = || device.native().allocator().statistics();

    let first_inputs = [f32_tensor(&[1.0, 2.0, 3.0, 4.0]), f32_tensor(&[5.0, 6.0, 7.0, 8.0])];
    let mut sum = call(&instance, &device, "local-sync", &binary_module("add"), &first_inputs).unwrap();
    let before = allocator().total_allocations;

    let mut second_inputs = [sum.remove(0), f32_tensor(&[1.0; 4])];
    let mut outputs = call(&instance, &device, "local-sync", &binary_module("sub"), &second_inputs).unwrap();

    // one upload for the host input, one output; the device input is passed through
    assert_eq!(allocator().total_allocations - before, 2);
    assert_eq!(outputs[0].to_vec::<f32>().unwrap(), vec![5.0, 7.0, 9.0, 11.0]);
    assert_eq!(second_inputs[0].backing_kind(), BackingKind::Device);
    assert_eq!(second_inputs[0].to_vec::<f32>().unwrap(), vec![6.0, 8.0, 10.0, 12.0]);
}

#[test]
fn intermediates_are_released() {
    let registry = registry();
    let instance = create_instance().unwrap();
    let device = create_device(&registry, "local-sync://default").unwrap();

    {
        let inputs = [f32_tensor(&[1.0; 4]), f32_tensor(&[2.0; 4])];
        let outputs = call(&instance, &device, "local-sync", &binary_module("max"), &inputs).unwrap();
        assert_eq!(device.native().allocator().statistics().live_buffers, 1);
        drop(outputs);
    }
    let stats = device.native().allocator().statistics();
    assert_eq!(stats.live_buffers, 0);
    assert_eq!(stats.live_bytes, 0);
}
