//! Driver registration, device listings and thread-bound contexts

mod common;

use common::{binary_module, hip_driver, registry, FakeFactory, FlakyDriver, ThreadBoundDriver};
use nxbridge::{
    call, call_with_config, create_device, create_instance, get_driver_registry, list_devices,
    list_devices_for_driver, list_devices_with_config, list_drivers, read_buffer, register_all_drivers,
    BridgeConfig, DriverRegistry, ElementType, ErrorKind, ReadLength, Tensor,
};
use serial_test::serial;
use std::sync::Arc;
use std::thread;

// ============================================================================
// Registry
// ============================================================================

#[test]
#[serial]
fn global_registration_is_idempotent() {
    let registry = get_driver_registry();
    register_all_drivers(&registry).unwrap();
    register_all_drivers(&get_driver_registry()).unwrap();

    let names: Vec<_> = list_drivers(&registry).into_iter().map(|d| d.name).collect();
    assert!(names.contains(&"local-sync".to_string()));
    assert!(names.contains(&"local-task".to_string()));
}

#[test]
fn empty_registry_lists_nothing() {
    let registry = DriverRegistry::new();
    assert!(list_drivers(&registry).is_empty());
    assert!(list_devices(&registry).unwrap().is_empty());
}

#[test]
fn hip_is_never_listed() {
    let registry = registry();
    FakeFactory::new().with("hip", hip_driver()).register(&registry);

    assert!(list_drivers(&registry).iter().all(|d| d.name != "hip"));
    let devices = list_devices(&registry).unwrap();
    assert!(!devices.is_empty());
    assert!(devices.iter().all(|d| d.driver_name() != "hip" && !d.uri().starts_with("hip://")));
    assert!(list_devices_for_driver(&registry, "hip").unwrap().is_empty());

    // Still creatable by explicit URI
    let device = create_device(&registry, "hip://0").unwrap();
    assert_eq!(device.driver_name(), "hip");
}

#[test]
fn deny_list_comes_from_config() {
    let registry = registry();
    FakeFactory::new().with("hip", hip_driver()).register(&registry);
    let config = BridgeConfig {
        denied_drivers: vec!["local-task".to_string()],
        ..BridgeConfig::default()
    };

    let uris: Vec<_> = list_devices_with_config(&registry, &config)
        .unwrap()
        .iter()
        .map(|d| d.uri().to_string())
        .collect();
    assert_eq!(uris, vec!["local-sync://default", "local-sync://0", "hip://default", "hip://0"]);
}

#[test]
fn listing_tags_every_device_with_its_uri() {
    let registry = registry();
    let devices = list_devices(&registry).unwrap();
    let summary: Vec<_> = devices.iter().map(|d| (d.uri().to_string(), d.id())).collect();
    assert_eq!(
        summary,
        vec![
            ("local-sync://default".to_string(), 0),
            ("local-sync://0".to_string(), 0),
            ("local-task://default".to_string(), 0),
            ("local-task://0".to_string(), 0),
        ]
    );
}

#[test]
fn repeated_creation_yields_independent_devices() {
    let registry = registry();
    let a = create_device(&registry, "local-sync://default").unwrap();
    let b = create_device(&registry, "local-sync://default").unwrap();
    assert!(!Arc::ptr_eq(a.native(), b.native()));
}

#[test]
fn bad_uris_fail_with_a_diagnostic() {
    let registry = registry();
    for uri in ["nope://0", "local-sync://7"] {
        let err = create_device(&registry, uri).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resolution);
        assert!(!err.to_string().is_empty());
    }
}

#[test]
fn failed_enumeration_releases_built_devices() {
    let registry = registry();
    let flaky = Arc::new(FlakyDriver::new());
    FakeFactory::new().with("flaky", flaky.clone()).register(&registry);

    let err = list_devices_for_driver(&registry, "flaky").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Construction);
    assert_eq!(flaky.live_devices(), 0);

    assert!(list_devices(&registry).is_err());
    assert_eq!(flaky.live_devices(), 0);

    let default = create_device(&registry, "flaky://").unwrap();
    assert_eq!(flaky.live_devices(), 1);
    drop(default);
    assert_eq!(flaky.live_devices(), 0);
}

// ============================================================================
// Thread-bound contexts
// ============================================================================

fn cuda_registry() -> (DriverRegistry, Arc<ThreadBoundDriver>) {
    let registry = registry();
    let driver = Arc::new(ThreadBoundDriver::new());
    FakeFactory::new().with("cuda", driver.clone()).register(&registry);
    (registry, driver)
}

#[test]
fn call_binds_context_on_every_thread() {
    let (registry, driver) = cuda_registry();
    let instance = create_instance().unwrap();
    let device = create_device(&registry, "cuda://0").unwrap();
    let module = binary_module("add");

    thread::scope(|scope| {
        for _ in 0..2 {
            scope.spawn(|| {
                let inputs = [
                    Tensor::from_slice(&[1.0f32, 2.0], &[2], ElementType::Float32).unwrap(),
                    Tensor::from_slice(&[3.0f32, 4.0], &[2], ElementType::Float32).unwrap(),
                ];
                let mut outputs = call(&instance, &device, "cuda", &module, &inputs).unwrap();
                assert_eq!(outputs[0].to_vec::<f32>().unwrap(), vec![4.0, 6.0]);
            });
        }
    });

    assert_eq!(driver.context.bound_thread_count(), 2);
    // one bind per call plus one per materialization
    assert_eq!(driver.context.bind_count(), 4);
}

#[test]
fn read_buffer_binds_context() {
    let (registry, driver) = cuda_registry();
    let instance = create_instance().unwrap();
    let device = create_device(&registry, "cuda://0").unwrap();

    let inputs = [
        Tensor::from_slice(&[1i64, 2], &[2], ElementType::Int64).unwrap(),
        Tensor::from_slice(&[1i64, 1], &[2], ElementType::Int64).unwrap(),
    ];
    let outputs = call(&instance, &device, "cuda", &binary_module("sub"), &inputs).unwrap();
    let binds = driver.context.bind_count();

    thread::scope(|scope| {
        scope.spawn(|| {
            let mut out = [0u8; 16];
            let written = read_buffer(&device, &outputs[0], ReadLength::Whole, &mut out).unwrap();
            assert_eq!(written, 16);
            assert_eq!(bytemuck::pod_collect_to_vec::<u8, i64>(&out), vec![0, 1]);
        });
    });
    assert_eq!(driver.context.bind_count(), binds + 1);
    assert_eq!(driver.context.bound_thread_count(), 2);
}

#[test]
fn unbound_driver_fails_on_a_fresh_thread() {
    let (registry, driver) = cuda_registry();
    let instance = create_instance().unwrap();
    let device = create_device(&registry, "cuda://0").unwrap();
    let config = BridgeConfig {
        context_bound_drivers: Vec::new(),
        ..BridgeConfig::default()
    };

    thread::scope(|scope| {
        scope.spawn(|| {
            let inputs = [
                Tensor::from_slice(&[1.0f32], &[1], ElementType::Float32).unwrap(),
                Tensor::from_slice(&[1.0f32], &[1], ElementType::Float32).unwrap(),
            ];
            let err = call_with_config(&instance, &device, "cuda", &binary_module("add"), &inputs, &config)
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Construction);
        });
    });
    assert_eq!(driver.context.bind_count(), 0);
}
