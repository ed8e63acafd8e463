//! Fake back-ends and module builders shared by the integration tests
#![allow(dead_code)]

use nxbridge::{register_all_drivers, register_driver_factory, DriverRegistry};
use nxbridge_hal::allocator::Allocator;
use nxbridge_hal::drivers::{LocalDevice, LocalDriver};
use nxbridge_hal::kernels::Kernel;
use nxbridge_hal::vm::{FunctionBuilder, ModuleBuilder};
use nxbridge_hal::{
    Buffer, BufferView, Device, DeviceInfo, DeviceRef, Driver, DriverFactory, DriverInfo, ExecutionContext,
    HalError, Result, Timeout,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

pub fn registry() -> DriverRegistry {
    nxbridge_tracing::init_test_tracing();
    let registry = DriverRegistry::new();
    register_all_drivers(&registry).unwrap();
    registry
}

// ============================================================================
// Modules
// ============================================================================

/// `main(a, b) = hal.elementwise.<op>(a, b)`
pub fn binary_module(op: &str) -> Vec<u8> {
    let mut module = ModuleBuilder::new("module");
    let import = module.import(format!("hal.elementwise.{op}"), "0rr_r");
    let main = module.add_function(FunctionBuilder::new("main", "0rr_r").call_import(import, &[0, 1], &[2]).ret(&[2]));
    module.export("main", main);
    module.build().unwrap()
}

/// `main()` that does nothing
pub fn empty_module() -> Vec<u8> {
    let mut module = ModuleBuilder::new("module");
    let main = module.add_function(FunctionBuilder::new("main", "0v_v").ret(&[]));
    module.export("main", main);
    module.build().unwrap()
}

/// `main() -> i32` whose result is not a buffer view
pub fn integer_module() -> Vec<u8> {
    let mut module = ModuleBuilder::new("module");
    let main = module.add_function(FunctionBuilder::new("main", "0v_i").const_i32(0, 7).ret(&[0]));
    module.export("main", main);
    module.build().unwrap()
}

/// Module that exports `helper` but no `main`
pub fn module_without_main() -> Vec<u8> {
    let mut module = ModuleBuilder::new("module");
    let helper = module.add_function(FunctionBuilder::new("helper", "0v_v").ret(&[]));
    module.export("helper", helper);
    module.build().unwrap()
}

// ============================================================================
// Factory
// ============================================================================

/// Factory serving a fixed set of drivers
pub struct FakeFactory {
    drivers: Vec<(DriverInfo, Arc<dyn Driver>)>,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self { drivers: Vec::new() }
    }

    pub fn with(mut self, name: &str, driver: Arc<dyn Driver>) -> Self {
        self.drivers.push((DriverInfo::new(name, format!("fake {name} driver")), driver));
        self
    }

    pub fn register(self, registry: &DriverRegistry) {
        register_driver_factory(registry, Arc::new(self)).unwrap();
    }
}

impl DriverFactory for FakeFactory {
    fn enumerate(&self) -> Vec<DriverInfo> {
        self.drivers.iter().map(|(info, _)| info.clone()).collect()
    }

    fn try_create(&self, driver_name: &str) -> Result<Arc<dyn Driver>> {
        self.drivers
            .iter()
            .find(|(info, _)| info.driver_name == driver_name)
            .map(|(_, driver)| Arc::clone(driver))
            .ok_or_else(|| HalError::not_found(format!("no fake driver '{driver_name}'")))
    }
}

/// A `hip` back-end that would otherwise list devices
pub fn hip_driver() -> Arc<dyn Driver> {
    Arc::new(LocalDriver::new("hip", false))
}

// ============================================================================
// Thread-bound device
// ============================================================================

/// Execution context that remembers which threads bound it
#[derive(Default)]
pub struct ThreadContext {
    threads: Mutex<HashSet<ThreadId>>,
    binds: AtomicUsize,
}

impl ThreadContext {
    pub fn bind_count(&self) -> usize {
        self.binds.load(Ordering::SeqCst)
    }

    pub fn bound_thread_count(&self) -> usize {
        self.threads.lock().len()
    }
}

impl ExecutionContext for ThreadContext {
    fn bind_to_current_thread(&self) -> Result<()> {
        self.threads.lock().insert(thread::current().id());
        self.binds.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_bound_to_current_thread(&self) -> bool {
        self.threads.lock().contains(&thread::current().id())
    }
}

/// Local device that refuses work on threads its context is not bound to
pub struct ThreadBoundDevice {
    inner: LocalDevice,
    context: Arc<ThreadContext>,
}

impl ThreadBoundDevice {
    fn check_bound(&self) -> Result<()> {
        if self.context.is_bound_to_current_thread() {
            Ok(())
        } else {
            Err(HalError::FailedPrecondition(
                "execution context is not bound to this thread".to_string(),
            ))
        }
    }
}

impl Device for ThreadBoundDevice {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn driver_name(&self) -> &str {
        self.inner.driver_name()
    }

    fn allocator(&self) -> &dyn Allocator {
        self.inner.allocator()
    }

    fn transfer_h2d(&self, source: &[u8], target: &Buffer, target_offset: usize, timeout: Timeout) -> Result<()> {
        self.check_bound()?;
        self.inner.transfer_h2d(source, target, target_offset, timeout)
    }

    fn transfer_d2h(&self, source: &Buffer, source_offset: usize, target: &mut [u8], timeout: Timeout) -> Result<()> {
        self.check_bound()?;
        self.inner.transfer_d2h(source, source_offset, target, timeout)
    }

    fn dispatch(&self, kernel: Kernel, inputs: &[&BufferView], output: &BufferView) -> Result<()> {
        self.check_bound()?;
        self.inner.dispatch(kernel, inputs, output)
    }

    fn execution_context(&self) -> Option<&dyn ExecutionContext> {
        Some(self.context.as_ref())
    }
}

/// Driver named `cuda` whose devices share one [`ThreadContext`]
pub struct ThreadBoundDriver {
    pub context: Arc<ThreadContext>,
}

impl ThreadBoundDriver {
    pub fn new() -> Self {
        Self {
            context: Arc::new(ThreadContext::default()),
        }
    }
}

impl Driver for ThreadBoundDriver {
    fn name(&self) -> &str {
        "cuda"
    }

    fn create_default_device(&self) -> Result<DeviceRef> {
        self.create_device_by_path("0")
    }

    fn query_available_devices(&self) -> Result<Vec<DeviceInfo>> {
        Ok(vec![DeviceInfo {
            device_id: 0,
            path: "0".to_string(),
            name: "fake gpu".to_string(),
        }])
    }

    fn create_device_by_path(&self, path: &str) -> Result<DeviceRef> {
        Ok(Arc::new(ThreadBoundDevice {
            inner: LocalDevice::new("cuda", path, false),
            context: Arc::clone(&self.context),
        }))
    }
}

// ============================================================================
// Enumeration that fails part-way
// ============================================================================

/// Local device that tracks how many of its kind are alive
pub struct CountedDevice {
    inner: LocalDevice,
    live: Arc<AtomicUsize>,
}

impl CountedDevice {
    fn new(path: &str, live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self {
            inner: LocalDevice::new("flaky", path, false),
            live: Arc::clone(live),
        }
    }
}

impl Drop for CountedDevice {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Device for CountedDevice {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn driver_name(&self) -> &str {
        self.inner.driver_name()
    }

    fn allocator(&self) -> &dyn Allocator {
        self.inner.allocator()
    }

    fn transfer_h2d(&self, source: &[u8], target: &Buffer, target_offset: usize, timeout: Timeout) -> Result<()> {
        self.inner.transfer_h2d(source, target, target_offset, timeout)
    }

    fn transfer_d2h(&self, source: &Buffer, source_offset: usize, target: &mut [u8], timeout: Timeout) -> Result<()> {
        self.inner.transfer_d2h(source, source_offset, target, timeout)
    }

    fn dispatch(&self, kernel: Kernel, inputs: &[&BufferView], output: &BufferView) -> Result<()> {
        self.inner.dispatch(kernel, inputs, output)
    }
}

/// Enumerates three devices but cannot open the last one
pub struct FlakyDriver {
    pub live: Arc<AtomicUsize>,
}

impl FlakyDriver {
    pub fn new() -> Self {
        Self {
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn live_devices(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl Driver for FlakyDriver {
    fn name(&self) -> &str {
        "flaky"
    }

    fn create_default_device(&self) -> Result<DeviceRef> {
        Ok(Arc::new(CountedDevice::new("default", &self.live)))
    }

    fn query_available_devices(&self) -> Result<Vec<DeviceInfo>> {
        Ok((0..3)
            .map(|i| DeviceInfo {
                device_id: i,
                path: i.to_string(),
                name: format!("flaky {i}"),
            })
            .collect())
    }

    fn create_device_by_path(&self, path: &str) -> Result<DeviceRef> {
        if path == "2" {
            return Err(HalError::Unavailable(format!("device {path} is unplugged")));
        }
        Ok(Arc::new(CountedDevice::new(path, &self.live)))
    }
}
