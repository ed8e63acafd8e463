//! Native runtime for nxbridge
//!
//! A small hardware abstraction layer plus the bytecode VM that drives it.
//! The bridge crate consumes everything through this surface:
//!
//! - [`error`]: status codes and [`HalError`]
//! - [`element_type`], [`buffer`], [`allocator`]: typed device memory
//! - [`device`], [`driver`], [`registry`]: back-end discovery and devices
//! - [`drivers`]: the compiled-in `local-sync` and `local-task` back-ends
//! - [`kernels`]: host element-wise kernels used by the local devices
//! - [`vm`]: instance, bytecode modules, HAL module, contexts, invocation
//!
//! # Example
//!
//! ```rust
//! use nxbridge_hal::drivers::register_all_available_drivers;
//! use nxbridge_hal::registry::DriverRegistry;
//! use nxbridge_hal::Device;
//!
//! let registry = DriverRegistry::new();
//! register_all_available_drivers(&registry).unwrap();
//! let device = registry.create_device("local-sync://default").unwrap();
//! assert_eq!(device.driver_name(), "local-sync");
//! ```

pub mod allocator;
pub mod buffer;
pub mod device;
pub mod driver;
pub mod drivers;
pub mod element_type;
pub mod error;
pub mod kernels;
pub mod registry;
pub mod vm;

pub use buffer::{Buffer, BufferParams, BufferView, BufferViewRef};
pub use device::{Device, DeviceRef, ExecutionContext, Timeout};
pub use driver::{DeviceInfo, Driver, DriverFactory, DriverInfo};
pub use element_type::ElementType;
pub use error::{HalError, Result, StatusCode};
pub use registry::DriverRegistry;
