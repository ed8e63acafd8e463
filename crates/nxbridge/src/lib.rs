//! nxbridge: run precompiled VM bytecode against tensors on a HAL device
//!
//! A host hands over compiled module bytes and a list of tensors, and gets
//! tensors (or a [`Status`] with a diagnostic) back.
//!
//! ```text
//! ┌──────────┐  create_instance   ┌──────────┐
//! │   host   │ ─────────────────> │ Instance │ ──┐
//! │          │  create_device     ┌──────────┐   │   call
//! │          │ ─────────────────> │  Device  │ ──┼──────────> Vec<Tensor>
//! │          │  Tensor::from_*    ┌──────────┐   │
//! │          │ ─────────────────> │  Tensor  │ ──┘
//! └──────────┘                    └──────────┘
//! ```
//!
//! - [`instance`]: VM instance with the HAL types registered
//! - [`registry`], [`device`]: driver discovery, device creation, listings
//! - [`tensor`], [`wire`], [`codes`]: the tensor value model and its formats
//! - [`pipeline`]: `call` (load, link, invoke, extract)
//! - [`transfer`]: `read_buffer`
//! - [`status`], [`error`], [`config`]: the host-facing ambient surface
//!
//! # Example
//!
//! ```rust
//! use nxbridge::{create_device, create_instance, get_driver_registry, register_all_drivers};
//!
//! let registry = get_driver_registry();
//! register_all_drivers(&registry).unwrap();
//!
//! let instance = create_instance().unwrap();
//! let device = create_device(&registry, "local-sync://default").unwrap();
//! assert_eq!(device.driver_name(), "local-sync");
//! # drop((instance, device));
//! ```

pub mod codes;
pub mod config;
pub mod context;
pub mod device;
pub mod error;
pub mod instance;
pub mod pipeline;
pub mod registry;
pub mod status;
pub mod tensor;
pub mod transfer;
pub mod wire;

pub use codes::{element_type_from_code, element_type_to_code};
pub use config::BridgeConfig;
pub use context::ensure_context_bound;
pub use device::{
    create_device, list_devices, list_devices_for_driver, list_devices_for_driver_with_config,
    list_devices_with_config, Device,
};
pub use error::{Error, ErrorKind, Result};
pub use instance::{create_instance, create_instance_with_config, Instance};
pub use pipeline::{call, call_with_config, ENTRY_POINT};
pub use registry::{
    get_driver_registry, list_drivers, list_drivers_with_config, register_all_drivers, register_driver_factory,
    Driver,
};
pub use status::Status;
pub use tensor::{BackingKind, Tensor};
pub use transfer::{
    read_buffer, read_buffer_to_vec, read_buffer_to_vec_with_config, read_buffer_with_config, ReadLength,
};

pub use nxbridge_hal::{DriverRegistry, ElementType};
