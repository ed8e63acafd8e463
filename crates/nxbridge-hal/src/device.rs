//! Device trait
//!
//! A device owns an allocator, moves bytes between host memory and its
//! buffers, and runs kernels over buffer views.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 Device trait                 │
//! │  - allocator()                               │
//! │  - transfer_h2d() / transfer_d2h()           │
//! │  - dispatch(kernel, inputs, output)          │
//! │  - execution_context()  (thread-bound only)  │
//! └──────────────────────┬───────────────────────┘
//!                        │
//!             ┌──────────┴──────────┐
//!             ▼                     ▼
//!      ┌─────────────┐       ┌─────────────┐
//!      │ local-sync  │       │ local-task  │
//!      │ (inline)    │       │ (rayon)     │
//!      └─────────────┘       └─────────────┘
//! ```
//!
//! Every operation completes before returning; the [`Timeout`] argument is
//! an upper bound for back-ends that queue work.

use crate::allocator::Allocator;
use crate::buffer::{Buffer, BufferView};
use crate::error::Result;
use crate::kernels::Kernel;
use std::sync::Arc;
use std::time::Duration;

/// Shared reference to a device
pub type DeviceRef = Arc<dyn Device>;

/// How long a blocking operation may wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    Infinite,
    After(Duration),
}

/// Native execution context that must be current on the calling thread
/// before a device can be used (GPU-style back-ends).
pub trait ExecutionContext: Send + Sync {
    /// Make the context current on the calling thread
    fn bind_to_current_thread(&self) -> Result<()>;

    fn is_bound_to_current_thread(&self) -> bool;
}

/// A concrete device created by a driver
pub trait Device: Send + Sync {
    /// Native device identifier, e.g. `"default"`
    fn id(&self) -> &str;

    fn driver_name(&self) -> &str;

    fn allocator(&self) -> &dyn Allocator;

    /// Copy `source` into `target` at `target_offset`
    fn transfer_h2d(&self, source: &[u8], target: &Buffer, target_offset: usize, timeout: Timeout) -> Result<()>;

    /// Copy `target.len()` bytes of `source` starting at `source_offset`
    fn transfer_d2h(&self, source: &Buffer, source_offset: usize, target: &mut [u8], timeout: Timeout) -> Result<()>;

    /// Run `kernel` reading `inputs` and writing `output`
    fn dispatch(&self, kernel: Kernel, inputs: &[&BufferView], output: &BufferView) -> Result<()>;

    /// Thread-bound context, if this back-end has one
    fn execution_context(&self) -> Option<&dyn ExecutionContext> {
        None
    }
}
