//! Device allocators
//!
//! [`HeapAllocator`] backs every local device: allocations are plain host
//! heap vectors behind a lock, and statistics are kept so leaks show up in
//! tests. Dropping the last reference to a [`Buffer`] releases its bytes.

use crate::buffer::{Buffer, BufferParams, BufferStorage};
use crate::error::{HalError, Result};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::sync::Arc;

/// Allocation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocatorStatistics {
    pub live_buffers: usize,
    pub live_bytes: usize,
    pub peak_bytes: usize,
    pub total_allocations: u64,
}

/// Allocator owned by a device
pub trait Allocator: Send + Sync {
    /// Human-readable identifier, e.g. `"local-sync"`
    fn identifier(&self) -> &str;

    fn allocate_buffer(&self, params: BufferParams, byte_length: usize) -> Result<Arc<Buffer>>;

    fn statistics(&self) -> AllocatorStatistics;
}

/// Host-heap allocator used by the local drivers
pub struct HeapAllocator {
    identifier: String,
    limit_bytes: Option<usize>,
    stats: Arc<Mutex<AllocatorStatistics>>,
}

impl HeapAllocator {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            limit_bytes: None,
            stats: Arc::new(Mutex::new(AllocatorStatistics::default())),
        }
    }

    /// Cap the number of live bytes; allocations past it fail with
    /// `RESOURCE_EXHAUSTED`.
    pub fn with_limit(mut self, limit_bytes: usize) -> Self {
        self.limit_bytes = Some(limit_bytes);
        self
    }
}

impl Allocator for HeapAllocator {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn allocate_buffer(&self, params: BufferParams, byte_length: usize) -> Result<Arc<Buffer>> {
        {
            let mut stats = self.stats.lock();
            if let Some(limit) = self.limit_bytes {
                if stats.live_bytes + byte_length > limit {
                    return Err(HalError::ResourceExhausted(format!(
                        "allocation of {} bytes exceeds allocator limit of {} bytes ({} in use)",
                        byte_length, limit, stats.live_bytes
                    )));
                }
            }
            stats.live_buffers += 1;
            stats.live_bytes += byte_length;
            stats.peak_bytes = stats.peak_bytes.max(stats.live_bytes);
            stats.total_allocations += 1;
        }

        tracing::trace!(allocator = %self.identifier, byte_length, "buffer_allocated");

        let storage = HeapStorage {
            bytes: RwLock::new(vec![0u8; byte_length]),
            stats: Arc::clone(&self.stats),
        };
        Ok(Arc::new(Buffer::new(byte_length, params, Box::new(storage))))
    }

    fn statistics(&self) -> AllocatorStatistics {
        *self.stats.lock()
    }
}

/// Heap backing of a buffer produced by [`HeapAllocator`]
pub struct HeapStorage {
    bytes: RwLock<Vec<u8>>,
    stats: Arc<Mutex<AllocatorStatistics>>,
}

impl HeapStorage {
    /// Run `f` over the whole allocation, mutably
    pub fn with_bytes_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        f(&mut self.bytes.write())
    }
}

impl BufferStorage for HeapStorage {
    fn read(&self, offset: usize, target: &mut [u8]) -> Result<()> {
        let bytes = self.bytes.read();
        let end = checked_end(offset, target.len(), bytes.len())?;
        target.copy_from_slice(&bytes[offset..end]);
        Ok(())
    }

    fn write(&self, offset: usize, source: &[u8]) -> Result<()> {
        let mut bytes = self.bytes.write();
        let end = checked_end(offset, source.len(), bytes.len())?;
        bytes[offset..end].copy_from_slice(source);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for HeapStorage {
    fn drop(&mut self) {
        let len = self.bytes.get_mut().len();
        let mut stats = self.stats.lock();
        stats.live_buffers = stats.live_buffers.saturating_sub(1);
        stats.live_bytes = stats.live_bytes.saturating_sub(len);
    }
}

fn checked_end(offset: usize, size: usize, buffer_size: usize) -> Result<usize> {
    match offset.checked_add(size) {
        Some(end) if end <= buffer_size => Ok(end),
        _ => Err(HalError::BufferOutOfBounds {
            offset,
            size,
            buffer_size,
        }),
    }
}
