//! Buffers and buffer views
//!
//! A [`Buffer`] is a device allocation; its backing memory is released when
//! the last reference drops. A [`BufferView`] annotates a buffer with an
//! element type and a shape and is what crosses module boundaries. Both are
//! shared through `Arc`, so "retain" is `Arc::clone` and "release" is `drop`.

use crate::device::Device;
use crate::element_type::ElementType;
use crate::error::{HalError, Result};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Shared reference to a buffer view
pub type BufferViewRef = Arc<BufferView>;

/// Memory placement of an allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryType {
    DeviceLocal,
    HostVisible,
}

/// Intended use of an allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Transfer + dispatch storage
    Default,
    /// Transfer only
    Transfer,
}

/// Allocation parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferParams {
    pub usage: BufferUsage,
    pub memory_type: MemoryType,
}

impl Default for BufferParams {
    fn default() -> Self {
        Self {
            usage: BufferUsage::Default,
            memory_type: MemoryType::DeviceLocal,
        }
    }
}

/// Backing memory of a buffer, implemented per allocator
pub trait BufferStorage: Send + Sync {
    /// Copy `target.len()` bytes starting at `offset` out of the allocation
    fn read(&self, offset: usize, target: &mut [u8]) -> Result<()>;

    /// Copy `source` into the allocation starting at `offset`
    fn write(&self, offset: usize, source: &[u8]) -> Result<()>;

    /// Downcast hook for drivers that operate on their own storage directly
    fn as_any(&self) -> &dyn Any;
}

/// A device allocation
pub struct Buffer {
    byte_length: usize,
    params: BufferParams,
    storage: Box<dyn BufferStorage>,
}

impl Buffer {
    pub fn new(byte_length: usize, params: BufferParams, storage: Box<dyn BufferStorage>) -> Self {
        Self {
            byte_length,
            params,
            storage,
        }
    }

    pub fn byte_length(&self) -> usize {
        self.byte_length
    }

    pub fn params(&self) -> BufferParams {
        self.params
    }

    pub fn storage(&self) -> &dyn BufferStorage {
        self.storage.as_ref()
    }

    /// Bounds check for a `[offset, offset + size)` access
    pub fn check_range(&self, offset: usize, size: usize) -> Result<()> {
        match offset.checked_add(size) {
            Some(end) if end <= self.byte_length => Ok(()),
            _ => Err(HalError::BufferOutOfBounds {
                offset,
                size,
                buffer_size: self.byte_length,
            }),
        }
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("byte_length", &self.byte_length)
            .field("params", &self.params)
            .finish()
    }
}

/// Row-major dense layout is the only encoding produced by this runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingType {
    DenseRowMajor,
}

/// Typed, shaped view over a buffer
#[derive(Debug)]
pub struct BufferView {
    buffer: Arc<Buffer>,
    shape: Vec<i64>,
    element_type: ElementType,
    encoding: EncodingType,
}

impl BufferView {
    /// Wrap `buffer`; the buffer must be large enough for the shape.
    pub fn new(buffer: Arc<Buffer>, shape: Vec<i64>, element_type: ElementType) -> Result<BufferViewRef> {
        let byte_length = compute_byte_length(&shape, element_type)?;
        if byte_length > buffer.byte_length() {
            return Err(HalError::OutOfRange(format!(
                "buffer view of {} bytes does not fit in buffer of {} bytes",
                byte_length,
                buffer.byte_length()
            )));
        }
        Ok(Arc::new(Self {
            buffer,
            shape,
            element_type,
            encoding: EncodingType::DenseRowMajor,
        }))
    }

    pub fn buffer(&self) -> &Arc<Buffer> {
        &self.buffer
    }

    pub fn shape(&self) -> &[i64] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn encoding(&self) -> EncodingType {
        self.encoding
    }

    pub fn element_count(&self) -> usize {
        self.shape.iter().map(|&d| d as usize).product()
    }

    /// Bytes covered by the view (element count × element size)
    pub fn byte_length(&self) -> usize {
        self.element_count() * self.element_type.size_bytes()
    }
}

/// Dense byte length of `shape` elements of `element_type`
pub fn compute_byte_length(shape: &[i64], element_type: ElementType) -> Result<usize> {
    if !element_type.is_valid() {
        return Err(HalError::invalid_argument("element type NONE has no size"));
    }
    let mut count: usize = 1;
    for &dim in shape {
        let dim = usize::try_from(dim).map_err(|_| HalError::invalid_argument(format!("negative dimension {dim}")))?;
        count = count
            .checked_mul(dim)
            .ok_or_else(|| HalError::invalid_argument("shape element count overflows"))?;
    }
    count
        .checked_mul(element_type.size_bytes())
        .ok_or_else(|| HalError::invalid_argument("shape byte length overflows"))
}

/// Allocate a buffer on `device`, fill it with `data` and wrap it in a view.
///
/// `data` must hold exactly the dense byte length of `shape`.
pub fn allocate_buffer_copy(
    device: &dyn Device,
    shape: &[i64],
    element_type: ElementType,
    params: BufferParams,
    data: &[u8],
) -> Result<BufferViewRef> {
    let byte_length = compute_byte_length(shape, element_type)?;
    if data.len() != byte_length {
        return Err(HalError::invalid_argument(format!(
            "initial data of {} bytes does not match buffer view of {} bytes",
            data.len(),
            byte_length
        )));
    }
    let buffer = device.allocator().allocate_buffer(params, byte_length)?;
    device.transfer_h2d(data, &buffer, 0, crate::device::Timeout::Infinite)?;
    BufferView::new(buffer, shape.to_vec(), element_type)
}
