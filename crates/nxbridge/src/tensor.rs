//! Tensor value model
//!
//! A [`Tensor`] carries its element type, dimensions and byte length next
//! to one of three backings:
//!
//! ```text
//!   None ──────────────────────────── metadata only
//!   Host(bytes) ───────────────────── owned host copy
//!   Device(view) ── materialize() ──> Host(bytes)
//! ```
//!
//! Host reads and serialization need a host copy. A device backing is
//! copied to the host once and then kept as host bytes, releasing the
//! buffer view.

use crate::codes::element_type_from_code;
use crate::config::BridgeConfig;
use crate::context::ensure_context_bound;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::wire;
use nxbridge_hal::buffer::compute_byte_length;
use nxbridge_hal::{BufferViewRef, DeviceRef, ElementType, Timeout};
use std::fmt;

/// Which backing a tensor currently holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackingKind {
    None,
    Host,
    Device,
}

enum Backing {
    None,
    Host(Vec<u8>),
    Device {
        view: BufferViewRef,
        device: DeviceRef,
        bind_context: bool,
    },
}

/// Tensor value exchanged with the host.
///
/// Single owner; dropping it frees the host bytes or releases the buffer
/// view reference.
pub struct Tensor {
    element_type: ElementType,
    dims: Vec<i64>,
    byte_len: usize,
    backing: Backing,
}

impl Tensor {
    // ============================================================================
    // Construction
    // ============================================================================

    /// Copy `data` into a host-backed tensor.
    ///
    /// `data` must be exactly the dense byte length of `dims`.
    pub fn from_host(data: &[u8], dims: &[i64], element_type: ElementType) -> Result<Self> {
        check_host_len(data.len(), dims, element_type)?;
        Self::from_vec(data.to_vec(), dims, element_type)
    }

    /// Host-backed tensor that takes ownership of `data` without copying
    pub fn from_vec(data: Vec<u8>, dims: &[i64], element_type: ElementType) -> Result<Self> {
        let byte_len = check_host_len(data.len(), dims, element_type)?;
        Ok(Self {
            element_type,
            dims: dims.to_vec(),
            byte_len,
            backing: Backing::Host(data),
        })
    }

    /// Host-backed tensor from typed elements
    pub fn from_slice<T: bytemuck::Pod>(data: &[T], dims: &[i64], element_type: ElementType) -> Result<Self> {
        check_element_size::<T>(element_type)?;
        Self::from_host(bytemuck::cast_slice(data), dims, element_type)
    }

    /// Host-backed tensor from a short type code such as `"f32"`
    pub fn from_code(data: &[u8], dims: &[i64], code: &str) -> Result<Self> {
        let element_type = element_type_from_code(code);
        if !element_type.is_valid() {
            return Err(Error::construction(format!("unknown element type code '{code}'")));
        }
        Self::from_host(data, dims, element_type)
    }

    /// Metadata-only tensor with no backing storage
    pub fn placeholder(dims: &[i64], element_type: ElementType) -> Result<Self> {
        let byte_len = compute_byte_length(dims, element_type).map_err(Error::Construction)?;
        Ok(Self {
            element_type,
            dims: dims.to_vec(),
            byte_len,
            backing: Backing::None,
        })
    }

    /// Take ownership of a buffer view living on `device`.
    ///
    /// Shape, element type and byte length come from the view.
    pub fn from_buffer_view(view: BufferViewRef, device: &Device, config: &BridgeConfig) -> Self {
        let bind_context = config.requires_context_binding(device.driver_name());
        Self::from_device_view(view, device.native().clone(), bind_context)
    }

    pub(crate) fn from_device_view(view: BufferViewRef, device: DeviceRef, bind_context: bool) -> Self {
        Self {
            element_type: view.element_type(),
            dims: view.shape().to_vec(),
            byte_len: view.byte_length(),
            backing: Backing::Device {
                view,
                device,
                bind_context,
            },
        }
    }

    /// Rebuild a host tensor from a [`wire`] blob
    pub fn deserialize(blob: &[u8]) -> Result<Self> {
        let decoded = wire::decode(blob)?;
        Self::from_vec(decoded.data, &decoded.dims, decoded.element_type)
    }

    // ============================================================================
    // Metadata
    // ============================================================================

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn dims(&self) -> &[i64] {
        &self.dims
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    pub fn backing_kind(&self) -> BackingKind {
        match self.backing {
            Backing::None => BackingKind::None,
            Backing::Host(_) => BackingKind::Host,
            Backing::Device { .. } => BackingKind::Device,
        }
    }

    /// Device buffer view, while the tensor is device-backed
    pub fn buffer_view(&self) -> Option<&BufferViewRef> {
        match &self.backing {
            Backing::Device { view, .. } => Some(view),
            _ => None,
        }
    }

    /// Host bytes without triggering a device copy
    pub fn host_bytes(&self) -> Option<&[u8]> {
        match &self.backing {
            Backing::Host(bytes) => Some(bytes),
            _ => None,
        }
    }

    // ============================================================================
    // Host access
    // ============================================================================

    /// Copy a device backing to the host. No-op for host tensors.
    pub fn materialize(&mut self) -> Result<()> {
        let bytes = match &self.backing {
            Backing::Host(_) => return Ok(()),
            Backing::None => {
                return Err(Error::Transfer(nxbridge_hal::HalError::FailedPrecondition(
                    "tensor has no backing storage".to_string(),
                )))
            }
            Backing::Device {
                view,
                device,
                bind_context,
            } => {
                ensure_context_bound(device.as_ref(), *bind_context).map_err(Error::Execution)?;
                let mut bytes = vec![0u8; self.byte_len];
                device
                    .transfer_d2h(view.buffer(), 0, &mut bytes, Timeout::Infinite)
                    .map_err(Error::Transfer)?;
                tracing::trace!(bytes = self.byte_len, "tensor_materialized");
                bytes
            }
        };
        self.backing = Backing::Host(bytes);
        Ok(())
    }

    /// Host bytes, copying from the device on first use
    pub fn host_data(&mut self) -> Result<&[u8]> {
        self.materialize()?;
        Ok(self.host_bytes().unwrap_or_default())
    }

    /// Elements as `T`; `T` must match the element size
    pub fn to_vec<T: bytemuck::Pod>(&mut self) -> Result<Vec<T>> {
        check_element_size::<T>(self.element_type)?;
        let bytes = self.host_data()?;
        let mut out = vec![T::zeroed(); bytes.len() / std::mem::size_of::<T>().max(1)];
        bytemuck::cast_slice_mut::<T, u8>(&mut out).copy_from_slice(bytes);
        Ok(out)
    }

    /// Encode as a [`wire`] blob, materializing first
    pub fn serialize(&mut self) -> Result<Vec<u8>> {
        self.materialize()?;
        let data = self.host_bytes().unwrap_or_default();
        Ok(wire::encode(self.element_type, data, &self.dims))
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("element_type", &self.element_type)
            .field("dims", &self.dims)
            .field("byte_len", &self.byte_len)
            .field("backing", &self.backing_kind())
            .finish()
    }
}

/// Dense byte length of `dims`, which `len` must equal
fn check_host_len(len: usize, dims: &[i64], element_type: ElementType) -> Result<usize> {
    let byte_len = compute_byte_length(dims, element_type).map_err(Error::Construction)?;
    if len != byte_len {
        return Err(Error::construction(format!(
            "tensor of {} {} elements needs {} bytes, got {}",
            describe_dims(dims),
            element_type,
            byte_len,
            len
        )));
    }
    Ok(byte_len)
}

fn check_element_size<T>(element_type: ElementType) -> Result<()> {
    let size = std::mem::size_of::<T>();
    if size != element_type.size_bytes() {
        return Err(Error::construction(format!(
            "{}-byte host elements do not match {} ({} bytes)",
            size,
            element_type,
            element_type.size_bytes()
        )));
    }
    Ok(())
}

fn describe_dims(dims: &[i64]) -> String {
    let parts: Vec<_> = dims.iter().map(i64::to_string).collect();
    format!("[{}]", parts.join("x"))
}
