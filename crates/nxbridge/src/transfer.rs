//! Device-to-host reads of tensor buffers

use crate::config::BridgeConfig;
use crate::context::ensure_context_bound;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::tensor::Tensor;
use nxbridge_hal::{HalError, Timeout};
use nxbridge_tracing::performance::record_transfer;
use std::time::Instant;

/// How many bytes [`read_buffer`] copies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadLength {
    /// The full length of the buffer view
    Whole,
    Bytes(usize),
}

impl ReadLength {
    /// Host encoding: `-1` reads the whole view
    pub fn from_host(num_bytes: i64) -> Result<Self> {
        match num_bytes {
            -1 => Ok(Self::Whole),
            n => usize::try_from(n)
                .map(Self::Bytes)
                .map_err(|_| Error::Transfer(HalError::invalid_argument(format!("invalid read length {n}")))),
        }
    }
}

pub fn read_buffer(device: &Device, tensor: &Tensor, length: ReadLength, out: &mut [u8]) -> Result<usize> {
    read_buffer_with_config(device, tensor, length, out, &BridgeConfig::default())
}

/// Copy the start of `tensor`'s buffer view into `out`.
///
/// Blocks until the copy completes. Returns the number of bytes written.
/// The tensor must be device-backed; its backing is left untouched.
#[tracing::instrument(skip(device, tensor, out, config), fields(uri = device.uri(), bytes = tracing::field::Empty))]
pub fn read_buffer_with_config(
    device: &Device,
    tensor: &Tensor,
    length: ReadLength,
    out: &mut [u8],
    config: &BridgeConfig,
) -> Result<usize> {
    let native = device.native();
    ensure_context_bound(native.as_ref(), config.requires_context_binding(device.driver_name()))
        .map_err(Error::Execution)?;

    let view = tensor.buffer_view().ok_or_else(|| {
        Error::Transfer(HalError::FailedPrecondition(
            "tensor has no device buffer view to read".to_string(),
        ))
    })?;
    let available = view.byte_length();
    let requested = match length {
        ReadLength::Whole => available,
        ReadLength::Bytes(n) => n,
    };
    if requested > available {
        return Err(Error::Transfer(HalError::OutOfRange(format!(
            "requested {requested} bytes from a buffer view of {available} bytes"
        ))));
    }
    if requested > out.len() {
        return Err(Error::Transfer(HalError::OutOfRange(format!(
            "destination holds {} bytes, {requested} requested",
            out.len()
        ))));
    }
    tracing::Span::current().record("bytes", requested);

    let start = Instant::now();
    native
        .transfer_d2h(view.buffer(), 0, &mut out[..requested], Timeout::Infinite)
        .map_err(Error::Transfer)?;
    record_transfer(requested, "D2H", start.elapsed().as_micros() as u64);
    Ok(requested)
}

/// [`read_buffer`] into a freshly allocated vector
pub fn read_buffer_to_vec(device: &Device, tensor: &Tensor, length: ReadLength) -> Result<Vec<u8>> {
    read_buffer_to_vec_with_config(device, tensor, length, &BridgeConfig::default())
}

pub fn read_buffer_to_vec_with_config(
    device: &Device,
    tensor: &Tensor,
    length: ReadLength,
    config: &BridgeConfig,
) -> Result<Vec<u8>> {
    let available = tensor.buffer_view().map_or(0, |view| view.byte_length());
    let capacity = match length {
        ReadLength::Whole => available,
        ReadLength::Bytes(n) => n.min(available),
    };
    let mut out = vec![0u8; capacity];
    let written = read_buffer_with_config(device, tensor, length, &mut out, config)?;
    out.truncate(written);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_read_length_encoding() {
        assert_eq!(ReadLength::from_host(-1).unwrap(), ReadLength::Whole);
        assert_eq!(ReadLength::from_host(16).unwrap(), ReadLength::Bytes(16));
        assert!(ReadLength::from_host(-2).is_err());
    }
}
