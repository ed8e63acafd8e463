//! Thread binding of native execution contexts

use nxbridge_hal::{Device, HalError, Result};

/// Bind the device's execution context to the calling thread when
/// `required`.
///
/// Called before every operation that touches the device, on whatever
/// thread runs it.
pub fn ensure_context_bound(device: &dyn Device, required: bool) -> Result<()> {
    if !required {
        return Ok(());
    }
    let context = device.execution_context().ok_or_else(|| {
        HalError::FailedPrecondition(format!(
            "driver '{}' requires a thread-bound context but device '{}' exposes none",
            device.driver_name(),
            device.id()
        ))
    })?;
    context.bind_to_current_thread()?;
    tracing::trace!(driver = device.driver_name(), "execution_context_bound");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nxbridge_hal::drivers::LocalDevice;

    #[test]
    fn not_required_is_a_no_op() {
        let device = LocalDevice::new("local-sync", "default", false);
        ensure_context_bound(&device, false).unwrap();
    }

    #[test]
    fn required_without_context_fails() {
        let device = LocalDevice::new("cuda", "0", false);
        let err = ensure_context_bound(&device, true).unwrap_err();
        assert_eq!(err.code(), nxbridge_hal::StatusCode::FailedPrecondition);
    }
}
