//! Error types for bridge operations
//!
//! Every failure falls into one of four stages of the bridge, plus
//! configuration. Native failures keep their [`HalError`] (and with it the
//! status code and diagnostic text).

use nxbridge_hal::{HalError, StatusCode};

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Stage of the bridge an error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Building an instance, device, module, tensor or input buffer
    Construction,
    /// Finding a driver, linking imports or resolving an entry point
    Resolution,
    /// Binding, invoking or extracting results
    Execution,
    /// Moving bytes between device and host
    Transfer,
    Config,
}

/// Errors returned by the bridge
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Construction(#[source] HalError),

    #[error("{0}")]
    Resolution(#[source] HalError),

    #[error("{0}")]
    Execution(#[source] HalError),

    #[error("{0}")]
    Transfer(#[source] HalError),

    #[error("INVALID_ARGUMENT; invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Construction(_) => ErrorKind::Construction,
            Error::Resolution(_) => ErrorKind::Resolution,
            Error::Execution(_) => ErrorKind::Execution,
            Error::Transfer(_) => ErrorKind::Transfer,
            Error::Config(_) => ErrorKind::Config,
        }
    }

    /// Native error behind this one, if any
    pub fn hal_error(&self) -> Option<&HalError> {
        match self {
            Error::Construction(e) | Error::Resolution(e) | Error::Execution(e) | Error::Transfer(e) => Some(e),
            Error::Config(_) => None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.hal_error()
            .map(HalError::code)
            .unwrap_or(StatusCode::InvalidArgument)
    }

    pub fn construction(msg: impl Into<String>) -> Self {
        Error::Construction(HalError::invalid_argument(msg))
    }
}
