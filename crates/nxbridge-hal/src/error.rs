//! Error types for HAL and VM operations
//!
//! Every failure carries a [`StatusCode`]; the `Display` form is
//! `"<CODE>; <message>"`, which is the diagnostic text the bridge forwards to
//! its callers.

use std::fmt;

/// Result type for HAL and VM operations
pub type Result<T> = std::result::Result<T, HalError>;

/// Canonical status codes of the native runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    InvalidArgument,
    NotFound,
    AlreadyExists,
    FailedPrecondition,
    OutOfRange,
    ResourceExhausted,
    Unavailable,
    Unimplemented,
    Internal,
}

impl StatusCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            StatusCode::InvalidArgument => "INVALID_ARGUMENT",
            StatusCode::NotFound => "NOT_FOUND",
            StatusCode::AlreadyExists => "ALREADY_EXISTS",
            StatusCode::FailedPrecondition => "FAILED_PRECONDITION",
            StatusCode::OutOfRange => "OUT_OF_RANGE",
            StatusCode::ResourceExhausted => "RESOURCE_EXHAUSTED",
            StatusCode::Unavailable => "UNAVAILABLE",
            StatusCode::Unimplemented => "UNIMPLEMENTED",
            StatusCode::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur in HAL and VM operations
#[derive(Debug, thiserror::Error)]
pub enum HalError {
    #[error("INVALID_ARGUMENT; {0}")]
    InvalidArgument(String),

    #[error("NOT_FOUND; {0}")]
    NotFound(String),

    #[error("ALREADY_EXISTS; {0}")]
    AlreadyExists(String),

    #[error("FAILED_PRECONDITION; {0}")]
    FailedPrecondition(String),

    #[error("OUT_OF_RANGE; {0}")]
    OutOfRange(String),

    /// Buffer access past the end of an allocation
    #[error("OUT_OF_RANGE; buffer access out of bounds: offset {offset} + size {size} > buffer size {buffer_size}")]
    BufferOutOfBounds {
        offset: usize,
        size: usize,
        buffer_size: usize,
    },

    #[error("RESOURCE_EXHAUSTED; {0}")]
    ResourceExhausted(String),

    #[error("UNAVAILABLE; {0}")]
    Unavailable(String),

    #[error("UNIMPLEMENTED; {0}")]
    Unimplemented(String),

    /// Operand element types or shapes disagree
    #[error("INVALID_ARGUMENT; type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Bytecode container could not be parsed or verified
    #[error("INVALID_ARGUMENT; invalid bytecode module: {0}")]
    InvalidModule(String),

    /// Bytecode body could not be decoded
    #[error("INVALID_ARGUMENT; bytecode decode failed: {0}")]
    Decode(#[from] bincode::Error),

    #[error("INTERNAL; {0}")]
    Internal(String),
}

impl HalError {
    /// Status code of this error
    pub fn code(&self) -> StatusCode {
        match self {
            HalError::InvalidArgument(_)
            | HalError::TypeMismatch { .. }
            | HalError::InvalidModule(_)
            | HalError::Decode(_) => StatusCode::InvalidArgument,
            HalError::NotFound(_) => StatusCode::NotFound,
            HalError::AlreadyExists(_) => StatusCode::AlreadyExists,
            HalError::FailedPrecondition(_) => StatusCode::FailedPrecondition,
            HalError::OutOfRange(_) | HalError::BufferOutOfBounds { .. } => StatusCode::OutOfRange,
            HalError::ResourceExhausted(_) => StatusCode::ResourceExhausted,
            HalError::Unavailable(_) => StatusCode::Unavailable,
            HalError::Unimplemented(_) => StatusCode::Unimplemented,
            HalError::Internal(_) => StatusCode::Internal,
        }
    }

    /// True for the "already registered" outcome of registration calls
    pub fn is_already_exists(&self) -> bool {
        self.code() == StatusCode::AlreadyExists
    }

    pub fn type_mismatch(expected: impl fmt::Display, actual: impl fmt::Display) -> Self {
        Self::TypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unimplemented(msg: impl Into<String>) -> Self {
        Self::Unimplemented(msg.into())
    }
}
