//! Status values handed across the host boundary

use crate::config::BridgeConfig;
use crate::error::{Error, Result};
use std::fmt;

/// Outcome of a bridge operation in the form hosts consume: an ok flag and
/// a rendered diagnostic
#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub struct Status {
    ok: bool,
    message: String,
}

impl Status {
    pub fn ok() -> Self {
        Self {
            ok: true,
            message: String::new(),
        }
    }

    /// Render `error` as `Failed to execute <runtime> due to error: <diagnostic>`
    pub fn from_error(error: &Error, config: &BridgeConfig) -> Self {
        Self {
            ok: false,
            message: format!("Failed to execute {} due to error: {error}", config.runtime_name),
        }
    }

    pub fn from_result<T>(result: &Result<T>) -> Self {
        Self::from_result_with_config(result, &BridgeConfig::default())
    }

    pub fn from_result_with_config<T>(result: &Result<T>, config: &BridgeConfig) -> Self {
        match result {
            Ok(_) => Self::ok(),
            Err(error) => Self::from_error(error, config),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// Take the message; empty for an ok status
    pub fn into_message(self) -> String {
        self.message
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ok {
            f.write_str("OK")
        } else {
            f.write_str(&self.message)
        }
    }
}

impl<T> From<&Result<T>> for Status {
    fn from(result: &Result<T>) -> Self {
        Status::from_result(result)
    }
}
