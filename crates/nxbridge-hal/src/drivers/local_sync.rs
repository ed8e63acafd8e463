//! `local-sync`: inline execution on the calling thread

use super::local::LocalDriver;
use crate::driver::{Driver, DriverFactory, DriverInfo};
use crate::error::{HalError, Result};
use std::sync::Arc;

pub const DRIVER_NAME: &str = "local-sync";

/// Factory for the `local-sync` driver
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalSyncDriverFactory;

impl DriverFactory for LocalSyncDriverFactory {
    fn enumerate(&self) -> Vec<DriverInfo> {
        vec![DriverInfo::new(
            DRIVER_NAME,
            "Local execution using a lightweight inline executor",
        )]
    }

    fn try_create(&self, driver_name: &str) -> Result<Arc<dyn Driver>> {
        if driver_name != DRIVER_NAME {
            return Err(HalError::unimplemented(format!(
                "no driver '{driver_name}' is provided by this factory"
            )));
        }
        Ok(Arc::new(LocalDriver::new(DRIVER_NAME, false)))
    }
}
