//! `local-task`: element loops split across the rayon pool

use super::local::LocalDriver;
use crate::driver::{Driver, DriverFactory, DriverInfo};
use crate::error::{HalError, Result};
use std::sync::Arc;

pub const DRIVER_NAME: &str = "local-task";

/// Factory for the `local-task` driver
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalTaskDriverFactory;

impl DriverFactory for LocalTaskDriverFactory {
    fn enumerate(&self) -> Vec<DriverInfo> {
        vec![DriverInfo::new(
            DRIVER_NAME,
            format!(
                "Local execution using a {}-thread task pool",
                rayon::current_num_threads()
            ),
        )]
    }

    fn try_create(&self, driver_name: &str) -> Result<Arc<dyn Driver>> {
        if driver_name != DRIVER_NAME {
            return Err(HalError::unimplemented(format!(
                "no driver '{driver_name}' is provided by this factory"
            )));
        }
        Ok(Arc::new(LocalDriver::new(DRIVER_NAME, true)))
    }
}
