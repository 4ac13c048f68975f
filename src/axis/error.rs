use std::time::Duration;

use thiserror::Error;

use super::state::MotionState;
use crate::driver::DriverError;

#[derive(Debug, Error)]
pub enum AxisError {
    #[error("Outside of limits: {target}{units} not within [{min}, {max}]")]
    OutOfLimits {
        target: f64,
        min: f64,
        max: f64,
        units: String,
    },
    #[error("{value}{units} is beyond the controller's step range")]
    OutOfRange { value: f64, units: String },
    #[error("axis is {0}")]
    Busy(MotionState),
    #[error("invalid speed {0}: must be a positive number")]
    InvalidSpeed(f64),
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error("timed out waiting for idle after {} ms", .0.as_millis())]
    Timeout(Duration),
}
