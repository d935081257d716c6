//! On-board sensor drivers.

pub mod dht11;
pub mod light;

pub use dht11::Dht11;
pub use light::LightSensor;

use thiserror_no_std::Error;

/// Failures from the single-wire temperature/humidity transaction. Each one
/// counts as a failed read toward the application loop's sensor threshold.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("sensor did not acknowledge the start signal")]
    NoResponse,
    #[error("bit timing stalled mid-frame")]
    BitTimeout,
    #[error("frame checksum mismatch")]
    Checksum,
}
