//! Pin backends

pub mod mock;
#[cfg(feature = "rpi")]
pub mod rpi;

use crate::config::Config;
use crate::core::clock::Clock;
use crate::core::io::DigitalIo;
use crate::error::{Error, Result};
use std::sync::Arc;

/// Acquired I/O capability plus the clock that times it
pub struct Device {
    pub io: Box<dyn DigitalIo>,
    pub clock: Arc<dyn Clock>,
}

/// Create a device based on configuration
///
/// Fails before any pin is touched when the backend is unknown, not compiled
/// in, cannot be opened, or (for the mock) its simulation block is invalid.
pub fn create_device(config: &Config) -> Result<Device> {
    match config.device.device_type.as_str() {
        "mock" => {
            let sim = config.device.simulation.clone().unwrap_or_default();
            sim.validate()?;
            let board = mock::SimulatedBoard::new(sim, config.pins);
            let clock = Arc::new(board.clock());
            Ok(Device {
                io: Box::new(board),
                clock,
            })
        }
        #[cfg(feature = "rpi")]
        "rpi" => {
            let gpio = rpi::RpiGpio::open()?;
            Ok(Device {
                io: Box::new(gpio),
                clock: Arc::new(crate::core::clock::SystemClock::new()),
            })
        }
        #[cfg(not(feature = "rpi"))]
        "rpi" => Err(Error::NotSupported(
            "built without the `rpi` feature".to_string(),
        )),
        other => Err(Error::UnknownDevice(other.to_string())),
    }
}
