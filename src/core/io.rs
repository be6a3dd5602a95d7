//! DigitalIo trait definition

use crate::error::Result;

/// Logic level of a digital line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Level {
    #[default]
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Direction of a digital line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    Output,
}

/// Digital pin capability for hardware abstraction
///
/// Pins are addressed by BCM number. An implementation owns every pin it has
/// configured until [`teardown`](DigitalIo::teardown) releases them.
pub trait DigitalIo: Send {
    /// Claim a pin and configure its direction
    fn set_mode(&mut self, pin: u8, mode: PinMode) -> Result<()>;

    /// Drive an output pin
    fn write(&mut self, pin: u8, level: Level) -> Result<()>;

    /// Sample the current level of a pin
    fn read(&mut self, pin: u8) -> Result<Level>;

    /// Release all claimed pins
    fn teardown(&mut self) -> Result<()>;
}
