//! STEP/DIR stepper driver control

use crate::core::clock::Clock;
use crate::core::io::{DigitalIo, Level, PinMode};
use crate::error::Result;
use std::time::Duration;

/// Whole steps for an angular move: round(|degrees| / 360 × steps_per_revolution)
pub fn steps_for_angle(degrees: f32, steps_per_revolution: u32) -> u32 {
    (degrees.abs() / 360.0 * steps_per_revolution as f32).round() as u32
}

/// Stepper motor behind a STEP/DIR driver (A4988, DRV8825, ...)
#[derive(Debug, Clone)]
pub struct StepperMotor {
    step: u8,
    direction: u8,
    steps_per_revolution: u32,
    phase: Duration,
}

impl StepperMotor {
    /// `phase` is the time spent in each half of a step pulse
    pub fn new(step: u8, direction: u8, steps_per_revolution: u32, phase: Duration) -> Self {
        Self {
            step,
            direction,
            steps_per_revolution,
            phase,
        }
    }

    pub fn steps_per_revolution(&self) -> u32 {
        self.steps_per_revolution
    }

    /// Claim STEP and DIR as low outputs
    pub fn configure(&self, io: &mut dyn DigitalIo) -> Result<()> {
        for pin in [self.step, self.direction] {
            io.set_mode(pin, PinMode::Output)?;
            io.write(pin, Level::Low)?;
        }
        Ok(())
    }

    /// Drive STEP low
    pub fn park(&self, io: &mut dyn DigitalIo) -> Result<()> {
        io.write(self.step, Level::Low)
    }

    /// Rotate by `degrees`; positive sets DIR high.
    ///
    /// Returns the number of step pulses issued.
    pub fn advance(&self, io: &mut dyn DigitalIo, clock: &dyn Clock, degrees: f32) -> Result<u32> {
        let steps = steps_for_angle(degrees, self.steps_per_revolution);
        io.write(self.direction, Level::from(degrees > 0.0))?;

        for _ in 0..steps {
            io.write(self.step, Level::High)?;
            clock.sleep(self.phase);
            io.write(self.step, Level::Low)?;
            clock.sleep(self.phase);
        }

        log::trace!("Advanced {:.1}° ({} steps)", degrees, steps);
        Ok(steps)
    }
}
