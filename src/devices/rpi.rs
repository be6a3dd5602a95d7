//! Raspberry Pi GPIO backend
//!
//! Claims BCM pins through `rppal`. Claimed pins are restored to their
//! original mode and level when released, because `rppal` resets a pin when
//! its handle drops.

use crate::core::io::{DigitalIo, Level, PinMode};
use crate::error::{Error, Result};
use rppal::gpio::{Bias, Gpio, IoPin, Mode};
use std::collections::HashMap;

pub struct RpiGpio {
    gpio: Option<Gpio>,
    pins: HashMap<u8, IoPin>,
}

impl RpiGpio {
    /// Map the GPIO peripheral. Fails when not running on a Raspberry Pi or
    /// without access to `/dev/gpiomem`.
    pub fn open() -> Result<Self> {
        let gpio = Gpio::new()?;
        log::info!("GPIO peripheral mapped");
        Ok(Self {
            gpio: Some(gpio),
            pins: HashMap::new(),
        })
    }

    fn pin_mut(&mut self, pin: u8, operation: &'static str) -> Result<&mut IoPin> {
        self.pins
            .get_mut(&pin)
            .ok_or(Error::PinNotConfigured { pin, operation })
    }
}

fn to_rppal(level: Level) -> rppal::gpio::Level {
    match level {
        Level::Low => rppal::gpio::Level::Low,
        Level::High => rppal::gpio::Level::High,
    }
}

impl DigitalIo for RpiGpio {
    fn set_mode(&mut self, pin: u8, mode: PinMode) -> Result<()> {
        let mode = match mode {
            PinMode::Input => Mode::Input,
            PinMode::Output => Mode::Output,
        };

        if let Some(io) = self.pins.get_mut(&pin) {
            io.set_mode(mode);
            return Ok(());
        }

        let gpio = self.gpio.as_ref().ok_or(Error::NotInitialized)?;
        let mut io = gpio.get(pin)?.into_io(mode);
        if mode == Mode::Input {
            io.set_bias(Bias::Off);
        }
        log::debug!("GPIO{} claimed as {:?}", pin, mode);
        self.pins.insert(pin, io);
        Ok(())
    }

    fn write(&mut self, pin: u8, level: Level) -> Result<()> {
        let io = self.pin_mut(pin, "output")?;
        if io.mode() != Mode::Output {
            return Err(Error::PinNotConfigured {
                pin,
                operation: "output",
            });
        }
        io.write(to_rppal(level));
        Ok(())
    }

    fn read(&mut self, pin: u8) -> Result<Level> {
        let io = self.pin_mut(pin, "input")?;
        Ok(Level::from(io.is_high()))
    }

    fn teardown(&mut self) -> Result<()> {
        for (pin, mut io) in self.pins.drain() {
            if io.mode() == Mode::Output {
                io.set_low();
            }
            log::debug!("GPIO{} released", pin);
        }
        self.gpio = None;
        Ok(())
    }
}
