//! Ultrasonic time-of-flight ranging
//!
//! A 10 µs pulse on TRIG makes the sensor emit a burst; ECHO is then held high
//! for as long as the sound took to return. Both edges are found by polling
//! ECHO against an explicit deadline.

use crate::core::clock::Clock;
use crate::core::io::{DigitalIo, Level, PinMode};
use crate::error::{Error, Result};
use std::time::Duration;

use super::SPEED_OF_SOUND_CM_PER_S;

/// One-way distance for a round-trip echo pulse
pub fn pulse_to_distance_cm(width: Duration) -> f32 {
    (width.as_secs_f64() * SPEED_OF_SOUND_CM_PER_S / 2.0) as f32
}

/// HC-SR04 style sensor on a trigger/echo pin pair
#[derive(Debug, Clone)]
pub struct UltrasonicRanger {
    trigger: u8,
    echo: u8,
    pulse: Duration,
    timeout: Duration,
}

impl UltrasonicRanger {
    pub fn new(trigger: u8, echo: u8, pulse: Duration, timeout: Duration) -> Self {
        Self {
            trigger,
            echo,
            pulse,
            timeout,
        }
    }

    /// Claim pins: trigger as low output, echo as input
    pub fn configure(&self, io: &mut dyn DigitalIo) -> Result<()> {
        io.set_mode(self.trigger, PinMode::Output)?;
        io.write(self.trigger, Level::Low)?;
        io.set_mode(self.echo, PinMode::Input)?;
        Ok(())
    }

    /// Drive the trigger line low
    pub fn park(&self, io: &mut dyn DigitalIo) -> Result<()> {
        io.write(self.trigger, Level::Low)
    }

    fn send_trigger_pulse(&self, io: &mut dyn DigitalIo, clock: &dyn Clock) -> Result<()> {
        io.write(self.trigger, Level::High)?;
        clock.sleep(self.pulse);
        io.write(self.trigger, Level::Low)
    }

    /// Poll the echo line until it reads `level`.
    ///
    /// Returns the time the level was seen, or `None` once more than
    /// `timeout` has passed since `since`. An edge seen after the deadline
    /// still counts as a timeout.
    fn wait_for(
        &self,
        io: &mut dyn DigitalIo,
        clock: &dyn Clock,
        level: Level,
        since: Duration,
    ) -> Result<Option<Duration>> {
        loop {
            let seen = io.read(self.echo)? == level;
            let now = clock.now();
            if now.saturating_sub(since) > self.timeout {
                return Ok(None);
            }
            if seen {
                return Ok(Some(now));
            }
        }
    }

    /// Trigger a ping and time the echo pulse.
    ///
    /// Returns the distance in centimeters, or [`Error::RisingEdgeTimeout`] /
    /// [`Error::FallingEdgeTimeout`] when the corresponding edge does not
    /// arrive within the timeout.
    pub fn measure_distance(&self, io: &mut dyn DigitalIo, clock: &dyn Clock) -> Result<f32> {
        self.send_trigger_pulse(io, clock)?;

        let start = clock.now();
        let rising = self
            .wait_for(io, clock, Level::High, start)?
            .ok_or(Error::RisingEdgeTimeout {
                timeout: self.timeout,
            })?;

        let falling = self
            .wait_for(io, clock, Level::Low, rising)?
            .ok_or(Error::FallingEdgeTimeout {
                timeout: self.timeout,
            })?;

        Ok(pulse_to_distance_cm(falling - rising))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PinConfig;
    use crate::devices::mock::config::{EchoNoiseConfig, SimulationConfig};
    use crate::devices::mock::{Echo, SimulatedBoard};
    use approx::assert_relative_eq;

    const TIMEOUT: Duration = Duration::from_millis(50);

    fn setup() -> (SimulatedBoard, UltrasonicRanger) {
        let pins = PinConfig::default();
        let config = SimulationConfig {
            random_seed: 1,
            noise: EchoNoiseConfig {
                range_stddev_cm: 0.0,
                miss_rate: 0.0,
            },
            ..Default::default()
        };
        let mut board = SimulatedBoard::new(config, pins);
        let ranger =
            UltrasonicRanger::new(pins.trigger, pins.echo, Duration::from_micros(10), TIMEOUT);
        ranger.configure(&mut board).unwrap();
        (board, ranger)
    }

    fn measure(board: &mut SimulatedBoard, ranger: &UltrasonicRanger) -> Result<f32> {
        let clock = board.clock();
        ranger.measure_distance(board, &clock)
    }

    #[test]
    fn test_pulse_to_distance() {
        assert_relative_eq!(
            pulse_to_distance_cm(Duration::from_micros(1000)),
            17.15,
            epsilon = 1e-4
        );
        assert_eq!(pulse_to_distance_cm(Duration::ZERO), 0.0);
    }

    #[test]
    fn test_thousand_microsecond_pulse() {
        let (mut board, ranger) = setup();
        board.queue_echo(Echo::Pulse {
            delay: Duration::from_micros(100),
            width: Duration::from_micros(1000),
        });

        let distance = measure(&mut board, &ranger).unwrap();
        assert_relative_eq!(distance, 17.15, epsilon = 1e-3);
    }

    #[test]
    fn test_trigger_pulse_is_ten_microseconds() {
        let (mut board, ranger) = setup();
        let clock = board.clock();
        board.queue_echo(Echo::Pulse {
            delay: Duration::ZERO,
            width: Duration::from_micros(5),
        });
        ranger.measure_distance(&mut board, &clock).unwrap();

        // 10 µs trigger, then one poll per µs until the echo drops at 15 µs
        assert_eq!(clock.now(), Duration::from_micros(15));
        assert_eq!(board.level(PinConfig::default().trigger), Level::Low);
        assert_eq!(board.trigger_pulses(), 1);
    }

    #[test]
    fn test_rising_edge_at_deadline_succeeds() {
        let (mut board, ranger) = setup();
        board.queue_echo(Echo::Pulse {
            delay: TIMEOUT,
            width: Duration::from_micros(500),
        });
        let distance = measure(&mut board, &ranger).unwrap();
        assert_relative_eq!(distance, pulse_to_distance_cm(Duration::from_micros(500)));
    }

    #[test]
    fn test_rising_edge_past_deadline_times_out() {
        let (mut board, ranger) = setup();
        board.queue_echo(Echo::Pulse {
            delay: TIMEOUT + Duration::from_micros(1),
            width: Duration::from_micros(500),
        });
        let err = measure(&mut board, &ranger).unwrap_err();
        assert!(matches!(err, Error::RisingEdgeTimeout { .. }));
    }

    #[test]
    fn test_silent_sensor_times_out_on_rising_edge() {
        let (mut board, ranger) = setup();
        let clock = board.clock();
        board.queue_echo(Echo::Silent);

        let err = ranger.measure_distance(&mut board, &clock).unwrap_err();
        assert!(matches!(err, Error::RisingEdgeTimeout { .. }));
        // Gave up one poll after the budget ran out
        assert_eq!(
            clock.now(),
            Duration::from_micros(10) + TIMEOUT + Duration::from_micros(1)
        );
    }

    #[test]
    fn test_falling_edge_within_budget() {
        let (mut board, ranger) = setup();
        board.queue_echo(Echo::Pulse {
            delay: Duration::from_micros(200),
            width: TIMEOUT,
        });
        let distance = measure(&mut board, &ranger).unwrap();
        assert_relative_eq!(distance, 857.5, epsilon = 1e-2);
    }

    #[test]
    fn test_falling_edge_past_deadline_times_out() {
        let (mut board, ranger) = setup();
        board.queue_echo(Echo::Pulse {
            delay: Duration::from_micros(200),
            width: TIMEOUT + Duration::from_micros(1),
        });
        let err = measure(&mut board, &ranger).unwrap_err();
        assert!(matches!(err, Error::FallingEdgeTimeout { .. }));
    }

    #[test]
    fn test_stuck_echo_times_out_on_falling_edge() {
        let (mut board, ranger) = setup();
        board.queue_echo(Echo::StuckHigh {
            delay: Duration::from_micros(300),
        });
        let err = measure(&mut board, &ranger).unwrap_err();
        assert_eq!(err.timed_out_edge(), Some(crate::core::types::Edge::Falling));
    }

    #[test]
    fn test_room_echo_distance() {
        let (mut board, ranger) = setup();
        // Default room: heading 0° faces a wall 100 cm away
        let distance = measure(&mut board, &ranger).unwrap();
        assert!((distance - 100.0).abs() < 0.05, "got {}", distance);
    }
}
