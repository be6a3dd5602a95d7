//! Range scanner: rotate, settle, ping, record
//!
//! # Sweep Loop
//!
//! ```text
//! Idle ─▶ Advancing ─▶ Settling ─▶ Measuring ─┬─▶ sample recorded ──┐
//!              ▲                              └─▶ timeout recorded ─┤
//!              └────────────────────────────────────────────────────┘
//!                          (after the last step) ─▶ Idle
//! ```
//!
//! A full sweep takes ⌈360 / step_angle⌉ steps. Timeouts never stop the sweep:
//! the sample stays in the session marked missing, so sample `i` always belongs
//! to angle `(i + 1) * step_angle`.
//!
//! # Motor Position
//!
//! The scanner does not home the motor. Each `scan` starts from wherever the
//! previous motion left the shaft, so a second sweep is offset by the total
//! rotation of the first (which is more than 360° when the step count rounds
//! up). Callers needing repeatable headings must reposition between sweeps.
//!
//! # Pin Ownership
//!
//! The scanner owns its [`DigitalIo`] and calls `teardown` exactly once,
//! from [`Scanner::release`] or, failing that, from `Drop`.

mod ranger;
mod stepper;

pub use ranger::{pulse_to_distance_cm, UltrasonicRanger};
pub use stepper::{steps_for_angle, StepperMotor};

use crate::config::PinConfig;
use crate::core::clock::Clock;
use crate::core::io::DigitalIo;
use crate::core::types::{Reading, Sample, ScanSession};
use crate::devices::Device;
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Speed of sound used for ranging (cm/s)
pub const SPEED_OF_SOUND_CM_PER_S: f64 = 34300.0;
/// Trigger pulse width
pub const TRIGGER_PULSE: Duration = Duration::from_micros(10);
/// Budget for each echo edge
pub const EDGE_TIMEOUT: Duration = Duration::from_millis(50);
/// Full steps per revolution (1.8° motor)
pub const STEPS_PER_REVOLUTION: u32 = 200;
/// Duration of each half of a step pulse
pub const STEP_PHASE: Duration = Duration::from_millis(1);
/// Pause after motion before pinging
pub const SETTLE_TIME: Duration = Duration::from_secs(1);
/// Trigger-low time before the first ping
pub const WARM_UP_TIME: Duration = Duration::from_secs(2);

/// Fixed timing of the sweep head
#[derive(Debug, Clone)]
pub struct ScanTiming {
    pub trigger_pulse: Duration,
    pub edge_timeout: Duration,
    pub steps_per_revolution: u32,
    pub step_phase: Duration,
    pub settle: Duration,
    pub warm_up: Duration,
}

impl Default for ScanTiming {
    fn default() -> Self {
        Self {
            trigger_pulse: TRIGGER_PULSE,
            edge_timeout: EDGE_TIMEOUT,
            steps_per_revolution: STEPS_PER_REVOLUTION,
            step_phase: STEP_PHASE,
            settle: SETTLE_TIME,
            warm_up: WARM_UP_TIME,
        }
    }
}

/// Where the sweep loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Advancing,
    Settling,
    Measuring,
}

/// Rotating ultrasonic range scanner
pub struct Scanner {
    io: Box<dyn DigitalIo>,
    clock: Arc<dyn Clock>,
    ranger: UltrasonicRanger,
    motor: StepperMotor,
    settle: Duration,
    warm_up: Duration,
    state: ScanState,
    released: bool,
}

impl Scanner {
    /// Claim the sensor and motor pins with default timing
    pub fn new(device: Device, pins: &PinConfig) -> Result<Self> {
        Self::with_timing(device, pins, ScanTiming::default())
    }

    pub fn with_timing(device: Device, pins: &PinConfig, timing: ScanTiming) -> Result<Self> {
        let ranger = UltrasonicRanger::new(
            pins.trigger,
            pins.echo,
            timing.trigger_pulse,
            timing.edge_timeout,
        );
        let motor = StepperMotor::new(
            pins.step,
            pins.direction,
            timing.steps_per_revolution,
            timing.step_phase,
        );

        let mut scanner = Self {
            io: device.io,
            clock: device.clock,
            ranger,
            motor,
            settle: timing.settle,
            warm_up: timing.warm_up,
            state: ScanState::Idle,
            released: false,
        };

        // On failure, Drop still releases whatever was claimed
        scanner.ranger.configure(scanner.io.as_mut())?;
        scanner.motor.configure(scanner.io.as_mut())?;
        log::debug!(
            "Pins configured: TRIG={} ECHO={} STEP={} DIR={}",
            pins.trigger,
            pins.echo,
            pins.step,
            pins.direction
        );

        Ok(scanner)
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    fn set_state(&mut self, state: ScanState) {
        log::trace!("{:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Hold the trigger low while the sensor settles after power-up
    pub fn warm_up(&mut self) -> Result<()> {
        self.ranger.park(self.io.as_mut())?;
        log::info!("Waiting {:?} for sensor to settle", self.warm_up);
        self.clock.sleep(self.warm_up);
        Ok(())
    }

    /// Ping once and return the distance in centimeters
    pub fn measure_distance(&mut self) -> Result<f32> {
        self.ranger
            .measure_distance(self.io.as_mut(), self.clock.as_ref())
    }

    /// Rotate by `degrees`, returning the number of step pulses issued
    pub fn advance(&mut self, degrees: f32) -> Result<u32> {
        self.motor
            .advance(self.io.as_mut(), self.clock.as_ref(), degrees)
    }

    /// Sweep a full turn in `step_angle` increments.
    ///
    /// `running` is checked before every step; once it reads false the sweep
    /// stops and the partial session is returned marked `aborted`.
    pub fn scan(&mut self, step_angle: u32, running: &AtomicBool) -> Result<ScanSession> {
        if !(1..=360).contains(&step_angle) {
            return Err(Error::InvalidParameter(format!(
                "step angle must be in 1..=360, got {}",
                step_angle
            )));
        }

        let result = self.sweep(step_angle, running);
        self.set_state(ScanState::Idle);
        result
    }

    fn sweep(&mut self, step_angle: u32, running: &AtomicBool) -> Result<ScanSession> {
        let steps = 360u32.div_ceil(step_angle);
        let mut session = ScanSession::new(step_angle, steps);
        let mut angle = 0u32;

        log::info!("Starting sweep: {} steps of {}°", steps, step_angle);

        for _ in 0..steps {
            if !running.load(Ordering::Relaxed) {
                log::info!(
                    "Sweep interrupted after {} of {} steps",
                    session.len(),
                    steps
                );
                session.aborted = true;
                break;
            }

            self.set_state(ScanState::Advancing);
            self.advance(step_angle as f32)?;
            angle += step_angle;

            self.set_state(ScanState::Settling);
            self.clock.sleep(self.settle);

            self.set_state(ScanState::Measuring);
            let reading = match self.measure_distance() {
                Ok(distance) => {
                    log::info!("Angle: {}, Distance: {:.2} cm", angle, distance);
                    Reading::Range(distance)
                }
                Err(e) => match e.timed_out_edge() {
                    Some(edge) => {
                        log::warn!("Error measuring distance at angle {}: {}", angle, e);
                        Reading::Missing(edge)
                    }
                    None => return Err(e),
                },
            };
            session.push(Sample::new(angle, reading));
        }

        if !session.aborted {
            log::info!(
                "Sweep complete: {} samples, {} missing",
                session.len(),
                session.missing_count()
            );
        }
        Ok(session)
    }

    /// Warm up, sweep once, then release the pins.
    ///
    /// The pins are released whatever the sweep's outcome. A sweep error wins
    /// over a release error, which is then only logged.
    pub fn run(mut self, step_angle: u32, running: &AtomicBool) -> Result<ScanSession> {
        let swept = self
            .warm_up()
            .and_then(|_| self.scan(step_angle, running));
        let released = self.release();

        match swept {
            Ok(session) => released.map(|_| session),
            Err(e) => {
                if let Err(release_err) = released {
                    log::error!("Failed to release I/O: {}", release_err);
                }
                Err(e)
            }
        }
    }

    /// Park the outputs and release all pins
    pub fn release(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let parked = self
            .ranger
            .park(self.io.as_mut())
            .and(self.motor.park(self.io.as_mut()));
        if let Err(e) = parked {
            log::warn!("Failed to park outputs before release: {}", e);
        }

        self.io.teardown()?;
        log::debug!("I/O released");
        Ok(())
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::error!("Failed to release I/O: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::{Level, PinMode};
    use crate::core::types::Edge;
    use crate::devices::mock::config::{EchoNoiseConfig, SimulationConfig};
    use crate::devices::mock::{Echo, SimulatedBoard};

    fn quiet_board() -> SimulatedBoard {
        let config = SimulationConfig {
            random_seed: 3,
            noise: EchoNoiseConfig {
                range_stddev_cm: 0.0,
                miss_rate: 0.0,
            },
            ..Default::default()
        };
        SimulatedBoard::new(config, PinConfig::default())
    }

    /// Simulated board with injectable failures
    struct FaultyIo {
        board: SimulatedBoard,
        fail_set_mode_at: Option<usize>,
        set_mode_calls: usize,
        fail_teardown: bool,
    }

    impl FaultyIo {
        fn new(board: &SimulatedBoard) -> Self {
            Self {
                board: board.clone(),
                fail_set_mode_at: None,
                set_mode_calls: 0,
                fail_teardown: false,
            }
        }
    }

    impl DigitalIo for FaultyIo {
        fn set_mode(&mut self, pin: u8, mode: PinMode) -> Result<()> {
            self.set_mode_calls += 1;
            if self.fail_set_mode_at == Some(self.set_mode_calls) {
                return Err(Error::Other(format!("GPIO{} is busy", pin)));
            }
            self.board.set_mode(pin, mode)
        }

        fn write(&mut self, pin: u8, level: Level) -> Result<()> {
            self.board.write(pin, level)
        }

        fn read(&mut self, pin: u8) -> Result<Level> {
            self.board.read(pin)
        }

        fn teardown(&mut self) -> Result<()> {
            self.board.teardown()?;
            if self.fail_teardown {
                return Err(Error::Other("release failed".to_string()));
            }
            Ok(())
        }
    }

    fn device_with(board: &SimulatedBoard, io: FaultyIo) -> Device {
        Device {
            io: Box::new(io),
            clock: Arc::new(board.clock()),
        }
    }

    fn scanner_on(board: &SimulatedBoard) -> Scanner {
        let device = Device {
            io: Box::new(board.clone()),
            clock: Arc::new(board.clock()),
        };
        Scanner::new(device, &PinConfig::default()).unwrap()
    }

    #[test]
    fn test_new_configures_pins() {
        let board = quiet_board();
        let pins = PinConfig::default();
        let _scanner = scanner_on(&board);

        assert_eq!(board.mode(pins.trigger), Some(PinMode::Output));
        assert_eq!(board.mode(pins.echo), Some(PinMode::Input));
        assert_eq!(board.mode(pins.step), Some(PinMode::Output));
        assert_eq!(board.mode(pins.direction), Some(PinMode::Output));
        assert_eq!(board.level(pins.trigger), Level::Low);
    }

    #[test]
    fn test_warm_up_holds_trigger_low() {
        let board = quiet_board();
        let mut scanner = scanner_on(&board);
        scanner.warm_up().unwrap();
        assert_eq!(board.clock().now(), WARM_UP_TIME);
        assert_eq!(board.trigger_pulses(), 0);
    }

    #[test]
    fn test_scan_produces_one_sample_per_step() {
        let board = quiet_board();
        let mut scanner = scanner_on(&board);
        let running = AtomicBool::new(true);

        let session = scanner.scan(10, &running).unwrap();

        assert_eq!(session.len(), 36);
        assert!(session.is_complete());
        let angles: Vec<u32> = session.samples.iter().map(|s| s.angle).collect();
        let expected: Vec<u32> = (1..=36).map(|i| i * 10).collect();
        assert_eq!(angles, expected);
        assert_eq!(session.final_angle(), 360);
        assert_eq!(session.missing_count(), 0);
        assert_eq!(scanner.state(), ScanState::Idle);
        // 6 steps per 10° move
        assert_eq!(board.step_pulses(), 36 * 6);
        assert_eq!(board.trigger_pulses(), 36);
    }

    #[test]
    fn test_uneven_step_rounds_sample_count_up() {
        let board = quiet_board();
        let mut scanner = scanner_on(&board);
        let running = AtomicBool::new(true);

        let session = scanner.scan(7, &running).unwrap();
        assert_eq!(session.len(), 52);
        assert_eq!(session.final_angle(), 7 * 52);
    }

    #[test]
    fn test_timeouts_keep_positional_samples() {
        let board = quiet_board();
        board.queue_echo(Echo::Pulse {
            delay: Duration::from_micros(100),
            width: Duration::from_micros(1000),
        });
        board.queue_echo(Echo::Silent);
        board.queue_echo(Echo::StuckHigh {
            delay: Duration::from_micros(100),
        });
        let mut scanner = scanner_on(&board);
        let running = AtomicBool::new(true);

        let session = scanner.scan(90, &running).unwrap();

        assert_eq!(session.len(), 4);
        assert!((session.samples[0].distance().unwrap() - 17.15).abs() < 1e-3);
        assert_eq!(session.samples[1].reading, Reading::Missing(Edge::Rising));
        assert_eq!(session.samples[1].angle, 180);
        assert_eq!(session.samples[2].reading, Reading::Missing(Edge::Falling));
        assert_eq!(session.samples[2].angle, 270);
        assert!(session.samples[3].distance().is_some());
        assert_eq!(session.final_angle(), 360);
        assert_eq!(session.missing_count(), 2);
    }

    #[test]
    fn test_settle_pause_precedes_each_ping() {
        let board = quiet_board();
        board.queue_echo(Echo::Pulse {
            delay: Duration::ZERO,
            width: Duration::from_micros(2),
        });
        let mut scanner = scanner_on(&board);
        let running = AtomicBool::new(true);

        let session = scanner.scan(360, &running).unwrap();
        assert_eq!(session.samples[0].angle, 360);
        // 200 steps × 2 ms, 1 s settle, 10 µs trigger, 2 µs of polling
        let expected = Duration::from_millis(400) + SETTLE_TIME + Duration::from_micros(12);
        assert_eq!(board.clock().now(), expected);
    }

    #[test]
    fn test_interrupt_stops_between_steps() {
        let board = quiet_board();
        let mut scanner = scanner_on(&board);
        let running = AtomicBool::new(false);

        let session = scanner.scan(10, &running).unwrap();
        assert!(session.is_empty());
        assert!(session.aborted);
        assert!(!session.is_complete());
        assert_eq!(board.step_pulses(), 0);
        assert_eq!(scanner.state(), ScanState::Idle);
    }

    #[test]
    fn test_second_scan_starts_where_first_ended() {
        let board = quiet_board();
        let mut scanner = scanner_on(&board);
        let running = AtomicBool::new(true);

        scanner.scan(10, &running).unwrap();
        let after_first = board.position_steps();
        // 36 × 6 = 216 steps: 16 steps (28.8°) past a full turn
        assert_eq!(after_first, 216);
        assert!((board.heading_deg() - 28.8).abs() < 1e-3);

        scanner.scan(10, &running).unwrap();
        assert_eq!(board.position_steps(), 432);
    }

    #[test]
    fn test_invalid_step_angle() {
        let board = quiet_board();
        let mut scanner = scanner_on(&board);
        let running = AtomicBool::new(true);

        assert!(matches!(
            scanner.scan(0, &running),
            Err(Error::InvalidParameter(_))
        ));
        assert!(scanner.scan(361, &running).is_err());
        assert_eq!(board.step_pulses(), 0);
    }

    #[test]
    fn test_io_failure_aborts_scan_and_returns_idle() {
        let board = quiet_board();
        let mut scanner = scanner_on(&board);
        let running = AtomicBool::new(true);

        // Releasing the pins behind the scanner's back makes every write fail
        board.clone().teardown().unwrap();
        assert!(matches!(
            scanner.scan(10, &running),
            Err(Error::NotInitialized)
        ));
        assert_eq!(scanner.state(), ScanState::Idle);
    }

    #[test]
    fn test_release_tears_down_once() {
        let board = quiet_board();
        let scanner = scanner_on(&board);
        scanner.release().unwrap();
        assert_eq!(board.teardown_count(), 1);
    }

    #[test]
    fn test_drop_tears_down_once() {
        let board = quiet_board();
        {
            let mut scanner = scanner_on(&board);
            scanner.advance(45.0).unwrap();
            assert_eq!(board.level(PinConfig::default().direction), Level::High);
        }
        assert_eq!(board.teardown_count(), 1);
        assert_eq!(board.mode(PinConfig::default().step), None);
    }

    #[test]
    fn test_panic_mid_sweep_still_releases() {
        let board = quiet_board();
        let handle = board.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let mut scanner = scanner_on(&board);
            scanner.advance(10.0).unwrap();
            panic!("simulated failure");
        }));
        assert!(result.is_err());
        assert_eq!(handle.teardown_count(), 1);
    }

    #[test]
    fn test_failed_pin_setup_still_tears_down_once() {
        let board = quiet_board();
        let mut io = FaultyIo::new(&board);
        // Trigger claims fine, echo does not
        io.fail_set_mode_at = Some(2);

        let result = Scanner::new(device_with(&board, io), &PinConfig::default());

        assert!(matches!(result, Err(Error::Other(_))));
        assert_eq!(board.teardown_count(), 1);
        assert_eq!(board.step_pulses(), 0);
        assert_eq!(board.mode(PinConfig::default().trigger), None);
    }

    #[test]
    fn test_run_sweeps_and_releases() {
        let board = quiet_board();
        let running = AtomicBool::new(true);

        let session = scanner_on(&board).run(90, &running).unwrap();

        assert_eq!(session.len(), 4);
        assert!(session.is_complete());
        assert_eq!(board.teardown_count(), 1);
    }

    #[test]
    fn test_run_reports_sweep_error_over_release_error() {
        let board = quiet_board();
        let mut io = FaultyIo::new(&board);
        io.fail_teardown = true;
        let scanner = Scanner::new(device_with(&board, io), &PinConfig::default()).unwrap();
        let running = AtomicBool::new(true);

        let err = scanner.run(0, &running).unwrap_err();

        assert!(matches!(err, Error::InvalidParameter(_)));
        assert_eq!(board.teardown_count(), 1);
    }

    #[test]
    fn test_run_reports_release_error_after_clean_sweep() {
        let board = quiet_board();
        let mut io = FaultyIo::new(&board);
        io.fail_teardown = true;
        let scanner = Scanner::new(device_with(&board, io), &PinConfig::default()).unwrap();
        let running = AtomicBool::new(true);

        let err = scanner.run(180, &running).unwrap_err();

        assert!(matches!(err, Error::Other(_)));
        assert_eq!(board.teardown_count(), 1);
    }
}
