//! Simulated sweep head for hardware-free runs and tests
//!
//! # Overview
//!
//! [`SimulatedBoard`] stands in for the GPIO header of a board wired to an
//! HC-SR04 style ultrasonic sensor and a STEP/DIR stepper driver:
//!
//! | Line | Simulation |
//! |------|------------|
//! | STEP | Rising edges counted, signed position kept from DIR |
//! | DIR | High = positive rotation |
//! | TRIG | Falling edge schedules an echo window |
//! | ECHO | High inside the echo window, low elsewhere |
//!
//! Echo distances come from ray casting the [`room::Room`] at the current motor
//! heading, with Gaussian range noise and a miss rate. Tests can override the
//! next echoes with [`Echo`] scripts to force exact pulse widths or timeouts.
//!
//! # Virtual Time
//!
//! The board owns a [`SimClock`]. Sleeping advances virtual time instantly and
//! every read of a pin costs `poll_interval_us`, so a busy-wait on the echo line
//! terminates deterministically. With `speed_factor > 0` sleeps are also paced
//! against the wall clock.
//!
//! ```toml
//! [device]
//! type = "mock"
//!
//! [device.simulation]
//! random_seed = 42
//! speed_factor = 0.0
//!
//! [device.simulation.room]
//! width_cm = 200.0
//! depth_cm = 150.0
//! ```

pub mod config;
mod noise;
mod room;

use crate::config::PinConfig;
use crate::core::clock::Clock;
use crate::core::io::{DigitalIo, Level, PinMode};
use crate::error::{Error, Result};

use config::SimulationConfig;
use noise::EchoNoise;
use room::Room;

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

const SPEED_OF_SOUND_CM_PER_S: f64 = 34300.0;

/// Virtual clock shared between the board and the scanner
#[derive(Debug, Clone)]
pub struct SimClock {
    nanos: Arc<AtomicU64>,
    speed_factor: f32,
}

impl SimClock {
    pub fn new(speed_factor: f32) -> Self {
        Self {
            nanos: Arc::new(AtomicU64::new(0)),
            speed_factor,
        }
    }

    /// Move virtual time forward without pacing
    pub fn advance(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    /// Wall time a virtual sleep is paced to, if any
    fn wall_time(&self, duration: Duration) -> Option<Duration> {
        if self.speed_factor <= 0.0 {
            return None;
        }
        Duration::try_from_secs_f64(duration.as_secs_f64() / self.speed_factor as f64).ok()
    }
}

impl Clock for SimClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Relaxed))
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
        if let Some(wall) = self.wall_time(duration) {
            thread::sleep(wall);
        }
    }
}

/// Scripted response to the next trigger pulse
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Echo {
    /// Echo goes high after `delay` and stays high for `width`
    Pulse { delay: Duration, width: Duration },
    /// Echo never goes high
    Silent,
    /// Echo goes high after `delay` and never drops
    StuckHigh { delay: Duration },
}

impl Echo {
    /// Pulse of the width an echo from `distance_cm` would have
    pub fn from_distance(delay: Duration, distance_cm: f32) -> Self {
        let width = Duration::from_secs_f64(2.0 * distance_cm as f64 / SPEED_OF_SOUND_CM_PER_S);
        Echo::Pulse { delay, width }
    }
}

/// Echo line activity scheduled by the last trigger
#[derive(Debug, Clone, Copy)]
struct EchoWindow {
    rise: Duration,
    fall: Option<Duration>,
}

impl EchoWindow {
    fn level_at(&self, t: Duration) -> Level {
        let after_rise = t >= self.rise;
        let before_fall = self.fall.map_or(true, |fall| t < fall);
        Level::from(after_rise && before_fall)
    }
}

struct BoardState {
    config: SimulationConfig,
    pins: PinConfig,
    room: Room,
    noise: EchoNoise,
    modes: HashMap<u8, PinMode>,
    levels: HashMap<u8, Level>,
    scripted: VecDeque<Echo>,
    echo: Option<EchoWindow>,
    position_steps: i64,
    step_pulses: u64,
    trigger_pulses: u64,
    teardowns: u32,
    torn_down: bool,
}

impl BoardState {
    fn mode_of(&self, pin: u8, operation: &'static str) -> Result<PinMode> {
        if self.torn_down {
            return Err(Error::NotInitialized);
        }
        self.modes
            .get(&pin)
            .copied()
            .ok_or(Error::PinNotConfigured { pin, operation })
    }

    fn heading_deg(&self) -> f32 {
        let steps_per_rev = self.config.steps_per_revolution.max(1) as i64;
        let folded = self.position_steps.rem_euclid(steps_per_rev);
        folded as f32 * 360.0 / steps_per_rev as f32
    }

    /// Echo the room would return at the current heading
    fn room_echo(&mut self) -> Echo {
        let delay = Duration::from_micros(self.config.echo_latency_us);
        let range = self.room.range_at(self.heading_deg());
        match self.noise.perturb(range) {
            Some(distance)
                if distance.is_finite() && distance > 0.0 && distance <= self.config.max_range_cm =>
            {
                Echo::from_distance(delay, distance)
            }
            _ => Echo::Silent,
        }
    }

    fn fire_trigger(&mut self, now: Duration) {
        self.trigger_pulses += 1;
        let echo = match self.scripted.pop_front() {
            Some(echo) => echo,
            None => self.room_echo(),
        };
        self.echo = match echo {
            Echo::Pulse { delay, width } => Some(EchoWindow {
                rise: now + delay,
                fall: Some(now + delay + width),
            }),
            Echo::StuckHigh { delay } => Some(EchoWindow {
                rise: now + delay,
                fall: None,
            }),
            Echo::Silent => None,
        };
    }
}

/// Simulated GPIO header with sensor and stepper attached
///
/// Clones share the same board, so a test can keep a handle for inspection
/// after handing one to the scanner.
#[derive(Clone)]
pub struct SimulatedBoard {
    inner: Arc<Mutex<BoardState>>,
    clock: SimClock,
}

impl SimulatedBoard {
    pub fn new(config: SimulationConfig, pins: PinConfig) -> Self {
        let clock = SimClock::new(config.speed_factor);
        let room = Room::new(&config.room);
        let noise = EchoNoise::new(config.random_seed, &config.noise);
        Self {
            inner: Arc::new(Mutex::new(BoardState {
                config,
                pins,
                room,
                noise,
                modes: HashMap::new(),
                levels: HashMap::new(),
                scripted: VecDeque::new(),
                echo: None,
                position_steps: 0,
                step_pulses: 0,
                trigger_pulses: 0,
                teardowns: 0,
                torn_down: false,
            })),
            clock,
        }
    }

    /// Virtual clock driving this board
    pub fn clock(&self) -> SimClock {
        self.clock.clone()
    }

    fn state(&self) -> Result<MutexGuard<'_, BoardState>> {
        self.inner
            .lock()
            .map_err(|e| Error::MutexPoisoned(format!("board state: {}", e)))
    }

    // Inspection helpers read through a poisoned lock: they only serve tests
    // looking at the board after the fact. `DigitalIo` calls go through
    // `state()` and report `MutexPoisoned`.
    fn snapshot<T>(&self, f: impl FnOnce(&BoardState) -> T) -> T {
        let state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&state)
    }

    /// Queue a scripted response for an upcoming trigger
    pub fn queue_echo(&self, echo: Echo) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.scripted.push_back(echo);
    }

    /// Total step pulses seen on the STEP line
    pub fn step_pulses(&self) -> u64 {
        self.snapshot(|s| s.step_pulses)
    }

    /// Signed motor position in steps
    pub fn position_steps(&self) -> i64 {
        self.snapshot(|s| s.position_steps)
    }

    /// Current motor heading in degrees `[0, 360)`
    pub fn heading_deg(&self) -> f32 {
        self.snapshot(|s| s.heading_deg())
    }

    /// Completed trigger pulses
    pub fn trigger_pulses(&self) -> u64 {
        self.snapshot(|s| s.trigger_pulses)
    }

    /// Times `teardown` was called
    pub fn teardown_count(&self) -> u32 {
        self.snapshot(|s| s.teardowns)
    }

    pub fn mode(&self, pin: u8) -> Option<PinMode> {
        self.snapshot(|s| s.modes.get(&pin).copied())
    }

    /// Last level driven on a pin
    pub fn level(&self, pin: u8) -> Level {
        self.snapshot(|s| s.levels.get(&pin).copied().unwrap_or_default())
    }
}

impl DigitalIo for SimulatedBoard {
    fn set_mode(&mut self, pin: u8, mode: PinMode) -> Result<()> {
        let mut state = self.state()?;
        if state.torn_down {
            return Err(Error::NotInitialized);
        }
        state.modes.insert(pin, mode);
        state.levels.entry(pin).or_insert(Level::Low);
        Ok(())
    }

    fn write(&mut self, pin: u8, level: Level) -> Result<()> {
        let now = self.clock.now();
        let mut state = self.state()?;
        if state.mode_of(pin, "output")? != PinMode::Output {
            return Err(Error::PinNotConfigured {
                pin,
                operation: "output",
            });
        }

        let previous = state.levels.insert(pin, level).unwrap_or_default();
        let pins = state.pins;

        if pin == pins.trigger && previous == Level::High && level == Level::Low {
            state.fire_trigger(now);
        } else if pin == pins.step && previous == Level::Low && level == Level::High {
            let forward = state
                .levels
                .get(&pins.direction)
                .copied()
                .unwrap_or_default()
                .is_high();
            state.step_pulses += 1;
            state.position_steps += if forward { 1 } else { -1 };
        }

        Ok(())
    }

    fn read(&mut self, pin: u8) -> Result<Level> {
        let mut state = self.state()?;
        state.mode_of(pin, "input")?;

        self.clock
            .advance(Duration::from_micros(state.config.poll_interval_us));
        let now = self.clock.now();

        if pin == state.pins.echo {
            let level = state.echo.map_or(Level::Low, |w| w.level_at(now));
            state.levels.insert(pin, level);
            return Ok(level);
        }
        Ok(state.levels.get(&pin).copied().unwrap_or_default())
    }

    fn teardown(&mut self) -> Result<()> {
        let mut state = self.state()?;
        state.teardowns += 1;
        state.torn_down = true;
        state.modes.clear();
        state.levels.clear();
        state.echo = None;
        log::debug!("Simulated board released");
        Ok(())
    }
}
