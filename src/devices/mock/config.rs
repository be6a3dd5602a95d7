//! Mock board simulation configuration
//!
//! Every parameter has a default matching an HC-SR04 sensor on a 1.8° stepper
//! in a small room, so `[device.simulation]` may be left empty.
//!
//! ```text
//! SimulationConfig
//! ├── random_seed, speed_factor          # Simulation control
//! ├── poll_interval_us, echo_latency_us  # Sensor timing model
//! ├── max_range_cm, steps_per_revolution
//! ├── RoomConfig                         # Walls + round obstacles
//! └── EchoNoiseConfig                    # Range noise, miss rate
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Slowest wall-clock pacing accepted for `speed_factor`
pub const MIN_SPEED_FACTOR: f32 = 0.01;

/// Noise applied to simulated echoes
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EchoNoiseConfig {
    /// Range noise standard deviation (cm)
    #[serde(default = "default_range_stddev")]
    pub range_stddev_cm: f32,

    /// Probability that a ping produces no echo (0.0-1.0)
    #[serde(default = "default_miss_rate")]
    pub miss_rate: f32,
}

fn default_range_stddev() -> f32 {
    0.5
}
fn default_miss_rate() -> f32 {
    0.01
}

impl Default for EchoNoiseConfig {
    fn default() -> Self {
        Self {
            range_stddev_cm: default_range_stddev(),
            miss_rate: default_miss_rate(),
        }
    }
}

/// Round obstacle inside the room
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ObstacleConfig {
    pub x_cm: f32,
    pub y_cm: f32,
    pub radius_cm: f32,
}

/// Rectangular room with the sensor somewhere inside
///
/// Room coordinates put the origin at one corner; heading 0° points along +x.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoomConfig {
    #[serde(default = "default_room_width")]
    pub width_cm: f32,
    #[serde(default = "default_room_depth")]
    pub depth_cm: f32,
    #[serde(default = "default_sensor_x")]
    pub sensor_x_cm: f32,
    #[serde(default = "default_sensor_y")]
    pub sensor_y_cm: f32,
    #[serde(default)]
    pub obstacles: Vec<ObstacleConfig>,
}

fn default_room_width() -> f32 {
    200.0
}
fn default_room_depth() -> f32 {
    150.0
}
fn default_sensor_x() -> f32 {
    100.0
}
fn default_sensor_y() -> f32 {
    75.0
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            width_cm: default_room_width(),
            depth_cm: default_room_depth(),
            sensor_x_cm: default_sensor_x(),
            sensor_y_cm: default_sensor_y(),
            obstacles: Vec::new(),
        }
    }
}

/// Top-level simulation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Noise seed (0 = random each run)
    #[serde(default)]
    pub random_seed: u64,

    /// Wall-clock pacing: 1.0 = real time, 2.0 = 2x speed, 0.0 = no pacing
    #[serde(default)]
    pub speed_factor: f32,

    /// Virtual time consumed by one read of a pin (µs)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_us: u64,

    /// Delay between trigger falling edge and echo rising edge (µs)
    #[serde(default = "default_echo_latency")]
    pub echo_latency_us: u64,

    /// Targets beyond this range produce no echo (cm)
    #[serde(default = "default_max_range")]
    pub max_range_cm: f32,

    /// Full-step count of the simulated motor
    #[serde(default = "default_steps_per_revolution")]
    pub steps_per_revolution: u32,

    #[serde(default)]
    pub room: RoomConfig,

    #[serde(default)]
    pub noise: EchoNoiseConfig,
}

fn default_poll_interval() -> u64 {
    1
}
fn default_echo_latency() -> u64 {
    200
}
fn default_max_range() -> f32 {
    400.0
}
fn default_steps_per_revolution() -> u32 {
    200
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            random_seed: 0,
            speed_factor: 0.0,
            poll_interval_us: default_poll_interval(),
            echo_latency_us: default_echo_latency(),
            max_range_cm: default_max_range(),
            steps_per_revolution: default_steps_per_revolution(),
            room: RoomConfig::default(),
            noise: EchoNoiseConfig::default(),
        }
    }
}

fn require(ok: bool, message: impl FnOnce() -> String) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(Error::Config(message()))
    }
}

impl RoomConfig {
    pub fn validate(&self) -> Result<()> {
        require(self.width_cm.is_finite() && self.width_cm > 0.0, || {
            format!("room.width_cm must be positive, got {}", self.width_cm)
        })?;
        require(self.depth_cm.is_finite() && self.depth_cm > 0.0, || {
            format!("room.depth_cm must be positive, got {}", self.depth_cm)
        })?;
        require(
            (0.0..=self.width_cm).contains(&self.sensor_x_cm)
                && (0.0..=self.depth_cm).contains(&self.sensor_y_cm),
            || {
                format!(
                    "room sensor position ({}, {}) is outside the {} x {} cm room",
                    self.sensor_x_cm, self.sensor_y_cm, self.width_cm, self.depth_cm
                )
            },
        )?;
        for (i, obstacle) in self.obstacles.iter().enumerate() {
            require(
                obstacle.x_cm.is_finite()
                    && obstacle.y_cm.is_finite()
                    && obstacle.radius_cm.is_finite()
                    && obstacle.radius_cm > 0.0,
                || format!("room.obstacles[{}] needs a finite center and radius > 0", i),
            )?;
        }
        Ok(())
    }
}

impl EchoNoiseConfig {
    pub fn validate(&self) -> Result<()> {
        require(
            self.range_stddev_cm.is_finite() && self.range_stddev_cm >= 0.0,
            || {
                format!(
                    "noise.range_stddev_cm must be >= 0, got {}",
                    self.range_stddev_cm
                )
            },
        )?;
        require((0.0..=1.0).contains(&self.miss_rate), || {
            format!("noise.miss_rate must be in 0.0..=1.0, got {}", self.miss_rate)
        })
    }
}

impl SimulationConfig {
    /// Reject values the simulated board cannot run with
    pub fn validate(&self) -> Result<()> {
        // Reads are the only thing moving virtual time during an echo wait
        require(self.poll_interval_us > 0, || {
            "simulation.poll_interval_us must be at least 1".to_string()
        })?;
        require(
            self.speed_factor == 0.0
                || (self.speed_factor.is_finite() && self.speed_factor >= MIN_SPEED_FACTOR),
            || {
                format!(
                    "simulation.speed_factor must be 0 or >= {}, got {}",
                    MIN_SPEED_FACTOR, self.speed_factor
                )
            },
        )?;
        require(self.max_range_cm.is_finite() && self.max_range_cm > 0.0, || {
            format!(
                "simulation.max_range_cm must be positive, got {}",
                self.max_range_cm
            )
        })?;
        require(self.steps_per_revolution > 0, || {
            "simulation.steps_per_revolution must be at least 1".to_string()
        })?;
        self.room.validate()?;
        self.noise.validate()
    }
}
