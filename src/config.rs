//! Configuration for drishti-scan
//!
//! Loads configuration from a TOML file. Only the device backend, pin
//! assignment, sweep step and plot output are configurable; pulse timing is
//! fixed (see [`ScanTiming`](crate::scanner::ScanTiming)).

use crate::devices::mock::config::SimulationConfig;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub pins: PinConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub plot: PlotConfig,
}

/// Device backend selection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// Backend type: "rpi" or "mock"
    #[serde(rename = "type", default = "default_device_type")]
    pub device_type: String,

    /// Human-readable name for logs
    #[serde(default = "default_device_name")]
    pub name: String,

    /// Mock board parameters (only read when type = "mock")
    #[serde(default)]
    pub simulation: Option<SimulationConfig>,
}

fn default_device_type() -> String {
    "rpi".to_string()
}
fn default_device_name() -> String {
    "HC-SR04 + A4988 sweep head".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_type: default_device_type(),
            name: default_device_name(),
            simulation: None,
        }
    }
}

/// BCM pin assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct PinConfig {
    /// Ultrasonic trigger output
    #[serde(default = "default_trigger_pin")]
    pub trigger: u8,
    /// Ultrasonic echo input
    #[serde(default = "default_echo_pin")]
    pub echo: u8,
    /// Stepper driver STEP output
    #[serde(default = "default_step_pin")]
    pub step: u8,
    /// Stepper driver DIR output
    #[serde(default = "default_direction_pin")]
    pub direction: u8,
}

fn default_trigger_pin() -> u8 {
    13
}
fn default_echo_pin() -> u8 {
    25
}
fn default_step_pin() -> u8 {
    18
}
fn default_direction_pin() -> u8 {
    17
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            trigger: default_trigger_pin(),
            echo: default_echo_pin(),
            step: default_step_pin(),
            direction: default_direction_pin(),
        }
    }
}

/// Sweep parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanConfig {
    /// Angular increment per sample (whole degrees, 1-360)
    #[serde(default = "default_step_angle")]
    pub step_angle: u32,
}

fn default_step_angle() -> u32 {
    10
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            step_angle: default_step_angle(),
        }
    }
}

/// Plot output
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlotConfig {
    /// SVG output path
    #[serde(default = "default_plot_output")]
    pub output: String,
    #[serde(default = "default_plot_title")]
    pub title: String,
}

fn default_plot_output() -> String {
    "scan.svg".to_string()
}
fn default_plot_title() -> String {
    "2D Object Mapping".to_string()
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            output: default_plot_output(),
            title: default_plot_title(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    ///
    /// # Example
    /// ```no_run
    /// use drishti_scan::Config;
    ///
    /// let config = Config::load("drishti.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges, pin uniqueness and the simulation block
    pub fn validate(&self) -> Result<()> {
        if !(1..=360).contains(&self.scan.step_angle) {
            return Err(Error::Config(format!(
                "scan.step_angle must be in 1..=360, got {}",
                self.scan.step_angle
            )));
        }

        let pins = [
            ("trigger", self.pins.trigger),
            ("echo", self.pins.echo),
            ("step", self.pins.step),
            ("direction", self.pins.direction),
        ];
        for (i, (name_a, pin_a)) in pins.iter().enumerate() {
            for (name_b, pin_b) in &pins[i + 1..] {
                if pin_a == pin_b {
                    return Err(Error::Config(format!(
                        "pins.{} and pins.{} share GPIO{}",
                        name_a, name_b, pin_a
                    )));
                }
            }
        }

        if let Some(simulation) = &self.device.simulation {
            simulation.validate()?;
        }

        Ok(())
    }
}
