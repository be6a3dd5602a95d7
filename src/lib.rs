//! drishti-scan - Ultrasonic sweep mapping
//!
//! Rotates an HC-SR04 style range sensor on a stepper motor, pings once per
//! step and collects the resulting (angle, distance) samples into a
//! [`ScanSession`] that a [`PlotSink`] can render.
//!
//! ## Features
//!
//! - `rpi`: Raspberry Pi GPIO backend (via `rppal`)
//!
//! Without `rpi`, the simulated board in [`devices::mock`] is the only backend.

pub mod config;
pub mod core;
pub mod devices;
pub mod error;
pub mod plot;
pub mod scanner;

// Re-export commonly used types
pub use crate::core::types::{Edge, Reading, Sample, ScanSession};
pub use config::Config;
pub use devices::{create_device, Device};
pub use error::{Error, Result};
pub use plot::{PlotSink, SvgPlot, SvgPlotConfig};
pub use scanner::{ScanState, ScanTiming, Scanner};
