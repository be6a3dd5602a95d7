//! Error types for drishti-scan

use crate::core::types::Edge;
use std::time::Duration;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// drishti-scan error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raspberry Pi GPIO error
    #[cfg(feature = "rpi")]
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unknown device type in configuration
    #[error("Unknown device type: {0}")]
    UnknownDevice(String),

    /// Operation not supported by this build or backend
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// I/O interface used before setup or after teardown
    #[error("Device not initialized")]
    NotInitialized,

    /// Pin used without (or against) its configured mode
    #[error("Pin {pin} is not configured for {operation}")]
    PinNotConfigured {
        /// BCM pin number
        pin: u8,
        /// Attempted operation
        operation: &'static str,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Echo line never went high within the budget
    #[error("Timeout waiting for rising edge ({}ms)", .timeout.as_millis())]
    RisingEdgeTimeout {
        /// Budget that was exceeded
        timeout: Duration,
    },

    /// Echo line never went low within the budget after the rising edge
    #[error("Timeout waiting for falling edge ({}ms)", .timeout.as_millis())]
    FallingEdgeTimeout {
        /// Budget that was exceeded
        timeout: Duration,
    },

    /// Mutex poisoned (thread panicked while holding lock)
    #[error("Mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// The edge that timed out, if this is one of the recoverable measurement errors.
    pub fn timed_out_edge(&self) -> Option<Edge> {
        match self {
            Error::RisingEdgeTimeout { .. } => Some(Edge::Rising),
            Error::FallingEdgeTimeout { .. } => Some(Edge::Falling),
            _ => None,
        }
    }
}
