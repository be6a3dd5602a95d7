//! Core abstractions shared by the scanner and device backends.
//!
//! - [`io::DigitalIo`]: Trait to implement for new pin backends
//! - [`clock::Clock`]: Time source used for pulse timing and delays
//! - [`types`]: Samples, readings and scan sessions

pub mod clock;
pub mod io;
pub mod types;
