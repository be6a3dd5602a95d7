//! Sweep sample types

use std::fmt;

/// Echo transition waited on during a measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Low to high (start of the echo pulse)
    Rising,
    /// High to low (end of the echo pulse)
    Falling,
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Rising => write!(f, "rising edge"),
            Edge::Falling => write!(f, "falling edge"),
        }
    }
}

/// Outcome of one range measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// Distance in centimeters
    Range(f32),
    /// No distance: the wait for this edge timed out
    Missing(Edge),
}

/// A single sweep measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Cumulative commanded angle in degrees since the start of the sweep
    pub angle: u32,
    /// Measured range, or the edge that timed out
    pub reading: Reading,
}

impl Sample {
    pub fn new(angle: u32, reading: Reading) -> Self {
        Self { angle, reading }
    }

    /// Angle folded into `[0, 360)`
    pub fn heading(&self) -> u32 {
        self.angle % 360
    }

    /// Distance in centimeters, `None` if the measurement timed out
    pub fn distance(&self) -> Option<f32> {
        match self.reading {
            Reading::Range(cm) => Some(cm),
            Reading::Missing(_) => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self.reading, Reading::Missing(_))
    }

    /// Project to Cartesian coordinates (x, y) in centimeters
    pub fn to_cartesian(&self) -> Option<(f32, f32)> {
        let distance = self.distance()?;
        let theta = (self.heading() as f32).to_radians();
        Some((distance * theta.cos(), distance * theta.sin()))
    }
}

/// One sweep worth of samples, in acquisition order
///
/// Missing measurements stay in the sequence so that position `i` always
/// corresponds to angle `(i + 1) * step_angle`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSession {
    /// Angular increment between samples (degrees)
    pub step_angle: u32,
    /// Number of steps a full sweep takes
    pub planned_steps: u32,
    /// Samples in acquisition order
    pub samples: Vec<Sample>,
    /// Sweep stopped early by an interrupt
    pub aborted: bool,
}

impl ScanSession {
    pub fn new(step_angle: u32, planned_steps: u32) -> Self {
        Self {
            step_angle,
            planned_steps,
            samples: Vec::with_capacity(planned_steps as usize),
            aborted: false,
        }
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// All planned steps were taken
    pub fn is_complete(&self) -> bool {
        !self.aborted && self.samples.len() == self.planned_steps as usize
    }

    pub fn valid_count(&self) -> usize {
        self.samples.iter().filter(|s| !s.is_missing()).count()
    }

    pub fn missing_count(&self) -> usize {
        self.samples.iter().filter(|s| s.is_missing()).count()
    }

    /// Angle recorded for the last sample (0 if none)
    pub fn final_angle(&self) -> u32 {
        self.samples.last().map_or(0, |s| s.angle)
    }

    /// Cartesian points of all valid samples
    pub fn points(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.samples.iter().filter_map(Sample::to_cartesian)
    }
}
