//! Echo noise model
//!
//! A ping is either lost (no echo at all) or returns the true range plus
//! zero-mean Gaussian error. Both draws come from one seeded generator so a
//! given seed replays the same sequence of hits and misses.

use super::config::EchoNoiseConfig;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

pub struct EchoNoise {
    rng: SmallRng,
    range_error: Option<Normal<f32>>,
    miss_rate: f32,
}

impl EchoNoise {
    /// `seed == 0` draws from OS entropy
    pub fn new(seed: u64, config: &EchoNoiseConfig) -> Self {
        let rng = match seed {
            0 => SmallRng::from_entropy(),
            seed => SmallRng::seed_from_u64(seed),
        };
        let range_error = if config.range_stddev_cm > 0.0 {
            Normal::new(0.0, config.range_stddev_cm).ok()
        } else {
            None
        };
        Self {
            rng,
            range_error,
            miss_rate: config.miss_rate,
        }
    }

    /// Range the sensor reports for a surface at `range_cm`, `None` if the ping is lost
    pub fn perturb(&mut self, range_cm: f32) -> Option<f32> {
        if self.miss_rate > 0.0 && self.rng.gen::<f32>() < self.miss_rate {
            return None;
        }
        let error = self
            .range_error
            .map_or(0.0, |normal| normal.sample(&mut self.rng));
        Some(range_cm + error)
    }
}
