use rand::distributions::{Distribution, Standard};
use rand::Rng;

use crate::error::{Error, Result};

/// Probability of replacing a correctly computed checksum with a random one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorPolicy {
    probability: f64,
}

impl ErrorPolicy {
    pub const NEVER: ErrorPolicy = ErrorPolicy { probability: 0.0 };
    #[cfg(test)]
    pub const ALWAYS: ErrorPolicy = ErrorPolicy { probability: 1.0 };

    pub fn new(probability: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(Error::Probability(probability));
        }
        Ok(ErrorPolicy { probability })
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Draws once; on a hit returns a uniformly random value of the same width
    /// as `correct`, otherwise `correct` itself.
    pub fn apply<T, R>(&self, rng: &mut R, correct: T) -> T
    where
        R: Rng + ?Sized,
        Standard: Distribution<T>,
    {
        if rng.gen::<f64>() < self.probability {
            rng.gen()
        } else {
            correct
        }
    }
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        ErrorPolicy::NEVER
    }
}

/// Per-layer error rates for one run.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ErrorRates {
    pub frame: ErrorPolicy,
    pub ip: ErrorPolicy,
    pub icmp: ErrorPolicy,
}
