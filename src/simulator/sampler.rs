//! Inter-individual variability sampling
//!
//! [`PopulationSampler`] owns a seeded pseudorandom stream. A fixed seed gives
//! reproducible populations; [`PopulationSampler::split`] hands out independent,
//! deterministically seeded sub-samplers for parallel consumers.

use ndarray::Array1;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::error::{ensure_non_negative, PkpdError};

#[derive(Debug, Clone)]
pub struct PopulationSampler {
    rng: StdRng,
}

impl PopulationSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seed from the thread-local generator
    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    /// Build from an optional seed, falling back to entropy
    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::new)
    }

    /// `n` draws of `value * exp(eta)` with `eta ~ N(0, omega)`
    ///
    /// With `omega = 0` every draw equals `value`.
    pub fn sample_lognormal(
        &mut self,
        value: f64,
        omega: f64,
        n: usize,
    ) -> Result<Array1<f64>, PkpdError> {
        ensure_non_negative("population value", value)?;
        let eta = self.sample_normal(omega, n)?;
        Ok(eta.mapv(|e| value * e.exp()))
    }

    /// `n` draws from `N(0, sigma)`; all zero when `sigma = 0`
    pub fn sample_normal(&mut self, sigma: f64, n: usize) -> Result<Array1<f64>, PkpdError> {
        ensure_non_negative("sigma", sigma)?;
        let normal =
            Normal::new(0.0, sigma).map_err(|e| PkpdError::Distribution(e.to_string()))?;
        Ok(Array1::from_iter(
            (0..n).map(|_| normal.sample(&mut self.rng)),
        ))
    }

    /// Derive `n` independent sub-samplers from this stream
    pub fn split(&mut self, n: usize) -> Vec<PopulationSampler> {
        (0..n)
            .map(|_| PopulationSampler::new(self.rng.random::<u64>()))
            .collect()
    }
}
