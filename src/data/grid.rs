use serde::{Deserialize, Serialize};

use crate::error::{ensure_positive, PkpdError};

/// Relative tolerance used to accept a grid as uniformly spaced
const STEP_TOLERANCE: f64 = 1e-6;

/// A fixed-step grid of sampling points starting at zero
///
/// Points are computed as `i * step` rather than by repeated addition, so long
/// horizons do not accumulate rounding drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeGrid {
    times: Vec<f64>,
    step: f64,
}

impl TimeGrid {
    /// Build the grid `0, step, 2·step, …, horizon` (inclusive)
    pub fn new(horizon: f64, step: f64) -> Result<Self, PkpdError> {
        ensure_positive("step", step)?;
        if !horizon.is_finite() || horizon < 0.0 {
            return Err(PkpdError::InvalidTimeGrid {
                reason: format!("horizon must be finite and non-negative, got {horizon}"),
            });
        }
        let n = (horizon / step + STEP_TOLERANCE).floor() as usize + 1;
        let times = (0..n).map(|i| i as f64 * step).collect();
        Ok(Self { times, step })
    }

    /// `n` evenly spaced points over `[0, end]`, both ends included
    pub fn linspace(end: f64, n: usize) -> Result<Self, PkpdError> {
        if n < 2 {
            return Err(PkpdError::InvalidTimeGrid {
                reason: format!("linspace needs at least 2 points, got {n}"),
            });
        }
        ensure_positive("end", end)?;
        let step = end / (n - 1) as f64;
        let mut times: Vec<f64> = (0..n).map(|i| i as f64 * step).collect();
        times[n - 1] = end;
        Ok(Self { times, step })
    }

    /// Validate a caller-supplied grid: it must start at 0 and have a fixed step
    pub fn from_times(times: Vec<f64>) -> Result<Self, PkpdError> {
        match times.first() {
            None => {
                return Err(PkpdError::InvalidTimeGrid {
                    reason: "grid is empty".to_string(),
                })
            }
            Some(&t0) if t0 != 0.0 => {
                return Err(PkpdError::InvalidTimeGrid {
                    reason: format!("grid must start at 0, starts at {t0}"),
                })
            }
            _ => {}
        }
        if times.len() == 1 {
            return Ok(Self { times, step: 0.0 });
        }

        let step = times[1] - times[0];
        if !(step.is_finite() && step > 0.0) {
            return Err(PkpdError::InvalidTimeGrid {
                reason: format!("step must be positive, got {step}"),
            });
        }
        for (i, pair) in times.windows(2).enumerate() {
            let delta = pair[1] - pair[0];
            if (delta - step).abs() > STEP_TOLERANCE * step {
                return Err(PkpdError::InvalidTimeGrid {
                    reason: format!(
                        "non-uniform step between points {} and {}: {delta} != {step}",
                        i,
                        i + 1
                    ),
                });
            }
        }
        Ok(Self { times, step })
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn horizon(&self) -> f64 {
        self.times.last().copied().unwrap_or(0.0)
    }
}
