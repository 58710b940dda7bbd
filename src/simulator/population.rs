//! One-compartment population PK simulation
//!
//! Every virtual subject gets its own CL, V, F (and ka when the population
//! defines one), drawn log-normally. The profile follows the closed form
//!
//! ```text
//! IV (no ka):  C(t) = Dose·F/V · e^(−ke·t)
//! with ka:     C(t) = Dose·F·ka / (V·(ka − ke)) · (e^(−ke·t) − e^(−ka·t))
//! ```
//!
//! with `ke = CL/V`, plus one additive residual per subject applied to all of
//! that subject's time points.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::data::{PkParameterSet, TimeGrid};
use crate::error::{ensure_non_negative, ensure_positive, PkpdError};
use crate::simulator::sampler::PopulationSampler;
use crate::stats::sanitize;

/// Configuration of a population PK simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationPkOptions {
    pub n_subjects: usize,
    pub dose: f64,
    /// Last sampling time (inclusive)
    pub horizon: f64,
    /// Sampling step (default: 0.1)
    pub step: f64,
    /// Also report the natural log of the concentrations
    pub log_concentrations: bool,
    /// Optional concentration ceiling (e.g. a toxicity threshold)
    pub concentration_limit: Option<f64>,
    /// Seed of the pseudorandom stream (None = entropy)
    pub seed: Option<u64>,
}

impl Default for PopulationPkOptions {
    fn default() -> Self {
        Self {
            n_subjects: 1,
            dose: 0.0,
            horizon: 24.0,
            step: 0.1,
            log_concentrations: false,
            concentration_limit: None,
            seed: None,
        }
    }
}

impl PopulationPkOptions {
    pub fn new(n_subjects: usize, dose: f64, horizon: f64) -> Self {
        Self {
            n_subjects,
            dose,
            horizon,
            ..Default::default()
        }
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    pub fn with_log_concentrations(mut self, log: bool) -> Self {
        self.log_concentrations = log;
        self
    }

    pub fn with_concentration_limit(mut self, limit: f64) -> Self {
        self.concentration_limit = Some(limit);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn validate(&self) -> Result<(), PkpdError> {
        if self.n_subjects == 0 {
            return Err(PkpdError::invalid("Number of Patients", 0.0));
        }
        ensure_non_negative("Dose", self.dose)?;
        if let Some(limit) = self.concentration_limit {
            ensure_positive("C Limit", limit)?;
        }
        Ok(())
    }
}

/// Individual parameter draws, one entry per subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectDraws {
    pub clearance: Array1<f64>,
    pub volume: Array1<f64>,
    pub bioavailability: Array1<f64>,
    pub ke: Array1<f64>,
    pub ka: Option<Array1<f64>>,
    pub residual: Array1<f64>,
}

/// Subject × time concentration matrix of a population simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationProfile {
    pub times: Vec<f64>,
    pub concentrations: Array2<f64>,
    pub log_concentrations: Option<Array2<f64>>,
    pub draws: SubjectDraws,
    pub concentration_limit: Option<f64>,
    /// Number of entries replaced by NaN because they were not finite
    pub sanitized: usize,
}

impl PopulationProfile {
    pub fn n_subjects(&self) -> usize {
        self.concentrations.nrows()
    }

    /// Ceiling on the log scale, for log-concentration displays
    pub fn log_limit(&self) -> Option<f64> {
        self.concentration_limit.map(f64::ln)
    }

    /// Subjects whose profile exceeds the concentration ceiling at any time
    pub fn subjects_above_limit(&self) -> Vec<usize> {
        let Some(limit) = self.concentration_limit else {
            return Vec::new();
        };
        self.concentrations
            .rows()
            .into_iter()
            .enumerate()
            .filter(|(_, row)| row.iter().any(|&c| c > limit))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Simulate concentration-time profiles of a virtual population
///
/// # Example
///
/// ```rust
/// use pkpd::prelude::*;
///
/// let params = PkParameterSet::new(
///     PopulationParameter::new(5.0, 0.2),
///     PopulationParameter::new(30.0, 0.1),
/// );
/// let options = PopulationPkOptions::new(10, 500.0, 24.0).with_seed(42);
/// let profile = simulate_population(&params, &options).unwrap();
/// assert_eq!(profile.concentrations.dim(), (10, 241));
/// ```
pub fn simulate_population(
    params: &PkParameterSet,
    options: &PopulationPkOptions,
) -> Result<PopulationProfile, PkpdError> {
    params.validate()?;
    options.validate()?;
    let grid = TimeGrid::new(options.horizon, options.step)?;
    let n = options.n_subjects;
    let mut sampler = PopulationSampler::from_seed(options.seed);

    let volume = sampler.sample_lognormal(params.volume.value, params.volume.omega, n)?;
    let clearance = sampler.sample_lognormal(params.clearance.value, params.clearance.omega, n)?;
    let bioavailability = sampler.sample_lognormal(
        params.bioavailability.value,
        params.bioavailability.omega,
        n,
    )?;
    let ke = &clearance / &volume;
    let residual = sampler.sample_normal(params.sigma_residual, n)?;
    let ka = match &params.ka {
        Some(ka) => Some(sampler.sample_lognormal(ka.value, ka.omega, n)?),
        None => None,
    };

    let times = grid.times();
    let dose = options.dose;
    let mut concentrations = Array2::<f64>::from_shape_fn((n, times.len()), |(i, j)| {
        let t = times[j];
        let (v, f, k) = (volume[i], bioavailability[i], ke[i]);
        let c = match &ka {
            None => dose * f / v * (-k * t).exp(),
            Some(ka) => {
                let a = ka[i];
                dose * f * a / (v * (a - k)) * ((-k * t).exp() - (-a * t).exp())
            }
        };
        c + residual[i]
    });

    let mut sanitized = sanitize(concentrations.iter_mut());
    let log_concentrations = if options.log_concentrations {
        let mut logs = concentrations.mapv(f64::ln);
        sanitized += sanitize(logs.iter_mut());
        Some(logs)
    } else {
        None
    };
    if sanitized > 0 {
        tracing::warn!(
            sanitized,
            "non-finite concentrations replaced by NaN (ka close to ke or extreme draws)"
        );
    }

    Ok(PopulationProfile {
        times: times.to_vec(),
        concentrations,
        log_concentrations,
        draws: SubjectDraws {
            clearance,
            volume,
            bioavailability,
            ke,
            ka,
            residual,
        },
        concentration_limit: options.concentration_limit,
        sanitized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PopulationParameter;
    use approx::assert_relative_eq;

    fn no_variability() -> PkParameterSet {
        PkParameterSet::new(
            PopulationParameter::fixed(6.0),
            PopulationParameter::fixed(30.0),
        )
    }

    #[test]
    fn test_iv_profile_without_variability() {
        let options = PopulationPkOptions::new(3, 500.0, 5.0).with_seed(1);
        let profile = simulate_population(&no_variability(), &options).unwrap();
        assert_eq!(profile.concentrations.dim(), (3, 51));
        for i in 0..3 {
            assert_relative_eq!(profile.concentrations[[i, 0]], 500.0 / 30.0, epsilon = 1e-12);
            assert_relative_eq!(
                profile.concentrations[[i, 50]],
                500.0 / 30.0 * (-0.2f64 * 5.0).exp(),
                epsilon = 1e-9
            );
        }
        assert_eq!(profile.sanitized, 0);
        assert!(profile.draws.ka.is_none());
    }

    #[test]
    fn test_absorption_profile_starts_at_zero() {
        let params = no_variability().with_ka(PopulationParameter::fixed(1.0));
        let options = PopulationPkOptions::new(2, 500.0, 24.0).with_seed(1);
        let profile = simulate_population(&params, &options).unwrap();
        assert_relative_eq!(profile.concentrations[[0, 0]], 0.0, epsilon = 1e-12);
        let peak = profile
            .concentrations
            .row(0)
            .iter()
            .cloned()
            .fold(f64::MIN, f64::max);
        assert!(peak > 0.0 && peak < 500.0 / 30.0);
    }

    #[test]
    fn test_ka_equal_to_ke_is_sanitized() {
        // ke = CL/V = 0.2
        let params = no_variability().with_ka(PopulationParameter::fixed(0.2));
        let options = PopulationPkOptions::new(1, 500.0, 1.0)
            .with_seed(1)
            .with_log_concentrations(true);
        let profile = simulate_population(&params, &options).unwrap();
        assert!(profile.concentrations.iter().all(|c| c.is_nan()));
        assert!(profile.sanitized > 0);
    }

    #[test]
    fn test_residual_is_shared_by_subject() {
        let params = no_variability().with_sigma_residual(0.5);
        let options = PopulationPkOptions::new(4, 500.0, 2.0).with_seed(9);
        let profile = simulate_population(&params, &options).unwrap();
        for i in 0..4 {
            let r = profile.draws.residual[i];
            let expected = 500.0 / 30.0 * (-0.2f64 * 2.0).exp() + r;
            assert_relative_eq!(profile.concentrations[[i, 20]], expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_limit_annotation() {
        let options = PopulationPkOptions::new(2, 500.0, 5.0)
            .with_seed(1)
            .with_concentration_limit(10.0);
        let profile = simulate_population(&no_variability(), &options).unwrap();
        assert_eq!(profile.subjects_above_limit(), vec![0, 1]);
        assert_relative_eq!(profile.log_limit().unwrap(), 10.0f64.ln());
    }

    #[test]
    fn test_negative_log_is_missing() {
        let options = PopulationPkOptions::new(1, 0.0, 1.0)
            .with_seed(1)
            .with_log_concentrations(true);
        let profile = simulate_population(&no_variability(), &options).unwrap();
        let logs = profile.log_concentrations.unwrap();
        assert!(logs.iter().all(|l| l.is_nan()));
    }

    #[test]
    fn test_zero_subjects_is_rejected() {
        let options = PopulationPkOptions::new(0, 500.0, 1.0);
        assert!(simulate_population(&no_variability(), &options).is_err());
    }
}
