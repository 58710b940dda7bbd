//! Population pharmacodynamic simulation with the sigmoid Emax (Hill) model
//!
//! `E(C) = E0 + Emax·C^h / (EC50^h + C^h)`, evaluated over a concentration grid
//! for every virtual subject. With `h = 1` this is the plain Emax model.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::data::{PdParameterSet, TimeGrid};
use crate::error::{ensure_positive, PkpdError};
use crate::simulator::sampler::PopulationSampler;
use crate::stats::sanitize;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationPdOptions {
    pub n_subjects: usize,
    /// Upper end of the concentration grid
    pub max_concentration: f64,
    /// Number of grid points over `[0, max_concentration]` (default: 1000)
    pub n_points: usize,
    pub effect_limit: Option<f64>,
    pub seed: Option<u64>,
}

impl Default for PopulationPdOptions {
    fn default() -> Self {
        Self {
            n_subjects: 1,
            max_concentration: 20.0,
            n_points: 1000,
            effect_limit: None,
            seed: None,
        }
    }
}

impl PopulationPdOptions {
    pub fn new(n_subjects: usize, max_concentration: f64) -> Self {
        Self {
            n_subjects,
            max_concentration,
            ..Default::default()
        }
    }

    pub fn with_points(mut self, n_points: usize) -> Self {
        self.n_points = n_points;
        self
    }

    pub fn with_effect_limit(mut self, limit: f64) -> Self {
        self.effect_limit = Some(limit);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Sigmoid Emax model for one subject
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HillModel {
    pub baseline: f64,
    pub emax: f64,
    pub ec50: f64,
    pub hill: f64,
}

impl HillModel {
    #[inline]
    pub fn effect(&self, concentration: f64) -> f64 {
        let c = concentration.max(0.0).powf(self.hill);
        self.baseline + self.emax * c / (self.ec50.powf(self.hill) + c)
    }
}

/// Subject × concentration effect matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdProfile {
    pub concentrations: Vec<f64>,
    pub effects: Array2<f64>,
    pub models: Vec<HillModel>,
    pub residual: Array1<f64>,
    pub effect_limit: Option<f64>,
    pub sanitized: usize,
}

/// Simulate effect-concentration curves of a virtual population
pub fn simulate_population_pd(
    params: &PdParameterSet,
    options: &PopulationPdOptions,
) -> Result<PdProfile, PkpdError> {
    params.validate()?;
    if options.n_subjects == 0 {
        return Err(PkpdError::invalid("Number of Patients", 0.0));
    }
    ensure_positive("Sampling Conc", options.max_concentration)?;
    let grid = TimeGrid::linspace(options.max_concentration, options.n_points)?;
    let n = options.n_subjects;
    let mut sampler = PopulationSampler::from_seed(options.seed);

    let baseline = sampler.sample_lognormal(params.baseline.value, params.baseline.omega, n)?;
    let emax = sampler.sample_lognormal(params.emax.value, params.emax.omega, n)?;
    let ec50 = sampler.sample_lognormal(params.ec50.value, params.ec50.omega, n)?;
    let hill = sampler.sample_lognormal(params.hill.value, params.hill.omega, n)?;
    let residual = sampler.sample_normal(params.sigma_residual, n)?;

    let models: Vec<HillModel> = (0..n)
        .map(|i| HillModel {
            baseline: baseline[i],
            emax: emax[i],
            ec50: ec50[i],
            hill: hill[i],
        })
        .collect();

    let concentrations = grid.times().to_vec();
    let mut effects = Array2::from_shape_fn((n, concentrations.len()), |(i, j)| {
        models[i].effect(concentrations[j]) + residual[i]
    });
    let sanitized = sanitize(effects.iter_mut());
    if sanitized > 0 {
        tracing::warn!(sanitized, "non-finite effects replaced by NaN");
    }

    Ok(PdProfile {
        concentrations,
        effects,
        models,
        residual,
        effect_limit: options.effect_limit,
        sanitized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PopulationParameter;
    use approx::assert_relative_eq;

    #[test]
    fn test_emax_at_ec50_is_half_maximal() {
        let model = HillModel {
            baseline: 1.0,
            emax: 6.0,
            ec50: 5.0,
            hill: 2.0,
        };
        assert_relative_eq!(model.effect(5.0), 4.0);
        assert_relative_eq!(model.effect(0.0), 1.0);
    }

    #[test]
    fn test_population_without_variability() {
        let params = PdParameterSet::new(
            PopulationParameter::fixed(6.43),
            PopulationParameter::fixed(5.38),
        )
        .with_baseline(PopulationParameter::fixed(1.0));
        let options = PopulationPdOptions::new(2, 50.0).with_seed(3);
        let profile = simulate_population_pd(&params, &options).unwrap();
        assert_eq!(profile.effects.dim(), (2, 1000));
        assert_relative_eq!(profile.effects[[1, 0]], 1.0);
        let last = profile.effects[[0, 999]];
        assert_relative_eq!(last, 1.0 + 6.43 * 50.0 / (5.38 + 50.0), epsilon = 1e-12);
    }
}
