//! Population parameter sets for simulation
//!
//! Each parameter is described by a typical (population) value and an
//! inter-individual variability `omega`, the standard deviation of the
//! log-normal random effect. Individual values are drawn as
//! `value * exp(eta)` with `eta ~ N(0, omega)`.

use serde::{Deserialize, Serialize};

use crate::error::{ensure_non_negative, PkpdError};

/// Typical value and inter-individual variability of one parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopulationParameter {
    /// Population (typical) value
    pub value: f64,
    /// Standard deviation of the log-normal random effect
    pub omega: f64,
}

impl PopulationParameter {
    pub fn new(value: f64, omega: f64) -> Self {
        Self { value, omega }
    }

    /// A parameter without inter-individual variability
    pub fn fixed(value: f64) -> Self {
        Self { value, omega: 0.0 }
    }

    pub(crate) fn validate(&self, name: &str) -> Result<(), PkpdError> {
        ensure_non_negative(&format!("Population {name}"), self.value)?;
        ensure_non_negative(&format!("Omega {name}"), self.omega)
    }
}

/// Pharmacokinetic parameters of a one-compartment population model
///
/// When `ka` is `None` the model degenerates to first-order elimination
/// without an absorption phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PkParameterSet {
    pub clearance: PopulationParameter,
    pub volume: PopulationParameter,
    pub ka: Option<PopulationParameter>,
    pub bioavailability: PopulationParameter,
    /// Standard deviation of the additive residual error
    pub sigma_residual: f64,
}

impl PkParameterSet {
    pub fn new(clearance: PopulationParameter, volume: PopulationParameter) -> Self {
        Self {
            clearance,
            volume,
            ka: None,
            bioavailability: PopulationParameter::fixed(1.0),
            sigma_residual: 0.0,
        }
    }

    pub fn with_ka(mut self, ka: PopulationParameter) -> Self {
        self.ka = Some(ka);
        self
    }

    pub fn with_bioavailability(mut self, bioavailability: PopulationParameter) -> Self {
        self.bioavailability = bioavailability;
        self
    }

    pub fn with_sigma_residual(mut self, sigma: f64) -> Self {
        self.sigma_residual = sigma;
        self
    }

    /// Check the non-negativity invariant of every mean, omega and sigma
    pub fn validate(&self) -> Result<(), PkpdError> {
        self.clearance.validate("CL")?;
        self.volume.validate("V")?;
        self.bioavailability.validate("F")?;
        if let Some(ka) = &self.ka {
            ka.validate("ka")?;
        }
        ensure_non_negative("Sigma Residual", self.sigma_residual)
    }
}

/// Pharmacodynamic parameters of the sigmoid Emax (Hill) model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdParameterSet {
    pub emax: PopulationParameter,
    pub ec50: PopulationParameter,
    pub baseline: PopulationParameter,
    pub hill: PopulationParameter,
    pub sigma_residual: f64,
}

impl PdParameterSet {
    pub fn new(emax: PopulationParameter, ec50: PopulationParameter) -> Self {
        Self {
            emax,
            ec50,
            baseline: PopulationParameter::fixed(0.0),
            hill: PopulationParameter::fixed(1.0),
            sigma_residual: 0.0,
        }
    }

    pub fn with_baseline(mut self, baseline: PopulationParameter) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn with_hill(mut self, hill: PopulationParameter) -> Self {
        self.hill = hill;
        self
    }

    pub fn with_sigma_residual(mut self, sigma: f64) -> Self {
        self.sigma_residual = sigma;
        self
    }

    pub fn validate(&self) -> Result<(), PkpdError> {
        self.emax.validate("Emax")?;
        self.ec50.validate("EC50")?;
        self.baseline.validate("Ebaseline")?;
        self.hill.validate("Hill")?;
        ensure_non_negative("Sigma Residual", self.sigma_residual)
    }
}
