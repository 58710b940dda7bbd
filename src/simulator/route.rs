//! Closed-form single-dose profiles of the one-compartment model
//!
//! | Route | Concentration |
//! |-------|---------------|
//! | IV bolus | `Dose/Vd · e^(−ke·t)` |
//! | IV infusion, `t ≤ D` | `Dose/(Vd·D·ke) · (1 − e^(−ke·t))` |
//! | IV infusion, `t > D` | `Dose/(Vd·D·ke) · (1 − e^(−ke·D)) · e^(−ke·(t−D))` |
//! | Extravascular | `Dose·F·ka/(Vd·(ka−ke)) · (e^(−ke·t) − e^(−ka·t))` |
//!
//! Multi-dose regimens are built by superposition: every dose is evaluated at
//! `t − start` for `t ≥ start`, is zero before its start, and the per-dose
//! profiles are summed.

use serde::{Deserialize, Serialize};

use crate::data::{DoseEvent, DoseRegimen, Route, TimeGrid};
use crate::error::{ensure_non_negative, ensure_positive, PkpdError};
use crate::stats::sanitize;

#[inline]
fn iv_bolus_at(dose: f64, vd: f64, ke: f64, t: f64) -> f64 {
    dose / vd * (-ke * t).exp()
}

#[inline]
fn iv_infusion_at(dose: f64, vd: f64, ke: f64, duration: f64, t: f64) -> f64 {
    let plateau = dose / (vd * duration * ke);
    if t <= duration {
        plateau * (1.0 - (-ke * t).exp())
    } else {
        plateau * (1.0 - (-ke * duration).exp()) * (-ke * (t - duration)).exp()
    }
}

#[inline]
fn extravascular_at(dose: f64, f: f64, vd: f64, ke: f64, ka: f64, t: f64) -> f64 {
    dose * f * ka / (vd * (ka - ke)) * ((-ke * t).exp() - (-ka * t).exp())
}

/// Instantaneous IV dose
pub fn iv_bolus(dose: f64, vd: f64, ke: f64, times: &[f64]) -> Vec<f64> {
    times.iter().map(|&t| iv_bolus_at(dose, vd, ke, t)).collect()
}

/// Constant-rate IV infusion lasting `duration`
pub fn iv_infusion(dose: f64, vd: f64, ke: f64, duration: f64, times: &[f64]) -> Vec<f64> {
    times
        .iter()
        .map(|&t| iv_infusion_at(dose, vd, ke, duration, t))
        .collect()
}

/// First-order absorption with bioavailability `f`
pub fn extravascular(dose: f64, f: f64, vd: f64, ke: f64, ka: f64, times: &[f64]) -> Vec<f64> {
    times
        .iter()
        .map(|&t| extravascular_at(dose, f, vd, ke, ka, t))
        .collect()
}

/// Disposition parameters shared by all doses of a regimen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteParameters {
    pub ke: f64,
    pub vd: f64,
    /// Absorption rate constant, required by extravascular doses
    pub ka: Option<f64>,
}

impl RouteParameters {
    pub fn new(ke: f64, vd: f64) -> Self {
        Self { ke, vd, ka: None }
    }

    pub fn with_ka(mut self, ka: f64) -> Self {
        self.ka = Some(ka);
        self
    }

    /// Build from clearance instead of an elimination rate constant
    pub fn from_clearance(clearance: f64, vd: f64) -> Self {
        Self::new(clearance / vd, vd)
    }

    fn validate(&self) -> Result<(), PkpdError> {
        ensure_non_negative("ke", self.ke)?;
        ensure_positive("Vd", self.vd)?;
        if let Some(ka) = self.ka {
            ensure_non_negative("ka", ka)?;
        }
        Ok(())
    }

    /// Concentration at time `t` after the start of a single dose
    fn single_dose(&self, event: &DoseEvent, t: f64) -> Result<f64, PkpdError> {
        let value = match event.route {
            Route::IvBolus => iv_bolus_at(event.amount, self.vd, self.ke, t),
            Route::IvInfusion { duration } => {
                iv_infusion_at(event.amount, self.vd, self.ke, duration, t)
            }
            Route::Extravascular { bioavailability } => {
                let ka = self.ka.ok_or_else(|| PkpdError::MissingAbsorptionRate {
                    context: format!("extravascular dose at t = {}", event.start),
                })?;
                extravascular_at(event.amount, bioavailability, self.vd, self.ke, ka, t)
            }
        };
        Ok(value)
    }
}

/// Per-dose and summed profiles of a regimen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimenProfile {
    pub times: Vec<f64>,
    /// One profile per dose event, in regimen order, zero before its start
    pub per_dose: Vec<Vec<f64>>,
    pub total: Vec<f64>,
    pub sanitized: usize,
}

/// Superpose the single-dose profiles of a regimen on a time grid
///
/// # Example
///
/// ```rust
/// use pkpd::prelude::*;
///
/// let regimen = DoseRegimen::builder()
///     .dose(DoseEvent::iv_bolus(0.0, 500.0))
///     .dose(DoseEvent::iv_bolus(12.0, 500.0))
///     .build()
///     .unwrap();
/// let grid = TimeGrid::new(24.0, 0.1).unwrap();
/// let profile = simulate_regimen(&regimen, &RouteParameters::new(0.2, 30.0), &grid).unwrap();
/// assert_eq!(profile.per_dose.len(), 2);
/// ```
pub fn simulate_regimen(
    regimen: &DoseRegimen,
    params: &RouteParameters,
    grid: &TimeGrid,
) -> Result<RegimenProfile, PkpdError> {
    params.validate()?;
    if regimen.requires_absorption() && params.ka.is_none() {
        return Err(PkpdError::MissingAbsorptionRate {
            context: "regimen contains extravascular doses".to_string(),
        });
    }

    let times = grid.times();
    let mut per_dose = Vec::with_capacity(regimen.len());
    for event in regimen.events() {
        let profile = times
            .iter()
            .map(|&t| {
                if t < event.start {
                    Ok(0.0)
                } else {
                    params.single_dose(event, t - event.start)
                }
            })
            .collect::<Result<Vec<f64>, PkpdError>>()?;
        per_dose.push(profile);
    }

    let mut sanitized = 0;
    for profile in per_dose.iter_mut() {
        sanitized += sanitize(profile.iter_mut());
    }
    if sanitized > 0 {
        tracing::warn!(sanitized, "non-finite concentrations replaced by NaN");
    }

    let mut total = vec![0.0; times.len()];
    for profile in &per_dose {
        for (acc, c) in total.iter_mut().zip(profile) {
            *acc += c;
        }
    }

    Ok(RegimenProfile {
        times: times.to_vec(),
        per_dose,
        total,
        sanitized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_iv_bolus_example() {
        let c = iv_bolus(500.0, 30.0, 0.2, &[0.0, 5.0]);
        assert_relative_eq!(c[0], 16.666666666666668, epsilon = 1e-12);
        assert_relative_eq!(c[1], 500.0 / 30.0 * (-1.0f64).exp(), epsilon = 1e-12);
        assert_relative_eq!(c[1], 6.131, epsilon = 1e-3);
    }

    #[test]
    fn test_infusion_is_continuous_at_stop() {
        let d = 2.0;
        let before = iv_infusion_at(500.0, 30.0, 0.2, d, d);
        let after = iv_infusion_at(500.0, 30.0, 0.2, d, d + 1e-12);
        assert!((before - after).abs() < 1e-9);
    }

    #[test]
    fn test_extravascular_peak() {
        let times: Vec<f64> = (0..=240).map(|i| i as f64 * 0.1).collect();
        let c = extravascular(500.0, 1.0, 30.0, 0.2, 1.0, &times);
        assert_eq!(c[0], 0.0);
        let tmax = (1.0f64 / 0.2).ln() / (1.0 - 0.2);
        let imax = c
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert!((times[imax] - tmax).abs() <= 0.05 + 1e-12);
    }

    #[test]
    fn test_regimen_requires_ka() {
        let regimen = DoseRegimen::builder()
            .dose(DoseEvent::extravascular(0.0, 100.0, 0.9))
            .build()
            .unwrap();
        let grid = TimeGrid::new(10.0, 1.0).unwrap();
        let err = simulate_regimen(&regimen, &RouteParameters::new(0.2, 30.0), &grid).unwrap_err();
        assert!(matches!(err, PkpdError::MissingAbsorptionRate { .. }));
    }

    #[test]
    fn test_dose_is_zero_before_start() {
        let regimen = DoseRegimen::builder()
            .dose(DoseEvent::iv_bolus(5.0, 100.0))
            .build()
            .unwrap();
        let grid = TimeGrid::new(10.0, 1.0).unwrap();
        let profile = simulate_regimen(&regimen, &RouteParameters::new(0.1, 10.0), &grid).unwrap();
        assert!(profile.total[..5].iter().all(|&c| c == 0.0));
        assert_relative_eq!(profile.total[5], 10.0);
    }
}
