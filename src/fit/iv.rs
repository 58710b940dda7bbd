//! IV one-compartment regression
//!
//! `ln(C + ε) = ln(C0) − ke·t` is fitted by ordinary least squares on all valid
//! points. Goodness of fit is reported on the back-transformed curve
//! `C0·e^(−ke·t)` against the observed concentrations.

use std::f64::consts::LN_2;

use serde::{Deserialize, Serialize};

use crate::analysis::{analyze_subjects, AnalysisOutput};
use crate::data::{ObservationTable, SubjectObservations};
use crate::error::SubjectError;
use crate::stats::{linear_regression, r_squared, rmse, sanitize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IvFitOptions {
    /// Minimum number of valid points per subject (default: 3)
    pub min_points: usize,
    /// Offset added to concentrations before taking logs (default: 1e-5)
    pub epsilon: f64,
}

impl Default for IvFitOptions {
    fn default() -> Self {
        Self {
            min_points: 3,
            epsilon: 1e-5,
        }
    }
}

impl IvFitOptions {
    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points.max(3);
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IvFitResult {
    pub id: String,
    pub dose: f64,
    /// Back-extrapolated concentration at time zero
    pub c0: f64,
    pub ke: f64,
    /// R² in concentration space
    pub r_squared: f64,
    /// RMSE in concentration space
    pub rmse: f64,
    pub auc_0_inf: f64,
    pub half_life: f64,
    pub clearance: f64,
    pub volume: f64,
}

/// Fit one subject
pub fn fit_iv_subject(
    subject: &SubjectObservations,
    options: &IvFitOptions,
) -> Result<IvFitResult, SubjectError> {
    subject.qualify(options.min_points)?;
    let times = subject.times();
    let concentrations = subject.concentrations();
    let logs: Vec<f64> = concentrations
        .iter()
        .map(|c| (c + options.epsilon).ln())
        .collect();

    let fit = linear_regression(times, &logs).ok_or_else(|| SubjectError::DegenerateRegression {
        reason: "all observations share the same time".to_string(),
    })?;
    if !(fit.slope.is_finite() && fit.intercept.is_finite()) {
        return Err(SubjectError::DegenerateRegression {
            reason: "non-finite log-linear fit".to_string(),
        });
    }

    let ke = -fit.slope;
    let c0 = fit.intercept.exp();
    let predicted: Vec<f64> = times.iter().map(|t| c0 * (-ke * t).exp()).collect();
    let dose = subject.dose();
    let volume = dose / c0;

    tracing::debug!(id = subject.id(), c0, ke, "IV regression");

    // A flat profile gives ke = 0 and unbounded AUC and half-life
    let mut derived = [c0 / ke, LN_2 / ke, ke * volume, volume];
    let sanitized = sanitize(derived.iter_mut());
    if sanitized > 0 {
        tracing::warn!(id = subject.id(), sanitized, "non-finite IV parameters set to NaN");
    }
    let [auc_0_inf, half_life, clearance, volume] = derived;

    Ok(IvFitResult {
        id: subject.id().to_string(),
        dose,
        c0,
        ke,
        r_squared: r_squared(concentrations, &predicted),
        rmse: rmse(concentrations, &predicted),
        auc_0_inf,
        half_life,
        clearance,
        volume,
    })
}

/// IV regression of every subject of a table
pub fn fit_iv(table: &ObservationTable, options: &IvFitOptions) -> AnalysisOutput<IvFitResult> {
    analyze_subjects(table, |subject| fit_iv_subject(subject, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_recovers_c0_and_ke() {
        let times = vec![0.5f64, 1.0, 2.0, 4.0, 8.0, 12.0];
        let concentrations: Vec<f64> = times.iter().map(|t| 16.0 * (-0.2 * t).exp()).collect();
        let subject = SubjectObservations::new("1", times, concentrations, 480.0);
        let result = fit_iv_subject(&subject, &IvFitOptions::default().with_epsilon(0.0)).unwrap();
        assert_relative_eq!(result.c0, 16.0, max_relative = 1e-10);
        assert_relative_eq!(result.ke, 0.2, max_relative = 1e-10);
        assert_relative_eq!(result.volume, 30.0, max_relative = 1e-10);
        assert_relative_eq!(result.clearance, 6.0, max_relative = 1e-10);
        assert_relative_eq!(result.auc_0_inf, 80.0, max_relative = 1e-10);
        assert_relative_eq!(result.r_squared, 1.0, epsilon = 1e-12);
        assert!(result.rmse < 1e-10);
    }

    #[test]
    fn test_fit_quality_in_concentration_space() {
        let times = vec![1.0f64, 2.0, 3.0, 4.0];
        let concentrations = vec![10.0, 7.0, 5.5, 3.0];
        let subject = SubjectObservations::new("1", times.clone(), concentrations.clone(), 100.0);
        let result = fit_iv_subject(&subject, &IvFitOptions::default()).unwrap();
        let predicted: Vec<f64> = times
            .iter()
            .map(|t| result.c0 * (-result.ke * t).exp())
            .collect();
        assert_relative_eq!(result.rmse, rmse(&concentrations, &predicted), epsilon = 1e-12);
        assert!(result.r_squared < 1.0);
    }

    #[test]
    fn test_flat_profile_gives_nan_not_infinity() {
        let subject = SubjectObservations::new("flat", vec![1.0, 2.0, 4.0], vec![5.0; 3], 100.0);
        let result = fit_iv_subject(&subject, &IvFitOptions::default()).unwrap();
        assert_eq!(result.ke, 0.0);
        assert!(result.half_life.is_nan());
        assert!(result.auc_0_inf.is_nan());
        for value in [result.c0, result.clearance, result.volume] {
            assert!(value.is_finite() || value.is_nan());
        }
    }

    #[test]
    fn test_min_points_never_drops_below_three() {
        assert_eq!(IvFitOptions::default().with_min_points(2).min_points, 3);
        let subject = SubjectObservations::new("1", vec![1.0, 2.0], vec![5.0, 4.0], 100.0);
        let options = IvFitOptions::default().with_min_points(1);
        assert!(fit_iv_subject(&subject, &options).is_err());
    }

    #[test]
    fn test_two_points_are_unqualified() {
        let subject = SubjectObservations::new("1", vec![1.0, 2.0], vec![5.0, 4.0], 100.0);
        let err = fit_iv_subject(&subject, &IvFitOptions::default()).unwrap_err();
        assert_eq!(err, SubjectError::InsufficientData { n: 2, required: 3 });
    }
}
