//! Tests for terminal phase selection
//!
//! The selected window must have the maximum R² of all trailing windows
//! `3..=N`, with ties going to the smallest window.

use approx::assert_relative_eq;
use pkpd::nca::terminal::{fit_window, log_concentrations};
use pkpd::prelude::*;

/// Helper to create a table with a single subject
fn single_subject(times: &[f64], concs: &[f64], dose: f64) -> ObservationTable {
    times
        .iter()
        .zip(concs)
        .map(|(&t, &c)| ObservationRow::new("test", t, c, dose))
        .collect()
}

fn analyze_one(times: &[f64], concs: &[f64]) -> NcaResult {
    let output = nca(&single_subject(times, concs, 100.0), &NcaOptions::default());
    assert!(output.unqualified.is_empty());
    output.results.into_iter().next().expect("NCA should succeed")
}

#[test]
fn test_selected_window_has_maximum_r_squared() {
    let times = vec![0.5, 1.0, 2.0, 3.0, 4.0, 6.0, 8.0, 12.0, 16.0, 24.0];
    let concs = vec![4.1, 7.9, 9.6, 8.8, 7.4, 5.5, 4.0, 2.3, 1.25, 0.41];
    let result = analyze_one(&times, &concs);

    // Brute force over every window
    let logs = log_concentrations(&concs, 1e-5);
    let r2: Vec<f64> = (3..=times.len())
        .map(|w| fit_window(&times, &logs, w).unwrap().r_squared)
        .collect();
    let best = r2.iter().cloned().fold(f64::MIN, f64::max);
    let first_best = r2.iter().position(|&r| r == best).unwrap() + 3;

    assert_eq!(result.r_squared, best);
    assert_eq!(result.lambda_points, first_best);
    assert_eq!(result.lambda_start_time, times[times.len() - first_best]);
    assert!(r2.iter().all(|&r| r <= result.r_squared));
}

#[test]
fn test_slope_is_reported_positive() {
    // C = 100 * e^(-0.1 t)
    let times = vec![0.0f64, 4.0, 8.0, 12.0, 16.0, 24.0];
    let concs: Vec<f64> = times.iter().map(|t| 100.0 * (-0.1 * t).exp()).collect();
    let result = analyze_one(&times, &concs);
    assert_relative_eq!(result.slope, 0.1, epsilon = 1e-6);
    assert_relative_eq!(result.half_life, 2.0f64.ln() / 0.1, max_relative = 1e-5);
    assert!(result.r_squared > 0.999_999);
}

#[test]
fn test_three_point_example() {
    let result = analyze_one(&[1.0, 2.0, 4.0], &[8.0, 6.0, 3.0]);
    assert_eq!(result.lambda_points, 3);
    assert_eq!(result.lambda_start_time, 1.0);
    assert!(result.slope > 0.0, "reported slope is the negated regression slope");
    assert_relative_eq!(result.auc_0_last, 16.0);
    assert_eq!(result.dose, 100.0);
}

#[test]
fn test_zero_concentrations_use_offset() {
    let times = vec![1.0, 2.0, 4.0, 8.0];
    let concs = vec![5.0, 2.0, 0.5, 0.0];
    let result = analyze_one(&times, &concs);
    assert!(result.slope.is_finite() && result.slope > 0.0);
    // C_last = 0 gives no extrapolated area
    assert_eq!(result.auc_last_inf, 0.0);
    assert_eq!(result.auc_0_inf, result.auc_0_last);
}
