//! Tests for AUC and derived parameters

use approx::assert_relative_eq;
use pkpd::prelude::*;

fn table(times: &[f64], concs: &[f64], dose: f64) -> ObservationTable {
    times
        .iter()
        .zip(concs)
        .map(|(&t, &c)| ObservationRow::new("s1", t, c, dose))
        .collect()
}

#[test]
fn test_auc_last_is_trapezoidal() {
    let times = [0.0, 1.0, 2.0, 4.0, 8.0];
    let concs = [10.0, 8.0, 6.0, 4.0, 2.0];
    let output = nca(&table(&times, &concs, 50.0), &NcaOptions::default());
    let result = &output.results[0];
    // 9 + 7 + 10 + 12
    assert_relative_eq!(result.auc_0_last, 38.0, epsilon = 1e-12);
}

#[test]
fn test_extrapolation_and_clearance() {
    let times = [0.5f64, 1.0, 2.0, 4.0, 6.0, 8.0, 12.0];
    let concs: Vec<f64> = times.iter().map(|t| 12.0 * (-0.2 * t).exp()).collect();
    let output = nca(&table(&times, &concs, 300.0), &NcaOptions::default());
    let result = &output.results[0];

    assert_relative_eq!(
        result.auc_last_inf,
        concs[6] / result.slope,
        max_relative = 1e-12
    );
    assert_relative_eq!(
        result.auc_0_inf,
        result.auc_0_last + result.auc_last_inf,
        max_relative = 1e-12
    );
    assert_relative_eq!(
        result.apparent_clearance,
        300.0 / result.auc_0_inf,
        max_relative = 1e-12
    );
    // Exact area from the first sample onwards; trapezoids overestimate a convex decline
    let exact = 12.0 / 0.2 * (-0.1f64).exp();
    assert!(result.auc_0_inf > exact);
    assert_relative_eq!(result.auc_0_inf, exact, max_relative = 0.05);
}

#[test]
fn test_dose_comes_from_first_valid_row() {
    let mut rows = vec![ObservationRow::new("s1", f64::NAN, 3.0, 999.0)];
    rows.extend(
        [(1.0, 8.0), (2.0, 6.0), (4.0, 3.0)]
            .into_iter()
            .map(|(t, c)| ObservationRow::new("s1", t, c, 500.0)),
    );
    let output = nca(&ObservationTable::new(rows), &NcaOptions::default());
    assert_eq!(output.results[0].dose, 500.0);
}
