//! Terminal phase selection
//!
//! Every trailing window of `w` points, `w = min_points..=N`, is fitted with
//! `ln(C + ε) = intercept + slope · t`. The window with the highest R² is kept.
//! Windows are visited from the smallest upwards and only a strictly larger R²
//! replaces the current best, so ties go to the smallest window.

use serde::{Deserialize, Serialize};

use crate::error::SubjectError;
use crate::stats::{linear_regression, LinearFit};

/// The selected terminal window and its log-linear fit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerminalWindow {
    pub points: usize,
    pub start_time: f64,
    pub fit: LinearFit,
}

/// `ln(C + ε)` for every concentration
pub fn log_concentrations(concentrations: &[f64], epsilon: f64) -> Vec<f64> {
    concentrations.iter().map(|c| (c + epsilon).ln()).collect()
}

/// Fit of the trailing `w` points
pub fn fit_window(times: &[f64], log_conc: &[f64], w: usize) -> Option<LinearFit> {
    let n = times.len();
    if w > n {
        return None;
    }
    linear_regression(&times[n - w..], &log_conc[n - w..])
}

/// Search all trailing windows for the best terminal fit
///
/// Windows without time variance are skipped. If none remains the subject
/// cannot be analyzed.
pub fn select_terminal_window(
    times: &[f64],
    concentrations: &[f64],
    min_points: usize,
    epsilon: f64,
) -> Result<TerminalWindow, SubjectError> {
    let n = times.len();
    if n < min_points {
        return Err(SubjectError::InsufficientData {
            n,
            required: min_points,
        });
    }

    let log_conc = log_concentrations(concentrations, epsilon);
    let mut best: Option<TerminalWindow> = None;
    for w in min_points..=n {
        let Some(fit) = fit_window(times, &log_conc, w) else {
            continue;
        };
        if !fit.r_squared.is_finite() {
            continue;
        }
        let better = best.map_or(true, |b| fit.r_squared > b.fit.r_squared);
        if better {
            best = Some(TerminalWindow {
                points: w,
                start_time: times[n - w],
                fit,
            });
        }
    }

    best.ok_or_else(|| SubjectError::DegenerateRegression {
        reason: "no terminal window with distinct time points".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_three_points_use_the_only_window() {
        let window = select_terminal_window(&[1.0, 2.0, 4.0], &[8.0, 6.0, 3.0], 3, 1e-5).unwrap();
        assert_eq!(window.points, 3);
        assert_eq!(window.start_time, 1.0);
        assert!(window.fit.slope < 0.0);
    }

    #[test]
    fn test_monoexponential_tail_excludes_absorption() {
        // Absorption phase followed by an exact exponential decline
        let times = [0.5f64, 1.0, 2.0, 4.0, 6.0, 8.0];
        let concentrations: Vec<f64> = [2.0, 6.0]
            .into_iter()
            .chain(times[2..].iter().map(|t| 20.0 * (-0.3 * t).exp()))
            .collect();
        let window = select_terminal_window(&times, &concentrations, 3, 0.0).unwrap();
        // Only the 3- and 4-point windows are exact
        assert!(window.points <= 4);
        assert!(window.start_time >= 2.0);
        assert_relative_eq!(window.fit.slope, -0.3, epsilon = 1e-9);
    }

    #[test]
    fn test_ties_keep_the_smallest_window() {
        // Constant tail: every window is a perfect (flat) fit
        let window = select_terminal_window(&[1.0, 2.0, 3.0, 4.0], &[5.0; 4], 3, 1e-5).unwrap();
        assert_eq!(window.points, 3);
        assert_eq!(window.fit.r_squared, 1.0);
    }

    #[test]
    fn test_identical_times_are_degenerate() {
        let err = select_terminal_window(&[1.0, 1.0, 1.0], &[3.0, 2.0, 1.0], 3, 1e-5).unwrap_err();
        assert!(matches!(err, SubjectError::DegenerateRegression { .. }));
    }

    #[test]
    fn test_too_few_points() {
        let err = select_terminal_window(&[1.0, 2.0], &[3.0, 2.0], 3, 1e-5).unwrap_err();
        assert_eq!(err, SubjectError::InsufficientData { n: 2, required: 3 });
    }
}
