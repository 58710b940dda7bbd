//! Small numerical helpers shared by the analysis engines
//!
//! - Ordinary least squares on one regressor
//! - Goodness-of-fit metrics (R², RMSE)
//! - Linear trapezoidal integration of sampled data
//! - Adaptive Simpson quadrature of a function over `[0, ∞)`
//! - Marking non-finite outputs as missing

use serde::{Deserialize, Serialize};

/// Maximum bisection depth of the adaptive Simpson rule
const MAX_DEPTH: usize = 48;

/// Result of a simple linear regression `y = intercept + slope * x`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl LinearFit {
    #[inline]
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Ordinary least squares of `y` on `x`
///
/// Returns `None` when fewer than two points are given or when `x` has no
/// variance. A response without variance is fitted exactly and gets R² = 1.
pub fn linear_regression(x: &[f64], y: &[f64]) -> Option<LinearFit> {
    let n = x.len();
    if n < 2 || n != y.len() {
        return None;
    }

    let n_f = n as f64;
    let x_mean: f64 = x.iter().sum::<f64>() / n_f;
    let y_mean: f64 = y.iter().sum::<f64>() / n_f;

    let mut ss_xy = 0.0;
    let mut ss_xx = 0.0;
    let mut ss_yy = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let x_diff = xi - x_mean;
        let y_diff = yi - y_mean;
        ss_xy += x_diff * y_diff;
        ss_xx += x_diff * x_diff;
        ss_yy += y_diff * y_diff;
    }

    if ss_xx.abs() < 1e-15 {
        return None;
    }

    let slope = ss_xy / ss_xx;
    let intercept = y_mean - slope * x_mean;
    let r_squared = if ss_yy.abs() < 1e-15 {
        1.0
    } else {
        (ss_xy * ss_xy) / (ss_xx * ss_yy)
    };

    Some(LinearFit {
        slope,
        intercept,
        r_squared,
    })
}

/// Coefficient of determination `1 - SS_res / SS_tot` of predictions against observations
///
/// Observations without variance give 1 for a perfect prediction and 0 otherwise.
pub fn r_squared(observed: &[f64], predicted: &[f64]) -> f64 {
    let n = observed.len() as f64;
    let mean = observed.iter().sum::<f64>() / n;
    let ss_res: f64 = observed
        .iter()
        .zip(predicted)
        .map(|(o, p)| (o - p).powi(2))
        .sum();
    let ss_tot: f64 = observed.iter().map(|o| (o - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    }
}

/// Root mean squared error
pub fn rmse(observed: &[f64], predicted: &[f64]) -> f64 {
    let n = observed.len() as f64;
    let sse: f64 = observed
        .iter()
        .zip(predicted)
        .map(|(o, p)| (o - p).powi(2))
        .sum();
    (sse / n).sqrt()
}

/// Linear trapezoidal area under sampled points, from the first to the last sample
pub fn trapezoid(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (ys[0] + ys[1]) / 2.0 * (xs[1] - xs[0]))
        .sum()
}

/// Mark every non-finite value as missing (NaN), returning how many there were
pub(crate) fn sanitize<'a>(values: impl Iterator<Item = &'a mut f64>) -> usize {
    let mut replaced = 0;
    for value in values {
        if !value.is_finite() {
            replaced += 1;
            *value = f64::NAN;
        }
    }
    replaced
}

/// Integrate `f` over `[0, ∞)`
///
/// The half-line is mapped onto `[0, 1)` with `t = scale · u / (1 − u)` and the
/// transformed integrand is integrated with adaptive Simpson. `scale` should be
/// the characteristic time of `f` (e.g. the slowest time constant of a decay).
/// Non-finite integrand values are treated as zero.
pub fn integrate_to_infinity<F>(f: F, scale: f64, rel_tolerance: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    let g = |u: f64| -> f64 {
        if u >= 1.0 {
            return 0.0;
        }
        let one_minus = 1.0 - u;
        let value = f(scale * u / one_minus) * scale / (one_minus * one_minus);
        if value.is_finite() {
            value
        } else {
            0.0
        }
    };

    let (a, b) = (0.0, 1.0);
    let fa = g(a);
    let fm = g(0.5);
    let fb = g(b);
    let whole = (b - a) / 6.0 * (fa + 4.0 * fm + fb);
    // Coarse estimate of the magnitude to turn the relative tolerance into an absolute one
    let coarse: f64 = (0..=16).map(|i| g(i as f64 / 16.0).abs()).sum::<f64>() / 16.0;
    let tolerance = (rel_tolerance * coarse).max(f64::MIN_POSITIVE);

    adaptive_simpson(&g, a, b, fa, fm, fb, whole, tolerance, MAX_DEPTH)
}

#[allow(clippy::too_many_arguments)]
fn adaptive_simpson<G: Fn(f64) -> f64>(
    g: &G,
    a: f64,
    b: f64,
    fa: f64,
    fm: f64,
    fb: f64,
    whole: f64,
    tolerance: f64,
    depth: usize,
) -> f64 {
    let m = (a + b) / 2.0;
    let lm = (a + m) / 2.0;
    let rm = (m + b) / 2.0;
    let flm = g(lm);
    let frm = g(rm);
    let left = (m - a) / 6.0 * (fa + 4.0 * flm + fm);
    let right = (b - m) / 6.0 * (fm + 4.0 * frm + fb);
    let delta = left + right - whole;

    if depth == 0 || delta.abs() <= 15.0 * tolerance {
        left + right + delta / 15.0
    } else {
        adaptive_simpson(g, a, m, fa, flm, fm, left, tolerance / 2.0, depth - 1)
            + adaptive_simpson(g, m, b, fm, frm, fb, right, tolerance / 2.0, depth - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_regression_exact_line() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [3.0, 5.0, 7.0, 9.0];
        let fit = linear_regression(&x, &y).unwrap();
        assert_relative_eq!(fit.slope, 2.0, epsilon = 1e-12);
        assert_relative_eq!(fit.intercept, 1.0, epsilon = 1e-12);
        assert_relative_eq!(fit.r_squared, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_linear_regression_degenerate_x() {
        assert!(linear_regression(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]).is_none());
        assert!(linear_regression(&[1.0], &[1.0]).is_none());
    }

    #[test]
    fn test_r_squared_matches_regression() {
        let x = [1.0, 2.0, 4.0, 6.0, 8.0];
        let y = [2.1, 3.9, 8.3, 11.8, 16.5];
        let fit = linear_regression(&x, &y).unwrap();
        let predicted: Vec<f64> = x.iter().map(|&xi| fit.predict(xi)).collect();
        assert_relative_eq!(r_squared(&y, &predicted), fit.r_squared, epsilon = 1e-12);
    }

    #[test]
    fn test_trapezoid() {
        // (8+6)/2*1 + (6+3)/2*2 = 7 + 9
        assert_relative_eq!(trapezoid(&[1.0, 2.0, 4.0], &[8.0, 6.0, 3.0]), 16.0);
    }

    #[test]
    fn test_sanitize_marks_non_finite() {
        let mut values = vec![1.0, f64::INFINITY, f64::NEG_INFINITY, 2.0, f64::NAN];
        assert_eq!(sanitize(values.iter_mut()), 3);
        assert!(values[1].is_nan() && values[2].is_nan());
        assert_eq!(values[3], 2.0);
    }

    #[test]
    fn test_rmse() {
        assert_relative_eq!(rmse(&[1.0, 2.0], &[2.0, 3.0]), 1.0);
    }

    #[test]
    fn test_integrate_exponential_to_infinity() {
        let k = 0.2f64;
        let area = integrate_to_infinity(|t| 10.0 * (-k * t).exp(), 1.0 / k, 1e-10);
        assert_relative_eq!(area, 10.0 / k, max_relative = 1e-8);
    }
}
