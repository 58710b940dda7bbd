//! NCA configuration and result rows

use serde::{Deserialize, Serialize};

/// NCA configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NcaOptions {
    /// Minimum number of valid points per subject, also the smallest
    /// terminal window tested (default: 3)
    pub min_points: usize,
    /// Offset added to concentrations before taking logs (default: 1e-5)
    pub epsilon: f64,
}

impl Default for NcaOptions {
    fn default() -> Self {
        Self {
            min_points: 3,
            epsilon: 1e-5,
        }
    }
}

impl NcaOptions {
    pub fn with_min_points(mut self, min_points: usize) -> Self {
        // Terminal windows start at three points
        self.min_points = min_points.max(3);
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }
}

/// NCA parameters of one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NcaResult {
    pub id: String,
    pub dose: f64,
    /// Terminal rate constant, the negated log-linear slope (positive for a decline)
    pub slope: f64,
    /// Number of trailing points in the selected terminal window
    pub lambda_points: usize,
    pub r_squared: f64,
    /// Intercept of `ln(C + ε)` against time in the terminal window
    pub intercept: f64,
    /// First time point of the terminal window
    pub lambda_start_time: f64,
    pub auc_0_last: f64,
    pub auc_last_inf: f64,
    pub auc_0_inf: f64,
    pub half_life: f64,
    /// `Dose / AUC0-∞`
    pub apparent_clearance: f64,
}
