//! Extravascular one-compartment regression
//!
//! The Bateman function
//!
//! ```text
//! C(t) = F·Dose·ka / (V·(ka − ke)) · (e^(−ke·t) − e^(−ka·t))
//! ```
//!
//! is fitted by least squares with `F` fixed and `ka`, `ke`, `V` free. The
//! simplex search runs on `ln(ka), ln(ke), ln(V)` so every trial point is
//! positive. Running out of iterations is a fit failure for that subject.

use std::f64::consts::LN_2;

use argmin::core::{CostFunction, Error, Executor, State, TerminationReason};
use argmin::solver::neldermead::NelderMead;
use serde::{Deserialize, Serialize};

use crate::analysis::{analyze_subjects, AnalysisOutput};
use crate::data::{ObservationTable, SubjectObservations};
use crate::error::{ensure_non_negative, ensure_positive, PkpdError, SubjectError};
use crate::stats::{integrate_to_infinity, rmse, sanitize};

/// Relative gap below which `ka` and `ke` are treated as equal
const RATE_TIE: f64 = 1e-9;

/// Size of the initial simplex in log-parameter space
const SIMPLEX_STEP: f64 = 0.1;

const AUC_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtravascularFitOptions {
    /// Fixed bioavailability
    pub bioavailability: f64,
    pub initial_ka: f64,
    pub initial_ke: f64,
    pub initial_volume: f64,
    /// Minimum number of valid points per subject (default: 3)
    pub min_points: usize,
    /// Nelder–Mead iteration budget (default: 5000)
    pub max_iters: u64,
    /// Convergence threshold on the spread of the simplex costs, relative to
    /// the sum of squared observations (default: 1e-14)
    pub tolerance: f64,
}

impl ExtravascularFitOptions {
    pub fn new(bioavailability: f64, initial_ka: f64, initial_ke: f64, initial_volume: f64) -> Self {
        Self {
            bioavailability,
            initial_ka,
            initial_ke,
            initial_volume,
            min_points: 3,
            max_iters: 5000,
            tolerance: 1e-14,
        }
    }

    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points.max(3);
        self
    }

    pub fn with_max_iters(mut self, max_iters: u64) -> Self {
        self.max_iters = max_iters;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    fn validate(&self) -> Result<(), PkpdError> {
        ensure_non_negative("F", self.bioavailability)?;
        ensure_positive("Initial ka", self.initial_ka)?;
        ensure_positive("Initial ke", self.initial_ke)?;
        ensure_positive("Initial V", self.initial_volume)?;
        ensure_non_negative("Tolerance", self.tolerance)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtravascularFitResult {
    pub id: String,
    pub dose: f64,
    pub ka: f64,
    pub ke: f64,
    pub volume: f64,
    pub rmse: f64,
    pub tmax: f64,
    pub cmax: f64,
    /// Half-life of the rate-limiting (slower) process
    pub half_life: f64,
    /// Numerical integral of the fitted curve over `[0, ∞)`
    pub auc_0_inf: f64,
    /// `Dose / AUC0-∞`
    pub clearance: f64,
    pub iterations: u64,
}

/// One-compartment model with first-order absorption
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bateman {
    pub bioavailability: f64,
    pub dose: f64,
    pub ka: f64,
    pub ke: f64,
    pub volume: f64,
}

impl Bateman {
    fn rates_tied(&self) -> bool {
        (self.ka - self.ke).abs() <= RATE_TIE * self.ka.max(self.ke)
    }

    /// Concentration at time `t`, using the `ka → ke` limit when the rates coincide
    pub fn concentration(&self, t: f64) -> f64 {
        let scale = self.bioavailability * self.dose / self.volume;
        if self.rates_tied() {
            let k = self.ke;
            scale * k * t * (-k * t).exp()
        } else {
            scale * self.ka / (self.ka - self.ke) * ((-self.ke * t).exp() - (-self.ka * t).exp())
        }
    }

    pub fn tmax(&self) -> f64 {
        if self.rates_tied() {
            1.0 / self.ke
        } else {
            (self.ke / self.ka).ln() / (self.ke - self.ka)
        }
    }

    pub fn cmax(&self) -> f64 {
        self.concentration(self.tmax())
    }

    /// Terminal half-life, set by the slower of absorption and elimination
    pub fn half_life(&self) -> f64 {
        if self.rates_tied() || self.ka > self.ke {
            LN_2 / self.ke
        } else {
            LN_2 / self.ka
        }
    }

    pub fn auc_0_inf(&self) -> f64 {
        integrate_to_infinity(
            |t| self.concentration(t),
            1.0 / self.ka.min(self.ke),
            AUC_TOLERANCE,
        )
    }

    /// `[tmax, cmax, half-life, AUC0-∞, Dose/AUC0-∞]` with non-finite values set to NaN
    fn derived_parameters(&self, id: &str) -> [f64; 5] {
        let auc_0_inf = self.auc_0_inf();
        let mut derived = [
            self.tmax(),
            self.cmax(),
            self.half_life(),
            auc_0_inf,
            self.dose / auc_0_inf,
        ];
        let sanitized = sanitize(derived.iter_mut());
        if sanitized > 0 {
            tracing::warn!(id, sanitized, "non-finite Bateman parameters set to NaN");
        }
        derived
    }
}

/// Sum of squared residuals as a function of `[ln ka, ln ke, ln V]`
struct BatemanCost<'a> {
    times: &'a [f64],
    concentrations: &'a [f64],
    bioavailability: f64,
    dose: f64,
}

impl BatemanCost<'_> {
    fn model(&self, log_params: &[f64]) -> Bateman {
        Bateman {
            bioavailability: self.bioavailability,
            dose: self.dose,
            ka: log_params[0].exp(),
            ke: log_params[1].exp(),
            volume: log_params[2].exp(),
        }
    }
}

impl CostFunction for BatemanCost<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, log_params: &Self::Param) -> Result<Self::Output, Error> {
        let model = self.model(log_params);
        let sse: f64 = self
            .times
            .iter()
            .zip(self.concentrations)
            .map(|(&t, &c)| (c - model.concentration(t)).powi(2))
            .sum();
        Ok(if sse.is_finite() { sse } else { f64::INFINITY })
    }
}

fn initial_simplex(start: &[f64]) -> Vec<Vec<f64>> {
    let mut vertices = vec![start.to_vec()];
    for i in 0..start.len() {
        let mut vertex = start.to_vec();
        vertex[i] += SIMPLEX_STEP;
        vertices.push(vertex);
    }
    vertices
}

/// Fit one subject
pub fn fit_extravascular_subject(
    subject: &SubjectObservations,
    options: &ExtravascularFitOptions,
) -> Result<ExtravascularFitResult, SubjectError> {
    subject.qualify(options.min_points)?;
    let times = subject.times();
    let concentrations = subject.concentrations();
    let dose = subject.dose();

    let cost = BatemanCost {
        times,
        concentrations,
        bioavailability: options.bioavailability,
        dose,
    };
    let start = [
        options.initial_ka.ln(),
        options.initial_ke.ln(),
        options.initial_volume.ln(),
    ];
    let scale: f64 = 1.0 + concentrations.iter().map(|c| c * c).sum::<f64>();
    let optimizer_error = |e: Error| SubjectError::DegenerateRegression {
        reason: format!("optimizer error: {e}"),
    };

    let solver: NelderMead<Vec<f64>, f64> = NelderMead::new(initial_simplex(&start))
        .with_sd_tolerance(options.tolerance * scale)
        .map_err(optimizer_error)?;
    let res = Executor::new(cost, solver)
        .configure(|state| state.max_iters(options.max_iters))
        .run()
        .map_err(optimizer_error)?;

    let iterations = res.state.get_iter();
    let converged = matches!(
        res.state.get_termination_reason(),
        Some(TerminationReason::SolverConverged) | Some(TerminationReason::TargetCostReached)
    );
    let best = match res.state.get_best_param() {
        Some(best) if converged && res.state.get_best_cost().is_finite() => best,
        _ => return Err(SubjectError::FitConvergence { iterations }),
    };

    let model = Bateman {
        bioavailability: options.bioavailability,
        dose,
        ka: best[0].exp(),
        ke: best[1].exp(),
        volume: best[2].exp(),
    };
    let predicted: Vec<f64> = times.iter().map(|&t| model.concentration(t)).collect();
    let [tmax, cmax, half_life, auc_0_inf, clearance] = model.derived_parameters(subject.id());

    tracing::debug!(
        id = subject.id(),
        ka = model.ka,
        ke = model.ke,
        volume = model.volume,
        iterations,
        "Bateman fit converged"
    );

    Ok(ExtravascularFitResult {
        id: subject.id().to_string(),
        dose,
        ka: model.ka,
        ke: model.ke,
        volume: model.volume,
        rmse: rmse(concentrations, &predicted),
        tmax,
        cmax,
        half_life,
        auc_0_inf,
        clearance,
        iterations,
    })
}

/// Bateman regression of every subject of a table
///
/// Invalid starting values or a negative bioavailability abort the call before
/// any subject is fitted.
pub fn fit_extravascular(
    table: &ObservationTable,
    options: &ExtravascularFitOptions,
) -> Result<AnalysisOutput<ExtravascularFitResult>, PkpdError> {
    options.validate()?;
    Ok(analyze_subjects(table, |subject| {
        fit_extravascular_subject(subject, options)
    }))
}
