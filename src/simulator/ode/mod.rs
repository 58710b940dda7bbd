//! Multi-compartment simulation with a central compartment and peripheral exchange
//!
//! The state is the vector of compartment concentrations `C_0 … C_n`. Peripheral
//! compartments exchange with the central compartment only:
//!
//! ```text
//! dC_1/dt = input − k_1·C_1 + Σ_{i≥2} (k_out_i·C_i − k_in_i·C_1)
//! dC_i/dt = k_in_i·C_1 − k_out_i·C_i                      (i ≥ 2)
//! ```
//!
//! The dosing compartment depends on the route:
//!
//! - IV bolus: `C_1(0) = Dose/V_0` and the dosing compartment carries the
//!   forcing term `dC_0/dt = Dose/V_0`. That term does not feed the central
//!   compartment, so it only shows up in compartment 0 as a linear ramp.
//! - Extravascular: compartment 0 is the absorption depot,
//!   `C_0(0) = F·Dose/V_0`, `dC_0/dt = −k_0·C_0`, and `k_0·C_0` enters `C_1`.
//! - IV infusion (regimens only): zero-order input `Dose/(V_0·D)` into the
//!   central compartment during `[0, D)`.
//!
//! Exchange terms are written in concentrations, so amounts are conserved when
//! the compartments share a volume.
//!
//! Each dose is integrated with diffsol's BDF method, so fast absorption and
//! other stiff configurations are accepted. An infusion restarts the solver at
//! its end.

use diffsol::error::{DiffsolError, OdeSolverError};
use diffsol::{
    NalgebraLU, NalgebraMat, NalgebraVec, OdeBuilder, OdeSolverMethod, OdeSolverStopReason,
    Vector,
};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::data::{CompartmentModel, DoseEvent, DoseRegimen, Route, TimeGrid, CENTRAL, DEPOT};
use crate::error::{ensure_non_negative, PkpdError};

type M = NalgebraMat<f64>;
type V = NalgebraVec<f64>;

const RTOL: f64 = 1e-8;
const ATOL: f64 = 1e-10;
const H0: f64 = 1e-3;

/// A single dose given at time zero
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Administration {
    pub dose: f64,
    pub bioavailability: f64,
    pub iv: bool,
}

impl Administration {
    pub fn iv(dose: f64) -> Self {
        Self {
            dose,
            bioavailability: 1.0,
            iv: true,
        }
    }

    pub fn extravascular(dose: f64, bioavailability: f64) -> Self {
        Self {
            dose,
            bioavailability,
            iv: false,
        }
    }

    fn validate(&self) -> Result<(), PkpdError> {
        ensure_non_negative("Dose", self.dose)?;
        ensure_non_negative("F", self.bioavailability)
    }
}

#[derive(Debug, Clone, Copy)]
enum Input {
    Bolus { dose: f64 },
    Depot { dose: f64, bioavailability: f64 },
    Infusion { dose: f64, duration: f64 },
}

impl From<&Administration> for Input {
    fn from(admin: &Administration) -> Self {
        if admin.iv {
            Input::Bolus { dose: admin.dose }
        } else {
            Input::Depot {
                dose: admin.dose,
                bioavailability: admin.bioavailability,
            }
        }
    }
}

impl From<&DoseEvent> for Input {
    fn from(event: &DoseEvent) -> Self {
        match event.route {
            Route::IvBolus => Input::Bolus { dose: event.amount },
            Route::IvInfusion { duration } => Input::Infusion {
                dose: event.amount,
                duration,
            },
            Route::Extravascular { bioavailability } => Input::Depot {
                dose: event.amount,
                bioavailability,
            },
        }
    }
}

/// Right-hand side for one dose; `infusion_rate` is switched off by the caller
/// once the infusion ends
#[derive(Clone, Copy)]
struct StarSystem<'a> {
    model: &'a CompartmentModel,
    forcing: f64,
    absorption: bool,
    infusion_rate: f64,
}

impl StarSystem<'_> {
    /// Linear part of the system, also the action of its Jacobian
    fn exchange(&self, x: &V, dx: &mut V) {
        let compartments = self.model.compartments();
        let central = x[CENTRAL];

        let mut d_central = -compartments[CENTRAL].k_out * central;
        dx[DEPOT] = 0.0;
        if self.absorption {
            let k0 = compartments[DEPOT].k_out;
            dx[DEPOT] = -k0 * x[DEPOT];
            d_central += k0 * x[DEPOT];
        }
        for peripheral in self.model.peripherals() {
            let i = peripheral.index;
            let k_in = peripheral.k_in.unwrap_or(0.0);
            let flow = k_in * central - peripheral.k_out * x[i];
            dx[i] = flow;
            d_central -= flow;
        }
        dx[CENTRAL] = d_central;
    }

    fn rhs(&self, x: &V, dx: &mut V) {
        self.exchange(x, dx);
        dx[DEPOT] += self.forcing;
        dx[CENTRAL] += self.infusion_rate;
    }
}

/// Concentration profile of every compartment on a shared time axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompartmentProfiles {
    pub times: Vec<f64>,
    /// One vector per compartment, ordered by index
    pub concentrations: Vec<Vec<f64>>,
    pub volumes: Vec<f64>,
}

impl CompartmentProfiles {
    fn zeros(times: &[f64], volumes: Vec<f64>) -> Self {
        Self {
            times: times.to_vec(),
            concentrations: vec![vec![0.0; times.len()]; volumes.len()],
            volumes,
        }
    }

    pub fn n_compartments(&self) -> usize {
        self.concentrations.len()
    }

    pub fn compartment(&self, index: usize) -> Option<&[f64]> {
        self.concentrations.get(index).map(Vec::as_slice)
    }

    pub fn central(&self) -> &[f64] {
        &self.concentrations[CENTRAL]
    }

    /// Drug amounts (`C_i · V_i`) per compartment
    pub fn amounts(&self) -> Vec<Vec<f64>> {
        self.concentrations
            .iter()
            .zip(&self.volumes)
            .map(|(c, v)| c.iter().map(|x| x * v).collect())
            .collect()
    }

    /// Total amount across all compartments at each time point
    pub fn total_amount(&self) -> Vec<f64> {
        let mut total = vec![0.0; self.times.len()];
        for compartment in self.amounts() {
            for (acc, a) in total.iter_mut().zip(compartment) {
                *acc += a;
            }
        }
        total
    }

    fn add_shifted(&mut self, other: &CompartmentProfiles, offset: usize) {
        for (acc, part) in self.concentrations.iter_mut().zip(&other.concentrations) {
            for (a, c) in acc[offset..].iter_mut().zip(part) {
                *a += c;
            }
        }
    }
}

fn check_absorption(
    model: &CompartmentModel,
    context: impl FnOnce() -> String,
) -> Result<(), PkpdError> {
    if model.depot().k_out > 0.0 {
        Ok(())
    } else {
        Err(PkpdError::MissingAbsorptionRate { context: context() })
    }
}

/// Integrate `system` from `t0` to `t1` with BDF, recording the state at each of
/// `times` into the columns of `profiles` starting at `offset`
///
/// Returns the state at `t1`.
fn integrate_segment(
    system: StarSystem<'_>,
    y0: DVector<f64>,
    t0: f64,
    t1: f64,
    times: &[f64],
    profiles: &mut CompartmentProfiles,
    offset: usize,
) -> Result<DVector<f64>, PkpdError> {
    let n = y0.len();
    let init: V = y0.into();
    let problem = OdeBuilder::<M>::new()
        .t0(t0)
        .h0(H0)
        .rtol(RTOL)
        .atol([ATOL])
        .rhs_implicit(
            move |x: &V, _p: &V, _t: f64, dx: &mut V| system.rhs(x, dx),
            move |_x: &V, _p: &V, _t: f64, v: &V, jv: &mut V| system.exchange(v, jv),
        )
        .init(move |_p: &V, _t: f64, y: &mut V| y.copy_from(&init), n)
        .build()?;
    let mut solver = problem.bdf::<NalgebraLU<f64>>()?;

    let stops = times.iter().copied().chain(std::iter::once(t1));
    for (j, target) in stops.enumerate() {
        if target > solver.state().t {
            solver.set_stop_time(target)?;
            loop {
                match solver.step() {
                    Ok(OdeSolverStopReason::TstopReached) => break,
                    Ok(_) => continue,
                    Err(DiffsolError::OdeSolverError(OdeSolverError::StepSizeTooSmall {
                        time,
                    })) => {
                        return Err(PkpdError::Integration(format!(
                            "step size went to zero at t = {time}"
                        )));
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
        if j < times.len() {
            let y = solver.state().y;
            for (i, profile) in profiles.concentrations.iter_mut().enumerate() {
                profile[offset + j] = y[i];
            }
        }
    }

    let y = solver.state().y;
    let state = DVector::from_iterator(n, (0..n).map(|i| y[i]));
    Ok(state)
}

/// Integrate the response to one dose given at time zero, reported at `times`
///
/// `times` must be sorted and non-negative; it does not need to start at zero.
fn solve(
    model: &CompartmentModel,
    input: Input,
    times: &[f64],
) -> Result<CompartmentProfiles, PkpdError> {
    let compartments = model.compartments();
    let v0 = model.depot().volume;
    let mut y0 = DVector::from_iterator(compartments.len(), compartments.iter().map(|c| c.c0));
    y0[DEPOT] = 0.0;
    y0[CENTRAL] = 0.0;

    let mut system = StarSystem {
        model,
        forcing: 0.0,
        absorption: false,
        infusion_rate: 0.0,
    };
    let mut infusion_end = None;
    match input {
        Input::Bolus { dose } => {
            y0[CENTRAL] = dose / v0;
            system.forcing = dose / v0;
        }
        Input::Depot {
            dose,
            bioavailability,
        } => {
            y0[DEPOT] = bioavailability * dose / v0;
            system.absorption = true;
        }
        Input::Infusion { dose, duration } => {
            system.infusion_rate = dose / (v0 * duration);
            infusion_end = Some(duration);
        }
    }

    let volumes = compartments.iter().map(|c| c.volume).collect();
    let mut profiles = CompartmentProfiles::zeros(times, volumes);
    let Some(&last) = times.last() else {
        return Ok(profiles);
    };

    match infusion_end {
        Some(end) => {
            // Integration restarts at the end of the infusion
            let split = times.partition_point(|&t| t <= end);
            let y_end = integrate_segment(system, y0, 0.0, end, &times[..split], &mut profiles, 0)?;
            if split < times.len() {
                let washout = StarSystem {
                    infusion_rate: 0.0,
                    ..system
                };
                integrate_segment(washout, y_end, end, last, &times[split..], &mut profiles, split)?;
            }
        }
        None => {
            integrate_segment(system, y0, 0.0, last, times, &mut profiles, 0)?;
        }
    }
    Ok(profiles)
}

/// Simulate all compartments after a single dose at time zero
///
/// # Example
///
/// ```rust
/// use pkpd::prelude::*;
///
/// let model = CompartmentModel::builder()
///     .depot(1.0, 30.0)
///     .central(0.2, 30.0)
///     .peripheral(0.3, 0.1, 30.0, 0.0)
///     .build()
///     .unwrap();
/// let grid = TimeGrid::new(24.0, 0.5).unwrap();
/// let profiles = ode::simulate(&model, &Administration::extravascular(500.0, 0.9), &grid).unwrap();
/// assert_eq!(profiles.n_compartments(), 3);
/// assert_eq!(profiles.central().len(), grid.len());
/// ```
pub fn simulate(
    model: &CompartmentModel,
    admin: &Administration,
    grid: &TimeGrid,
) -> Result<CompartmentProfiles, PkpdError> {
    admin.validate()?;
    if !admin.iv {
        check_absorption(model, || "extravascular administration".to_string())?;
    }
    solve(model, Input::from(admin), grid.times())
}

/// Superposed response of a dose regimen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimenResponse {
    pub total: CompartmentProfiles,
    /// Response to each event alone, in regimen order, zero before its start
    pub per_dose: Vec<CompartmentProfiles>,
}

/// Simulate every dose of a regimen separately and sum the time-shifted responses
pub fn simulate_regimen(
    model: &CompartmentModel,
    regimen: &DoseRegimen,
    grid: &TimeGrid,
) -> Result<RegimenResponse, PkpdError> {
    if regimen.requires_absorption() {
        check_absorption(model, || "regimen contains extravascular doses".to_string())?;
    }

    let times = grid.times();
    let volumes: Vec<f64> = model.compartments().iter().map(|c| c.volume).collect();
    let mut total = CompartmentProfiles::zeros(times, volumes.clone());
    let mut per_dose = Vec::with_capacity(regimen.len());

    for event in regimen.events() {
        let offset = times.partition_point(|&t| t < event.start);
        let local: Vec<f64> = times[offset..].iter().map(|t| t - event.start).collect();
        let response = solve(model, Input::from(event), &local)?;
        let mut shifted = CompartmentProfiles::zeros(times, volumes.clone());
        shifted.add_shifted(&response, offset);
        total.add_shifted(&response, offset);
        per_dose.push(shifted);
    }

    Ok(RegimenResponse { total, per_dose })
}
