//! Forward models
//!
//! - [`sampler`]: inter-individual variability draws
//! - [`population`]: one-compartment population PK profiles
//! - [`pd`]: population Emax/Hill effect curves
//! - [`route`]: closed-form single-dose profiles and their superposition
//! - [`ode`]: multi-compartment ODE simulation and regimen superposition

pub mod ode;
pub mod pd;
pub mod population;
pub mod route;
pub mod sampler;

pub use ode::{Administration, CompartmentProfiles, RegimenResponse};
pub use pd::{simulate_population_pd, HillModel, PdProfile, PopulationPdOptions};
pub use population::{simulate_population, PopulationPkOptions, PopulationProfile, SubjectDraws};
pub use route::{RegimenProfile, RouteParameters};
pub use sampler::PopulationSampler;
