//! Population PK/PD simulation and pharmacokinetic parameter estimation
//!
//! The crate has two halves:
//!
//! - **Simulation** ([`simulator`]): population one-compartment PK profiles,
//!   population Emax/Hill PD curves, closed-form single-dose routes, and a
//!   multi-compartment ODE model, with multi-dose regimens built by superposition.
//! - **Estimation** ([`nca`], [`fit`]): non-compartmental analysis with an adaptive
//!   terminal window, and one-compartment regression for IV and extravascular data.
//!
//! Inputs live in [`data`]. Every call builds its own state and returns its results;
//! nothing is kept between calls.

pub mod analysis;
pub mod data;
pub mod error;
pub mod fit;
pub mod nca;
pub mod simulator;
pub mod stats;

pub use error::{PkpdError, SubjectError};

pub mod prelude {
    pub use crate::analysis::{AnalysisOutput, Unqualified};
    pub use crate::data::parser::{read_observations, read_observations_from};
    pub use crate::data::*;
    pub use crate::error::{PkpdError, SubjectError};
    pub use crate::fit::{
        fit_extravascular, fit_iv, ExtravascularFitOptions, ExtravascularFitResult, IvFitOptions,
        IvFitResult,
    };
    pub use crate::nca::{nca, NcaOptions, NcaResult};
    pub use crate::simulator::ode::{self, Administration, CompartmentProfiles, RegimenResponse};
    pub use crate::simulator::route::{
        extravascular, iv_bolus, iv_infusion, simulate_regimen, RegimenProfile, RouteParameters,
    };
    pub use crate::simulator::{
        simulate_population, simulate_population_pd, HillModel, PdProfile, PopulationPdOptions,
        PopulationPkOptions, PopulationProfile, PopulationSampler,
    };
}
