//! Input records for simulations and analyses
//!
//! Everything in this module is constructed fresh for each call. The only
//! incrementally built records are the compartment collection and the dose
//! regimen, which have dedicated builders owned by the caller.

pub mod compartment;
pub mod dose;
pub mod grid;
pub mod observation;
pub mod parameters;
pub mod parser;

pub use compartment::{Compartment, CompartmentModel, CompartmentModelBuilder, CENTRAL, DEPOT};
pub use dose::{DoseEvent, DoseRegimen, DoseRegimenBuilder, Route};
pub use grid::TimeGrid;
pub use observation::{ObservationRow, ObservationTable, SubjectObservations};
pub use parameters::{PdParameterSet, PkParameterSet, PopulationParameter};
