//! One-compartment regression of observed concentration-time data
//!
//! - [`iv`]: log-linear least squares for intravenous data
//! - [`extravascular`]: Nelder–Mead least squares of the Bateman function,
//!   with a fixed bioavailability and caller-supplied starting values
//!
//! Both share the minimum-points gate and the unqualified-subject reporting
//! of [`crate::nca`].

pub mod extravascular;
pub mod iv;

pub use extravascular::{
    fit_extravascular, fit_extravascular_subject, Bateman, ExtravascularFitOptions,
    ExtravascularFitResult,
};
pub use iv::{fit_iv, fit_iv_subject, IvFitOptions, IvFitResult};
