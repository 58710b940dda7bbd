//! Compartment topology for the multi-compartment simulator
//!
//! Compartments are addressed by an explicit integer index:
//!
//! | Index | Role |
//! |-------|------|
//! | 0 | Dosing site / absorption depot |
//! | 1 | Central (plasma) compartment |
//! | ≥ 2 | Peripheral compartments, exchanging with compartment 1 only |
//!
//! A [`CompartmentModel`] is a validated, index-ordered snapshot. Callers that
//! collect compartments incrementally use [`CompartmentModelBuilder`] and call
//! [`CompartmentModelBuilder::build`] once before simulating.

use serde::{Deserialize, Serialize};

use crate::error::{ensure_non_negative, ensure_positive, PkpdError};

pub const DEPOT: usize = 0;
pub const CENTRAL: usize = 1;

/// A homogeneous drug pool with first-order exchange
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Compartment {
    pub index: usize,
    /// Initial concentration; overridden by the route for compartments 0 and 1
    pub c0: f64,
    /// Rate constant of inflow from the central compartment (peripherals only)
    pub k_in: Option<f64>,
    /// Rate constant of outflow from this compartment
    pub k_out: f64,
    pub volume: f64,
}

impl Compartment {
    pub fn new(index: usize, c0: f64, k_in: Option<f64>, k_out: f64, volume: f64) -> Self {
        Self {
            index,
            c0,
            k_in,
            k_out,
            volume,
        }
    }

    pub fn is_peripheral(&self) -> bool {
        self.index > CENTRAL
    }

    fn validate(&self) -> Result<(), PkpdError> {
        let name = |field: &str| format!("Compartment {} {field}", self.index);
        ensure_non_negative(&name("k_out"), self.k_out)?;
        ensure_positive(&name("V"), self.volume)?;
        ensure_non_negative(&name("C0"), self.c0)?;
        match self.k_in {
            Some(k_in) => ensure_non_negative(&name("k_in"), k_in),
            None if self.is_peripheral() => Err(PkpdError::InvalidCompartments {
                reason: format!(
                    "peripheral compartment {} needs an inflow rate constant (k_in)",
                    self.index
                ),
            }),
            None => Ok(()),
        }
    }
}

/// Validated set of compartments ordered by index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompartmentModel {
    compartments: Vec<Compartment>,
}

impl CompartmentModel {
    pub fn builder() -> CompartmentModelBuilder {
        CompartmentModelBuilder::default()
    }

    /// Validate and order a collection of compartments
    pub fn new(mut compartments: Vec<Compartment>) -> Result<Self, PkpdError> {
        compartments.sort_by_key(|c| c.index);
        if compartments.len() < 2 {
            return Err(PkpdError::InvalidCompartments {
                reason: format!(
                    "a dosing compartment (0) and a central compartment (1) are required, got {} compartment(s)",
                    compartments.len()
                ),
            });
        }
        for (expected, compartment) in compartments.iter().enumerate() {
            if compartment.index != expected {
                return Err(PkpdError::InvalidCompartments {
                    reason: format!(
                        "compartment indices must be contiguous from 0, expected {expected} but found {}",
                        compartment.index
                    ),
                });
            }
            compartment.validate()?;
        }
        Ok(Self { compartments })
    }

    pub fn compartments(&self) -> &[Compartment] {
        &self.compartments
    }

    pub fn len(&self) -> usize {
        self.compartments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compartments.is_empty()
    }

    pub fn depot(&self) -> &Compartment {
        &self.compartments[DEPOT]
    }

    pub fn central(&self) -> &Compartment {
        &self.compartments[CENTRAL]
    }

    pub fn peripherals(&self) -> &[Compartment] {
        &self.compartments[CENTRAL + 1..]
    }
}

/// Incremental collection of compartments, owned by the caller
#[derive(Debug, Clone, Default)]
pub struct CompartmentModelBuilder {
    compartments: Vec<Compartment>,
}

impl CompartmentModelBuilder {
    pub fn add_compartment(&mut self, compartment: Compartment) -> &mut Self {
        self.compartments.push(compartment);
        self
    }

    /// Dosing site; `ka` is its outflow rate constant into the central compartment
    pub fn depot(mut self, ka: f64, volume: f64) -> Self {
        self.add_compartment(Compartment::new(DEPOT, 0.0, None, ka, volume));
        self
    }

    pub fn central(mut self, ke: f64, volume: f64) -> Self {
        self.add_compartment(Compartment::new(CENTRAL, 0.0, None, ke, volume));
        self
    }

    /// Append a peripheral compartment after the ones already added
    pub fn peripheral(mut self, k_in: f64, k_out: f64, volume: f64, c0: f64) -> Self {
        let index = self.next_index().max(CENTRAL + 1);
        self.add_compartment(Compartment::new(index, c0, Some(k_in), k_out, volume));
        self
    }

    pub fn len(&self) -> usize {
        self.compartments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compartments.is_empty()
    }

    fn next_index(&self) -> usize {
        self.compartments
            .iter()
            .map(|c| c.index + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn build(&self) -> Result<CompartmentModel, PkpdError> {
        CompartmentModel::new(self.compartments.clone())
    }
}
