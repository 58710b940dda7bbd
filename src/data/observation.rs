//! Subject observation tables
//!
//! An [`ObservationTable`] holds rows of `(ID, Time, Conc, Dose)` plus optional
//! covariates. Analyses work per subject on [`SubjectObservations`], which keeps
//! only the valid rows of one ID in their original order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SubjectError;

/// One row of an observation table; `None` marks a missing value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRow {
    pub id: String,
    pub time: Option<f64>,
    pub conc: Option<f64>,
    pub dose: Option<f64>,
    #[serde(default)]
    pub covariates: BTreeMap<String, f64>,
}

impl ObservationRow {
    pub fn new(id: impl Into<String>, time: f64, conc: f64, dose: f64) -> Self {
        Self {
            id: id.into(),
            time: Some(time),
            conc: Some(conc),
            dose: Some(dose),
            covariates: BTreeMap::new(),
        }
    }

    pub fn with_covariate(mut self, name: impl Into<String>, value: f64) -> Self {
        self.covariates.insert(name.into(), value);
        self
    }

    /// Time, concentration and dose are all present and finite
    pub fn is_valid(&self) -> bool {
        [self.time, self.conc, self.dose]
            .iter()
            .all(|v| v.is_some_and(f64::is_finite))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationTable {
    rows: Vec<ObservationRow>,
}

impl ObservationTable {
    pub fn new(rows: Vec<ObservationRow>) -> Self {
        Self { rows }
    }

    pub fn push(&mut self, row: ObservationRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[ObservationRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Unique subject IDs in order of first appearance
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !ids.contains(&row.id.as_str()) {
                ids.push(row.id.as_str());
            }
        }
        ids
    }

    /// Group rows per subject, keeping first-appearance order of IDs
    pub fn subjects(&self) -> Vec<SubjectObservations> {
        let mut order: Vec<String> = Vec::new();
        let mut grouped: BTreeMap<&str, Vec<&ObservationRow>> = BTreeMap::new();
        for row in &self.rows {
            let entry = grouped.entry(row.id.as_str()).or_default();
            if entry.is_empty() {
                order.push(row.id.clone());
            }
            entry.push(row);
        }
        order
            .into_iter()
            .map(|id| {
                let rows = grouped.remove(id.as_str()).unwrap_or_default();
                SubjectObservations::from_rows(id, &rows)
            })
            .collect()
    }
}

impl FromIterator<ObservationRow> for ObservationTable {
    fn from_iter<I: IntoIterator<Item = ObservationRow>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Valid observations of a single subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectObservations {
    id: String,
    times: Vec<f64>,
    concentrations: Vec<f64>,
    doses: Vec<f64>,
}

impl SubjectObservations {
    /// Build from raw arrays; every index must hold a finite time and concentration
    pub fn new(id: impl Into<String>, times: Vec<f64>, concentrations: Vec<f64>, dose: f64) -> Self {
        let doses = vec![dose; times.len()];
        Self {
            id: id.into(),
            times,
            concentrations,
            doses,
        }
    }

    fn from_rows(id: String, rows: &[&ObservationRow]) -> Self {
        let valid: Vec<&&ObservationRow> = rows.iter().filter(|r| r.is_valid()).collect();
        Self {
            id,
            times: valid.iter().filter_map(|r| r.time).collect(),
            concentrations: valid.iter().filter_map(|r| r.conc).collect(),
            doses: valid.iter().filter_map(|r| r.dose).collect(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn concentrations(&self) -> &[f64] {
        &self.concentrations
    }

    /// Dose of the subject, taken from its first valid row
    pub fn dose(&self) -> f64 {
        self.doses.first().copied().unwrap_or(f64::NAN)
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Enforce the minimum number of valid points required by an analysis
    pub fn qualify(&self, required: usize) -> Result<(), SubjectError> {
        if self.len() < required {
            Err(SubjectError::InsufficientData {
                n: self.len(),
                required,
            })
        } else {
            Ok(())
        }
    }
}
