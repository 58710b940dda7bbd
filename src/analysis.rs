//! Per-subject batch analysis of an observation table
//!
//! Subjects are independent, so they are processed in parallel with `rayon`.
//! Results keep the first-appearance order of the subject IDs in the table.
//! A subject that cannot be analyzed never aborts the batch: it is reported in
//! [`AnalysisOutput::unqualified`] together with the reason.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::{ObservationTable, SubjectObservations};
use crate::error::SubjectError;

/// A subject excluded from an analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unqualified {
    pub id: String,
    pub reason: SubjectError,
}

/// Results table of a batch analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutput<R> {
    /// One row per analyzed subject
    pub results: Vec<R>,
    pub unqualified: Vec<Unqualified>,
}

impl<R> AnalysisOutput<R> {
    pub fn unqualified_ids(&self) -> Vec<&str> {
        self.unqualified.iter().map(|u| u.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

pub(crate) fn analyze_subjects<R, F>(table: &ObservationTable, analysis: F) -> AnalysisOutput<R>
where
    R: Send,
    F: Fn(&SubjectObservations) -> Result<R, SubjectError> + Sync,
{
    let subjects = table.subjects();
    let outcomes: Vec<Result<R, SubjectError>> = subjects.par_iter().map(&analysis).collect();

    let mut results = Vec::with_capacity(outcomes.len());
    let mut unqualified = Vec::new();
    for (subject, outcome) in subjects.iter().zip(outcomes) {
        match outcome {
            Ok(result) => results.push(result),
            Err(reason) => {
                tracing::warn!(id = subject.id(), %reason, "subject excluded from analysis");
                unqualified.push(Unqualified {
                    id: subject.id().to_string(),
                    reason,
                });
            }
        }
    }

    AnalysisOutput {
        results,
        unqualified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ObservationRow;

    #[test]
    fn test_order_and_exclusion() {
        let table: ObservationTable = [("c", 3), ("a", 1), ("b", 4)]
            .iter()
            .flat_map(|&(id, n)| {
                (0..n).map(move |i| ObservationRow::new(id, i as f64, 1.0, 10.0))
            })
            .collect();
        let output = analyze_subjects(&table, |s| {
            s.qualify(3)?;
            Ok(s.id().to_string())
        });
        assert_eq!(output.results, vec!["c".to_string(), "b".to_string()]);
        assert_eq!(output.unqualified_ids(), vec!["a"]);
        assert_eq!(
            output.unqualified[0].reason,
            SubjectError::InsufficientData { n: 1, required: 3 }
        );
    }
}
