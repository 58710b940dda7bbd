use crate::analysis::{analyze_subjects, AnalysisOutput};
use crate::data::{ObservationTable, SubjectObservations};
use crate::error::SubjectError;
use crate::nca::terminal::select_terminal_window;
use crate::nca::types::{NcaOptions, NcaResult};
use crate::stats::{sanitize, trapezoid};

/// Run NCA on every subject of a table
///
/// Subjects with fewer than `options.min_points` valid points, or without a
/// usable terminal window, are listed in `unqualified`.
///
/// # Example
///
/// ```rust
/// use pkpd::prelude::*;
///
/// let table: ObservationTable = [(1.0, 8.0), (2.0, 6.0), (4.0, 3.0)]
///     .into_iter()
///     .map(|(t, c)| ObservationRow::new("1", t, c, 500.0))
///     .collect();
/// let output = nca(&table, &NcaOptions::default());
/// assert_eq!(output.results[0].auc_0_last, 16.0);
/// ```
pub fn nca(table: &ObservationTable, options: &NcaOptions) -> AnalysisOutput<NcaResult> {
    analyze_subjects(table, |subject| nca_subject(subject, options))
}

/// NCA of a single subject
pub fn nca_subject(
    subject: &SubjectObservations,
    options: &NcaOptions,
) -> Result<NcaResult, SubjectError> {
    subject.qualify(options.min_points)?;
    let times = subject.times();
    let concentrations = subject.concentrations();

    let window = select_terminal_window(times, concentrations, options.min_points, options.epsilon)?;
    tracing::debug!(
        id = subject.id(),
        points = window.points,
        r_squared = window.fit.r_squared,
        "terminal window selected"
    );

    let lambda = window.fit.slope.abs();
    let c_last = concentrations[concentrations.len() - 1];
    let dose = subject.dose();

    let auc_0_last = trapezoid(times, concentrations);
    let auc_last_inf = c_last / lambda;
    let auc_0_inf = auc_0_last + auc_last_inf;
    let apparent_clearance = if auc_0_inf.is_finite() {
        dose / auc_0_inf
    } else {
        f64::NAN
    };
    let mut derived = [
        auc_0_last,
        auc_last_inf,
        auc_0_inf,
        std::f64::consts::LN_2 / lambda,
        apparent_clearance,
    ];
    let sanitized = sanitize(derived.iter_mut());
    if sanitized > 0 {
        tracing::warn!(id = subject.id(), sanitized, "non-finite NCA parameters set to NaN");
    }
    let [auc_0_last, auc_last_inf, auc_0_inf, half_life, apparent_clearance] = derived;

    Ok(NcaResult {
        id: subject.id().to_string(),
        dose,
        slope: -window.fit.slope,
        lambda_points: window.points,
        r_squared: window.fit.r_squared,
        intercept: window.fit.intercept,
        lambda_start_time: window.start_time,
        auc_0_last,
        auc_last_inf,
        auc_0_inf,
        half_life,
        apparent_clearance,
    })
}
