//! Tests for batch behaviour: qualification gate and output ordering

use pkpd::prelude::*;

fn rows(id: &str, points: &[(f64, f64)]) -> Vec<ObservationRow> {
    points
        .iter()
        .map(|&(t, c)| ObservationRow::new(id, t, c, 100.0))
        .collect()
}

#[test]
fn test_two_points_are_unqualified() {
    let mut all = rows("short", &[(1.0, 5.0), (2.0, 4.0)]);
    all.extend(rows("ok", &[(1.0, 8.0), (2.0, 6.0), (4.0, 3.0)]));
    let output = nca(&ObservationTable::new(all), &NcaOptions::default());

    assert_eq!(output.len(), 1);
    assert_eq!(output.results[0].id, "ok");
    assert_eq!(output.unqualified_ids(), vec!["short"]);
    assert_eq!(
        output.unqualified[0].reason,
        SubjectError::InsufficientData { n: 2, required: 3 }
    );
}

#[test]
fn test_missing_values_do_not_count() {
    let mut all = rows("s", &[(1.0, 8.0), (2.0, 6.0)]);
    all.push(ObservationRow::new("s", 4.0, f64::NAN, 100.0));
    let output = nca(&ObservationTable::new(all), &NcaOptions::default());
    assert!(output.is_empty());
    assert_eq!(output.unqualified_ids(), vec!["s"]);
}

#[test]
fn test_results_follow_input_order() {
    let ids = ["9", "3", "17", "1", "4", "22", "8"];
    let all: Vec<ObservationRow> = ids
        .iter()
        .flat_map(|id| rows(id, &[(1.0, 8.0), (2.0, 6.0), (4.0, 3.0), (8.0, 1.0)]))
        .collect();
    let output = nca(&ObservationTable::new(all), &NcaOptions::default());
    let got: Vec<&str> = output.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(got, ids);
}

#[test]
fn test_interleaved_rows_are_grouped() {
    let all = vec![
        ObservationRow::new("a", 1.0, 8.0, 100.0),
        ObservationRow::new("b", 1.0, 4.0, 50.0),
        ObservationRow::new("a", 2.0, 6.0, 100.0),
        ObservationRow::new("b", 2.0, 3.0, 50.0),
        ObservationRow::new("a", 4.0, 3.0, 100.0),
        ObservationRow::new("b", 4.0, 1.5, 50.0),
    ];
    let output = nca(&ObservationTable::new(all), &NcaOptions::default());
    assert_eq!(output.len(), 2);
    assert_eq!(output.results[0].auc_0_last, 16.0);
    assert_eq!(output.results[1].auc_0_last, 8.0);
    assert_eq!(output.results[1].dose, 50.0);
}
