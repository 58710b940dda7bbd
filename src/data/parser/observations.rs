use std::collections::BTreeMap;
use std::io::Read;

use crate::data::observation::{ObservationRow, ObservationTable};
use crate::error::PkpdError;

const REQUIRED: [&str; 4] = ["id", "time", "conc", "dose"];

/// Read an observation table from a CSV file
///
/// The file must carry the columns `ID`, `Time`, `Conc` and `Dose` (case-insensitive).
/// Every other column is read as a numeric covariate; cells that are empty or not
/// numeric are left out of the row's covariates. Empty required cells become missing
/// values, which the analyses drop.
///
/// # Example
///
/// ```rust,no_run
/// use pkpd::data::parser::read_observations;
///
/// let table = read_observations("trial.csv").unwrap();
/// println!("Number of subjects: {}", table.ids().len());
/// ```
pub fn read_observations(path: impl AsRef<std::path::Path>) -> Result<ObservationTable, PkpdError> {
    let file = std::fs::File::open(path.as_ref()).map_err(|e| PkpdError::Csv(e.to_string()))?;
    read_observations_from(file)
}

/// Same as [`read_observations`], from any reader
pub fn read_observations_from<R: Read>(reader: R) -> Result<ObservationTable, PkpdError> {
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| PkpdError::Csv(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();
    let lowercase: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();

    let mut columns = [0usize; 4];
    for (slot, name) in columns.iter_mut().zip(REQUIRED) {
        *slot = lowercase
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| PkpdError::Csv(format!("missing required column '{name}'")))?;
    }
    let [id_col, time_col, conc_col, dose_col] = columns;

    let mut table = ObservationTable::default();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| PkpdError::Csv(e.to_string()))?;
        let id = record.get(id_col).unwrap_or_default().to_string();
        if id.is_empty() {
            return Err(PkpdError::Csv(format!("row {} has an empty ID", line + 1)));
        }

        let mut covariates = BTreeMap::new();
        for (i, header) in headers.iter().enumerate() {
            if columns.contains(&i) {
                continue;
            }
            if let Some(value) = parse_cell(record.get(i)) {
                covariates.insert(header.clone(), value);
            }
        }

        table.push(ObservationRow {
            id,
            time: parse_cell(record.get(time_col)),
            conc: parse_cell(record.get(conc_col)),
            dose: parse_cell(record.get(dose_col)),
            covariates,
        });
    }
    tracing::debug!(rows = table.len(), "read observation table");
    Ok(table)
}

fn parse_cell(cell: Option<&str>) -> Option<f64> {
    match cell {
        None | Some("") | Some(".") => None,
        Some(s) => s.parse::<f64>().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_required_and_covariate_columns() {
        let csv = "\
ID,TIME,Conc,Dose,Weight,Gender
1,1,8,500,70,M
1,2,6,500,70,M
2,1,,500,,F
";
        let table = read_observations_from(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 3);
        let first = &table.rows()[0];
        assert_eq!(first.id, "1");
        assert_eq!(first.conc, Some(8.0));
        assert_eq!(first.covariates.get("Weight"), Some(&70.0));
        assert!(!first.covariates.contains_key("Gender"));
        assert_eq!(table.rows()[2].conc, None);
    }

    #[test]
    fn test_missing_column() {
        let csv = "ID,Time,Dose\n1,0,100\n";
        let err = read_observations_from(csv.as_bytes()).unwrap_err();
        assert_eq!(
            err,
            PkpdError::Csv("missing required column 'conc'".to_string())
        );
    }
}
