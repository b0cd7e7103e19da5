use crate::structs::{CsvData, ExprError, Result};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;

/// Cell values read as missing, matching the usual dataframe NA markers
const MISSING_MARKERS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "<NA>", "#N/A",
];

/// Whether a raw cell counts as a missing value
#[must_use]
pub fn is_missing(value: &str) -> bool {
    MISSING_MARKERS.contains(&value.trim())
}

/// Parse a non-missing cell as a finite number
///
/// # Errors
/// Returns error naming the row and column if the value is not numeric
pub fn parse_number(value: &str, row: usize, column: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ExprError::Parse {
            row,
            column: column.to_string(),
            value: value.to_string(),
        })
}

impl CsvData {
    /// Parse a CSV or TSV file
    ///
    /// # Errors
    /// Returns `Io` if the file cannot be opened, `Csv` if a record is malformed
    pub fn from_file(path: &Path, is_tsv: bool) -> Result<Self> {
        let delimiter = if is_tsv { b'\t' } else { b',' };

        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_reader(file);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_csv_with_index_column() {
        let file = create_test_csv(",TP53,ESR1\n0,1.5,10\n1,2.5,20\n2,3.5,30");

        let data = CsvData::from_file(file.path(), false).unwrap();

        assert_eq!(data.headers, vec!["", "TP53", "ESR1"]);
        assert_eq!(data.row_count(), 3);
        assert_eq!(data.col_count(), 3);
        assert_eq!(data.column_index("ESR1"), Some(2));
        assert_eq!(data.cell(1, 1), "2.5");
    }

    #[test]
    fn test_parse_tsv() {
        let file = create_test_csv("BRCA_subtype\tother\nLumA\tx\nBasal\ty");

        let data = CsvData::from_file(file.path(), true).unwrap();

        assert_eq!(data.headers, vec!["BRCA_subtype", "other"]);
        assert_eq!(data.cell(1, 0), "Basal");
    }

    #[test]
    fn test_malformed_record_fails() {
        let file = create_test_csv("a,b\n1,2\n3,4,5");
        assert!(matches!(
            CsvData::from_file(file.path(), false),
            Err(ExprError::Csv(_))
        ));
    }

    #[test]
    fn test_missing_file_fails() {
        let result = CsvData::from_file(Path::new("/nonexistent/dataset.csv"), false);
        assert!(matches!(result, Err(ExprError::Io(_))));
    }

    #[test]
    fn test_missing_markers() {
        assert!(is_missing(""));
        assert!(is_missing(" NA "));
        assert!(is_missing("NaN"));
        assert!(!is_missing("0"));
        assert!(!is_missing("LumA"));
    }

    #[test]
    fn test_parse_number_reports_location() {
        assert!((parse_number(" 2.5", 0, "TP53").unwrap() - 2.5).abs() < 1e-12);
        assert!(parse_number("inf", 0, "TP53").is_err());
        match parse_number("high", 7, "ESR1") {
            Err(ExprError::Parse { row, column, value }) => {
                assert_eq!(row, 7);
                assert_eq!(column, "ESR1");
                assert_eq!(value, "high");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
