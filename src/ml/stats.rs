use crate::csv_reader::{is_missing, parse_number};
use crate::structs::{ColumnProfile, ColumnStats, CsvData, ExprError, Result};

impl ColumnStats {
    /// Calculate statistics for a vector of values
    ///
    /// # Errors
    /// Returns error if values is empty
    #[allow(clippy::cast_precision_loss)]
    pub fn calculate(name: &str, values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(ExprError::Ml("Cannot calculate stats for empty data".into()));
        }

        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;

        let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / count as f64;
        let std_dev = variance.sqrt();

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let min = sorted[0];
        let max = sorted[count - 1];

        let q1 = percentile(&sorted, 25.0);
        let median = percentile(&sorted, 50.0);
        let q3 = percentile(&sorted, 75.0);

        Ok(Self {
            name: name.to_string(),
            count,
            mean,
            std_dev,
            min,
            max,
            q1,
            median,
            q3,
            iqr: q3 - q1,
        })
    }
}

/// Calculate percentile using linear interpolation
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let k = (p / 100.0) * (sorted.len() - 1) as f64;
    let f = k.floor() as usize;
    let c = k.ceil() as usize;

    if f == c {
        sorted[f]
    } else {
        let d0 = sorted[f] * (c as f64 - k);
        let d1 = sorted[c] * (k - f as f64);
        d0 + d1
    }
}

/// Missing and zero counts plus descriptive stats for the given raw columns
///
/// # Errors
/// Returns error if a non-missing cell is not numeric
pub fn profile_columns(table: &CsvData, columns: &[usize]) -> Result<Vec<ColumnProfile>> {
    columns
        .iter()
        .map(|&col| {
            let name = &table.headers[col];
            let mut missing = 0usize;
            let mut values = Vec::with_capacity(table.row_count());

            for row in 0..table.row_count() {
                let cell = table.cell(row, col);
                if is_missing(cell) {
                    missing += 1;
                } else {
                    values.push(parse_number(cell, row, name)?);
                }
            }

            let zeros = values.iter().filter(|&&v| v == 0.0).count();
            let stats = ColumnStats::calculate(name, &values).ok();
            log::debug!("{name}: {missing} missing, {zeros} zero");

            Ok(ColumnProfile {
                name: name.clone(),
                missing,
                zeros,
                stats,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_column_stats() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let stats = ColumnStats::calculate("test", &values).expect("calculate stats");

        assert_eq!(stats.count, 10);
        assert!((stats.mean - 5.5).abs() < 0.01);
        assert!((stats.min - 1.0).abs() < 0.01);
        assert!((stats.max - 10.0).abs() < 0.01);
        assert!((stats.median - 5.5).abs() < 0.01);
        assert!((stats.q1 - 3.25).abs() < 1e-9);
        assert!(stats.summary().starts_with("test: n=10"));
    }

    #[test]
    fn test_empty_stats_fails() {
        assert!(ColumnStats::calculate("empty", &[]).is_err());
    }

    #[test]
    fn test_profile_columns() {
        let mut file = NamedTempFile::new().expect("create");
        file.write_all(b",TP53,ESR1\n0,0,1.5\n1,NA,0\n2,0,\n3,2.0,3.0")
            .expect("write");
        let table = CsvData::from_file(file.path(), false).expect("parse");

        let profile = profile_columns(&table, &[1, 2]).expect("profile");

        assert_eq!(profile[0].name, "TP53");
        assert_eq!(profile[0].missing, 1);
        assert_eq!(profile[0].zeros, 2);
        assert_eq!(profile[1].missing, 1);
        assert_eq!(profile[1].zeros, 1);
        assert_eq!(profile[1].stats.as_ref().map(|s| s.count), Some(3));
    }

    #[test]
    fn test_profile_all_missing_column() {
        let mut file = NamedTempFile::new().expect("create");
        file.write_all(b"A,B\nNA,1\n,2").expect("write");
        let table = CsvData::from_file(file.path(), false).expect("parse");

        let profile = profile_columns(&table, &[0]).expect("profile");
        assert_eq!(profile[0].missing, 2);
        assert!(profile[0].stats.is_none());
    }
}
