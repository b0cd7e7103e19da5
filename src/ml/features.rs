use crate::csv_reader::{is_missing, parse_number};
use crate::structs::{CsvData, ExprError, FeatureMatrix, Result, StandardizedFeatures};
use ndarray::{Array2, Axis};
use std::collections::HashSet;

/// Curated breast cancer gene panel
pub const BRCA_GENES: &[&str] = &[
    "PGR", "ESR1", "BRCA1", "BRCA2", "PIK3CA", "RUNX1", "CDH1", "TP53", "TBX3", "PTEN", "FOXA1",
    "MAP3K1", "GATA3", "AKT1", "NBL1", "DCTD", "RB1", "SF3B1", "CBFB", "OR9A2", "NCOA3", "RBMX",
    "MAP2K4", "TROVE2", "NADK", "CASP8", "CTSS", "ACTL6B", "LGALS1", "KRAS", "KCNN3", "FBXW7",
    "LRIG2", "PIK3R1", "PARP4", "ZNF28", "HLA-DRB1", "ERBB2", "ZMYM3", "RAB42", "CTCF", "ATAD2",
    "CDKN1B", "GRIA2", "NCOR1", "HRNR", "GPRIN2", "PAX2", "ACTG1", "AQP12A", "PIK3C3", "MYB",
    "IRS4", "TBL1XR1", "RPGR", "CCNI", "ARID1A", "CD3EAP", "ADAMTS6", "OR2D2", "TMEM199", "MST1",
    "RHBG", "ZFP36L1", "TCP11", "CASZ1", "GAL3ST1", "FRMPD2", "GPS2", "ZNF362",
];

/// Default gene panel as owned strings
#[must_use]
pub fn default_genes() -> Vec<String> {
    BRCA_GENES.iter().map(|g| (*g).to_string()).collect()
}

/// Resolve the requested genes to column indices, in table order
///
/// # Errors
/// Returns `MissingColumn` for the first requested gene not present in the table
pub fn select_columns(table: &CsvData, genes: &[String]) -> Result<Vec<usize>> {
    if let Some(missing) = genes.iter().find(|g| table.column_index(g).is_none()) {
        return Err(ExprError::MissingColumn(missing.clone()));
    }

    let wanted: HashSet<&str> = genes.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();

    Ok(table
        .headers
        .iter()
        .enumerate()
        .filter(|(_, h)| wanted.contains(h.as_str()) && seen.insert(h.as_str()))
        .map(|(i, _)| i)
        .collect())
}

/// Attach the outcome column by row position and drop rows with missing values
///
/// # Errors
/// Returns error if the tables differ in length, the label column is absent,
/// or a non-missing cell is not numeric
pub fn join_outcome(
    expression: &CsvData,
    columns: &[usize],
    outcome: &CsvData,
    label_column: &str,
) -> Result<FeatureMatrix> {
    if expression.row_count() != outcome.row_count() {
        return Err(ExprError::Validation(format!(
            "Expression table has {} rows but outcome table has {}; rows are joined by position",
            expression.row_count(),
            outcome.row_count()
        )));
    }

    let label_idx = outcome
        .column_index(label_column)
        .ok_or_else(|| ExprError::MissingColumn(label_column.to_string()))?;

    let names: Vec<String> = columns
        .iter()
        .map(|&c| expression.headers[c].clone())
        .collect();

    let mut data = Vec::new();
    let mut outcomes = Vec::new();
    let mut row_indices = Vec::new();

    for row_idx in 0..expression.row_count() {
        let label = outcome.cell(row_idx, label_idx);
        if is_missing(label) {
            continue;
        }

        let cells: Vec<&str> = columns
            .iter()
            .map(|&c| expression.cell(row_idx, c))
            .collect();
        if cells.iter().any(|c| is_missing(c)) {
            continue;
        }

        let features = cells
            .iter()
            .zip(&names)
            .map(|(cell, name)| parse_number(cell, row_idx, name))
            .collect::<Result<Vec<f64>>>()?;

        data.push(features);
        outcomes.push(label.trim().to_string());
        row_indices.push(row_idx);
    }

    let dropped_rows = expression.row_count() - data.len();
    log::info!(
        "Kept {} of {} rows ({} dropped for missing values)",
        data.len(),
        expression.row_count(),
        dropped_rows
    );

    if data.is_empty() {
        return Err(ExprError::Validation(
            "No complete rows left after dropping missing values".into(),
        ));
    }

    Ok(FeatureMatrix {
        names,
        data,
        outcomes,
        row_indices,
        dropped_rows,
    })
}

impl FeatureMatrix {
    /// Z-score every column using the population standard deviation
    ///
    /// Constant columns are centred but not scaled.
    ///
    /// # Errors
    /// Returns error if the matrix cannot be built
    pub fn standardize(&self) -> Result<StandardizedFeatures> {
        let mut data = self.to_array()?;

        let means = data
            .mean_axis(Axis(0))
            .ok_or_else(|| ExprError::Ml("Cannot standardize an empty matrix".into()))?;
        let std_devs = data.std_axis(Axis(0), 0.0);
        let scales = std_devs.mapv(|s| if s == 0.0 { 1.0 } else { s });

        data -= &means;
        data /= &scales;

        Ok(StandardizedFeatures {
            names: self.names.clone(),
            data,
            means: means.to_vec(),
            std_devs: std_devs.to_vec(),
        })
    }

    /// Feature matrix with the encoded outcome appended as a last column
    ///
    /// # Errors
    /// Returns error if `codes` does not have one entry per row
    #[allow(clippy::cast_precision_loss)]
    pub fn with_label_column(&self, codes: &[usize]) -> Result<Array2<f64>> {
        if codes.len() != self.n_samples() {
            return Err(ExprError::Validation(format!(
                "{} label codes for {} rows",
                codes.len(),
                self.n_samples()
            )));
        }
        let features = self.to_array()?;
        let n_features = self.n_features();
        Ok(Array2::from_shape_fn(
            (self.n_samples(), n_features + 1),
            |(i, j)| {
                if j < n_features {
                    features[[i, j]]
                } else {
                    codes[i] as f64
                }
            },
        ))
    }
}
