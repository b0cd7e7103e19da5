//! Consolidated public types for the exprclust crate
//!
//! This module contains the error type and the data structures passed between
//! the analysis stages.

use ndarray::Array2;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum ExprError {
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Invalid value {value:?} in column {column} at row {row}")]
    Parse {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown label: {0}")]
    UnknownLabel(String),

    #[error("ML error: {0}")]
    Ml(String),

    #[error("Plot error: {0}")]
    Plot(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ExprError>;

// ============================================================================
// CSV Types
// ============================================================================

/// Represents a parsed CSV/TSV file with headers and rows
#[derive(Debug, Clone)]
pub struct CsvData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvData {
    /// Get number of rows
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get number of columns
    #[must_use]
    pub fn col_count(&self) -> usize {
        self.headers.len()
    }

    /// Get column index by name
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Get a cell, treating short rows as empty
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map_or("", String::as_str)
    }
}

// ============================================================================
// ML Types
// ============================================================================

/// Selected gene columns joined with their outcome label, missing rows removed
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    /// Gene names, in the order they appear in the expression table
    pub names: Vec<String>,
    /// Row data as feature vectors
    pub data: Vec<Vec<f64>>,
    /// Outcome label for each row
    pub outcomes: Vec<String>,
    /// Source row indices (for mapping back)
    pub row_indices: Vec<usize>,
    /// Rows removed because of a missing value
    pub dropped_rows: usize,
}

impl FeatureMatrix {
    /// Get number of samples (rows)
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.data.len()
    }

    /// Get number of features (columns)
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.names.len()
    }

    /// Get a feature column by index
    #[must_use]
    pub fn column(&self, index: usize) -> Option<Vec<f64>> {
        if index >= self.n_features() {
            return None;
        }
        Some(self.data.iter().map(|row| row[index]).collect())
    }

    /// Convert to flat `Vec<f64>` (row-major)
    #[must_use]
    pub fn to_flat(&self) -> Vec<f64> {
        self.data.iter().flatten().copied().collect()
    }

    /// Convert to an `n_samples x n_features` array
    ///
    /// # Errors
    /// Returns error if rows have inconsistent lengths
    pub fn to_array(&self) -> Result<Array2<f64>> {
        Array2::from_shape_vec((self.n_samples(), self.n_features()), self.to_flat())
            .map_err(|e| ExprError::Ml(format!("Failed to create array: {e}")))
    }
}

/// Z-scored feature matrix with scaling parameters
#[derive(Debug, Clone)]
pub struct StandardizedFeatures {
    pub names: Vec<String>,
    pub data: Array2<f64>,
    pub means: Vec<f64>,
    pub std_devs: Vec<f64>,
}

/// A numeric matrix whose rows and columns carry display labels
#[derive(Debug, Clone)]
pub struct LabeledMatrix {
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    pub values: Array2<f64>,
}

impl LabeledMatrix {
    /// Reorder rows and columns; `rows[i]` is the source row placed at position `i`
    #[must_use]
    pub fn permuted(&self, rows: &[usize], cols: &[usize]) -> Self {
        let values = Array2::from_shape_fn((rows.len(), cols.len()), |(i, j)| {
            self.values[[rows[i], cols[j]]]
        });
        Self {
            row_labels: rows.iter().map(|&r| self.row_labels[r].clone()).collect(),
            col_labels: cols.iter().map(|&c| self.col_labels[c].clone()).collect(),
            values,
        }
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.values.ncols()
    }
}

/// Descriptive statistics for a numeric column
#[derive(Debug, Clone, Serialize)]
pub struct ColumnStats {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub iqr: f64,
}

impl ColumnStats {
    /// Format as a summary string
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}: n={}, mean={:.2}, std={:.2}, min={:.2}, Q1={:.2}, median={:.2}, Q3={:.2}, max={:.2}, IQR={:.2}",
            self.name, self.count, self.mean, self.std_dev, self.min, self.q1, self.median, self.q3, self.max, self.iqr
        )
    }
}

/// Missing and zero counts for a raw expression column
#[derive(Debug, Clone, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub missing: usize,
    pub zeros: usize,
    pub stats: Option<ColumnStats>,
}

/// Result of K-means clustering
#[derive(Debug, Clone)]
pub struct ClusterResult {
    /// Cluster assignment for each sample
    pub labels: Vec<usize>,
    /// Number of clusters
    pub k: usize,
    /// Cluster sizes
    pub sizes: Vec<usize>,
    /// Centroids in the space the model was fitted on
    pub centroids: Array2<f64>,
    /// Whether the encoded outcome was one of the clustered columns
    pub used_label: bool,
}

impl ClusterResult {
    /// Number of clusters that received at least one sample
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.sizes.iter().filter(|&&s| s > 0).count()
    }

    /// Get summary for logging
    #[must_use]
    pub fn summary(&self) -> String {
        use std::fmt::Write as _;

        let mut s = format!("K-means clustering with k={}\n", self.k);
        for (i, size) in self.sizes.iter().enumerate() {
            let _ = writeln!(s, "  Cluster {i}: {size} samples");
        }
        s
    }
}
