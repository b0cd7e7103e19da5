//! Result file writers for the analyze and profile phases

use crate::ml::pipeline::{AnalysisConfig, AnalysisResult};
use crate::structs::{ColumnProfile, ColumnStats, CsvData, FeatureMatrix, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

pub const SUMMARY_FILE: &str = "summary.json";
pub const CLUSTERS_FILE: &str = "clusters.csv";
pub const PROFILE_FILE: &str = "profile.json";

/// Machine-readable record of one analyze run
#[derive(Debug, Serialize)]
pub struct AnalysisSummary {
    pub expression_file: String,
    pub outcome_file: String,
    pub expression_rows: usize,
    pub expression_columns: usize,
    pub label_column: String,
    pub genes: Vec<String>,
    pub retained_rows: usize,
    pub dropped_rows: usize,
    pub classes: Vec<String>,
    pub clustering: ClusteringSummary,
    pub silhouette: f64,
    pub ari: f64,
    pub scatter_axes: Option<(String, String)>,
    pub gene_stats: Vec<ColumnStats>,
    pub standardization: Vec<GeneScaling>,
    pub figures: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ClusteringSummary {
    pub k: usize,
    pub n_init: usize,
    pub seed: u64,
    pub clustered_on_label: bool,
    pub sizes: Vec<usize>,
    /// One row per cluster, in the fitted column space
    pub centroids: Vec<Vec<f64>>,
}

/// Mean and population std used to z-score one gene for the heatmaps
#[derive(Debug, Serialize)]
pub struct GeneScaling {
    pub gene: String,
    pub mean: f64,
    pub std_dev: f64,
}

/// Lines printed to stdout for the two scores
#[must_use]
pub fn metric_lines(silhouette: f64, ari: f64) -> [String; 2] {
    [
        format!("Silhouette score is: {silhouette:?}"),
        format!("ARI score is: {ari:?}"),
    ]
}

/// Assemble the run summary
#[allow(clippy::too_many_arguments)]
#[must_use]
pub fn build_summary(
    expression_path: &Path,
    outcome_path: &Path,
    expression: &CsvData,
    label_column: &str,
    table: &FeatureMatrix,
    config: &AnalysisConfig,
    result: &AnalysisResult,
    figures: Vec<String>,
) -> AnalysisSummary {
    AnalysisSummary {
        expression_file: expression_path.display().to_string(),
        outcome_file: outcome_path.display().to_string(),
        expression_rows: expression.row_count(),
        expression_columns: expression.col_count(),
        label_column: label_column.to_string(),
        genes: table.names.clone(),
        retained_rows: table.n_samples(),
        dropped_rows: table.dropped_rows,
        classes: result.encoder.classes().to_vec(),
        clustering: ClusteringSummary {
            k: result.clusters.k,
            n_init: config.n_init,
            seed: config.seed,
            clustered_on_label: result.clusters.used_label,
            sizes: result.clusters.sizes.clone(),
            centroids: result
                .clusters
                .centroids
                .rows()
                .into_iter()
                .map(|row| row.to_vec())
                .collect(),
        },
        silhouette: result.silhouette,
        ari: result.ari,
        scatter_axes: result
            .projection
            .as_ref()
            .map(|p| (p.x_label.clone(), p.y_label.clone())),
        gene_stats: result.gene_stats.clone(),
        standardization: result
            .standardized
            .names
            .iter()
            .zip(&result.standardized.means)
            .zip(&result.standardized.std_devs)
            .map(|((gene, &mean), &std_dev)| GeneScaling {
                gene: gene.clone(),
                mean,
                std_dev,
            })
            .collect(),
        figures,
    }
}

/// Write `summary.json`
///
/// # Errors
/// Returns error if file cannot be written
pub fn write_summary(output_dir: &Path, summary: &AnalysisSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(output_dir.join(SUMMARY_FILE), json)?;
    Ok(())
}

/// Write `clusters.csv` - label and cluster assignment for each retained row
///
/// # Errors
/// Returns error if file cannot be written
pub fn write_clusters(output_dir: &Path, table: &FeatureMatrix, result: &AnalysisResult) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_dir.join(CLUSTERS_FILE))?;
    writer.write_record(["row_id", "label", "label_code", "cluster"])?;

    for (i, &row_id) in table.row_indices.iter().enumerate() {
        writer.write_record([
            row_id.to_string(),
            table.outcomes[i].clone(),
            result.true_labels[i].to_string(),
            result.clusters.labels[i].to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Write `profile.json` - missing/zero counts per gene
///
/// # Errors
/// Returns error if file cannot be written
pub fn write_profile(output_dir: &Path, profiles: &[ColumnProfile]) -> Result<()> {
    let json = serde_json::to_string_pretty(profiles)?;
    fs::write(output_dir.join(PROFILE_FILE), json)?;
    Ok(())
}
