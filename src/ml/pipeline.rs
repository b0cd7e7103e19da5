//! Analysis pipeline that orchestrates all ML computations

use super::clustering::{kmeans, KMeansConfig};
use super::encoding::LabelEncoder;
use super::hierarchy::{ward, Linkage};
use super::metrics::{adjusted_rand_index, silhouette_or_sentinel};
use super::reduction::{first_two_features, pca_2d, Projection};
use crate::structs::{
    ClusterResult, ColumnStats, FeatureMatrix, LabeledMatrix, Result, StandardizedFeatures,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Configuration for the analysis pipeline
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub clusters: usize,
    pub n_init: usize,
    pub max_iter: u64,
    pub seed: u64,
    /// Append the encoded outcome to the clustered columns
    pub include_label: bool,
    /// Scatter on principal components instead of the first two genes
    pub pca: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            clusters: 5,
            n_init: 1,
            max_iter: 300,
            seed: 0,
            include_label: true,
            pca: false,
        }
    }
}

/// Everything the reporters and plots need from one run
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub encoder: LabelEncoder,
    pub true_labels: Vec<usize>,
    pub clusters: ClusterResult,
    pub silhouette: f64,
    pub ari: f64,
    pub projection: Option<Projection>,
    pub gene_stats: Vec<ColumnStats>,
    pub standardized: StandardizedFeatures,
    pub randomized: LabeledMatrix,
    pub row_linkage: Linkage,
    pub col_linkage: Linkage,
    pub ordered: LabeledMatrix,
}

/// Run the full analysis pipeline on a cleaned feature table
///
/// # Errors
/// Returns error if encoding, clustering, scoring or standardization fails.
/// A failed scatter projection is non-fatal (logged and set to `None`).
pub fn run_pipeline(table: &FeatureMatrix, config: &AnalysisConfig) -> Result<AnalysisResult> {
    let (encoder, true_labels) = LabelEncoder::fit_transform(&table.outcomes)?;
    log::info!(
        "Encoded {} outcome classes: {}",
        encoder.n_classes(),
        encoder.classes().join(", ")
    );

    let features = table.to_array()?;
    let records = if config.include_label {
        log::info!("Clustering on {} genes plus the encoded outcome", table.n_features());
        table.with_label_column(&true_labels)?
    } else {
        log::info!("Clustering on {} genes", table.n_features());
        features.clone()
    };

    let clusters = kmeans(
        &records,
        &KMeansConfig {
            k: config.clusters,
            n_init: config.n_init,
            max_iter: config.max_iter,
            seed: config.seed,
        },
        config.include_label,
    )?;
    log::info!("{}", clusters.summary().trim_end());
    if clusters.occupied() < clusters.k {
        log::warn!(
            "Only {} of {} clusters received samples",
            clusters.occupied(),
            clusters.k
        );
    }

    let silhouette = silhouette_or_sentinel(features.view(), &clusters.labels)?;
    let ari = adjusted_rand_index(&true_labels, &clusters.labels)?;

    let projected = if config.pca {
        pca_2d(features.view())
    } else {
        first_two_features(features.view())
    };
    let projection = match projected {
        Ok(p) => Some(p),
        Err(e) => {
            log::warn!("Skipping cluster scatter: {e}");
            None
        }
    };

    let gene_stats = table
        .names
        .iter()
        .enumerate()
        .filter_map(|(i, name)| {
            let col = table.column(i)?;
            ColumnStats::calculate(name, &col).ok()
        })
        .collect();

    let standardized = table.standardize()?;
    let randomized = randomize(&labeled(&standardized), config.seed);

    let row_linkage = ward(randomized.values.view());
    let col_linkage = ward(randomized.values.t());
    let ordered = randomized.permuted(&row_linkage.leaves(), &col_linkage.leaves());

    Ok(AnalysisResult {
        encoder,
        true_labels,
        clusters,
        silhouette,
        ari,
        projection,
        gene_stats,
        standardized,
        randomized,
        row_linkage,
        col_linkage,
        ordered,
    })
}

/// Standardized matrix labelled by retained-row position and gene name
#[must_use]
pub fn labeled(standardized: &StandardizedFeatures) -> LabeledMatrix {
    LabeledMatrix {
        row_labels: (0..standardized.data.nrows()).map(|i| i.to_string()).collect(),
        col_labels: standardized.names.clone(),
        values: standardized.data.clone(),
    }
}

/// Shuffle rows and columns independently with a seeded generator
#[must_use]
pub fn randomize(matrix: &LabeledMatrix, seed: u64) -> LabeledMatrix {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut rows: Vec<usize> = (0..matrix.n_rows()).collect();
    rows.shuffle(&mut rng);
    let mut cols: Vec<usize> = (0..matrix.n_cols()).collect();
    cols.shuffle(&mut rng);

    matrix.permuted(&rows, &cols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// 10 samples x 3 genes, two well separated subtypes
    fn synthetic_table() -> FeatureMatrix {
        let data: Vec<Vec<f64>> = (0..10_i32)
            .map(|i| {
                let base = if i < 5 { 0.0 } else { 8.0 };
                let jitter = f64::from(i % 5) * 0.1;
                vec![base + jitter, base - jitter, base * 0.5 + jitter]
            })
            .collect();
        let outcomes = (0..10)
            .map(|i| (if i < 5 { "LumA" } else { "Basal" }).to_string())
            .collect();
        FeatureMatrix {
            names: vec!["ESR1".into(), "TP53".into(), "GATA3".into()],
            data,
            outcomes,
            row_indices: (0..10).collect(),
            dropped_rows: 0,
        }
    }

    fn is_permutation(labels: &[String], n: usize) -> bool {
        let set: HashSet<usize> = labels.iter().filter_map(|l| l.parse().ok()).collect();
        labels.len() == n && set == (0..n).collect::<HashSet<_>>()
    }

    #[test]
    fn test_full_pipeline() {
        let table = synthetic_table();
        let config = AnalysisConfig {
            seed: 42,
            ..AnalysisConfig::default()
        };

        let result = run_pipeline(&table, &config).expect("pipeline");

        let codes: HashSet<usize> = result.true_labels.iter().copied().collect();
        assert_eq!(codes, HashSet::from([0, 1]));
        assert_eq!(result.clusters.labels.len(), 10);
        assert!(result.clusters.labels.iter().all(|&c| c <= 4));
        assert!(result.clusters.used_label);
        assert!((-0.5..=1.0).contains(&result.ari));
        assert!((-1.0..=1.0).contains(&result.silhouette));
        assert_eq!(result.gene_stats.len(), 3);
        assert!(result.projection.is_some());

        assert_eq!(result.randomized.values.dim(), (10, 3));
        assert!(is_permutation(&result.randomized.row_labels, 10));
        assert_eq!(result.row_linkage.merges.len(), 9);
        assert_eq!(result.col_linkage.merges.len(), 2);
        assert!(is_permutation(&result.ordered.row_labels, 10));
    }

    #[test]
    fn test_pipeline_without_label_leakage() {
        let table = synthetic_table();
        let config = AnalysisConfig {
            clusters: 2,
            n_init: 5,
            seed: 3,
            include_label: false,
            pca: true,
            ..AnalysisConfig::default()
        };

        let result = run_pipeline(&table, &config).expect("pipeline");

        assert!(!result.clusters.used_label);
        assert_eq!(result.clusters.centroids.ncols(), 3);
        // the two subtypes are far apart, so k = 2 recovers them
        assert!((result.ari - 1.0).abs() < 1e-12);
        assert!(result.silhouette > 0.5);
        assert_eq!(
            result.projection.as_ref().map(|p| p.x_label.as_str()),
            Some("PCA comp 1")
        );
    }

    #[test]
    fn test_randomize_is_seeded() {
        let table = synthetic_table();
        let matrix = labeled(&table.standardize().expect("standardize"));

        let a = randomize(&matrix, 9);
        let b = randomize(&matrix, 9);
        assert_eq!(a.row_labels, b.row_labels);
        assert_eq!(a.col_labels, b.col_labels);
        assert_eq!(a.values, b.values);

        let genes: HashSet<&String> = a.col_labels.iter().collect();
        assert_eq!(genes.len(), 3);
        // every value keeps its row and column
        for (i, row) in a.row_labels.iter().enumerate() {
            let src_row: usize = row.parse().expect("row label");
            for (j, gene) in a.col_labels.iter().enumerate() {
                let src_col = matrix.col_labels.iter().position(|g| g == gene).expect("gene");
                assert_eq!(a.values[[i, j]], matrix.values[[src_row, src_col]]);
            }
        }
    }

    #[test]
    fn test_ordered_follows_leaves() {
        let table = synthetic_table();
        let result = run_pipeline(&table, &AnalysisConfig::default()).expect("pipeline");

        let leaves = result.row_linkage.leaves();
        let expected: Vec<String> = leaves
            .iter()
            .map(|&i| result.randomized.row_labels[i].clone())
            .collect();
        assert_eq!(result.ordered.row_labels, expected);
    }
}
