//! Cluster evaluation metrics

use crate::structs::{ExprError, Result};
use ndarray::{ArrayView1, ArrayView2};
use std::collections::HashMap;

fn euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Relabel arbitrary ids to `0..n_distinct` in order of first appearance
fn dense_labels(labels: &[usize]) -> (Vec<usize>, usize) {
    let mut map: HashMap<usize, usize> = HashMap::new();
    let dense = labels
        .iter()
        .map(|l| {
            let next = map.len();
            *map.entry(*l).or_insert(next)
        })
        .collect();
    (dense, map.len())
}

/// Mean silhouette coefficient over all samples
///
/// Samples alone in their cluster score 0.
///
/// # Errors
/// Returns error if lengths differ or fewer than two clusters are present
#[allow(clippy::cast_precision_loss)]
pub fn silhouette_score(data: ArrayView2<f64>, labels: &[usize]) -> Result<f64> {
    let n = data.nrows();
    if n != labels.len() {
        return Err(ExprError::Ml(format!(
            "{n} samples but {} cluster labels",
            labels.len()
        )));
    }

    let (labels, n_clusters) = dense_labels(labels);
    if n_clusters < 2 {
        return Err(ExprError::Ml(format!(
            "Silhouette needs at least 2 clusters, got {n_clusters}"
        )));
    }

    let mut sizes = vec![0usize; n_clusters];
    for &l in &labels {
        sizes[l] += 1;
    }

    let mut total = 0.0;
    let mut sums = vec![0.0; n_clusters];
    for i in 0..n {
        if sizes[labels[i]] == 1 {
            continue;
        }

        sums.iter_mut().for_each(|s| *s = 0.0);
        for j in 0..n {
            if i != j {
                sums[labels[j]] += euclidean(data.row(i), data.row(j));
            }
        }

        let a = sums[labels[i]] / (sizes[labels[i]] - 1) as f64;
        let b = (0..n_clusters)
            .filter(|&c| c != labels[i])
            .map(|c| sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);

        let max_ab = a.max(b);
        if max_ab > 0.0 {
            total += (b - a) / max_ab;
        }
    }

    Ok(total / n as f64)
}

/// Silhouette score, or exactly `0.0` when all samples share one cluster
///
/// # Errors
/// Returns error if lengths differ
pub fn silhouette_or_sentinel(data: ArrayView2<f64>, labels: &[usize]) -> Result<f64> {
    let (_, n_clusters) = dense_labels(labels);
    if n_clusters < 2 {
        log::warn!("Clustering collapsed to {n_clusters} cluster(s); silhouette reported as 0.0");
        if data.nrows() != labels.len() {
            return Err(ExprError::Ml(format!(
                "{} samples but {} cluster labels",
                data.nrows(),
                labels.len()
            )));
        }
        return Ok(0.0);
    }
    silhouette_score(data, labels)
}

/// Adjusted Rand Index between two partitions of the same items
///
/// # Errors
/// Returns error if the partitions have different lengths
#[allow(clippy::cast_precision_loss)]
pub fn adjusted_rand_index(a: &[usize], b: &[usize]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(ExprError::Ml(
            "partitions must have the same length".into(),
        ));
    }

    let n = a.len();
    let (a, n_a) = dense_labels(a);
    let (b, n_b) = dense_labels(b);

    // Contingency table
    let mut contingency = vec![0u64; n_a * n_b];
    for i in 0..n {
        contingency[a[i] * n_b + b[i]] += 1;
    }

    let mut row_sums = vec![0u64; n_a];
    let mut col_sums = vec![0u64; n_b];
    for i in 0..n_a {
        for j in 0..n_b {
            row_sums[i] += contingency[i * n_b + j];
            col_sums[j] += contingency[i * n_b + j];
        }
    }

    let c2 = |x: u64| -> f64 { (x * x.saturating_sub(1) / 2) as f64 };

    let sum_comb_c: f64 = contingency.iter().map(|&x| c2(x)).sum();
    let sum_comb_a: f64 = row_sums.iter().map(|&x| c2(x)).sum();
    let sum_comb_b: f64 = col_sums.iter().map(|&x| c2(x)).sum();
    let comb_n = c2(n as u64);

    // Both partitions trivial in the same way (one cluster, or all singletons)
    if comb_n == 0.0 || (sum_comb_a == sum_comb_b && (sum_comb_a == 0.0 || sum_comb_a == comb_n)) {
        return Ok(1.0);
    }

    let expected = sum_comb_a * sum_comb_b / comb_n;
    let max_index = (sum_comb_a + sum_comb_b) / 2.0;

    Ok((sum_comb_c - expected) / (max_index - expected))
}
