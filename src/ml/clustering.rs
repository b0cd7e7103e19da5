use crate::structs::{ClusterResult, ExprError, Result};
use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use linfa_clustering::KMeans;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// K-means settings
#[derive(Debug, Clone, Copy)]
pub struct KMeansConfig {
    pub k: usize,
    pub n_init: usize,
    pub max_iter: u64,
    pub seed: u64,
}

/// Perform K-means clustering on the rows of `records`
///
/// `used_label` only records whether the caller appended the encoded outcome
/// as a column; it does not change the fit.
///
/// # Errors
/// Returns error if the parameters are invalid for the data or the fit fails
pub fn kmeans(records: &Array2<f64>, config: &KMeansConfig, used_label: bool) -> Result<ClusterResult> {
    let k = config.k;
    let n_samples = records.nrows();

    if k == 0 {
        return Err(ExprError::Ml("k must be at least 1".into()));
    }

    if n_samples < k {
        return Err(ExprError::Ml(format!(
            "Cannot create {k} clusters with only {n_samples} samples"
        )));
    }

    let dataset = DatasetBase::from(records.clone());
    let rng = StdRng::seed_from_u64(config.seed);

    let model = KMeans::params_with_rng(k, rng)
        .n_runs(config.n_init.max(1))
        .max_n_iterations(config.max_iter)
        .tolerance(1e-4)
        .fit(&dataset)
        .map_err(|e| ExprError::Ml(format!("K-means failed: {e}")))?;

    let predictions = model.predict(records);
    let labels: Vec<usize> = predictions.iter().copied().collect();

    let mut sizes = vec![0usize; k];
    for &cluster_id in &labels {
        sizes[cluster_id] += 1;
    }

    Ok(ClusterResult {
        labels,
        k,
        sizes,
        centroids: model.centroids().clone(),
        used_label,
    })
}
