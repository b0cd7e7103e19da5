//! PCA projection for the cluster scatter plots

use crate::structs::{ExprError, Result};
use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use linfa_reduction::Pca;
use ndarray::{Array2, ArrayView2};

/// Points for a two-dimensional scatter, plus axis names
#[derive(Debug, Clone)]
pub struct Projection {
    pub points: Vec<(f64, f64)>,
    pub x_label: String,
    pub y_label: String,
}

/// First two raw feature columns as scatter coordinates
///
/// # Errors
/// Returns error if there are fewer than two features
pub fn first_two_features(data: ArrayView2<f64>) -> Result<Projection> {
    if data.ncols() < 2 {
        return Err(ExprError::Ml(
            "Scatter needs at least 2 features".into(),
        ));
    }
    Ok(Projection {
        points: data.rows().into_iter().map(|r| (r[0], r[1])).collect(),
        x_label: "feature 1".into(),
        y_label: "feature 2".into(),
    })
}

/// Project samples onto their first two principal components
///
/// # Errors
/// Returns error if PCA computation fails (e.g., too few samples)
pub fn pca_2d(data: ArrayView2<f64>) -> Result<Projection> {
    let (n_samples, n_features) = data.dim();

    if n_features < 2 {
        return Err(ExprError::Ml("PCA requires at least 2 features".into()));
    }
    if n_samples < 3 {
        return Err(ExprError::Ml("PCA requires at least 3 samples".into()));
    }

    let records: Array2<f64> = data.to_owned();
    let dataset = DatasetBase::from(records.clone());

    let pca = Pca::params(2)
        .fit(&dataset)
        .map_err(|e| ExprError::Ml(format!("PCA failed: {e}")))?;

    let projected: Array2<f64> = pca.predict(&records);

    Ok(Projection {
        points: projected.rows().into_iter().map(|r| (r[0], r[1])).collect(),
        x_label: "PCA comp 1".into(),
        y_label: "PCA comp 2".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_first_two_features() {
        let data = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let projection = first_two_features(data.view()).expect("project");

        assert_eq!(projection.points, vec![(1.0, 2.0), (4.0, 5.0)]);
        assert_eq!(projection.x_label, "feature 1");
    }

    #[test]
    fn test_first_two_features_needs_two_columns() {
        let data = array![[1.0], [2.0]];
        assert!(first_two_features(data.view()).is_err());
    }

    #[test]
    fn test_pca_2d() {
        let data = array![
            [1.0, 2.0, 3.0],
            [2.0, 4.1, 5.0],
            [3.0, 6.0, 7.2],
            [4.0, 8.2, 9.0],
            [5.0, 10.0, 11.1]
        ];
        let projection = pca_2d(data.view()).expect("pca");

        assert_eq!(projection.points.len(), 5);
        assert_eq!(projection.y_label, "PCA comp 2");
        // the first component carries almost all the spread
        let spread = |f: fn(&(f64, f64)) -> f64| {
            let v: Vec<f64> = projection.points.iter().map(f).collect();
            v.iter().cloned().fold(f64::MIN, f64::max) - v.iter().cloned().fold(f64::MAX, f64::min)
        };
        assert!(spread(|p| p.0) > spread(|p| p.1));
    }

    #[test]
    fn test_pca_too_few_features() {
        let data = array![[1.0], [2.0], [3.0]];
        assert!(pca_2d(data.view()).is_err());
    }
}
