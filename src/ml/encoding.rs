//! Categorical label encoding

use crate::structs::{ExprError, Result};
use std::collections::BTreeSet;

/// Maps each distinct category string to an integer in `0..k`
///
/// Classes are kept in sorted order, so two encoders fitted on the same set of
/// categories always agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Learn the class list from a sequence of labels
    ///
    /// # Errors
    /// Returns error if `labels` is empty
    pub fn fit<S: AsRef<str>>(labels: &[S]) -> Result<Self> {
        if labels.is_empty() {
            return Err(ExprError::Ml("Cannot fit a label encoder on no labels".into()));
        }
        let classes: BTreeSet<&str> = labels.iter().map(AsRef::as_ref).collect();
        Ok(Self {
            classes: classes.into_iter().map(str::to_string).collect(),
        })
    }

    /// Distinct classes; the code of a class is its position here
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Code for a single label
    ///
    /// # Errors
    /// Returns `UnknownLabel` if the label was not seen during fitting
    pub fn encode(&self, label: &str) -> Result<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .map_err(|_| ExprError::UnknownLabel(label.to_string()))
    }

    /// Codes for a sequence of labels
    ///
    /// # Errors
    /// Returns `UnknownLabel` on the first label not seen during fitting
    pub fn transform<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<usize>> {
        labels.iter().map(|l| self.encode(l.as_ref())).collect()
    }

    /// Fit on `labels` and return the encoder together with their codes
    ///
    /// # Errors
    /// Returns error if `labels` is empty
    pub fn fit_transform<S: AsRef<str>>(labels: &[S]) -> Result<(Self, Vec<usize>)> {
        let encoder = Self::fit(labels)?;
        let codes = encoder.transform(labels)?;
        Ok((encoder, codes))
    }

    /// Class name for a code
    #[must_use]
    pub fn inverse_transform(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_codes_are_a_bijection() {
        let labels = ["LumB", "Basal", "LumA", "Basal", "Her2", "LumA", "Normal"];
        let (encoder, codes) = LabelEncoder::fit_transform(&labels).expect("fit");

        assert_eq!(encoder.classes(), ["Basal", "Her2", "LumA", "LumB", "Normal"]);
        let distinct: HashSet<usize> = codes.iter().copied().collect();
        assert_eq!(distinct, (0..encoder.n_classes()).collect::<HashSet<usize>>());

        for (label, &code) in labels.iter().zip(&codes) {
            assert_eq!(encoder.inverse_transform(code), Some(*label));
        }
    }

    #[test]
    fn test_refit_on_same_categories_agrees() {
        let table_column = vec!["LumA", "Basal", "LumA", "Her2"];
        let label_series: Vec<String> = table_column.iter().rev().map(|s| (*s).to_string()).collect();

        let (first, first_codes) = LabelEncoder::fit_transform(&table_column).expect("fit");
        let second = LabelEncoder::fit(&label_series).expect("fit");

        assert_eq!(first, second);
        assert_eq!(second.transform(&table_column).expect("transform"), first_codes);
    }

    #[test]
    fn test_refit_on_different_categories_disagrees() {
        let first = LabelEncoder::fit(&["LumA", "LumB"]).expect("fit");
        let second = LabelEncoder::fit(&["Basal", "LumA", "LumB"]).expect("fit");

        assert_ne!(first.encode("LumA").unwrap(), second.encode("LumA").unwrap());
    }

    #[test]
    fn test_unknown_label() {
        let encoder = LabelEncoder::fit(&["a", "b"]).expect("fit");
        assert!(matches!(encoder.encode("c"), Err(ExprError::UnknownLabel(_))));
        assert_eq!(encoder.inverse_transform(5), None);
    }

    #[test]
    fn test_empty_fit_fails() {
        let empty: [&str; 0] = [];
        assert!(LabelEncoder::fit(&empty).is_err());
    }
}
