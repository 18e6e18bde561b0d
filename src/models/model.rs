//! The model capability consumed by the fold runner.
//!
//! The cross-validation core never looks inside a model. It only needs:
//! - a factory that builds a fresh, unfitted instance per fold
//! - `fit` on copied train / censored feature views
//! - `predict` on a copied test view that carries no outcomes

use nalgebra::DMatrix;

use crate::domain::{ModelParams, Sample};
use crate::error::ModelError;

/// A fold-private copy of feature rows.
///
/// Only numeric feature columns are stored; ids, groups and ages never reach a
/// model. Views are built by copying, so a model that mutates its input cannot
/// affect another fold.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureView {
    feature_names: Vec<String>,
    matrix: DMatrix<f64>,
    outcomes: Option<Vec<Option<f64>>>,
}

impl FeatureView {
    /// Rows with their outcomes (train and censored views).
    pub fn with_outcomes(feature_names: &[String], rows: &[&Sample]) -> Self {
        let mut view = Self::features_only(feature_names, rows);
        view.outcomes = Some(rows.iter().map(|s| s.outcome).collect());
        view
    }

    /// Rows without outcomes (test views).
    pub fn features_only(feature_names: &[String], rows: &[&Sample]) -> Self {
        let p = feature_names.len();
        let matrix = DMatrix::from_fn(rows.len(), p, |i, j| rows[i].features[j]);
        Self {
            feature_names: feature_names.to_vec(),
            matrix,
            outcomes: None,
        }
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn n_rows(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.matrix.ncols()
    }

    /// Per-row outcomes; `None` for a test view. Censored rows may hold `None`.
    pub fn outcomes(&self) -> Option<&[Option<f64>]> {
        self.outcomes.as_deref()
    }
}

/// A survival ranking / regression model.
///
/// Higher predicted scores mean larger outcomes. Implementations may hold any
/// state, but the runner never reuses an instance across folds.
pub trait SurvivalModel: Send {
    fn fit(&mut self, train: &FeatureView, censored: &FeatureView) -> Result<(), ModelError>;

    /// One score per test row, in row order.
    fn predict(&self, test: &FeatureView) -> Result<Vec<f64>, ModelError>;
}

/// Builds fresh model instances; invoked once per fold.
pub trait ModelFactory: Send + Sync {
    /// Reject parameters before any fold runs.
    fn validate(&self, params: &ModelParams) -> Result<(), ModelError> {
        let _ = params;
        Ok(())
    }

    fn build(&self, params: &ModelParams) -> Box<dyn SurvivalModel>;
}

impl<F> ModelFactory for F
where
    F: Fn(&ModelParams) -> Box<dyn SurvivalModel> + Send + Sync,
{
    fn build(&self, params: &ModelParams) -> Box<dyn SurvivalModel> {
        self(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str, outcome: Option<f64>, features: Vec<f64>) -> Sample {
        Sample {
            id: id.to_string(),
            group: "C1".to_string(),
            age: Some("12".to_string()),
            outcome,
            features,
        }
    }

    #[test]
    fn views_copy_rows_and_hide_metadata() {
        let names = vec!["a".to_string(), "b".to_string()];
        let s1 = sample("C1-1", Some(3.0), vec![1.0, 2.0]);
        let s2 = sample("C1-2", None, vec![3.0, 4.0]);

        let train = FeatureView::with_outcomes(&names, &[&s1, &s2]);
        assert_eq!(train.n_rows(), 2);
        assert_eq!(train.n_features(), 2);
        assert_eq!(train.matrix()[(1, 0)], 3.0);
        assert_eq!(train.outcomes(), Some(&[Some(3.0), None][..]));

        let test = FeatureView::features_only(&names, &[&s1]);
        assert!(test.outcomes().is_none());
        assert_eq!(test.feature_names(), &names[..]);
    }

    #[test]
    fn empty_view_keeps_column_count() {
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let view = FeatureView::with_outcomes(&names, &[]);
        assert_eq!(view.n_rows(), 0);
        assert_eq!(view.n_features(), 3);
    }
}
