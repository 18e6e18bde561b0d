//! Bundled ranker: correlation-filtered, standardized weighted ridge regression.
//!
//! Fit steps:
//! 1. keep the `k` features most correlated (in absolute value) with the
//!    outcome on the uncensored training rows
//! 2. standardize them with the fit rows' mean / std, dropping constant columns
//! 3. solve weighted ridge least squares; censored rows with a known outcome
//!    enter with a reduced weight
//!
//! The score is the fitted outcome, so larger scores rank as longer survival.

use std::cmp::Ordering;

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::domain::ModelParams;
use crate::error::ModelError;
use crate::math::{solve_ridge, spearman};
use crate::models::model::{FeatureView, ModelFactory, SurvivalModel};

/// Columns with a smaller spread than this are treated as constant.
const MIN_STD: f64 = 1e-12;

#[derive(Debug, Clone)]
struct FittedRidge {
    n_features: usize,
    columns: Vec<usize>,
    means: Vec<f64>,
    stds: Vec<f64>,
    coef: DVector<f64>,
}

#[derive(Debug, Clone)]
pub struct RidgeRanker {
    params: ModelParams,
    fitted: Option<FittedRidge>,
}

impl RidgeRanker {
    pub fn new(params: ModelParams) -> Self {
        Self {
            params,
            fitted: None,
        }
    }

    /// Indices of the selected feature columns, once fitted.
    pub fn selected_columns(&self) -> Option<&[usize]> {
        self.fitted.as_ref().map(|f| f.columns.as_slice())
    }
}

impl SurvivalModel for RidgeRanker {
    fn fit(&mut self, train: &FeatureView, censored: &FeatureView) -> Result<(), ModelError> {
        let p = train.n_features();
        if censored.n_features() != p {
            return Err(ModelError::DimensionMismatch {
                expected: p,
                found: censored.n_features(),
            });
        }

        let FitRows {
            rows,
            y,
            w,
            n_uncensored,
        } = collect_fit_rows(train, censored, self.params.censored_weight)?;

        let candidates = select_features(train, self.params.feature_count);

        let mut columns = Vec::new();
        let mut means = Vec::new();
        let mut stds = Vec::new();
        for j in candidates {
            let col: Vec<f64> = rows.iter().map(|r| r[j]).collect();
            let (mean, std) = mean_std(&col);
            if std > MIN_STD {
                columns.push(j);
                means.push(mean);
                stds.push(std);
            }
        }

        let x = DMatrix::from_fn(rows.len(), columns.len(), |i, c| {
            (rows[i][columns[c]] - means[c]) / stds[c]
        });
        let coef = solve_ridge(&x, &y, &w, self.params.alpha)
            .ok_or_else(|| ModelError::Numerical("ridge solve failed".to_string()))?;

        debug!(
            "ridge fit: {} rows ({} uncensored), {} of {} features kept",
            rows.len(),
            n_uncensored,
            columns.len(),
            p
        );

        self.fitted = Some(FittedRidge {
            n_features: p,
            columns,
            means,
            stds,
            coef,
        });
        Ok(())
    }

    fn predict(&self, test: &FeatureView) -> Result<Vec<f64>, ModelError> {
        let fitted = self.fitted.as_ref().ok_or(ModelError::NotFitted)?;
        if test.n_features() != fitted.n_features {
            return Err(ModelError::DimensionMismatch {
                expected: fitted.n_features,
                found: test.n_features(),
            });
        }

        let m = test.matrix();
        let scores: Vec<f64> = (0..test.n_rows())
            .map(|i| {
                let mut s = fitted.coef[0];
                for (c, &j) in fitted.columns.iter().enumerate() {
                    s += fitted.coef[c + 1] * (m[(i, j)] - fitted.means[c]) / fitted.stds[c];
                }
                s
            })
            .collect();

        if scores.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::Numerical("non-finite score".to_string()));
        }
        Ok(scores)
    }
}

/// Rows, outcomes and weights used by the solve.
struct FitRows {
    rows: Vec<Vec<f64>>,
    y: Vec<f64>,
    w: Vec<f64>,
    n_uncensored: usize,
}

fn collect_fit_rows(
    train: &FeatureView,
    censored: &FeatureView,
    censored_weight: f64,
) -> Result<FitRows, ModelError> {
    let train_y = train
        .outcomes()
        .ok_or_else(|| ModelError::Other("training view has no outcomes".to_string()))?;

    let mut rows = Vec::new();
    let mut y = Vec::new();
    let mut w = Vec::new();

    for (i, outcome) in train_y.iter().enumerate() {
        if let Some(v) = outcome.filter(|v| v.is_finite()) {
            rows.push(row(train.matrix(), i));
            y.push(v);
            w.push(1.0);
        }
    }
    if rows.is_empty() {
        return Err(ModelError::NoTrainingRows);
    }
    let n_uncensored = rows.len();

    if censored_weight > 0.0 {
        if let Some(cens_y) = censored.outcomes() {
            for (i, outcome) in cens_y.iter().enumerate() {
                if let Some(v) = outcome.filter(|v| v.is_finite()) {
                    rows.push(row(censored.matrix(), i));
                    y.push(v);
                    w.push(censored_weight);
                }
            }
        }
    }

    if rows.iter().flatten().any(|v| !v.is_finite()) {
        return Err(ModelError::Numerical("non-finite feature value".to_string()));
    }
    Ok(FitRows {
        rows,
        y,
        w,
        n_uncensored,
    })
}

fn row(m: &DMatrix<f64>, i: usize) -> Vec<f64> {
    m.row(i).iter().copied().collect()
}

/// Top-`k` columns by |Spearman rho| against the uncensored outcome.
///
/// Ties keep column order. Undefined correlations rank as 0.
fn select_features(train: &FeatureView, k: Option<usize>) -> Vec<usize> {
    let p = train.n_features();
    let k = match k {
        Some(k) if k < p => k,
        _ => return (0..p).collect(),
    };

    let Some(outcomes) = train.outcomes() else {
        return (0..p).collect();
    };
    let (idx, y): (Vec<usize>, Vec<f64>) = outcomes
        .iter()
        .enumerate()
        .filter_map(|(i, o)| o.filter(|v| v.is_finite()).map(|v| (i, v)))
        .unzip();

    let m = train.matrix();
    let mut scored: Vec<(usize, f64)> = (0..p)
        .map(|j| {
            let x: Vec<f64> = idx.iter().map(|&i| m[(i, j)]).collect();
            let r = spearman(&x, &y).map(|c| c.coefficient.abs()).unwrap_or(0.0);
            (j, r)
        })
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    let mut keep: Vec<usize> = scored.into_iter().take(k).map(|(j, _)| j).collect();
    keep.sort_unstable();
    keep
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Factory for [`RidgeRanker`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RidgeFactory;

impl ModelFactory for RidgeFactory {
    fn validate(&self, params: &ModelParams) -> Result<(), ModelError> {
        if !(params.alpha.is_finite() && params.alpha >= 0.0) {
            return Err(ModelError::Other(format!(
                "alpha must be finite and >= 0, got {}",
                params.alpha
            )));
        }
        if !(0.0..=1.0).contains(&params.censored_weight) {
            return Err(ModelError::Other(format!(
                "censored weight must be in [0, 1], got {}",
                params.censored_weight
            )));
        }
        if params.feature_count == Some(0) {
            return Err(ModelError::Other("feature count must be >= 1".to_string()));
        }
        Ok(())
    }

    fn build(&self, params: &ModelParams) -> Box<dyn SurvivalModel> {
        Box::new(RidgeRanker::new(params.clone()))
    }
}
