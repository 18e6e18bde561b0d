//! Scoring of aggregated out-of-fold predictions.

use log::debug;

use crate::domain::{EvaluationResult, FoldStats, PredictionRecord};
use crate::error::CvError;
use crate::eval::concordance::concordance_index;
use crate::fit::aggregate::PredictionTable;
use crate::math::{pearson, spearman, Correlation};

/// Concordance, Spearman and Pearson over the whole table.
pub fn evaluate(table: &PredictionTable) -> Result<EvaluationResult, CvError> {
    let (y_true, y_pred) = table.columns();
    evaluate_pairs(&y_true, &y_pred)
}

/// Same metrics over raw `(true, predicted)` columns.
///
/// Degenerate correlations (zero variance, fewer than two pairs) are reported
/// as `corr = 0, p = 1`; they never surface as errors or NaN.
pub fn evaluate_pairs(y_true: &[f64], y_pred: &[f64]) -> Result<EvaluationResult, CvError> {
    let concordance = concordance_index(y_true, y_pred)?;
    let spearman = recover(spearman(y_true, y_pred), "spearman")?;
    let pearson = recover(pearson(y_true, y_pred), "pearson")?;

    Ok(EvaluationResult {
        n_samples: y_true.len(),
        concordance_index: concordance,
        spearman_corr: spearman.coefficient,
        spearman_pvalue: spearman.p_value,
        pearson_corr: pearson.coefficient,
        pearson_pvalue: pearson.p_value,
    })
}

fn recover(result: Result<Correlation, CvError>, name: &str) -> Result<Correlation, CvError> {
    match result {
        Ok(c) => Ok(c),
        Err(CvError::DegenerateCorrelation(reason)) => {
            debug!("{name} correlation undefined ({reason}); using 0 with p=1");
            Ok(Correlation::UNINFORMATIVE)
        }
        Err(e) => Err(e),
    }
}

/// Mean / spread of per-fold scores.
///
/// Only folds with at least two test samples are scored; a fold with one
/// sample has no pairs.
pub fn fold_stats(folds: &[Vec<PredictionRecord>]) -> FoldStats {
    let mut concordances = Vec::new();
    let mut spearmans = Vec::new();
    let mut pearsons = Vec::new();

    for records in folds.iter().filter(|r| r.len() >= 2) {
        let y_true: Vec<f64> = records.iter().map(|r| r.true_outcome).collect();
        let y_pred: Vec<f64> = records.iter().map(|r| r.predicted_score).collect();
        if let Ok(eval) = evaluate_pairs(&y_true, &y_pred) {
            concordances.push(eval.concordance_index);
            spearmans.push(eval.spearman_corr);
            pearsons.push(eval.pearson_corr);
        }
    }

    let (mean_concordance, std_concordance) = mean_std(&concordances);
    FoldStats {
        folds_scored: concordances.len(),
        mean_concordance,
        std_concordance,
        mean_spearman: mean_std(&spearmans).0,
        mean_pearson: mean_std(&pearsons).0,
    }
}

/// Mean and population standard deviation; `(0, 0)` for an empty slice.
fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}
