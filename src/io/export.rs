//! CSV exports of predictions and the ranked sweep summary.
//!
//! Both files are meant to be easy to consume in spreadsheets or downstream scripts.

use std::path::Path;

use crate::domain::ConfigOutcome;
use crate::error::AppError;
use crate::fit::{PredictionTable, SweepReport};

/// Write one configuration's out-of-fold predictions.
pub fn write_predictions_csv(path: &Path, table: &PredictionTable) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| {
        AppError::new(4, format!("Failed to create predictions CSV '{}': {e}", path.display()))
    })?;

    writer
        .write_record(["id", "group", "true_outcome", "predicted_score", "fold"])
        .map_err(|e| AppError::new(4, format!("Failed to write predictions CSV header: {e}")))?;

    for r in table.records() {
        writer
            .write_record([
                r.sample_id.clone(),
                r.group.clone(),
                format!("{}", r.true_outcome),
                format!("{:.10}", r.predicted_score),
                r.fold.to_string(),
            ])
            .map_err(|e| AppError::new(4, format!("Failed to write predictions CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush predictions CSV: {e}")))?;
    Ok(())
}

/// Write the ranked summary, one row per configuration.
///
/// Failed configurations keep their row with empty metric cells and the reason.
pub fn write_summary_csv(path: &Path, report: &SweepReport) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| {
        AppError::new(4, format!("Failed to create summary CSV '{}': {e}", path.display()))
    })?;

    writer
        .write_record([
            "rank",
            "label",
            "feature_count",
            "status",
            "n_samples",
            "folds_ok",
            "folds_total",
            "concordance_index",
            "spearman_corr",
            "spearman_pvalue",
            "pearson_corr",
            "pearson_pvalue",
            "fold_mean_concordance",
            "fold_std_concordance",
            "reason",
        ])
        .map_err(|e| AppError::new(4, format!("Failed to write summary CSV header: {e}")))?;

    for entry in &report.entries {
        let k = entry
            .config
            .model
            .feature_count
            .map(|k| k.to_string())
            .unwrap_or_else(|| "all".to_string());
        let mut row = vec![
            entry.rank.to_string(),
            entry.config.label.clone(),
            k,
        ];
        match &entry.outcome {
            ConfigOutcome::Scored {
                evaluation: e,
                fold_stats: s,
            } => row.extend([
                "scored".to_string(),
                e.n_samples.to_string(),
                entry.folds_ok.to_string(),
                entry.folds_total.to_string(),
                format!("{:.6}", e.concordance_index),
                format!("{:.6}", e.spearman_corr),
                format!("{:.6e}", e.spearman_pvalue),
                format!("{:.6}", e.pearson_corr),
                format!("{:.6e}", e.pearson_pvalue),
                format!("{:.6}", s.mean_concordance),
                format!("{:.6}", s.std_concordance),
                String::new(),
            ]),
            ConfigOutcome::Failed { reason } => {
                row.extend([
                    "failed".to_string(),
                    String::new(),
                    entry.folds_ok.to_string(),
                    entry.folds_total.to_string(),
                ]);
                row.extend(std::iter::repeat(String::new()).take(7));
                row.push(reason.clone());
            }
        }
        writer
            .write_record(&row)
            .map_err(|e| AppError::new(4, format!("Failed to write summary CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush summary CSV: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EvaluationResult, FoldStats, ModelParams, PredictionRecord, RunConfig, SplitSpec};
    use crate::fit::SweepEntry;

    fn report() -> SweepReport {
        let configs = RunConfig::feature_sweep(&SplitSpec::logo(), &ModelParams::default(), &[5, 10]);
        let table = PredictionTable::from_records(vec![PredictionRecord {
            sample_id: "C1-1".into(),
            group: "C1".into(),
            true_outcome: 30.0,
            predicted_score: 0.25,
            fold: 0,
        }]);
        SweepReport {
            entries: vec![
                SweepEntry {
                    rank: 1,
                    config: configs[0].clone(),
                    outcome: ConfigOutcome::Scored {
                        evaluation: EvaluationResult {
                            n_samples: 1,
                            concordance_index: 0.75,
                            spearman_corr: 0.5,
                            spearman_pvalue: 0.1,
                            pearson_corr: 0.4,
                            pearson_pvalue: 0.2,
                        },
                        fold_stats: FoldStats {
                            folds_scored: 1,
                            mean_concordance: 0.7,
                            std_concordance: 0.1,
                            mean_spearman: 0.5,
                            mean_pearson: 0.4,
                        },
                    },
                    folds_total: 3,
                    folds_ok: 3,
                    fold_failures: vec![],
                    predictions: Some(table),
                },
                SweepEntry {
                    rank: 2,
                    config: configs[1].clone(),
                    outcome: ConfigOutcome::Failed {
                        reason: "No fold produced predictions".into(),
                    },
                    folds_total: 3,
                    folds_ok: 0,
                    fold_failures: vec![],
                    predictions: None,
                },
            ],
            cancelled: false,
        }
    }

    #[test]
    fn predictions_csv_has_one_row_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pred.csv");
        let r = report();
        write_predictions_csv(&path, r.entries[0].predictions.as_ref().unwrap()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "id,group,true_outcome,predicted_score,fold");
        assert_eq!(lines[1], "C1-1,C1,30,0.2500000000,0");
    }

    #[test]
    fn summary_csv_keeps_failed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        write_summary_csv(&path, &report()).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][1], "k=5");
        assert_eq!(&rows[0][7], "0.750000");
        assert_eq!(&rows[1][3], "failed");
        assert_eq!(&rows[1][14], "No fold produced predictions");
        assert_eq!(rows[1].len(), 15);
    }
}
