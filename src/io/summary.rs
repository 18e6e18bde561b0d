//! JSON run summary.
//!
//! The summary is the portable record of a sweep:
//! - the resolved experiment configuration
//! - every configuration's outcome, including failures and skipped folds
//! - ingest counts

use std::fs::File;
use std::path::Path;

use chrono::Local;
use serde::Serialize;

use crate::domain::{ConfigOutcome, ExperimentConfig, FoldFailure, RunConfig};
use crate::error::AppError;
use crate::fit::SweepReport;
use crate::io::IngestStats;

#[derive(Debug, Serialize)]
pub struct SummaryFile<'a> {
    pub tool: &'static str,
    pub generated: String,
    pub config: &'a ExperimentConfig,
    /// Absent for synthetic cohorts.
    pub ingest: Option<&'a IngestStats>,
    pub cancelled: bool,
    pub entries: Vec<SummaryEntry<'a>>,
}

#[derive(Debug, Serialize)]
pub struct SummaryEntry<'a> {
    pub rank: usize,
    pub config: &'a RunConfig,
    pub folds_total: usize,
    pub folds_ok: usize,
    pub outcome: &'a ConfigOutcome,
    pub fold_failures: &'a [FoldFailure],
}

impl<'a> SummaryFile<'a> {
    pub fn new(
        config: &'a ExperimentConfig,
        ingest: Option<&'a IngestStats>,
        report: &'a SweepReport,
    ) -> Self {
        Self {
            tool: "cagecv",
            generated: Local::now().to_rfc3339(),
            config,
            ingest,
            cancelled: report.cancelled,
            entries: report
                .entries
                .iter()
                .map(|e| SummaryEntry {
                    rank: e.rank,
                    config: &e.config,
                    folds_total: e.folds_total,
                    folds_ok: e.folds_ok,
                    outcome: &e.outcome,
                    fold_failures: &e.fold_failures,
                })
                .collect(),
        }
    }
}

/// Write the summary JSON file.
pub fn write_summary_json(
    path: &Path,
    config: &ExperimentConfig,
    ingest: Option<&IngestStats>,
    report: &SweepReport,
) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create summary JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, &SummaryFile::new(config, ingest, report))
        .map_err(|e| AppError::new(4, format!("Failed to write summary JSON: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DataSource, ModelParams, SplitSpec};
    use crate::fit::SweepEntry;

    fn experiment() -> ExperimentConfig {
        ExperimentConfig {
            source: DataSource::Synthetic {
                seed: 1,
                cages: 4,
                per_cage: 3,
                features: 8,
            },
            age_filter: None,
            outcome_column: None,
            age_column: None,
            group_separator: '-',
            exclude_columns: vec![],
            split: SplitSpec::logo(),
            model: ModelParams::default(),
            feature_counts: vec![Some(4)],
            workers: 1,
            timeout_secs: None,
            out_dir: None,
            top_n: 10,
            plot: false,
            plot_width: 60,
            plot_height: 20,
        }
    }

    #[test]
    fn summary_json_records_failures() {
        let exp = experiment();
        let config = exp.run_configs().remove(0);
        let report = SweepReport {
            entries: vec![SweepEntry {
                rank: 1,
                config,
                outcome: ConfigOutcome::Failed {
                    reason: "cancelled".into(),
                },
                folds_total: 0,
                folds_ok: 0,
                fold_failures: vec![],
                predictions: None,
            }],
            cancelled: true,
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        write_summary_json(&path, &exp, None, &report).unwrap();

        let value: serde_json::Value =
            serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(value["tool"], "cagecv");
        assert_eq!(value["cancelled"], true);
        assert!(value["ingest"].is_null());
        assert_eq!(value["config"]["split"]["mode"], "logo");
        assert_eq!(value["config"]["source"]["kind"], "synthetic");
        assert_eq!(value["entries"][0]["outcome"]["status"], "failed");
        assert_eq!(value["entries"][0]["outcome"]["reason"], "cancelled");
        assert_eq!(value["entries"][0]["config"]["label"], "k=4");
    }
}
