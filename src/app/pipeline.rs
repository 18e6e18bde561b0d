//! Shared experiment pipeline used by every subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load/generate cohort -> sweep (split, fit, aggregate, evaluate) -> rank -> exports
//!
//! The subcommands can then focus on presentation.

use std::fs::create_dir_all;
use std::path::Path;
use std::time::Duration;

use log::{info, warn};

use crate::data::{generate_cohort, SyntheticSpec};
use crate::domain::{Cohort, DataSource, ExperimentConfig};
use crate::error::AppError;
use crate::fit::{CancelToken, Execution, Sweep, SweepReport};
use crate::io::{
    load_cohort, sanitize_column_name, write_predictions_csv, write_summary_csv, write_summary_json,
    IngestOptions, IngestStats, RowError,
};
use crate::journal::{EventSink, JournalSink, LogSink};
use crate::models::RidgeFactory;

pub const RUN_LOG_FILE: &str = "run_log.txt";
pub const SUMMARY_CSV_FILE: &str = "summary.csv";
pub const SUMMARY_JSON_FILE: &str = "summary.json";

/// All computed outputs of one experiment.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub cohort: Cohort,
    /// Present when the cohort came from CSV files.
    pub ingest_stats: Option<IngestStats>,
    pub row_errors: Vec<RowError>,
    pub report: SweepReport,
}

/// Load (or generate) the cohort described by the config.
pub fn load_data(config: &ExperimentConfig) -> Result<(Cohort, Option<IngestStats>, Vec<RowError>), AppError> {
    match &config.source {
        DataSource::Csv { uncensored, censored } => {
            let opts = IngestOptions {
                age_filter: config.age_filter.clone(),
                outcome_column: config.outcome_column.clone(),
                age_column: config.age_column.clone(),
                group_separator: config.group_separator,
                exclude_columns: config.exclude_columns.clone(),
                ..IngestOptions::new(uncensored, censored)
            };
            let ingested = load_cohort(&opts)?;
            Ok((ingested.cohort, Some(ingested.stats), ingested.row_errors))
        }
        DataSource::Synthetic {
            seed,
            cages,
            per_cage,
            features,
        } => {
            let cohort = generate_cohort(&SyntheticSpec::new(*seed, *cages, *per_cage, *features))?;
            info!(
                "Generated synthetic cohort: {} uncensored, {} censored, {} features",
                cohort.uncensored.len(),
                cohort.censored.len(),
                cohort.feature_count()
            );
            Ok((cohort, None, Vec::new()))
        }
    }
}

/// Execute the full experiment and write exports when an output directory is set.
pub fn run_experiment(config: &ExperimentConfig) -> Result<RunOutput, AppError> {
    // 1) Data.
    let (cohort, ingest_stats, row_errors) = load_data(config)?;

    let configs = config.run_configs();
    if configs.is_empty() {
        return Err(AppError::new(2, "No feature counts to evaluate."));
    }

    // 2) Event sink: the run log lives next to the other outputs.
    let sink: Box<dyn EventSink> = match &config.out_dir {
        Some(dir) => {
            create_dir_all(dir)
                .map_err(|e| AppError::new(4, format!("Failed to create output dir '{}': {e}", dir.display())))?;
            let journal = JournalSink::create(&dir.join(RUN_LOG_FILE))?;
            journal.note(&format!(
                "cohort: {} uncensored, {} censored, {} groups, {} features",
                cohort.uncensored.len(),
                cohort.censored.len(),
                cohort.groups().len(),
                cohort.feature_count()
            ));
            journal.note(&format!(
                "split: {} | configs: {}",
                config.split.mode.display_name(),
                configs.iter().map(|c| c.label.as_str()).collect::<Vec<_>>().join(", ")
            ));
            Box::new(journal)
        }
        None => Box::new(LogSink),
    };

    // 3) Sweep.
    let cancel = match config.timeout_secs {
        Some(secs) => CancelToken::with_timeout(Duration::from_secs(secs)),
        None => CancelToken::new(),
    };
    let factory = RidgeFactory;
    let report = Sweep::new(&factory, sink.as_ref())
        .with_execution(Execution::from_workers(config.workers))
        .with_cancel(cancel)
        .run(&cohort, &configs)?;

    if report.cancelled {
        warn!("Sweep was cancelled; unfinished configurations are reported as failed.");
    }

    // 4) Exports.
    if let Some(dir) = &config.out_dir {
        write_outputs(dir, config, ingest_stats.as_ref(), &report)?;
    }

    Ok(RunOutput {
        cohort,
        ingest_stats,
        row_errors,
        report,
    })
}

/// Summary CSV + JSON and one predictions CSV per scored configuration.
pub fn write_outputs(
    dir: &Path,
    config: &ExperimentConfig,
    ingest_stats: Option<&IngestStats>,
    report: &SweepReport,
) -> Result<(), AppError> {
    write_summary_csv(&dir.join(SUMMARY_CSV_FILE), report)?;
    write_summary_json(&dir.join(SUMMARY_JSON_FILE), config, ingest_stats, report)?;

    for entry in &report.entries {
        if let Some(table) = &entry.predictions {
            let path = dir.join(predictions_file_name(&entry.config.label));
            write_predictions_csv(&path, table)?;
        }
    }

    info!("Wrote outputs to {}", dir.display());
    Ok(())
}

pub fn predictions_file_name(label: &str) -> String {
    format!("predictions_{}.csv", sanitize_column_name(label))
}
