//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - turns them into an `ExperimentConfig`
//! - runs the experiment pipeline
//! - prints reports/plots

use clap::Parser;

use crate::cli::{Command, CvArgs, DataArgs, DemoArgs, RunArgs, SweepArgs};
use crate::domain::{DataSource, ExperimentConfig, ModelParams, SplitSpec};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `cagecv` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    let config = match &cli.command {
        Command::Run(args) => config_from_run(args),
        Command::Sweep(args) => config_from_sweep(args),
        Command::Demo(args) => config_from_demo(args),
    };
    handle_experiment(&config)
}

fn handle_experiment(config: &ExperimentConfig) -> Result<(), AppError> {
    let run = pipeline::run_experiment(config)?;

    println!(
        "{}",
        crate::report::format_run_header(config, run.ingest_stats.as_ref())
    );
    println!("{}", crate::report::format_sweep_summary(&run.report));

    let Some(best) = run.report.best() else {
        return Err(AppError::new(3, "No configuration could be scored."));
    };

    if let Some(table) = &best.predictions {
        println!("{}", crate::report::format_predictions(table, config.top_n));
        if config.plot {
            println!(
                "{}",
                crate::plot::render_scatter(table, config.plot_width, config.plot_height)
            );
        }
    }

    Ok(())
}

pub fn config_from_run(args: &RunArgs) -> ExperimentConfig {
    experiment_config(csv_source(&args.data), Some(&args.data), vec![args.feature_count], &args.cv)
}

pub fn config_from_sweep(args: &SweepArgs) -> ExperimentConfig {
    let counts = args.feature_counts.iter().map(|&k| Some(k)).collect();
    experiment_config(csv_source(&args.data), Some(&args.data), counts, &args.cv)
}

pub fn config_from_demo(args: &DemoArgs) -> ExperimentConfig {
    let source = DataSource::Synthetic {
        seed: args.data_seed,
        cages: args.cages,
        per_cage: args.per_cage,
        features: args.features,
    };
    let counts = args.feature_counts.iter().map(|&k| Some(k)).collect();
    experiment_config(source, None, counts, &args.cv)
}

fn csv_source(data: &DataArgs) -> DataSource {
    DataSource::Csv {
        uncensored: data.uncensored.clone(),
        censored: data.censored.clone(),
    }
}

fn experiment_config(
    source: DataSource,
    data: Option<&DataArgs>,
    feature_counts: Vec<Option<usize>>,
    cv: &CvArgs,
) -> ExperimentConfig {
    ExperimentConfig {
        source,
        age_filter: data.and_then(|d| d.age_filter.clone()),
        outcome_column: data.and_then(|d| d.outcome_column.clone()),
        age_column: data.and_then(|d| d.age_column.clone()),
        group_separator: data.map(|d| d.group_separator).unwrap_or(crate::domain::DEFAULT_GROUP_SEPARATOR),
        exclude_columns: data.map(|d| d.exclude_columns.clone()).unwrap_or_default(),

        split: SplitSpec {
            mode: cv.split,
            train_fraction: cv.train_fraction,
            repeats: cv.repeats,
            seed: cv.seed,
        },
        model: ModelParams {
            feature_count: None,
            alpha: cv.alpha,
            censored_weight: cv.censored_weight,
        },
        feature_counts,

        workers: cv.workers,
        timeout_secs: cv.timeout_secs,

        out_dir: cv.out_dir.clone(),
        top_n: cv.top,
        plot: cv.plot,
        plot_width: cv.width,
        plot_height: cv.height,
    }
}
