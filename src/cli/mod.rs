//! Command-line parsing for the grouped cross-validation tool.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! cross-validation code; `app` turns these structs into an `ExperimentConfig`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{SplitMode, DEFAULT_GROUP_SEPARATOR};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "cagecv",
    version,
    about = "Cage-grouped cross-validation and concordance scoring for survival experiments"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Cross-validate a single configuration.
    Run(RunArgs),
    /// Cross-validate one configuration per feature count and rank them.
    Sweep(SweepArgs),
    /// Run a sweep on a synthetic cohort (no input files needed).
    Demo(DemoArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Number of features kept by feature selection (all when omitted).
    #[arg(long)]
    pub feature_count: Option<usize>,

    #[command(flatten)]
    pub cv: CvArgs,
}

#[derive(Debug, Parser, Clone)]
pub struct SweepArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Feature counts to compare, comma separated.
    #[arg(long, value_delimiter = ',', required = true)]
    pub feature_counts: Vec<usize>,

    #[command(flatten)]
    pub cv: CvArgs,
}

#[derive(Debug, Parser, Clone)]
pub struct DemoArgs {
    /// Number of cages in the synthetic cohort.
    #[arg(long, default_value_t = 12)]
    pub cages: usize,

    /// Uncensored mice per cage.
    #[arg(long, default_value_t = 5)]
    pub per_cage: usize,

    /// Number of features.
    #[arg(long, default_value_t = 40)]
    pub features: usize,

    /// Seed for cohort generation (the split seed is `--seed`).
    #[arg(long, default_value_t = 7)]
    pub data_seed: u64,

    /// Feature counts to compare, comma separated.
    #[arg(long, value_delimiter = ',', default_values_t = [5, 10, 20, 40])]
    pub feature_counts: Vec<usize>,

    #[command(flatten)]
    pub cv: CvArgs,
}

/// Input tables and how to read them.
#[derive(Debug, Args, Clone)]
pub struct DataArgs {
    /// CSV of uncensored samples (id column first, outcome column required).
    #[arg(long, value_name = "CSV")]
    pub uncensored: PathBuf,

    /// CSV of censored samples (same feature columns).
    #[arg(long, value_name = "CSV")]
    pub censored: PathBuf,

    /// Keep only samples whose age column equals this value.
    #[arg(long)]
    pub age_filter: Option<String>,

    /// Outcome column (default: first column containing "diff").
    #[arg(long)]
    pub outcome_column: Option<String>,

    /// Age column (default: first column containing "Age").
    #[arg(long)]
    pub age_column: Option<String>,

    /// Separator between the cage prefix and the rest of a sample id.
    #[arg(long, default_value_t = DEFAULT_GROUP_SEPARATOR)]
    pub group_separator: char,

    /// Extra column to keep out of the features (repeatable).
    #[arg(long = "exclude-column")]
    pub exclude_columns: Vec<String>,
}

/// Splitting, model, execution and output options.
#[derive(Debug, Args, Clone)]
pub struct CvArgs {
    /// Fold construction.
    #[arg(long, value_enum, default_value_t = SplitMode::Logo)]
    pub split: SplitMode,

    /// Fraction of cages used for training in holdout mode.
    #[arg(long, default_value_t = 0.7)]
    pub train_fraction: f64,

    /// Number of holdout folds.
    #[arg(long, default_value_t = 10)]
    pub repeats: usize,

    /// Holdout shuffle seed (shared by every configuration).
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Ridge penalty.
    #[arg(long, default_value_t = 0.001)]
    pub alpha: f64,

    /// Training weight of censored samples with a recorded outcome.
    #[arg(long, default_value_t = 0.5)]
    pub censored_weight: f64,

    /// Worker threads for folds (parallel when > 1).
    #[arg(long, default_value_t = 1)]
    pub workers: usize,

    /// Abandon configurations not started after this many seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Write summary CSV/JSON, per-config predictions and the run log here.
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Rows of the per-sample prediction table.
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Render an ASCII true-vs-predicted scatter of the best configuration.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 24)]
    pub height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_parses_comma_separated_counts() {
        let cli = Cli::try_parse_from([
            "cagecv",
            "sweep",
            "--uncensored",
            "u.csv",
            "--censored",
            "c.csv",
            "--feature-counts",
            "10,25,50",
            "--split",
            "holdout",
            "--exclude-column",
            "Sex",
            "--exclude-column",
            "Batch",
        ])
        .unwrap();

        let Command::Sweep(args) = cli.command else {
            panic!("expected sweep");
        };
        assert_eq!(args.feature_counts, vec![10, 25, 50]);
        assert_eq!(args.cv.split, SplitMode::Holdout);
        assert_eq!(args.data.exclude_columns, vec!["Sex", "Batch"]);
        assert_eq!(args.data.group_separator, '-');
    }

    #[test]
    fn run_requires_input_files() {
        assert!(Cli::try_parse_from(["cagecv", "run", "--uncensored", "u.csv"]).is_err());
    }

    #[test]
    fn demo_has_defaults() {
        let cli = Cli::try_parse_from(["cagecv", "demo"]).unwrap();
        let Command::Demo(args) = cli.command else {
            panic!("expected demo");
        };
        assert_eq!(args.feature_counts, vec![5, 10, 20, 40]);
        assert_eq!(args.cv.split, SplitMode::Logo);
        assert_eq!(args.cv.workers, 1);
    }
}
