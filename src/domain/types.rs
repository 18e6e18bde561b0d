//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - used in-memory during cross-validation
//! - exported to JSON/CSV
//! - echoed back in run summaries

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::CvError;

/// Default separator between the cage prefix and the rest of a sample id
/// (`C12-M3` belongs to cage `C12`).
pub const DEFAULT_GROUP_SEPARATOR: char = '-';

/// Derive the group (cage) of a sample from its id.
///
/// Ids without the separator form a group of their own.
pub fn group_of(id: &str, separator: char) -> String {
    id.split(separator).next().unwrap_or(id).to_string()
}

/// One animal observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub id: String,
    /// Cage / litter identifier; the unit of train/test assignment.
    pub group: String,
    /// Filter-only attribute (e.g. age in months). Never a model feature.
    pub age: Option<String>,
    /// Ground truth (`diff`). Always present for uncensored samples.
    pub outcome: Option<f64>,
    pub features: Vec<f64>,
}

/// The two sample populations of an experiment.
///
/// Uncensored samples have a known outcome and are the only ones ever placed in
/// a test set. Censored samples are auxiliary training context.
#[derive(Debug, Clone)]
pub struct Cohort {
    pub feature_names: Vec<String>,
    pub uncensored: Vec<Sample>,
    pub censored: Vec<Sample>,
}

impl Cohort {
    /// Build a cohort, checking the shape invariants the splitter and runner rely on.
    pub fn new(
        feature_names: Vec<String>,
        uncensored: Vec<Sample>,
        censored: Vec<Sample>,
    ) -> Result<Self, CvError> {
        let p = feature_names.len();
        for s in uncensored.iter().chain(censored.iter()) {
            if s.features.len() != p {
                return Err(CvError::InvalidConfig(format!(
                    "sample '{}' has {} features, expected {p}",
                    s.id,
                    s.features.len()
                )));
            }
        }
        if let Some(s) = uncensored
            .iter()
            .find(|s| !s.outcome.is_some_and(f64::is_finite))
        {
            return Err(CvError::InvalidConfig(format!(
                "uncensored sample '{}' has no finite outcome",
                s.id
            )));
        }
        if let Some(s) = censored
            .iter()
            .find(|c| uncensored.iter().any(|u| u.id == c.id))
        {
            return Err(CvError::InvalidConfig(format!(
                "sample '{}' is both censored and uncensored",
                s.id
            )));
        }

        Ok(Self {
            feature_names,
            uncensored,
            censored,
        })
    }

    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    /// Distinct uncensored groups in first-appearance order.
    pub fn groups(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for s in &self.uncensored {
            if !out.contains(&s.group) {
                out.push(s.group.clone());
            }
        }
        out
    }
}

/// How the uncensored population is split into folds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    /// One fold per cage; that cage is the test set.
    Logo,
    /// Repeated random group shuffle split at a fixed train fraction.
    Holdout,
}

impl SplitMode {
    pub fn display_name(self) -> &'static str {
        match self {
            SplitMode::Logo => "leave-one-group-out",
            SplitMode::Holdout => "random group holdout",
        }
    }
}

/// Splitter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitSpec {
    pub mode: SplitMode,
    /// Fraction of groups (not samples) assigned to train in holdout mode.
    pub train_fraction: f64,
    /// Number of holdout folds.
    pub repeats: usize,
    /// Holdout shuffle seed. Reuse it across a sweep so configs see the same folds.
    pub seed: u64,
}

impl SplitSpec {
    pub fn logo() -> Self {
        Self {
            mode: SplitMode::Logo,
            train_fraction: 0.7,
            repeats: 1,
            seed: 42,
        }
    }

    pub fn holdout(train_fraction: f64, repeats: usize, seed: u64) -> Self {
        Self {
            mode: SplitMode::Holdout,
            train_fraction,
            repeats,
            seed,
        }
    }
}

/// Parameters handed to the model factory for every fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Number of features kept by feature selection (`None` keeps all).
    pub feature_count: Option<usize>,
    /// Ridge penalty.
    pub alpha: f64,
    /// Weight of censored rows with a known outcome (0 disables them).
    pub censored_weight: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            feature_count: None,
            alpha: 0.001,
            censored_weight: 0.5,
        }
    }
}

/// One point of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub label: String,
    pub split: SplitSpec,
    pub model: ModelParams,
}

impl RunConfig {
    /// One config per feature count, sharing split and remaining model settings.
    pub fn feature_sweep(split: &SplitSpec, base: &ModelParams, counts: &[usize]) -> Vec<RunConfig> {
        counts
            .iter()
            .map(|&k| RunConfig {
                label: format!("k={k}"),
                split: split.clone(),
                model: ModelParams {
                    feature_count: Some(k),
                    ..base.clone()
                },
            })
            .collect()
    }
}

/// A train/test partition of the uncensored population.
///
/// Indices point into `Cohort::uncensored` and keep input order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fold {
    pub index: usize,
    pub train: Vec<usize>,
    pub test: Vec<usize>,
    pub train_groups: Vec<String>,
    pub test_groups: Vec<String>,
}

/// One out-of-fold prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub sample_id: String,
    pub group: String,
    pub true_outcome: f64,
    pub predicted_score: f64,
    pub fold: usize,
}

/// Metrics over an aggregated prediction table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub n_samples: usize,
    pub concordance_index: f64,
    pub spearman_corr: f64,
    pub spearman_pvalue: f64,
    pub pearson_corr: f64,
    pub pearson_pvalue: f64,
}

/// Spread of the per-fold scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FoldStats {
    pub folds_scored: usize,
    pub mean_concordance: f64,
    pub std_concordance: f64,
    pub mean_spearman: f64,
    pub mean_pearson: f64,
}

/// Which model call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Fit,
    Predict,
}

/// A fold that was skipped because the model failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldFailure {
    pub fold: usize,
    pub test_groups: Vec<String>,
    pub stage: FailureStage,
    pub message: String,
}

/// Final state of one configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ConfigOutcome {
    Scored {
        evaluation: EvaluationResult,
        fold_stats: FoldStats,
    },
    Failed {
        reason: String,
    },
}

impl ConfigOutcome {
    pub fn evaluation(&self) -> Option<&EvaluationResult> {
        match self {
            ConfigOutcome::Scored { evaluation, .. } => Some(evaluation),
            ConfigOutcome::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ConfigOutcome::Failed { .. })
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults) and echoed into the summary JSON.
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentConfig {
    pub source: DataSource,
    pub age_filter: Option<String>,
    pub outcome_column: Option<String>,
    pub age_column: Option<String>,
    pub group_separator: char,
    pub exclude_columns: Vec<String>,

    pub split: SplitSpec,
    pub model: ModelParams,
    /// Feature counts to sweep; a single-config run has one entry.
    pub feature_counts: Vec<Option<usize>>,

    pub workers: usize,
    pub timeout_secs: Option<u64>,

    pub out_dir: Option<PathBuf>,
    pub top_n: usize,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
}

impl ExperimentConfig {
    /// Expand the feature counts into sweep configs.
    pub fn run_configs(&self) -> Vec<RunConfig> {
        self.feature_counts
            .iter()
            .map(|k| RunConfig {
                label: match k {
                    Some(k) => format!("k={k}"),
                    None => "k=all".to_string(),
                },
                split: self.split.clone(),
                model: ModelParams {
                    feature_count: *k,
                    ..self.model.clone()
                },
            })
            .collect()
    }
}

/// Where the cohort comes from.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DataSource {
    Csv {
        uncensored: PathBuf,
        censored: PathBuf,
    },
    Synthetic {
        seed: u64,
        cages: usize,
        per_cage: usize,
        features: usize,
    },
}
