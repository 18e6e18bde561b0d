//! Configuration sweep: split, run folds, aggregate, evaluate, rank.
//!
//! Every configuration ends up in the report:
//! - scored configs carry pooled metrics plus per-fold statistics
//! - configs that could not be scored carry a `Failed` outcome and sort last
//!
//! Fold failures never end a configuration on their own; a config fails only
//! when nothing was predicted, the split was impossible, or the run was
//! cancelled.

use std::cmp::Ordering;
use std::time::Instant;

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::domain::{Cohort, ConfigOutcome, FailureStage, Fold, FoldFailure, RunConfig};
use crate::error::CvError;
use crate::eval::{evaluate, fold_stats};
use crate::fit::aggregate::{aggregate, PredictionTable};
use crate::fit::cancel::CancelToken;
use crate::fit::fold_runner::{run_fold, FoldOutput};
use crate::journal::{EventSink, SweepEvent};
use crate::models::ModelFactory;
use crate::split::make_folds;

/// Reason recorded for configs abandoned by cancellation.
pub const CANCELLED_REASON: &str = "cancelled";

/// How the folds of one configuration are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Execution {
    #[default]
    Sequential,
    /// Folds run on a bounded worker pool; results keep fold order.
    Parallel { workers: usize },
}

impl Execution {
    pub fn from_workers(workers: usize) -> Self {
        if workers > 1 {
            Execution::Parallel { workers }
        } else {
            Execution::Sequential
        }
    }
}

/// One row of the ranked report.
#[derive(Debug, Clone)]
pub struct SweepEntry {
    /// 1-based position after ranking.
    pub rank: usize,
    pub config: RunConfig,
    pub outcome: ConfigOutcome,
    pub folds_total: usize,
    pub folds_ok: usize,
    pub fold_failures: Vec<FoldFailure>,
    /// Present for scored configs.
    pub predictions: Option<PredictionTable>,
}

/// Ranked results of a sweep.
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub entries: Vec<SweepEntry>,
    pub cancelled: bool,
}

impl SweepReport {
    /// Highest-concordance scored entry.
    pub fn best(&self) -> Option<&SweepEntry> {
        self.entries.first().filter(|e| !e.outcome.is_failed())
    }

    pub fn scored_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.outcome.is_failed()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &SweepEntry> {
        self.entries.iter().filter(|e| e.outcome.is_failed())
    }

    pub fn entry(&self, label: &str) -> Option<&SweepEntry> {
        self.entries.iter().find(|e| e.config.label == label)
    }
}

/// Sweep orchestrator.
///
/// The factory is invoked once per fold; the sink receives progress and every
/// failure as it happens.
pub struct Sweep<'a> {
    factory: &'a dyn ModelFactory,
    sink: &'a dyn EventSink,
    execution: Execution,
    cancel: CancelToken,
}

impl<'a> Sweep<'a> {
    pub fn new(factory: &'a dyn ModelFactory, sink: &'a dyn EventSink) -> Self {
        Self {
            factory,
            sink,
            execution: Execution::Sequential,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_execution(mut self, execution: Execution) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run every configuration and rank the results.
    ///
    /// Only an unusable setup is an error (no configs, no uncensored samples,
    /// a worker pool that cannot start); everything else is reported per entry.
    pub fn run(&self, cohort: &Cohort, configs: &[RunConfig]) -> Result<SweepReport, CvError> {
        if configs.is_empty() {
            return Err(CvError::InvalidConfig("no configurations to run".to_string()));
        }
        if cohort.uncensored.is_empty() {
            return Err(CvError::InsufficientData("no uncensored samples".to_string()));
        }

        let pool = match self.execution {
            Execution::Sequential => None,
            Execution::Parallel { workers } => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .build()
                    .map_err(|e| CvError::InvalidConfig(format!("cannot start {workers} workers: {e}")))?,
            ),
        };

        let started = Instant::now();
        let mut entries: Vec<SweepEntry> = configs
            .iter()
            .map(|config| self.run_config(cohort, config, pool.as_ref()))
            .collect();

        rank_entries(&mut entries);

        let scored = entries.iter().filter(|e| !e.outcome.is_failed()).count();
        let best = entries.first().and_then(|e| {
            e.outcome
                .evaluation()
                .map(|ev| (e.config.label.clone(), ev.concordance_index))
        });
        self.sink.record(&SweepEvent::SweepFinished {
            scored,
            failed: entries.len() - scored,
            best,
            elapsed: started.elapsed(),
        });

        Ok(SweepReport {
            entries,
            cancelled: self.cancel.is_cancelled(),
        })
    }

    fn run_config(&self, cohort: &Cohort, config: &RunConfig, pool: Option<&ThreadPool>) -> SweepEntry {
        let mut entry = SweepEntry {
            rank: 0,
            config: config.clone(),
            outcome: ConfigOutcome::Failed {
                reason: String::new(),
            },
            folds_total: 0,
            folds_ok: 0,
            fold_failures: Vec::new(),
            predictions: None,
        };

        if let Err(err) = self.score_config(cohort, config, pool, &mut entry) {
            let reason = match err {
                CvError::Cancelled => CANCELLED_REASON.to_string(),
                other => other.to_string(),
            };
            self.sink.record(&SweepEvent::ConfigFailed {
                label: config.label.clone(),
                reason: reason.clone(),
            });
            entry.outcome = ConfigOutcome::Failed { reason };
            entry.predictions = None;
        }
        entry
    }

    fn score_config(
        &self,
        cohort: &Cohort,
        config: &RunConfig,
        pool: Option<&ThreadPool>,
        entry: &mut SweepEntry,
    ) -> Result<(), CvError> {
        if self.cancel.is_cancelled() {
            return Err(CvError::Cancelled);
        }
        self.factory
            .validate(&config.model)
            .map_err(|e| CvError::InvalidConfig(e.to_string()))?;

        let folds = make_folds(cohort, &config.split)?;
        entry.folds_total = folds.len();
        self.sink.record(&SweepEvent::ConfigStarted {
            label: config.label.clone(),
            folds: folds.len(),
        });

        let results = match pool {
            None => folds
                .iter()
                .map(|fold| self.guarded_fold(cohort, config, fold))
                .collect::<Vec<_>>(),
            // Indexed collect keeps fold order.
            Some(pool) => pool.install(|| {
                folds
                    .par_iter()
                    .map(|fold| self.guarded_fold(cohort, config, fold))
                    .collect::<Vec<_>>()
            }),
        };

        // A cancelled fold invalidates the whole config; no partial table.
        if results.iter().any(|r| matches!(r, Err(CvError::Cancelled))) {
            return Err(CvError::Cancelled);
        }

        let mut outputs: Vec<FoldOutput> = Vec::new();
        for (fold, result) in folds.iter().zip(results) {
            match result {
                Ok(out) => outputs.push(out),
                Err(err) if err.is_fold_local() => {
                    let failure = fold_failure(fold, &err);
                    self.sink.record(&SweepEvent::FoldFailed {
                        label: config.label.clone(),
                        failure: failure.clone(),
                    });
                    entry.fold_failures.push(failure);
                }
                Err(err) => return Err(err),
            }
        }
        entry.folds_ok = outputs.len();

        let per_fold: Vec<_> = outputs.into_iter().map(|o| o.records).collect();
        let stats = fold_stats(&per_fold);
        let table = aggregate(per_fold)?;
        let evaluation = evaluate(&table)?;

        self.sink.record(&SweepEvent::ConfigScored {
            label: config.label.clone(),
            folds_ok: entry.folds_ok,
            folds_total: entry.folds_total,
            evaluation,
        });
        entry.outcome = ConfigOutcome::Scored {
            evaluation,
            fold_stats: stats,
        };
        entry.predictions = Some(table);
        Ok(())
    }

    fn guarded_fold(&self, cohort: &Cohort, config: &RunConfig, fold: &Fold) -> Result<FoldOutput, CvError> {
        if self.cancel.is_cancelled() {
            return Err(CvError::Cancelled);
        }
        let out = run_fold(cohort, fold, self.factory, &config.model)?;
        self.sink.record(&SweepEvent::FoldFinished {
            label: config.label.clone(),
            fold: fold.index,
            test_groups: fold.test_groups.clone(),
            n_test: out.records.len(),
        });
        Ok(out)
    }
}

fn fold_failure(fold: &Fold, err: &CvError) -> FoldFailure {
    let (stage, message) = match err {
        CvError::ModelFit { message, .. } => (FailureStage::Fit, message.clone()),
        CvError::ModelPredict { message, .. } => (FailureStage::Predict, message.clone()),
        other => (FailureStage::Fit, other.to_string()),
    };
    FoldFailure {
        fold: fold.index,
        test_groups: fold.test_groups.clone(),
        stage,
        message,
    }
}

/// Concordance descending, failed configs last; stable for ties.
fn rank_entries(entries: &mut [SweepEntry]) {
    entries.sort_by(|a, b| match (a.outcome.evaluation(), b.outcome.evaluation()) {
        (Some(x), Some(y)) => y
            .concordance_index
            .partial_cmp(&x.concordance_index)
            .unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    for (i, e) in entries.iter_mut().enumerate() {
        e.rank = i + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ModelParams, Sample, SplitSpec};
    use crate::error::ModelError;
    use crate::fit::fold_runner::test_models::{AlwaysFails, FirstFeature};
    use crate::journal::MemorySink;
    use crate::models::{FeatureView, SurvivalModel};

    /// Five cages; feature 0 tracks the outcome, feature 1 is its mirror.
    fn cohort() -> Cohort {
        let mut uncensored = Vec::new();
        let mut k = 0.0;
        for cage in ["A", "B", "C", "D", "E"] {
            for m in 0..3 {
                k += 1.0;
                uncensored.push(Sample {
                    id: format!("{cage}-{m}"),
                    group: cage.to_string(),
                    age: None,
                    outcome: Some(k),
                    features: vec![k, -k],
                });
            }
        }
        Cohort::new(vec!["up".into(), "down".into()], uncensored, vec![]).unwrap()
    }

    /// Scores by the column given in `feature_count`; `Some(99)` always fails.
    fn factory(params: &ModelParams) -> Box<dyn SurvivalModel> {
        match params.feature_count {
            Some(99) => Box::new(AlwaysFails),
            Some(1) => Box::new(Column(1)),
            _ => Box::new(FirstFeature),
        }
    }

    struct Column(usize);

    impl SurvivalModel for Column {
        fn fit(&mut self, _: &FeatureView, _: &FeatureView) -> Result<(), ModelError> {
            Ok(())
        }
        fn predict(&self, test: &FeatureView) -> Result<Vec<f64>, ModelError> {
            Ok((0..test.n_rows()).map(|i| test.matrix()[(i, self.0)]).collect())
        }
    }

    fn configs(counts: &[usize]) -> Vec<RunConfig> {
        RunConfig::feature_sweep(&SplitSpec::logo(), &ModelParams::default(), counts)
    }

    #[test]
    fn failing_config_is_ranked_last_and_others_still_scored() {
        let sink = MemorySink::new();
        let report = Sweep::new(&factory, &sink)
            .run(&cohort(), &configs(&[1, 99, 0]))
            .unwrap();

        let labels: Vec<&str> = report.entries.iter().map(|e| e.config.label.as_str()).collect();
        assert_eq!(labels, vec!["k=0", "k=1", "k=99"]);

        let best = report.best().unwrap();
        assert_eq!(best.outcome.evaluation().unwrap().concordance_index, 1.0);
        assert_eq!(report.entries[1].outcome.evaluation().unwrap().concordance_index, 0.0);

        let failed = &report.entries[2];
        assert_eq!(failed.rank, 3);
        assert!(failed.outcome.is_failed());
        assert_eq!(failed.folds_total, 5);
        assert_eq!(failed.folds_ok, 0);
        assert_eq!(failed.fold_failures.len(), 5);
        assert!(failed.fold_failures.iter().all(|f| f.stage == FailureStage::Fit));
        assert!(failed.predictions.is_none());
        assert_eq!(report.scored_count(), 2);

        let events = sink.events();
        assert!(events
            .iter()
            .any(|e| matches!(e, SweepEvent::ConfigFailed { label, .. } if label == "k=99")));
        assert!(matches!(events.last(), Some(SweepEvent::SweepFinished { scored: 2, failed: 1, .. })));
    }

    #[test]
    fn logo_sweep_scores_every_sample_once() {
        let sink = MemorySink::new();
        let report = Sweep::new(&factory, &sink).run(&cohort(), &configs(&[0])).unwrap();
        let entry = report.entry("k=0").unwrap();
        let table = entry.predictions.as_ref().unwrap();
        let mut ids: Vec<&str> = table.records().iter().map(|r| r.sample_id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 15);
        assert_eq!(table.len(), 15);

        match &entry.outcome {
            ConfigOutcome::Scored { fold_stats, .. } => {
                assert_eq!(fold_stats.folds_scored, 5);
                assert_eq!(fold_stats.mean_concordance, 1.0);
                assert_eq!(fold_stats.std_concordance, 0.0);
            }
            other => panic!("expected a scored config, got {other:?}"),
        }
    }

    #[test]
    fn partial_fold_failures_do_not_fail_the_config() {
        // Fails only on the fold whose test set holds the largest outcome.
        struct Picky;
        impl SurvivalModel for Picky {
            fn fit(&mut self, _: &FeatureView, _: &FeatureView) -> Result<(), ModelError> {
                Ok(())
            }
            fn predict(&self, test: &FeatureView) -> Result<Vec<f64>, ModelError> {
                let col: Vec<f64> = (0..test.n_rows()).map(|i| test.matrix()[(i, 0)]).collect();
                if col.iter().any(|&v| v >= 15.0) {
                    return Err(ModelError::Other("refused".into()));
                }
                Ok(col)
            }
        }

        let sink = MemorySink::new();
        let picky = |_: &ModelParams| -> Box<dyn SurvivalModel> { Box::new(Picky) };
        let report = Sweep::new(&picky, &sink).run(&cohort(), &configs(&[3])).unwrap();
        let entry = &report.entries[0];

        assert!(!entry.outcome.is_failed());
        assert_eq!(entry.folds_ok, 4);
        assert_eq!(entry.fold_failures.len(), 1);
        assert_eq!(entry.fold_failures[0].stage, FailureStage::Predict);
        assert_eq!(entry.fold_failures[0].test_groups, vec!["E".to_string()]);
        assert_eq!(entry.predictions.as_ref().unwrap().len(), 12);
    }

    #[test]
    fn parallel_matches_sequential() {
        let c = cohort();
        let split = SplitSpec::holdout(0.6, 6, 7);
        let cfgs = RunConfig::feature_sweep(&split, &ModelParams::default(), &[0, 1]);
        let sink = MemorySink::new();

        let seq = Sweep::new(&factory, &sink).run(&c, &cfgs).unwrap();
        let par = Sweep::new(&factory, &sink)
            .with_execution(Execution::Parallel { workers: 3 })
            .run(&c, &cfgs)
            .unwrap();

        for (a, b) in seq.entries.iter().zip(&par.entries) {
            assert_eq!(a.config.label, b.config.label);
            assert_eq!(a.outcome, b.outcome);
            assert_eq!(a.predictions, b.predictions);
        }
    }

    #[test]
    fn cancelled_sweep_fails_every_config_without_output() {
        let token = CancelToken::new();
        token.cancel();
        let sink = MemorySink::new();
        let report = Sweep::new(&factory, &sink)
            .with_cancel(token)
            .run(&cohort(), &configs(&[0, 1]))
            .unwrap();

        assert!(report.cancelled);
        assert!(report.best().is_none());
        for e in &report.entries {
            assert_eq!(
                e.outcome,
                ConfigOutcome::Failed {
                    reason: CANCELLED_REASON.to_string()
                }
            );
            assert!(e.predictions.is_none());
        }
    }

    #[test]
    fn cancel_mid_sweep_abandons_current_and_later_configs() {
        // Trips the token while fitting the second fold of the first config.
        struct Tripwire(CancelToken);
        impl SurvivalModel for Tripwire {
            fn fit(&mut self, train: &FeatureView, _: &FeatureView) -> Result<(), ModelError> {
                if train.n_rows() == 12 && train.matrix()[(0, 0)] == 1.0 {
                    self.0.cancel();
                }
                Ok(())
            }
            fn predict(&self, test: &FeatureView) -> Result<Vec<f64>, ModelError> {
                Ok(vec![0.0; test.n_rows()])
            }
        }

        let token = CancelToken::new();
        let inner = token.clone();
        let factory = move |_: &ModelParams| -> Box<dyn SurvivalModel> {
            Box::new(Tripwire(inner.clone()))
        };
        let sink = MemorySink::new();
        let report = Sweep::new(&factory, &sink)
            .with_cancel(token)
            .run(&cohort(), &configs(&[0, 1]))
            .unwrap();

        assert_eq!(report.scored_count(), 0);
        assert!(report.entries.iter().all(|e| e.predictions.is_none()));
    }

    #[test]
    fn split_errors_fail_the_config_only() {
        let c = cohort();
        let mut cfgs = configs(&[0]);
        cfgs.push(RunConfig {
            label: "bad-split".into(),
            split: SplitSpec::holdout(1.5, 3, 0),
            model: ModelParams::default(),
        });
        let sink = MemorySink::new();
        let report = Sweep::new(&factory, &sink).run(&c, &cfgs).unwrap();
        assert_eq!(report.entries[0].config.label, "k=0");
        let bad = report.entry("bad-split").unwrap();
        match &bad.outcome {
            ConfigOutcome::Failed { reason } => assert!(reason.contains("train fraction")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn empty_inputs_are_errors() {
        let sink = MemorySink::new();
        let sweep = Sweep::new(&factory, &sink);
        assert!(matches!(sweep.run(&cohort(), &[]), Err(CvError::InvalidConfig(_))));
        let empty = Cohort::new(vec!["a".into()], vec![], vec![]).unwrap();
        assert!(matches!(
            sweep.run(&empty, &configs(&[0])),
            Err(CvError::InsufficientData(_))
        ));
    }
}
