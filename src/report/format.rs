//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the sweep/evaluation code stays clean and testable
//! - output changes are localized

use crate::domain::{ConfigOutcome, DataSource, ExperimentConfig, FailureStage, SplitMode};
use crate::fit::{PredictionTable, SweepReport};
use crate::io::IngestStats;

/// Format the run header (data source, cohort counts, split and model settings).
pub fn format_run_header(config: &ExperimentConfig, stats: Option<&IngestStats>) -> String {
    let mut out = String::new();

    out.push_str("=== cagecv - grouped cross-validation ===\n");
    match &config.source {
        DataSource::Csv { uncensored, censored } => {
            out.push_str(&format!("Uncensored: {}\n", uncensored.display()));
            out.push_str(&format!("Censored  : {}\n", censored.display()));
        }
        DataSource::Synthetic {
            seed,
            cages,
            per_cage,
            features,
        } => {
            out.push_str(&format!(
                "Synthetic: seed={seed} | cages={cages} | mice/cage={per_cage} | features={features}\n"
            ));
        }
    }
    if let Some(age) = &config.age_filter {
        out.push_str(&format!("Age filter: {age}\n"));
    }
    if let Some(s) = stats {
        out.push_str(&format!(
            "Samples: uncensored={} (read {}, age-filtered {}, no outcome {}) | censored={} (read {})\n",
            s.uncensored_used,
            s.uncensored_rows_read,
            s.filtered_by_age,
            s.dropped_missing_outcome,
            s.censored_used,
            s.censored_rows_read,
        ));
        out.push_str(&format!("Groups: {} | features: {}\n", s.groups, s.feature_count));
        if !s.dropped_columns.is_empty() {
            out.push_str(&format!("Dropped non-numeric columns: {}\n", s.dropped_columns.join(", ")));
        }
    }

    let split = &config.split;
    match split.mode {
        SplitMode::Logo => out.push_str(&format!("Split: {}\n", split.mode.display_name())),
        SplitMode::Holdout => out.push_str(&format!(
            "Split: {} | train fraction={:.2} | repeats={} | seed={}\n",
            split.mode.display_name(),
            split.train_fraction,
            split.repeats,
            split.seed
        )),
    }
    out.push_str(&format!(
        "Model: ridge | alpha={} | censored weight={}\n",
        config.model.alpha, config.model.censored_weight
    ));
    out.push('\n');

    out
}

/// Format the ranked sweep table, the failure list and the best configuration.
pub fn format_sweep_summary(report: &SweepReport) -> String {
    let mut out = String::new();

    out.push_str(
        format!(
            "{:>4} {:<12} {:>5} {:>7} {:>5} {:>7} {:>19} {:>19} {:>15}\n",
            "rank", "config", "k", "folds", "n", "CI", "spearman (p)", "pearson (p)", "fold CI"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:->4} {:-<12} {:->5} {:->7} {:->5} {:->7} {:->19} {:->19} {:->15}\n",
            "", "", "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for entry in &report.entries {
        let k = entry
            .config
            .model
            .feature_count
            .map(|k| k.to_string())
            .unwrap_or_else(|| "all".to_string());
        let folds = format!("{}/{}", entry.folds_ok, entry.folds_total);

        let line = match &entry.outcome {
            ConfigOutcome::Scored {
                evaluation: e,
                fold_stats: s,
            } => format!(
                "{:>4} {:<12} {:>5} {:>7} {:>5} {:>7.4} {:>19} {:>19} {:>15}\n",
                entry.rank,
                truncate(&entry.config.label, 12),
                k,
                folds,
                e.n_samples,
                e.concordance_index,
                fmt_corr(e.spearman_corr, e.spearman_pvalue),
                fmt_corr(e.pearson_corr, e.pearson_pvalue),
                format!("{:.3} ± {:.3}", s.mean_concordance, s.std_concordance),
            ),
            ConfigOutcome::Failed { reason } => format!(
                "{:>4} {:<12} {:>5} {:>7} failed: {}\n",
                entry.rank,
                truncate(&entry.config.label, 12),
                k,
                folds,
                truncate(reason, 60),
            ),
        };
        out.push_str(line.trim_end());
        out.push('\n');
    }

    let fold_failures: Vec<_> = report
        .entries
        .iter()
        .flat_map(|e| e.fold_failures.iter().map(move |f| (&e.config.label, f)))
        .collect();
    if !fold_failures.is_empty() {
        out.push_str("\nSkipped folds:\n");
        for (label, f) in fold_failures {
            let stage = match f.stage {
                FailureStage::Fit => "fit",
                FailureStage::Predict => "predict",
            };
            out.push_str(&format!(
                "- {label} fold {} [{}] {stage}: {}\n",
                f.fold,
                f.test_groups.join(", "),
                f.message
            ));
        }
    }

    out.push('\n');
    if report.cancelled {
        out.push_str("Sweep cancelled before all configurations finished.\n");
    }
    match report.best() {
        Some(best) => {
            let ci = best
                .outcome
                .evaluation()
                .map(|e| e.concordance_index)
                .unwrap_or_default();
            out.push_str(&format!(
                "Best: {} (concordance {ci:.4}, {} of {} configs scored)\n",
                best.config.label,
                report.scored_count(),
                report.entries.len()
            ));
        }
        None => out.push_str("Best: none (no configuration could be scored)\n"),
    }

    out
}

/// Per-sample prediction table, highest predicted score first.
pub fn format_predictions(table: &PredictionTable, top: usize) -> String {
    let mut rows: Vec<_> = table.records().iter().collect();
    rows.sort_by(|a, b| {
        b.predicted_score
            .partial_cmp(&a.predicted_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut out = String::new();
    out.push_str(&format!("Top {} of {} predictions:\n", top.min(rows.len()), rows.len()));
    out.push_str(
        format!(
            "{:<24} {:<10} {:>5} {:>12} {:>12}\n",
            "id", "group", "fold", "true", "predicted"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<24} {:-<10} {:->5} {:->12} {:->12}\n",
            "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for r in rows.into_iter().take(top) {
        out.push_str(
            format!(
                "{:<24} {:<10} {:>5} {:>12.2} {:>12.4}\n",
                truncate(&r.sample_id, 24),
                truncate(&r.group, 10),
                r.fold,
                r.true_outcome,
                r.predicted_score,
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn fmt_corr(r: f64, p: f64) -> String {
    format!("{r:.3} ({p:.1e})")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ModelParams, RunConfig, SplitSpec};
    use crate::fit::fold_runner::test_models::FirstFeature;
    use crate::fit::Sweep;
    use crate::journal::MemorySink;
    use crate::models::SurvivalModel;
    use crate::split::test_support::cohort;

    fn report() -> SweepReport {
        let c = cohort(&["A-1", "A-2", "B-1", "B-2", "C-1", "C-2"]);
        let good = RunConfig {
            label: "k=all".to_string(),
            split: SplitSpec::logo(),
            model: ModelParams::default(),
        };
        let bad = RunConfig {
            label: "broken".to_string(),
            split: SplitSpec::holdout(1.5, 3, 1),
            model: ModelParams::default(),
        };
        let factory = |_: &ModelParams| -> Box<dyn SurvivalModel> { Box::new(FirstFeature) };
        let sink = MemorySink::new();
        Sweep::new(&factory, &sink).run(&c, &[bad, good]).unwrap()
    }

    #[test]
    fn summary_lists_scored_before_failed() {
        let txt = format_sweep_summary(&report());
        let lines: Vec<&str> = txt.lines().collect();

        assert!(lines[0].starts_with("rank config"));
        assert!(lines[2].starts_with("   1 k=all"));
        assert!(lines[2].contains("3/3"));
        assert!(lines[2].contains("1.0000"));
        assert!(lines[3].starts_with("   2 broken"));
        assert!(lines[3].contains("failed:"));
        assert!(txt.contains("Best: k=all (concordance 1.0000, 1 of 2 configs scored)"));
    }

    #[test]
    fn summary_without_scored_configs() {
        let report = SweepReport {
            entries: vec![],
            cancelled: true,
        };
        let txt = format_sweep_summary(&report);
        assert!(txt.contains("Sweep cancelled"));
        assert!(txt.contains("Best: none"));
    }

    #[test]
    fn predictions_sorted_by_score_and_limited() {
        let r = report();
        let table = r.best().unwrap().predictions.as_ref().unwrap();
        let txt = format_predictions(table, 2);
        let lines: Vec<&str> = txt.lines().collect();

        assert_eq!(lines[0], "Top 2 of 6 predictions:");
        assert_eq!(lines.len(), 5);
        assert!(lines[3].starts_with("C-2"));
        assert!(lines[4].starts_with("C-1"));
    }

    #[test]
    fn header_mentions_holdout_settings() {
        let config = ExperimentConfig {
            source: DataSource::Synthetic {
                seed: 3,
                cages: 8,
                per_cage: 4,
                features: 20,
            },
            age_filter: Some("12".into()),
            outcome_column: None,
            age_column: None,
            group_separator: '-',
            exclude_columns: vec![],
            split: SplitSpec::holdout(0.7, 10, 42),
            model: ModelParams::default(),
            feature_counts: vec![None],
            workers: 1,
            timeout_secs: None,
            out_dir: None,
            top_n: 10,
            plot: false,
            plot_width: 60,
            plot_height: 20,
        };
        let txt = format_run_header(&config, None);
        assert!(txt.contains("Synthetic: seed=3 | cages=8"));
        assert!(txt.contains("Age filter: 12"));
        assert!(txt.contains("random group holdout | train fraction=0.70 | repeats=10 | seed=42"));
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
