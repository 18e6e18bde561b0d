//! Fit and predict one fold.
//!
//! Given a fold over the uncensored population we:
//! - copy train, censored and test rows into fold-private feature views
//! - build a fresh model from the factory
//! - fit on train (+ censored context), predict the test rows
//! - pair each score with the sample's id, group and true outcome

use crate::domain::{Cohort, Fold, ModelParams, PredictionRecord, Sample};
use crate::error::CvError;
use crate::models::{FeatureView, ModelFactory};

/// Predictions of one successful fold.
#[derive(Debug, Clone, PartialEq)]
pub struct FoldOutput {
    pub fold: usize,
    pub test_groups: Vec<String>,
    pub records: Vec<PredictionRecord>,
}

/// Run a single fold with a model built just for it.
///
/// Model failures come back as `ModelFit` / `ModelPredict` so the caller can
/// skip the fold; an empty side is `InsufficientData`.
pub fn run_fold(
    cohort: &Cohort,
    fold: &Fold,
    factory: &dyn ModelFactory,
    params: &ModelParams,
) -> Result<FoldOutput, CvError> {
    if fold.train.is_empty() || fold.test.is_empty() {
        return Err(CvError::InsufficientData(format!(
            "fold {} has {} train and {} test samples",
            fold.index,
            fold.train.len(),
            fold.test.len()
        )));
    }

    let train_rows: Vec<&Sample> = fold.train.iter().map(|&i| &cohort.uncensored[i]).collect();
    let test_rows: Vec<&Sample> = fold.test.iter().map(|&i| &cohort.uncensored[i]).collect();
    let censored_rows: Vec<&Sample> = cohort.censored.iter().collect();

    let names = &cohort.feature_names;
    let train = FeatureView::with_outcomes(names, &train_rows);
    let censored = FeatureView::with_outcomes(names, &censored_rows);
    let test = FeatureView::features_only(names, &test_rows);

    let mut model = factory.build(params);
    model.fit(&train, &censored).map_err(|e| CvError::ModelFit {
        fold: fold.index,
        groups: fold.test_groups.clone(),
        message: e.to_string(),
    })?;

    let predict_err = |message: String| CvError::ModelPredict {
        fold: fold.index,
        groups: fold.test_groups.clone(),
        message,
    };
    let scores = model.predict(&test).map_err(|e| predict_err(e.to_string()))?;
    if scores.len() != test_rows.len() {
        return Err(predict_err(format!(
            "returned {} scores for {} test samples",
            scores.len(),
            test_rows.len()
        )));
    }
    if scores.iter().any(|s| !s.is_finite()) {
        return Err(predict_err("returned a non-finite score".to_string()));
    }

    let records = test_rows
        .iter()
        .zip(scores)
        .map(|(s, score)| PredictionRecord {
            sample_id: s.id.clone(),
            group: s.group.clone(),
            // Cohort::new guarantees uncensored outcomes are present.
            true_outcome: s.outcome.unwrap_or(f64::NAN),
            predicted_score: score,
            fold: fold.index,
        })
        .collect();

    Ok(FoldOutput {
        fold: fold.index,
        test_groups: fold.test_groups.clone(),
        records,
    })
}


#[cfg(test)]
mod tests {
    use super::test_models::{AlwaysFails, FirstFeature};
    use super::*;
    use crate::error::ModelError;
    use crate::models::SurvivalModel;
    use crate::split::leave_one_group_out;

    fn cohort() -> Cohort {
        let row = |id: &str, y: f64| Sample {
            id: id.to_string(),
            group: id.split('-').next().unwrap().to_string(),
            age: None,
            outcome: Some(y),
            features: vec![y * 10.0, 1.0],
        };
        let censored = vec![Sample {
            outcome: None,
            ..row("Z-1", 0.0)
        }];
        Cohort::new(
            vec!["f0".into(), "f1".into()],
            vec![row("A-1", 1.0), row("A-2", 2.0), row("B-1", 3.0)],
            censored,
        )
        .unwrap()
    }

    #[test]
    fn records_pair_scores_with_truth() {
        let c = cohort();
        let folds = leave_one_group_out(&c).unwrap();
        let factory = |_: &ModelParams| -> Box<dyn SurvivalModel> { Box::new(FirstFeature) };

        let out = run_fold(&c, &folds[0], &factory, &ModelParams::default()).unwrap();
        assert_eq!(out.fold, 0);
        assert_eq!(out.test_groups, vec!["A".to_string()]);
        let ids: Vec<&str> = out.records.iter().map(|r| r.sample_id.as_str()).collect();
        assert_eq!(ids, vec!["A-1", "A-2"]);
        assert_eq!(out.records[1].true_outcome, 2.0);
        assert_eq!(out.records[1].predicted_score, 20.0);
    }

    #[test]
    fn model_sees_only_features_and_fold_rows() {
        struct Inspect;
        impl SurvivalModel for Inspect {
            fn fit(&mut self, train: &FeatureView, censored: &FeatureView) -> Result<(), ModelError> {
                assert_eq!(train.n_rows(), 1);
                assert_eq!(train.n_features(), 2);
                assert_eq!(censored.n_rows(), 1);
                assert_eq!(censored.outcomes(), Some(&[None][..]));
                Ok(())
            }
            fn predict(&self, test: &FeatureView) -> Result<Vec<f64>, ModelError> {
                assert!(test.outcomes().is_none());
                Ok(vec![0.0; test.n_rows()])
            }
        }

        let c = cohort();
        let folds = leave_one_group_out(&c).unwrap();
        let factory = |_: &ModelParams| -> Box<dyn SurvivalModel> { Box::new(Inspect) };
        run_fold(&c, &folds[0], &factory, &ModelParams::default()).unwrap();
    }

    #[test]
    fn fit_failure_names_the_fold_and_groups() {
        let c = cohort();
        let folds = leave_one_group_out(&c).unwrap();
        let factory = |_: &ModelParams| -> Box<dyn SurvivalModel> { Box::new(AlwaysFails) };

        let err = run_fold(&c, &folds[1], &factory, &ModelParams::default()).unwrap_err();
        assert!(err.is_fold_local());
        match err {
            CvError::ModelFit { fold, groups, message } => {
                assert_eq!(fold, 1);
                assert_eq!(groups, vec!["B".to_string()]);
                assert!(message.contains("diverged"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn wrong_score_count_is_a_predict_failure() {
        struct Short;
        impl SurvivalModel for Short {
            fn fit(&mut self, _: &FeatureView, _: &FeatureView) -> Result<(), ModelError> {
                Ok(())
            }
            fn predict(&self, _: &FeatureView) -> Result<Vec<f64>, ModelError> {
                Ok(vec![1.0])
            }
        }

        let c = cohort();
        let folds = leave_one_group_out(&c).unwrap();
        let factory = |_: &ModelParams| -> Box<dyn SurvivalModel> { Box::new(Short) };
        let err = run_fold(&c, &folds[0], &factory, &ModelParams::default()).unwrap_err();
        assert!(matches!(err, CvError::ModelPredict { fold: 0, .. }));
    }

    #[test]
    fn factory_is_called_once_per_fold() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let built = AtomicUsize::new(0);
        let factory = |_: &ModelParams| -> Box<dyn SurvivalModel> {
            built.fetch_add(1, Ordering::SeqCst);
            Box::new(FirstFeature)
        };
        let c = cohort();
        for fold in leave_one_group_out(&c).unwrap() {
            run_fold(&c, &fold, &factory, &ModelParams::default()).unwrap();
        }
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }
}
