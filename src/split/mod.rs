//! Group-aware train/test splitting.
//!
//! Responsibilities:
//!
//! - leave-one-group-out folds (one per cage, first-appearance order)
//! - seeded random group holdout folds
//! - the no-leakage postcondition shared by both

pub mod holdout;
pub mod logo;

pub use holdout::*;
pub use logo::*;

use std::collections::HashSet;

use crate::domain::{Cohort, Fold, SplitMode, SplitSpec};
use crate::error::CvError;

/// Build the folds described by `spec` over the uncensored population.
///
/// Every returned fold has passed [`check_no_leakage`].
pub fn make_folds(cohort: &Cohort, spec: &SplitSpec) -> Result<Vec<Fold>, CvError> {
    let folds = match spec.mode {
        SplitMode::Logo => leave_one_group_out(cohort)?,
        SplitMode::Holdout => group_holdout(cohort, spec.train_fraction, spec.repeats, spec.seed)?,
    };
    for fold in &folds {
        check_no_leakage(fold, cohort)?;
    }
    Ok(folds)
}

/// Fail with `GroupLeakage` if any group has samples on both sides of `fold`.
///
/// Groups are re-derived from the samples the indices point at, so a fold whose
/// group labels disagree with its indices is caught too.
pub fn check_no_leakage(fold: &Fold, cohort: &Cohort) -> Result<(), CvError> {
    let train: HashSet<&str> = fold
        .train
        .iter()
        .map(|&i| cohort.uncensored[i].group.as_str())
        .collect();
    for &i in &fold.test {
        let group = &cohort.uncensored[i].group;
        if train.contains(group.as_str()) {
            return Err(CvError::GroupLeakage {
                fold: fold.index,
                group: group.clone(),
            });
        }
    }
    Ok(())
}

/// Assemble a fold from the set of test groups. Indices keep input order.
pub(crate) fn fold_from_test_groups(cohort: &Cohort, index: usize, test_groups: &[String]) -> Fold {
    let is_test: HashSet<&str> = test_groups.iter().map(String::as_str).collect();

    let mut train = Vec::new();
    let mut test = Vec::new();
    let mut train_groups: Vec<String> = Vec::new();
    for (i, s) in cohort.uncensored.iter().enumerate() {
        if is_test.contains(s.group.as_str()) {
            test.push(i);
        } else {
            train.push(i);
            if !train_groups.contains(&s.group) {
                train_groups.push(s.group.clone());
            }
        }
    }

    Fold {
        index,
        train,
        test,
        train_groups,
        test_groups: test_groups.to_vec(),
    }
}

pub(crate) fn require_two_groups(groups: &[String]) -> Result<(), CvError> {
    if groups.len() < 2 {
        return Err(CvError::InsufficientData(format!(
            "need at least 2 distinct groups among uncensored samples, found {}",
            groups.len()
        )));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::test_support::cohort;
    use super::*;

    #[test]
    fn make_folds_dispatches_on_mode() {
        let c = cohort(&["A-1", "B-1", "C-1", "D-1"]);
        assert_eq!(make_folds(&c, &SplitSpec::logo()).unwrap().len(), 4);
        assert_eq!(make_folds(&c, &SplitSpec::holdout(0.5, 3, 1)).unwrap().len(), 3);
    }

    #[test]
    fn leakage_is_detected() {
        let c = cohort(&["A-1", "A-2", "B-1"]);
        let bad = Fold {
            index: 7,
            train: vec![0, 2],
            test: vec![1],
            train_groups: vec!["B".into()],
            test_groups: vec!["A".into()],
        };
        assert_eq!(
            check_no_leakage(&bad, &c).unwrap_err(),
            CvError::GroupLeakage {
                fold: 7,
                group: "A".into()
            }
        );
    }
}
