//! Repeated random group holdout.
//!
//! The train fraction applies to the number of groups, not samples. One `StdRng`
//! is seeded per call and drives every repeat, so the same seed always yields
//! the same sequence of folds.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::domain::{Cohort, Fold};
use crate::error::CvError;
use crate::split::{fold_from_test_groups, require_two_groups};

/// `repeats` folds, each holding out a random subset of groups.
pub fn group_holdout(
    cohort: &Cohort,
    train_fraction: f64,
    repeats: usize,
    seed: u64,
) -> Result<Vec<Fold>, CvError> {
    if !(train_fraction.is_finite() && train_fraction > 0.0 && train_fraction < 1.0) {
        return Err(CvError::InvalidConfig(format!(
            "train fraction must be in (0, 1), got {train_fraction}"
        )));
    }
    if repeats == 0 {
        return Err(CvError::InvalidConfig("holdout repeats must be >= 1".to_string()));
    }

    let groups = cohort.groups();
    require_two_groups(&groups)?;
    let n_train = train_group_count(groups.len(), train_fraction);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut folds = Vec::with_capacity(repeats);
    for index in 0..repeats {
        let mut shuffled = groups.clone();
        shuffled.shuffle(&mut rng);
        let mut test_groups = shuffled.split_off(n_train);
        // Report test groups in first-appearance order for readable logs.
        test_groups.sort_by_key(|g| groups.iter().position(|x| x == g));
        folds.push(fold_from_test_groups(cohort, index, &test_groups));
    }
    Ok(folds)
}

/// `floor(f * n)` clamped so that both sides keep at least one group.
fn train_group_count(n_groups: usize, train_fraction: f64) -> usize {
    let raw = (train_fraction * n_groups as f64).floor() as usize;
    raw.clamp(1, n_groups - 1)
}
