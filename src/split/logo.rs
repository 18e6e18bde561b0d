//! Leave-one-group-out.

use crate::domain::{Cohort, Fold};
use crate::error::CvError;
use crate::split::{fold_from_test_groups, require_two_groups};

/// One fold per distinct group; that group's samples are the test set.
///
/// Folds follow group first-appearance order, so the union of the test sets is
/// the uncensored population exactly once.
pub fn leave_one_group_out(cohort: &Cohort) -> Result<Vec<Fold>, CvError> {
    let groups = cohort.groups();
    require_two_groups(&groups)?;

    Ok(groups
        .into_iter()
        .enumerate()
        .map(|(index, group)| fold_from_test_groups(cohort, index, &[group]))
        .collect())
}
