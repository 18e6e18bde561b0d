//! Pairwise concordance index.
//!
//! Every unordered pair with distinct true values is eligible. A pair scores 1
//! when the predictions order it the same way as the truth and 0.5 when the
//! predictions tie. With no eligible pair the index is the uninformative 0.5.
//!
//! This is a plain O(n²) loop: folds hold tens to low hundreds of samples and
//! the exact tie semantics matter more than speed.

use std::cmp::Ordering;

use crate::error::CvError;

/// Index returned when no pair has distinct true values.
pub const UNINFORMATIVE_CONCORDANCE: f64 = 0.5;

/// Concordance between true outcomes and predicted scores, in `[0, 1]`.
pub fn concordance_index(y_true: &[f64], y_pred: &[f64]) -> Result<f64, CvError> {
    if y_true.len() != y_pred.len() {
        return Err(CvError::LengthMismatch {
            left: y_true.len(),
            right: y_pred.len(),
        });
    }

    let n = y_true.len();
    let mut count = 0usize;
    let mut correct = 0.0_f64;

    for i in 0..n {
        for j in (i + 1)..n {
            let truth = match y_true[i].partial_cmp(&y_true[j]) {
                Some(Ordering::Equal) | None => continue,
                Some(ord) => ord,
            };
            count += 1;

            if y_pred[i] == y_pred[j] {
                correct += 0.5;
            } else if y_pred[i].partial_cmp(&y_pred[j]) == Some(truth) {
                correct += 1.0;
            }
        }
    }

    if count == 0 {
        return Ok(UNINFORMATIVE_CONCORDANCE);
    }
    Ok(correct / count as f64)
}
