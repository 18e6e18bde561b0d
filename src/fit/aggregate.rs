//! Concatenation of per-fold predictions.

use crate::domain::PredictionRecord;
use crate::error::CvError;

/// Out-of-fold predictions of one configuration, in fold order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionTable {
    records: Vec<PredictionRecord>,
}

impl PredictionTable {
    pub fn from_records(records: Vec<PredictionRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[PredictionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// `(true outcomes, predicted scores)` in row order.
    pub fn columns(&self) -> (Vec<f64>, Vec<f64>) {
        self.records
            .iter()
            .map(|r| (r.true_outcome, r.predicted_score))
            .unzip()
    }
}

/// Concatenate fold results without dedup or reordering.
///
/// Fails with `EmptyAggregation` when no fold contributed a record.
pub fn aggregate<I>(fold_results: I) -> Result<PredictionTable, CvError>
where
    I: IntoIterator<Item = Vec<PredictionRecord>>,
{
    let records: Vec<PredictionRecord> = fold_results.into_iter().flatten().collect();
    if records.is_empty() {
        return Err(CvError::EmptyAggregation);
    }
    Ok(PredictionTable { records })
}
