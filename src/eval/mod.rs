//! Prediction scoring.
//!
//! - pairwise concordance index with exact tie semantics (`concordance`)
//! - aggregated metrics and per-fold summaries (`evaluator`)

pub mod concordance;
pub mod evaluator;

pub use concordance::*;
pub use evaluator::*;
