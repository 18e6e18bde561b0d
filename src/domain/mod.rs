//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - samples and cohorts (`Sample`, `Cohort`)
//! - split and model settings (`SplitSpec`, `ModelParams`, `RunConfig`)
//! - cross-validation outputs (`Fold`, `PredictionRecord`, `EvaluationResult`, etc.)

pub mod types;

pub use types::*;
