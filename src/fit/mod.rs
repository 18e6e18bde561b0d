//! Cross-validation orchestration.
//!
//! Responsibilities:
//!
//! - run a single fold against a freshly built model (`fold_runner`)
//! - concatenate fold predictions (`aggregate`)
//! - sweep configurations, rank them and record every failure (`sweep`)
//! - cooperative cancellation between folds (`cancel`)

pub mod aggregate;
pub mod cancel;
pub mod fold_runner;
pub mod sweep;

pub use aggregate::*;
pub use cancel::*;
pub use fold_runner::*;
pub use sweep::*;
