//! Survival model capability and the bundled ridge ranker.
//!
//! The cross-validation core depends only on the traits in `model`; `ridge` is
//! one concrete implementation used by the CLI.

pub mod model;
pub mod ridge;

pub use model::*;
pub use ridge::*;
