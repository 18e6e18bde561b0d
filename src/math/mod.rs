//! Mathematical utilities: least squares, ranks, correlation and p-values.

pub mod correlation;
pub mod ols;
pub mod pvalue;
pub mod rank;

pub use correlation::*;
pub use ols::*;
pub use pvalue::*;
pub use rank::*;
