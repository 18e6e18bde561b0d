//! Reporting utilities: formatted terminal output for runs and sweeps.

pub mod format;

pub use format::*;
