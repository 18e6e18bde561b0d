//! `cagecv` library crate.
//!
//! The binary (`cagecv`) is a thin wrapper around this library so that:
//!
//! - the cross-validation core is testable without spawning processes
//! - other front-ends can plug in their own `SurvivalModel` and `EventSink`
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod eval;
pub mod fit;
pub mod io;
pub mod journal;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod split;
