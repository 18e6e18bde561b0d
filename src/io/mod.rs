//! Input/output helpers.
//!
//! - cohort CSV ingest + validation (`ingest`)
//! - prediction and summary CSV exports (`export`)
//! - run summary JSON (`summary`)

pub mod export;
pub mod ingest;
pub mod summary;

pub use export::*;
pub use ingest::*;
pub use summary::*;
