//! Data sources that are not files on disk.

pub mod synthetic;

pub use synthetic::*;
