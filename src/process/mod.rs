// src/process/mod.rs
//! Row-level validation of raw trip tables.

pub mod clean;
pub mod columns;
pub mod report;

pub use clean::{clean, CleanError};
pub use report::{CleaningReport, Stage, StageRemoval};
