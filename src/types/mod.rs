//! Shared types for the prediction pipeline
//!
//! Submodules:
//! - `channels`: canonical channel mnemonics and prediction column naming
//! - `fluid`: the fixed three-label fluid classification domain
//! - `table`: the validated depth-indexed log table
//! - `report`: run-level report types (targets, models, pipeline run)

pub mod channels;
pub mod fluid;
pub mod report;
pub mod table;

pub use fluid::FluidClass;
pub use report::{
    ModelReport, ModelStatus, PipelineRun, TargetKind, TargetOutcome, TargetReport,
};
pub use table::{LogTable, TableError};
