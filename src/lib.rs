//! MWD Copilot: Depth-Indexed Log Prediction
//!
//! Batch pipeline over measured-depth well logs: physics-derived ground
//! truth, leakage-free tree-ensemble predictions, and calibrated
//! confidence bands, with a data-quality report alongside.
//!
//! ## Architecture
//!
//! - **TargetComputer**: closed-form petrophysical targets (porosity,
//!   fluid class, pore pressure)
//! - **FeatureSelector / ModelManager**: causal feature isolation with
//!   graceful fallback, driving the GBT artifacts
//! - **ConfidenceEstimator**: ensemble-truncation variance turned into
//!   per-row confidence and interval bounds
//! - **DataQualityAssessor**: completeness and IQR outlier screening per
//!   channel and per feature group

pub mod config;
pub mod types;
pub mod loader;
pub mod targets;
pub mod features;
pub mod models;
pub mod confidence;
pub mod quality;
pub mod pipeline;
pub mod export;
pub mod demo;

// Re-export configuration
pub use config::{ConfigError, PipelineConfig};

// Re-export commonly used types
pub use types::{
    channels, FluidClass, LogTable, ModelReport, ModelStatus, PipelineRun, TableError,
    TargetKind, TargetReport,
};

// Re-export pipeline orchestration
pub use pipeline::{PipelineContext, PipelineError};

// Re-export feature isolation and model machinery
pub use features::{FeatureSelection, FeatureUnavailable};
pub use models::{GbtClassifier, GbtRegressor, LabelEncoder, ModelBundle, ModelError, ModelManager};

// Re-export estimation and quality
pub use confidence::{ConfidenceBands, ConfidenceEstimator};
pub use quality::{DataQualityAssessor, QualityReport};
