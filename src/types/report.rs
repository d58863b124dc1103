//! Run-level report types shared across pipeline stages

use crate::quality::QualityReport;
use crate::types::table::LogTable;
use chrono::{DateTime, Utc};
use serde::Serialize;

// ============================================================================
// Target Kinds
// ============================================================================

/// The three derived targets the pipeline knows about.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Porosity,
    Fluid,
    PorePressure,
}

impl TargetKind {
    /// Short name used in logs and model reports
    pub fn name(&self) -> &'static str {
        match self {
            TargetKind::Porosity => "porosity",
            TargetKind::Fluid => "fluid",
            TargetKind::PorePressure => "pore_pressure",
        }
    }

    /// Output column the target derivation writes
    pub fn output_column(&self) -> &'static str {
        match self {
            TargetKind::Porosity => super::channels::PHI_COMBINED,
            TargetKind::Fluid => super::channels::FLUID_CLASS,
            TargetKind::PorePressure => super::channels::PORE_PRESSURE_PSI,
        }
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Target Derivation Report
// ============================================================================

/// Per-target derivation statistics.
#[derive(Debug, Clone, Serialize)]
pub struct TargetOutcome {
    pub target: TargetKind,
    /// Output column name (fixed per target)
    pub column: String,
    /// True when the column already existed and derivation was skipped
    pub skipped_existing: bool,
    /// Rows where the formula produced a value
    pub computed_rows: usize,
    /// Rows left missing because a required input was missing
    pub missing_rows: usize,
    /// Rows whose raw result fell outside the physical range and was clipped
    pub clipped_rows: usize,
}

/// Summary of one TargetComputer pass over a table.
#[derive(Debug, Clone, Serialize, Default)]
pub struct TargetReport {
    pub outcomes: Vec<TargetOutcome>,
}

impl TargetReport {
    /// Outcome for one target, if it was visited.
    pub fn outcome(&self, target: TargetKind) -> Option<&TargetOutcome> {
        self.outcomes.iter().find(|o| o.target == target)
    }

    /// True when every visited target was skipped as already present.
    pub fn all_skipped(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(|o| o.skipped_existing)
    }
}

// ============================================================================
// Model Reports
// ============================================================================

/// How a model's feature resolution ended up.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum ModelStatus {
    /// Full requested feature set was usable
    Full,
    /// Degraded to the minimal fallback set
    Degraded,
    /// Even the fallback was incomplete; ran on the usable intersection
    Partial,
    /// No usable features (or a hard-required channel missing): predictions withheld
    Withheld,
}

impl std::fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelStatus::Full => write!(f, "full"),
            ModelStatus::Degraded => write!(f, "degraded"),
            ModelStatus::Partial => write!(f, "partial"),
            ModelStatus::Withheld => write!(f, "withheld"),
        }
    }
}

/// Record of one predictor invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ModelReport {
    pub target: TargetKind,
    pub status: ModelStatus,
    /// Channels the predictor actually consumed
    pub features_used: Vec<String>,
    /// Channels that were requested (or required) but not usable
    pub missing_channels: Vec<String>,
    /// Rows that received a prediction
    pub predicted_rows: usize,
}

// ============================================================================
// Pipeline Run
// ============================================================================

/// Everything one pipeline invocation produced: the augmented table plus the
/// advisory reports from each stage.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub table: LogTable,
    pub targets: TargetReport,
    pub models: Vec<ModelReport>,
    pub quality: QualityReport,
    pub completed_at: DateTime<Utc>,
}

impl PipelineRun {
    /// Model report for one target, if that predictor ran.
    pub fn model_report(&self, target: TargetKind) -> Option<&ModelReport> {
        self.models.iter().find(|m| m.target == target)
    }
}
