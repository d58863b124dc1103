//! Pipeline orchestration.
//!
//! A [`PipelineContext`] is built once from config and a loaded model
//! bundle and then passed by reference into every run — never a hidden
//! singleton. Construction is the only fallible step; a run itself is a
//! total function over a validated [`LogTable`]: per-row problems become
//! missing values, per-model problems become withheld predictions, and
//! the run always completes with a full report.
//!
//! Stage order per run:
//!
//! 1. data quality over the raw table (before any derived column exists)
//! 2. target derivation (porosity, fluid class, pore pressure)
//! 3. feature-isolated predictions plus confidence bands per target

use std::path::Path;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ConfigError, PipelineConfig};
use crate::confidence::{ConfidenceBands, ConfidenceError, ConfidenceEstimator};
use crate::models::{
    ClassificationOutput, GbtRegressor, ModelBundle, ModelError, ModelManager, RegressionOutput,
};
use crate::quality::{DataQualityAssessor, FeatureGroup};
use crate::targets::TargetComputer;
use crate::types::{channels, LogTable, ModelReport, PipelineRun, TargetKind};

// ============================================================================
// Errors
// ============================================================================

/// Failures that can occur while assembling a context. Once a context
/// exists, runs cannot fail.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Confidence(#[from] ConfidenceError),
}

// ============================================================================
// Context
// ============================================================================

/// Immutable bundle of everything a run needs.
pub struct PipelineContext {
    config: PipelineConfig,
    targets: TargetComputer,
    manager: ModelManager,
    confidence: ConfidenceEstimator,
    quality: DataQualityAssessor,
    groups: Vec<FeatureGroup>,
}

impl PipelineContext {
    /// Assemble a context from an already-validated config and bundle.
    pub fn new(config: PipelineConfig, bundle: ModelBundle) -> Result<Self, PipelineError> {
        let targets = TargetComputer::new(&config);
        let manager = ModelManager::new(bundle, config.features.clone());
        let confidence = ConfidenceEstimator::new(config.confidence.interval_level)?;
        let quality = DataQualityAssessor::new(&config.quality);
        let groups = FeatureGroup::from_features(&config.features);
        Ok(Self {
            config,
            targets,
            manager,
            confidence,
            quality,
            groups,
        })
    }

    /// Load config and models from disk and assemble a context.
    ///
    /// With no explicit config path the usual search order applies
    /// (environment variable, local file, defaults).
    pub fn from_paths(config: Option<&Path>, models: &Path) -> Result<Self, PipelineError> {
        let config = match config {
            Some(path) => PipelineConfig::load_from_file(path)?,
            None => PipelineConfig::load(),
        };
        let bundle = ModelBundle::load(models)?;
        Self::new(config, bundle)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The model manager, exposed for explainers that want the raw
    /// ensembles and feature frames.
    pub fn manager(&self) -> &ModelManager {
        &self.manager
    }

    /// Full run: quality, targets, predictions, confidence bands.
    pub fn run(&self, table: LogTable) -> PipelineRun {
        info!(
            rows = table.row_count(),
            channels = table.channel_names().count(),
            "pipeline run started"
        );

        let quality = self.quality.assess(&table, &self.groups);

        let mut table = table;
        let targets = self.targets.compute_all(&mut table);

        let mut models = Vec::with_capacity(3);

        let porosity = self.manager.predict_porosity(&table);
        models.push(self.attach_regression(
            &mut table,
            TargetKind::Porosity,
            &self.manager.bundle().porosity,
            porosity,
        ));

        let fluid = self.manager.predict_fluid(&table);
        models.push(self.attach_classification(&mut table, fluid));

        let pressure = self.manager.predict_pressure(&table);
        models.push(self.attach_regression(
            &mut table,
            TargetKind::PorePressure,
            &self.manager.bundle().pressure,
            pressure,
        ));

        info!(rows = table.row_count(), "pipeline run complete");
        PipelineRun {
            table,
            targets,
            models,
            quality,
            completed_at: Utc::now(),
        }
    }

    /// Targets and quality only — no predictor is invoked.
    pub fn run_targets_only(&self, table: LogTable) -> PipelineRun {
        info!(rows = table.row_count(), "target-only run started");

        let quality = self.quality.assess(&table, &self.groups);
        let mut table = table;
        let targets = self.targets.compute_all(&mut table);

        PipelineRun {
            table,
            targets,
            models: Vec::new(),
            quality,
            completed_at: Utc::now(),
        }
    }

    /// Write a regressor's prediction and band columns onto the table.
    fn attach_regression(
        &self,
        table: &mut LogTable,
        kind: TargetKind,
        model: &GbtRegressor,
        output: RegressionOutput,
    ) -> ModelReport {
        let n = table.row_count();
        let bands = match &output.frame {
            Some(frame) => self.confidence.estimate(model, frame, &output.values),
            // Withheld: missing predictions get missing bands
            None => ConfidenceBands {
                confidence: vec![f64::NAN; n],
                lower: vec![f64::NAN; n],
                upper: vec![f64::NAN; n],
            },
        };

        let target = kind.output_column();
        attach(table, &channels::pred_column(target), output.values);
        attach(table, &channels::conf_column(target), bands.confidence);
        attach(table, &channels::conf_low_column(target), bands.lower);
        attach(table, &channels::conf_high_column(target), bands.upper);
        output.report
    }

    /// Write the classifier's label and confidence columns onto the table.
    fn attach_classification(
        &self,
        table: &mut LogTable,
        output: ClassificationOutput,
    ) -> ModelReport {
        let target = TargetKind::Fluid.output_column();
        if let Err(err) = table.insert_class_column(&channels::pred_column(target), output.labels)
        {
            warn!(error = %err, "failed to attach fluid prediction column");
        }
        attach(table, &channels::conf_column(target), output.confidence);
        output.report
    }

}

/// Columns are sized off the same table, so a length failure here is a
/// programming error; it is logged rather than propagated.
fn attach(table: &mut LogTable, name: &str, values: Vec<f64>) {
    if let Err(err) = table.insert_channel(name, values) {
        warn!(error = %err, column = name, "failed to attach prediction column");
    }
}

// ============================================================================
// Tests
// ============================================================================
