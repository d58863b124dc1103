//! Model bundle loading and feature-isolated prediction.
//!
//! A bundle directory holds four JSON artifacts: the porosity and pressure
//! regressors, the fluid classifier, and the label encoder. Everything is
//! parsed and structurally validated once at startup; after that the
//! bundle is an immutable value and every prediction call is a pure
//! function of the input table.
//!
//! The [`ModelManager`] is the causal gatekeeper: each predictor only ever
//! sees the channels its schema negotiation resolved, and the pressure
//! model refuses to run at all on an incomplete feature set rather than
//! degrade silently.

pub mod artifact;
pub mod encoder;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::FeaturesConfig;
use crate::features;
use crate::types::{FluidClass, LogTable, ModelReport, ModelStatus, TargetKind};

pub use artifact::{GbtClassifier, GbtRegressor, RegressionTree, TreeNode};
pub use encoder::{LabelEncoder, RawLabelEncoder};

/// Artifact file names inside a bundle directory.
const POROSITY_FILE: &str = "porosity.json";
const FLUID_FILE: &str = "fluid.json";
const PRESSURE_FILE: &str = "pressure.json";
const ENCODER_FILE: &str = "label_encoder.json";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model artifact {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse model artifact {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {artifact} artifact: {reason}")]
    Invalid { artifact: String, reason: String },

    #[error("label encoder lists unknown class '{label}'")]
    UnknownLabel { label: String },
}

// ============================================================================
// Model Bundle
// ============================================================================

/// The three trained predictors plus the label codec, loaded once and
/// immutable afterwards.
#[derive(Debug, Clone)]
pub struct ModelBundle {
    pub porosity: GbtRegressor,
    pub fluid: GbtClassifier,
    pub pressure: GbtRegressor,
    pub labels: LabelEncoder,
}

impl ModelBundle {
    /// Load and validate a bundle directory.
    pub fn load(dir: &Path) -> Result<Self, ModelError> {
        let porosity: GbtRegressor = read_artifact(&dir.join(POROSITY_FILE))?;
        let fluid: GbtClassifier = read_artifact(&dir.join(FLUID_FILE))?;
        let pressure: GbtRegressor = read_artifact(&dir.join(PRESSURE_FILE))?;
        let raw: RawLabelEncoder = read_artifact(&dir.join(ENCODER_FILE))?;
        let labels = LabelEncoder::from_labels(&raw.classes)?;

        let bundle = Self::from_parts(porosity, fluid, pressure, labels)?;
        info!(
            dir = %dir.display(),
            porosity_trees = bundle.porosity.n_trees(),
            fluid_classes = bundle.fluid.n_classes(),
            pressure_trees = bundle.pressure.n_trees(),
            "model bundle loaded"
        );
        Ok(bundle)
    }

    /// Assemble a bundle from already-parsed artifacts, running the same
    /// validation as a directory load.
    pub fn from_parts(
        porosity: GbtRegressor,
        fluid: GbtClassifier,
        pressure: GbtRegressor,
        labels: LabelEncoder,
    ) -> Result<Self, ModelError> {
        porosity.validate("porosity")?;
        fluid.validate("fluid")?;
        pressure.validate("pressure")?;
        if fluid.n_classes() != labels.len() {
            return Err(ModelError::Invalid {
                artifact: "fluid".to_string(),
                reason: format!(
                    "classifier scores {} classes but the label encoder maps {}",
                    fluid.n_classes(),
                    labels.len()
                ),
            });
        }
        Ok(Self {
            porosity,
            fluid,
            pressure,
            labels,
        })
    }
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, ModelError> {
    let contents = fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ModelError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

// ============================================================================
// Feature Frame
// ============================================================================

/// A feature matrix in one artifact's trained column order, median-filled
/// where the selection allowed. This is also the SHAP handoff surface: an
/// external explainer consumes exactly these rows together with the
/// ensemble from [`ModelBundle`].
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    pub feature_names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

/// Build the matrix a predictor consumes.
///
/// Columns follow the artifact's trained order. A column both selected and
/// present is median-filled from the current table; anything else is passed
/// as all-NaN and routed by the trees' missing-value directions.
fn build_frame(table: &LogTable, artifact_features: &[String], selected: &[String]) -> FeatureFrame {
    let n = table.row_count();
    let selected: HashSet<&str> = selected.iter().map(String::as_str).collect();

    let mut columns: Vec<Vec<f64>> = Vec::with_capacity(artifact_features.len());
    for name in artifact_features {
        let column = if selected.contains(name.as_str()) {
            match (table.feature_values(name), table.column_median(name)) {
                (Some(values), Some(median)) => values
                    .iter()
                    .map(|&v| if v.is_nan() { median } else { v })
                    .collect(),
                (Some(values), None) => values.to_vec(),
                _ => vec![f64::NAN; n],
            }
        } else {
            vec![f64::NAN; n]
        };
        columns.push(column);
    }

    let rows = (0..n)
        .map(|r| columns.iter().map(|c| c[r]).collect())
        .collect();
    FeatureFrame {
        feature_names: artifact_features.to_vec(),
        rows,
    }
}

// ============================================================================
// Prediction Outputs
// ============================================================================

/// One regression pass: values plus the matrix that produced them.
#[derive(Debug, Clone)]
pub struct RegressionOutput {
    /// One value per table row; NaN where withheld
    pub values: Vec<f64>,
    /// The consumed feature matrix; None when the model was withheld
    pub frame: Option<FeatureFrame>,
    pub report: ModelReport,
}

/// One classification pass: decoded labels plus per-row class confidence.
#[derive(Debug, Clone)]
pub struct ClassificationOutput {
    /// One label per table row; None where withheld or undecodable
    pub labels: Vec<Option<FluidClass>>,
    /// Winning-class probability per row; NaN where withheld
    pub confidence: Vec<f64>,
    /// The consumed feature matrix; None when the model was withheld
    pub frame: Option<FeatureFrame>,
    pub report: ModelReport,
}

// ============================================================================
// Model Manager
// ============================================================================

/// Binds each predictor to its causally-isolated feature set.
#[derive(Debug, Clone)]
pub struct ModelManager {
    bundle: ModelBundle,
    features: FeaturesConfig,
}

impl ModelManager {
    pub fn new(bundle: ModelBundle, features: FeaturesConfig) -> Self {
        Self { bundle, features }
    }

    /// The loaded artifacts, for explainers and diagnostics.
    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }

    pub fn predict_porosity(&self, table: &LogTable) -> RegressionOutput {
        self.predict_regression(
            table,
            TargetKind::Porosity,
            &self.bundle.porosity,
            &self.features.porosity,
            false,
        )
    }

    /// Pressure demands its full feature set; an unusable required channel
    /// withholds every prediction instead of running degraded.
    pub fn predict_pressure(&self, table: &LogTable) -> RegressionOutput {
        self.predict_regression(
            table,
            TargetKind::PorePressure,
            &self.bundle.pressure,
            &self.features.pressure,
            true,
        )
    }

    pub fn predict_fluid(&self, table: &LogTable) -> ClassificationOutput {
        let n = table.row_count();
        let selection = match features::select(
            table,
            TargetKind::Fluid.name(),
            &self.features.fluid,
            &self.features.minimal,
            false,
        ) {
            Ok(selection) => selection,
            Err(err) => {
                warn!(error = %err, "fluid predictions withheld");
                return ClassificationOutput {
                    labels: vec![None; n],
                    confidence: vec![f64::NAN; n],
                    frame: None,
                    report: withheld_report(TargetKind::Fluid, err.requested),
                };
            }
        };

        let frame = build_frame(table, &self.bundle.fluid.feature_names, selection.features());
        let mut labels = Vec::with_capacity(n);
        let mut confidence = Vec::with_capacity(n);
        for row in &frame.rows {
            let (class_id, probability) = self.bundle.fluid.predict_row(row);
            labels.push(self.bundle.labels.decode(class_id));
            confidence.push(probability);
        }

        let predicted_rows = labels.iter().filter(|l| l.is_some()).count();
        info!(
            target = %TargetKind::Fluid,
            status = %selection.status(),
            rows = predicted_rows,
            "classification complete"
        );
        ClassificationOutput {
            labels,
            confidence,
            frame: Some(frame),
            report: ModelReport {
                target: TargetKind::Fluid,
                status: selection.status(),
                features_used: selection.features().to_vec(),
                missing_channels: selection.missing().to_vec(),
                predicted_rows,
            },
        }
    }

    fn predict_regression(
        &self,
        table: &LogTable,
        target: TargetKind,
        model: &GbtRegressor,
        requested: &[String],
        force_full: bool,
    ) -> RegressionOutput {
        let n = table.row_count();
        let selection = match features::select(
            table,
            target.name(),
            requested,
            &self.features.minimal,
            force_full,
        ) {
            Ok(selection) => selection,
            Err(err) => {
                warn!(error = %err, "predictions withheld");
                return withheld_regression(target, err.requested, n);
            }
        };

        if force_full {
            let missing: Vec<String> = requested
                .iter()
                .filter(|c| !table.is_usable(c))
                .cloned()
                .collect();
            if !missing.is_empty() {
                warn!(
                    target = %target,
                    missing = ?missing,
                    "required channels unusable, predictions withheld"
                );
                return withheld_regression(target, missing, n);
            }
        }

        let frame = build_frame(table, &model.feature_names, selection.features());
        let values = model.predict_rows(&frame.rows);
        let predicted_rows = values.iter().filter(|v| !v.is_nan()).count();

        info!(
            target = %target,
            status = %selection.status(),
            rows = predicted_rows,
            "regression complete"
        );
        RegressionOutput {
            values,
            frame: Some(frame),
            report: ModelReport {
                target,
                status: selection.status(),
                features_used: selection.features().to_vec(),
                missing_channels: selection.missing().to_vec(),
                predicted_rows,
            },
        }
    }
}

fn withheld_regression(target: TargetKind, missing: Vec<String>, rows: usize) -> RegressionOutput {
    RegressionOutput {
        values: vec![f64::NAN; rows],
        frame: None,
        report: withheld_report(target, missing),
    }
}

fn withheld_report(target: TargetKind, missing: Vec<String>) -> ModelReport {
    ModelReport {
        target,
        status: ModelStatus::Withheld,
        features_used: Vec::new(),
        missing_channels: missing,
        predicted_rows: 0,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::channels;
    use std::collections::BTreeMap;

    fn make_table(columns: Vec<(&str, Vec<f64>)>) -> LogTable {
        let mut depth = Vec::new();
        let mut floats = BTreeMap::new();
        for (name, values) in columns {
            if name == channels::DEPTH {
                depth = values;
            } else {
                floats.insert(name.to_string(), values);
            }
        }
        LogTable::from_columns(depth, floats).unwrap()
    }

    fn stump(feature: i32, threshold: f64, left: f64, right: f64) -> RegressionTree {
        RegressionTree {
            nodes: vec![
                TreeNode {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                    default_left: true,
                    value: 0.0,
                },
                TreeNode {
                    feature: -1,
                    threshold: 0.0,
                    left: -1,
                    right: -1,
                    default_left: true,
                    value: left,
                },
                TreeNode {
                    feature: -1,
                    threshold: 0.0,
                    left: -1,
                    right: -1,
                    default_left: true,
                    value: right,
                },
            ],
        }
    }

    fn make_bundle() -> ModelBundle {
        // Porosity: deeper rock (f0 = DEPTH > 1500) is tighter
        let porosity = GbtRegressor {
            feature_names: vec![channels::DEPTH.to_string(), channels::GAMMA_RAY.to_string()],
            base_score: 0.15,
            learning_rate: 1.0,
            trees: vec![stump(0, 1500.0, 0.10, -0.05)],
        };
        // Fluid: 3 classes keyed off gamma ray (f1)
        let fluid = GbtClassifier {
            feature_names: vec![channels::DEPTH.to_string(), channels::GAMMA_RAY.to_string()],
            learning_rate: 1.0,
            base_scores: vec![0.0, 0.0, 0.0],
            class_trees: vec![
                vec![stump(1, 60.0, -1.0, 2.0)],
                vec![stump(1, 60.0, 2.0, -1.0)],
                vec![stump(0, 1_000_000.0, -1.0, -1.0)],
            ],
        };
        // Pressure: trained on DEPTH + WOB
        let pressure = GbtRegressor {
            feature_names: vec![
                channels::DEPTH.to_string(),
                channels::WOB.to_string(),
            ],
            base_score: 4000.0,
            learning_rate: 1.0,
            trees: vec![stump(0, 1500.0, -500.0, 500.0)],
        };
        let labels = LabelEncoder::from_labels(&[
            "Background".to_string(),
            "Pay Zone".to_string(),
            "Potential Reservoir".to_string(),
        ])
        .unwrap();
        ModelBundle::from_parts(porosity, fluid, pressure, labels).unwrap()
    }

    fn make_features() -> FeaturesConfig {
        FeaturesConfig {
            porosity: vec![channels::DEPTH.to_string(), channels::GAMMA_RAY.to_string()],
            fluid: vec![channels::DEPTH.to_string(), channels::GAMMA_RAY.to_string()],
            pressure: vec![
                channels::DEPTH.to_string(),
                channels::WOB.to_string(),
            ],
            minimal: vec![channels::DEPTH.to_string()],
        }
    }

    fn make_manager() -> ModelManager {
        ModelManager::new(make_bundle(), make_features())
    }

    #[test]
    fn test_bundle_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = make_bundle();
        std::fs::write(
            dir.path().join(POROSITY_FILE),
            serde_json::to_string(&bundle.porosity).unwrap(),
        )
        .unwrap();
        std::fs::write(
            dir.path().join(FLUID_FILE),
            serde_json::to_string(&bundle.fluid).unwrap(),
        )
        .unwrap();
        std::fs::write(
            dir.path().join(PRESSURE_FILE),
            serde_json::to_string(&bundle.pressure).unwrap(),
        )
        .unwrap();
        std::fs::write(
            dir.path().join(ENCODER_FILE),
            r#"{"classes":["Background","Pay Zone","Potential Reservoir"]}"#,
        )
        .unwrap();

        let loaded = ModelBundle::load(dir.path()).unwrap();
        assert_eq!(loaded.porosity.n_trees(), 1);
        assert_eq!(loaded.fluid.n_classes(), 3);
        assert_eq!(loaded.labels.len(), 3);
    }

    #[test]
    fn test_bundle_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModelBundle::load(dir.path()).unwrap_err();
        assert!(matches!(err, ModelError::Io { .. }));
    }

    #[test]
    fn test_bundle_rejects_class_count_mismatch() {
        let bundle = make_bundle();
        let labels =
            LabelEncoder::from_labels(&["Background".to_string(), "Pay Zone".to_string()])
                .unwrap();
        let err =
            ModelBundle::from_parts(bundle.porosity, bundle.fluid, bundle.pressure, labels)
                .unwrap_err();
        assert!(err.to_string().contains("label encoder"));
    }

    #[test]
    fn test_porosity_prediction_full_status() {
        let manager = make_manager();
        let table = make_table(vec![
            (channels::DEPTH, vec![1000.0, 2000.0]),
            (channels::GAMMA_RAY, vec![45.0, 80.0]),
        ]);

        let output = manager.predict_porosity(&table);
        assert_eq!(output.report.status, ModelStatus::Full);
        assert_eq!(output.report.predicted_rows, 2);
        assert!((output.values[0] - 0.25).abs() < 1e-12); // shallow: 0.15 + 0.10
        assert!((output.values[1] - 0.10).abs() < 1e-12); // deep: 0.15 - 0.05
    }

    #[test]
    fn test_median_fill_uses_current_table() {
        let manager = make_manager();
        // DEPTH median over finite values is irrelevant here; GR has a NaN
        // hole whose fill value is median(40, 50, 60) = 50
        let table = make_table(vec![
            (channels::DEPTH, vec![1000.0, 1001.0, 1002.0, 1003.0]),
            (channels::GAMMA_RAY, vec![40.0, 50.0, f64::NAN, 60.0]),
        ]);

        let output = manager.predict_porosity(&table);
        let frame = output.frame.unwrap();
        assert!((frame.rows[2][1] - 50.0).abs() < 1e-12);
        // No NaN reaches the trees for selected-and-present columns
        assert!(frame.rows.iter().all(|r| r.iter().all(|v| v.is_finite())));
    }

    #[test]
    fn test_missing_requested_channel_degrades_to_minimal() {
        let bundle = make_bundle();
        let mut features = make_features();
        features.porosity.push(channels::ROP.to_string());
        let manager = ModelManager::new(bundle, features);

        let table = make_table(vec![
            (channels::DEPTH, vec![1000.0, 2000.0]),
            (channels::GAMMA_RAY, vec![45.0, 80.0]),
        ]);

        let output = manager.predict_porosity(&table);
        assert_eq!(output.report.status, ModelStatus::Degraded);
        assert_eq!(
            output.report.missing_channels,
            vec![channels::ROP.to_string()]
        );
        // Predictions still produced; GR now reaches the trees as NaN and
        // routes through the default direction
        assert_eq!(output.values.len(), 2);
        assert!(output.values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_unselected_artifact_feature_passed_as_nan() {
        let manager = make_manager();
        let table = make_table(vec![
            (channels::DEPTH, vec![1000.0]),
            (channels::GAMMA_RAY, vec![45.0]),
        ]);

        // Full selection: both columns present in the frame
        let full = manager.predict_porosity(&table);
        let frame = full.frame.unwrap();
        assert_eq!(frame.feature_names.len(), 2);
        assert!(frame.rows[0][1].is_finite());

        // Degraded to DEPTH only: the GR column the artifact expects is NaN
        let bundle = make_bundle();
        let mut features = make_features();
        features.porosity = vec![
            channels::DEPTH.to_string(),
            channels::ROP.to_string(),
        ];
        let degraded = ModelManager::new(bundle, features).predict_porosity(&table);
        let frame = degraded.frame.unwrap();
        assert!(frame.rows[0][0].is_finite());
        assert!(frame.rows[0][1].is_nan());
    }

    #[test]
    fn test_fluid_labels_decoded_with_confidence() {
        let manager = make_manager();
        let table = make_table(vec![
            (channels::DEPTH, vec![1000.0, 1001.0]),
            (channels::GAMMA_RAY, vec![30.0, 90.0]),
        ]);

        let output = manager.predict_fluid(&table);
        // Low GR boosts class 1 (Pay Zone), high GR boosts class 0 (Background)
        assert_eq!(output.labels[0], Some(FluidClass::PayZone));
        assert_eq!(output.labels[1], Some(FluidClass::Background));
        assert!(output.confidence.iter().all(|c| (0.0..=1.0).contains(c)));
        assert_eq!(output.report.predicted_rows, 2);
    }

    #[test]
    fn test_pressure_withheld_when_required_channel_missing() {
        let manager = make_manager();
        let table = make_table(vec![
            (channels::DEPTH, vec![1000.0, 2000.0]),
            (channels::GAMMA_RAY, vec![45.0, 80.0]),
        ]);

        let output = manager.predict_pressure(&table);
        assert_eq!(output.report.status, ModelStatus::Withheld);
        assert_eq!(output.report.predicted_rows, 0);
        assert!(output.values.iter().all(|v| v.is_nan()));
        assert!(output.frame.is_none());
        assert_eq!(
            output.report.missing_channels,
            vec![channels::WOB.to_string()]
        );
    }

    #[test]
    fn test_pressure_runs_when_all_channels_present() {
        let manager = make_manager();
        let table = make_table(vec![
            (channels::DEPTH, vec![1000.0, 2000.0]),
            (channels::WOB, vec![8.0, 12.0]),
        ]);

        let output = manager.predict_pressure(&table);
        assert_eq!(output.report.status, ModelStatus::Full);
        assert!((output.values[0] - 3500.0).abs() < 1e-9);
        assert!((output.values[1] - 4500.0).abs() < 1e-9);
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let manager = make_manager();
        let table = make_table(vec![
            (channels::DEPTH, vec![1000.0, 2000.0]),
            (channels::GAMMA_RAY, vec![45.0, f64::NAN]),
        ]);

        let first = manager.predict_porosity(&table);
        let second = manager.predict_porosity(&table);
        assert_eq!(first.values, second.values);
        assert_eq!(first.report.status, second.report.status);
    }
}
