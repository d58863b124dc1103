//! Pipeline Configuration Module
//!
//! Every formula constant and threshold the pipeline uses is an
//! operator-tunable TOML value with a built-in default. There is no global
//! config state: a loaded [`PipelineConfig`] is handed to the pipeline
//! context at construction and travels by reference from there.
//!
//! ## Loading Order
//!
//! 1. Explicit path (CLI `--config`)
//! 2. `MWD_COPILOT_CONFIG` environment variable (path to TOML file)
//! 3. `mwd_copilot.toml` in the current working directory
//! 4. Built-in defaults
//!
//! Unknown keys produce "did you mean?" warnings; impossible values fail
//! validation before the pipeline is built.

pub mod validation;

use crate::types::channels;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error ({path}): {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error ({path}): {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one pipeline deployment.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    /// Wyllie porosity derivation constants
    pub porosity: PorosityConfig,

    /// Resistivity fluid-classification thresholds
    pub fluid: FluidConfig,

    /// Rehm & McClendon pore-pressure constants
    pub pressure: PressureConfig,

    /// Confidence / prediction-interval tuning
    pub confidence: ConfidenceConfig,

    /// Data-quality scoring tuning
    pub quality: QualityConfig,

    /// Per-model feature channel lists
    pub features: FeaturesConfig,
}

impl PipelineConfig {
    /// Load configuration using the standard search order:
    /// 1. `$MWD_COPILOT_CONFIG` environment variable
    /// 2. `./mwd_copilot.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("MWD_COPILOT_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded pipeline config from MWD_COPILOT_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from MWD_COPILOT_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "MWD_COPILOT_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from("mwd_copilot.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded pipeline config from ./mwd_copilot.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./mwd_copilot.toml, using defaults");
                }
            }
        }

        info!("No mwd_copilot.toml found — using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        // Two-pass: check for unknown keys first (warnings only)
        for w in validation::validate_unknown_keys(&contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate formula constants, thresholds, and feature isolation.
    ///
    /// Impossible values are errors (startup must fail); suspicious but
    /// physically possible values only warn.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let (range_errors, range_warnings) = validation::validate_physical_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        errors.extend(validation::validate_feature_isolation(self));

        // Reject NaN/Inf in any config value (sweep all f64 fields via serialization)
        if let Ok(serialized) = toml::to_string(self) {
            if serialized.contains("nan") || serialized.contains("inf") {
                errors.push(
                    "Config contains NaN or Inf values — all constants must be finite numbers"
                        .to_string(),
                );
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Target Derivation Sections
// ============================================================================

/// Wyllie density-porosity constants.
///
/// phi = (rho_matrix - rho_bulk) / (rho_matrix - rho_fluid)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PorosityConfig {
    /// Matrix density (g/cm³). Default 2.71 = calcite.
    pub matrix_density_g_cc: f64,
    /// Pore-fluid density (g/cm³). Default 1.10 = saline mud filtrate.
    pub fluid_density_g_cc: f64,
}

impl Default for PorosityConfig {
    fn default() -> Self {
        Self {
            matrix_density_g_cc: 2.71,
            fluid_density_g_cc: 1.10,
        }
    }
}

/// Resistivity thresholds for fluid classification (Ω·m).
///
/// Evaluated high-to-low with closed lower bounds:
/// RT >= reservoir → Potential Reservoir; RT >= pay_zone → Pay Zone;
/// below that → Background.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FluidConfig {
    /// Lower bound of the Potential Reservoir class (Ω·m)
    pub reservoir_ohm_m: f64,
    /// Lower bound of the Pay Zone class (Ω·m)
    pub pay_zone_ohm_m: f64,
}

impl Default for FluidConfig {
    fn default() -> Self {
        Self {
            reservoir_ohm_m: 100.0,
            pay_zone_ohm_m: 20.0,
        }
    }
}

/// Rehm & McClendon pore-pressure constants.
///
/// P_pp = 0.052 × MW × depth + (normal_trend_exponent - DXC) × gradient
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PressureConfig {
    /// Normal-trend corrected drilling exponent (unitless)
    pub normal_trend_exponent: f64,
    /// Pressure change per unit of exponent deviation (psi)
    pub exponent_gradient_psi: f64,
    /// Mud weight substituted when MW_IN is missing (ppg).
    /// Default 8.34 = fresh water.
    pub fallback_mud_weight_ppg: f64,
}

impl Default for PressureConfig {
    fn default() -> Self {
        Self {
            normal_trend_exponent: 1.0,
            exponent_gradient_psi: 10_000.0,
            fallback_mud_weight_ppg: 8.34,
        }
    }
}

// ============================================================================
// Estimation / Quality Sections
// ============================================================================

/// Prediction-interval tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    /// Two-sided interval coverage level in (0, 1). Default 0.95 → z ≈ 1.96.
    pub interval_level: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            interval_level: 0.95,
        }
    }
}

/// Data-quality scoring tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// IQR fence multiplier for outlier detection. Default 1.5 (Tukey).
    pub iqr_multiplier: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            iqr_multiplier: 1.5,
        }
    }
}

// ============================================================================
// Feature Channel Lists
// ============================================================================

/// Per-model feature channel lists.
///
/// Each model sees only causally permissible channels: the list for a model
/// must not contain the channels that define that model's own target
/// (enforced by validation). `minimal` is the shared always-available
/// fallback set for the porosity and fluid models.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    pub porosity: Vec<String>,
    pub fluid: Vec<String>,
    pub pressure: Vec<String>,
    pub minimal: Vec<String>,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            porosity: to_names(&[
                channels::DEPTH,
                channels::GAMMA_RAY,
                channels::RESISTIVITY,
                channels::DRILLING_EXPONENT,
                channels::ROP,
                channels::TORQUE,
                channels::WOB,
                channels::TOTAL_GAS,
            ]),
            fluid: to_names(&[
                channels::DEPTH,
                channels::GAMMA_RAY,
                channels::DRILLING_EXPONENT,
                channels::ROP,
                channels::MSE,
                channels::TORQUE,
                channels::WOB,
                channels::STICK_SLIP,
            ]),
            pressure: to_names(&[
                channels::DEPTH,
                channels::MUD_WEIGHT_IN,
                channels::ECD,
                channels::ANNULAR_PRESSURE,
                channels::ROP,
                channels::WOB,
                channels::TORQUE,
            ]),
            minimal: to_names(&[channels::DEPTH, channels::WOB, channels::ROP]),
        }
    }
}

fn to_names(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| (*s).to_string()).collect()
}

// ============================================================================
// Tests
// ============================================================================
