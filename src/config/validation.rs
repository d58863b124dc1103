//! Config validation: unknown-key detection with Levenshtein suggestions,
//! physical range checks, and feature-isolation (no-leakage) checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs; range and
//! leakage errors do.

use crate::types::channels;
use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " — did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for PipelineConfig.
///
/// Maintained manually to match the struct hierarchy in mod.rs. Any new
/// field added to PipelineConfig must be added here too.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [porosity]
        "porosity",
        "porosity.matrix_density_g_cc",
        "porosity.fluid_density_g_cc",
        // [fluid]
        "fluid",
        "fluid.reservoir_ohm_m",
        "fluid.pay_zone_ohm_m",
        // [pressure]
        "pressure",
        "pressure.normal_trend_exponent",
        "pressure.exponent_gradient_psi",
        "pressure.fallback_mud_weight_ppg",
        // [confidence]
        "confidence",
        "confidence.interval_level",
        // [quality]
        "quality",
        "quality.iqr_multiplier",
        // [features]
        "features",
        "features.porosity",
        "features.fluid",
        "features.pressure",
        "features.minimal",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a_len = a.len();
    let b_len = b.len();
    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1)
                .min(curr[j] + 1)
                .min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for &k in known {
        let dist = levenshtein(unknown, k);
        if dist <= 3 {
            match best {
                Some((_, best_dist)) if dist >= best_dist => {}
                _ => best = Some((k, dist)),
            }
        }
    }
    best.map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys — it only warns. Existing configs
/// always continue to work.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    let mut warnings = Vec::new();

    for key in walk_toml_keys(&value, "") {
        if !known.contains(key.as_str()) {
            let suggestion = suggest_correction(&key, &known);
            warnings.push(ValidationWarning {
                message: format!("Unknown config key '{key}'"),
                field: key,
                suggestion,
            });
        }
    }

    warnings
}

// ============================================================================
// Physical Range Validation
// ============================================================================

/// Validate physical ranges on a parsed PipelineConfig.
///
/// Returns (errors, warnings) — errors are impossible values that must
/// prevent startup; warnings are suspicious but not fatal.
pub fn validate_physical_ranges(
    config: &super::PipelineConfig,
) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // Matrix density must exceed fluid density — the Wyllie denominator
    let p = &config.porosity;
    if p.matrix_density_g_cc <= p.fluid_density_g_cc {
        errors.push(format!(
            "porosity.matrix_density_g_cc ({:.2}) must be greater than fluid_density_g_cc ({:.2})",
            p.matrix_density_g_cc, p.fluid_density_g_cc
        ));
    }
    // Matrix density: 2.0-3.2 g/cm³ covers all sedimentary matrices
    if p.matrix_density_g_cc < 2.0 || p.matrix_density_g_cc > 3.2 {
        errors.push(format!(
            "porosity.matrix_density_g_cc = {:.2} is outside physical range (2.0-3.2 g/cm³)",
            p.matrix_density_g_cc
        ));
    }
    // Fluid density: suspicious outside 0.8-1.3 g/cm³ (fresh water to heavy brine)
    if p.fluid_density_g_cc < 0.8 || p.fluid_density_g_cc > 1.3 {
        warnings.push(ValidationWarning {
            field: "porosity.fluid_density_g_cc".to_string(),
            message: format!(
                "fluid_density_g_cc = {:.2} is outside typical range (0.8-1.3 g/cm³)",
                p.fluid_density_g_cc
            ),
            suggestion: None,
        });
    }

    // Fluid thresholds: ordered and positive
    let f = &config.fluid;
    if f.pay_zone_ohm_m <= 0.0 {
        errors.push(format!(
            "fluid.pay_zone_ohm_m = {:.1} must be > 0",
            f.pay_zone_ohm_m
        ));
    }
    if f.reservoir_ohm_m <= f.pay_zone_ohm_m {
        errors.push(format!(
            "fluid.reservoir_ohm_m ({:.1}) must be greater than pay_zone_ohm_m ({:.1})",
            f.reservoir_ohm_m, f.pay_zone_ohm_m
        ));
    }

    // Pressure constants
    let pp = &config.pressure;
    if pp.exponent_gradient_psi <= 0.0 {
        errors.push(format!(
            "pressure.exponent_gradient_psi = {:.1} must be > 0",
            pp.exponent_gradient_psi
        ));
    }
    if pp.normal_trend_exponent <= 0.0 {
        errors.push(format!(
            "pressure.normal_trend_exponent = {:.2} must be > 0",
            pp.normal_trend_exponent
        ));
    } else if pp.normal_trend_exponent < 0.5 || pp.normal_trend_exponent > 2.5 {
        warnings.push(ValidationWarning {
            field: "pressure.normal_trend_exponent".to_string(),
            message: format!(
                "normal_trend_exponent = {:.2} is outside typical range (0.5-2.5)",
                pp.normal_trend_exponent
            ),
            suggestion: None,
        });
    }
    // Mud weight: 5-25 ppg is the physically possible range for drilling fluids
    if pp.fallback_mud_weight_ppg < 5.0 || pp.fallback_mud_weight_ppg > 25.0 {
        errors.push(format!(
            "pressure.fallback_mud_weight_ppg = {:.1} is outside physical range (5-25 ppg)",
            pp.fallback_mud_weight_ppg
        ));
    }

    // Interval level must be a proper two-sided coverage probability
    let level = config.confidence.interval_level;
    if !(level > 0.0 && level < 1.0) {
        errors.push(format!(
            "confidence.interval_level = {level} must be strictly between 0 and 1"
        ));
    }

    // IQR multiplier
    let iqr = config.quality.iqr_multiplier;
    if iqr <= 0.0 {
        errors.push(format!("quality.iqr_multiplier = {iqr:.1} must be > 0"));
    } else if iqr > 5.0 {
        warnings.push(ValidationWarning {
            field: "quality.iqr_multiplier".to_string(),
            message: format!(
                "iqr_multiplier = {iqr:.1} is unusually wide — outliers will rarely be flagged"
            ),
            suggestion: None,
        });
    }

    (errors, warnings)
}

// ============================================================================
// Feature Isolation (No-Leakage) Validation
// ============================================================================

/// Channels that directly define each model's target. A feature list that
/// contains one of these would let the model read its own answer.
fn leakage_channels(target: &str) -> &'static [&'static str] {
    match target {
        "porosity" => &[channels::BULK_DENSITY, channels::NEUTRON_POROSITY],
        "fluid" => &[channels::RESISTIVITY, channels::TOTAL_GAS],
        "pressure" => &[channels::DRILLING_EXPONENT],
        _ => &[],
    }
}

/// Validate the feature channel lists: non-empty, free of target-defining
/// channels, and free of derived target columns. Returns errors only —
/// a leaking feature list is never acceptable.
pub fn validate_feature_isolation(config: &super::PipelineConfig) -> Vec<String> {
    let mut errors = Vec::new();
    let feats = &config.features;

    let groups: [(&str, &[String]); 4] = [
        ("porosity", &feats.porosity),
        ("fluid", &feats.fluid),
        ("pressure", &feats.pressure),
        ("minimal", &feats.minimal),
    ];

    let derived = [
        channels::PHI_COMBINED,
        channels::FLUID_CLASS,
        channels::PORE_PRESSURE_PSI,
    ];

    for (name, list) in groups {
        if list.is_empty() {
            errors.push(format!("features.{name} must not be empty"));
            continue;
        }

        for banned in leakage_channels(name) {
            if list.iter().any(|c| c == banned) {
                errors.push(format!(
                    "features.{name} contains '{banned}', which directly defines the {name} target"
                ));
            }
        }

        for column in derived {
            if list.iter().any(|c| c == column) {
                errors.push(format!(
                    "features.{name} contains derived target column '{column}'"
                ));
            }
        }
    }

    errors
}

// ============================================================================
// Tests
// ============================================================================
