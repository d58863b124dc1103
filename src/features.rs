//! Causal feature isolation.
//!
//! Each model is only allowed to see channels that do not directly encode
//! its own target (the leakage rules live in config validation). This
//! module resolves a model's requested channel list against the columns a
//! table can actually supply, walking an explicit fallback ladder:
//!
//! 1. every requested channel usable → use the request as-is
//! 2. otherwise → the minimal always-expected set, if fully usable
//! 3. otherwise → whatever subset of the minimal set is usable
//! 4. nothing usable at all → [`FeatureUnavailable`]
//!
//! A channel is usable when the column exists and holds at least one
//! finite value. The ladder is evaluated once per call and returns a
//! typed [`FeatureSelection`]; degradation is an expected branch here,
//! not an error path.

use tracing::warn;

use crate::types::{LogTable, ModelStatus};

/// Neither the requested channels nor the fallback set yielded a single
/// usable column. The affected model withholds its predictions; other
/// models are unaffected.
#[derive(Debug, Clone, thiserror::Error)]
#[error("no usable feature channels for the {model} model (requested: {})", requested.join(", "))]
pub struct FeatureUnavailable {
    pub model: String,
    pub requested: Vec<String>,
}

/// Resolved feature set for one model invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureSelection {
    /// The requested list, used verbatim.
    Full { features: Vec<String> },
    /// Requested channels were unusable; the full minimal set stands in.
    Fallback {
        features: Vec<String>,
        /// Requested channels the table could not supply
        missing: Vec<String>,
    },
    /// Even the minimal set was incomplete; its usable subset stands in.
    Partial {
        features: Vec<String>,
        /// Consulted channels (requested and minimal) the table could not supply
        missing: Vec<String>,
    },
}

impl FeatureSelection {
    /// Channels the model will actually be fed, in priority order.
    pub fn features(&self) -> &[String] {
        match self {
            Self::Full { features }
            | Self::Fallback { features, .. }
            | Self::Partial { features, .. } => features,
        }
    }

    /// Channels that were wanted but unusable (empty for a full selection).
    pub fn missing(&self) -> &[String] {
        match self {
            Self::Full { .. } => &[],
            Self::Fallback { missing, .. } | Self::Partial { missing, .. } => missing,
        }
    }

    /// How this selection should be reported against the model.
    pub fn status(&self) -> ModelStatus {
        match self {
            Self::Full { .. } => ModelStatus::Full,
            Self::Fallback { .. } => ModelStatus::Degraded,
            Self::Partial { .. } => ModelStatus::Partial,
        }
    }
}

/// Resolve a model's feature request against a table.
///
/// With `force_full` the request is returned verbatim without looking at
/// the table at all — the caller has opted out of degradation and handles
/// unusable channels itself (the pressure model's withhold policy).
pub fn select(
    table: &LogTable,
    model: &str,
    requested: &[String],
    minimal_fallback: &[String],
    force_full: bool,
) -> Result<FeatureSelection, FeatureUnavailable> {
    if force_full {
        return Ok(FeatureSelection::Full {
            features: requested.to_vec(),
        });
    }

    let requested_missing = unusable(table, requested);
    if requested_missing.is_empty() {
        return Ok(FeatureSelection::Full {
            features: requested.to_vec(),
        });
    }

    let fallback_missing = unusable(table, minimal_fallback);
    if fallback_missing.is_empty() {
        warn!(
            model,
            missing = ?requested_missing,
            features = ?minimal_fallback,
            "requested channels unusable, degraded to minimal feature set"
        );
        return Ok(FeatureSelection::Fallback {
            features: minimal_fallback.to_vec(),
            missing: requested_missing,
        });
    }

    let features: Vec<String> = minimal_fallback
        .iter()
        .filter(|c| table.is_usable(c))
        .cloned()
        .collect();
    if features.is_empty() {
        return Err(FeatureUnavailable {
            model: model.to_string(),
            requested: requested.to_vec(),
        });
    }

    let mut missing = requested_missing;
    missing.extend(fallback_missing);
    missing.sort();
    missing.dedup();
    warn!(
        model,
        missing = ?missing,
        features = ?features,
        "minimal feature set incomplete, using its usable subset"
    );
    Ok(FeatureSelection::Partial { features, missing })
}

fn unusable(table: &LogTable, channels: &[String]) -> Vec<String> {
    channels
        .iter()
        .filter(|c| !table.is_usable(c))
        .cloned()
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn make_table(columns: Vec<(&str, Vec<f64>)>) -> LogTable {
        let mut depth = Vec::new();
        let mut floats = BTreeMap::new();
        for (name, values) in columns {
            if name == "DEPTH" {
                depth = values;
            } else {
                floats.insert(name.to_string(), values);
            }
        }
        LogTable::from_columns(depth, floats).unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_all_requested_usable_returns_full() {
        let table = make_table(vec![
            ("DEPTH", vec![100.0, 101.0]),
            ("GR", vec![45.0, 50.0]),
            ("ROP", vec![12.0, f64::NAN]),
        ]);
        let requested = names(&["DEPTH", "GR", "ROP"]);

        let selection = select(&table, "porosity", &requested, &names(&["DEPTH"]), false).unwrap();
        assert_eq!(
            selection,
            FeatureSelection::Full {
                features: requested
            }
        );
        assert_eq!(selection.status(), ModelStatus::Full);
        assert!(selection.missing().is_empty());
    }

    #[test]
    fn test_missing_channel_falls_back_to_minimal() {
        let table = make_table(vec![
            ("DEPTH", vec![100.0, 101.0]),
            ("GR", vec![45.0, 50.0]),
            ("WOB", vec![8.0, 9.0]),
        ]);

        let selection = select(
            &table,
            "porosity",
            &names(&["DEPTH", "GR", "TORQUE"]),
            &names(&["DEPTH", "GR", "WOB"]),
            false,
        )
        .unwrap();

        match selection {
            FeatureSelection::Fallback { features, missing } => {
                assert_eq!(features, names(&["DEPTH", "GR", "WOB"]));
                assert_eq!(missing, names(&["TORQUE"]));
            }
            other => panic!("expected Fallback, got {other:?}"),
        }
    }

    #[test]
    fn test_incomplete_minimal_yields_usable_subset() {
        let table = make_table(vec![
            ("DEPTH", vec![100.0, 101.0]),
            ("GR", vec![45.0, 50.0]),
        ]);

        let selection = select(
            &table,
            "fluid",
            &names(&["TORQUE"]),
            &names(&["DEPTH", "GR", "WOB"]),
            false,
        )
        .unwrap();

        match selection {
            FeatureSelection::Partial { features, missing } => {
                assert_eq!(features, names(&["DEPTH", "GR"]));
                assert_eq!(missing, names(&["TORQUE", "WOB"]));
            }
            other => panic!("expected Partial, got {other:?}"),
        }
    }

    #[test]
    fn test_all_nan_column_is_not_usable() {
        let table = make_table(vec![
            ("DEPTH", vec![100.0, 101.0]),
            ("GR", vec![f64::NAN, f64::NAN]),
            ("WOB", vec![8.0, 9.0]),
        ]);

        let selection = select(
            &table,
            "porosity",
            &names(&["GR"]),
            &names(&["DEPTH", "WOB"]),
            false,
        )
        .unwrap();
        assert_eq!(selection.status(), ModelStatus::Degraded);
        assert_eq!(selection.missing(), names(&["GR"]).as_slice());
    }

    #[test]
    fn test_nothing_usable_is_an_error() {
        let table = make_table(vec![("DEPTH", vec![100.0, 101.0])]);

        let err = select(
            &table,
            "pressure",
            &names(&["GR", "RT"]),
            &names(&["WOB", "TORQUE"]),
            false,
        )
        .unwrap_err();
        assert_eq!(err.model, "pressure");
        assert!(err.to_string().contains("pressure"));
        assert!(err.to_string().contains("GR"));
    }

    #[test]
    fn test_force_full_ignores_availability() {
        let table = make_table(vec![("DEPTH", vec![100.0, 101.0])]);
        let requested = names(&["DXC_MISSING", "ALSO_MISSING"]);

        let selection = select(&table, "pressure", &requested, &names(&["DEPTH"]), true).unwrap();
        assert_eq!(
            selection,
            FeatureSelection::Full {
                features: requested
            }
        );
    }

    #[test]
    fn test_overlapping_missing_channels_reported_once() {
        let table = make_table(vec![
            ("DEPTH", vec![100.0, 101.0]),
            ("GR", vec![45.0, 50.0]),
        ]);

        // WOB is both requested and in the minimal set, and unusable
        let selection = select(
            &table,
            "fluid",
            &names(&["GR", "WOB"]),
            &names(&["DEPTH", "WOB"]),
            false,
        )
        .unwrap();

        match selection {
            FeatureSelection::Partial { missing, .. } => {
                assert_eq!(missing, names(&["WOB"]));
            }
            other => panic!("expected Partial, got {other:?}"),
        }
    }
}
