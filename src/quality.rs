//! Sensor data-quality scoring.
//!
//! Runs over the raw table before any target or prediction column is
//! added and scores what the sensors actually delivered: per-column
//! completeness, per-column outlier fractions via the IQR fence rule, and
//! a composite health score per feature group. The output is advisory —
//! it rides along in exports and logs and never blocks prediction.

use serde::Serialize;
use tracing::info;

use crate::config::{FeaturesConfig, QualityConfig};
use crate::types::{channels, LogTable};

// ============================================================================
// Feature Groups
// ============================================================================

/// A named set of channels scored together.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureGroup {
    pub name: String,
    pub channels: Vec<String>,
}

impl FeatureGroup {
    /// The three per-model groups from the configured feature lists.
    pub fn from_features(features: &FeaturesConfig) -> Vec<Self> {
        vec![
            Self {
                name: "porosity".to_string(),
                channels: features.porosity.clone(),
            },
            Self {
                name: "fluid".to_string(),
                channels: features.fluid.clone(),
            },
            Self {
                name: "pressure".to_string(),
                channels: features.pressure.clone(),
            },
        ]
    }
}

// ============================================================================
// Report Types
// ============================================================================

/// Completeness and outlier statistics for one present column.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnQuality {
    pub channel: String,
    /// 1 - missing/rows
    pub completeness: f64,
    pub missing_count: usize,
    /// Fraction of non-missing values outside the IQR fences
    pub outlier_fraction: f64,
    pub outlier_count: usize,
    /// Lower IQR fence; NaN when the column had no finite values
    pub lower_bound: f64,
    /// Upper IQR fence; NaN when the column had no finite values
    pub upper_bound: f64,
}

/// Composite health for one feature group.
///
/// Health multiplies mean completeness by (1 - mean outlier fraction), so
/// either heavy missingness or heavy noise alone can drive it to zero. A
/// channel the table does not carry at all contributes zero completeness.
#[derive(Debug, Clone, Serialize)]
pub struct GroupQuality {
    pub group: String,
    pub completeness: f64,
    pub outlier_fraction: f64,
    pub health: f64,
    pub absent_channels: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub row_count: usize,
    /// Mean column completeness over present columns
    pub overall_completeness: f64,
    /// Rows where every float channel holds a finite value
    pub complete_rows: usize,
    pub columns: Vec<ColumnQuality>,
    pub groups: Vec<GroupQuality>,
}

impl QualityReport {
    pub fn column(&self, name: &str) -> Option<&ColumnQuality> {
        self.columns.iter().find(|c| c.channel == name)
    }

    pub fn group(&self, name: &str) -> Option<&GroupQuality> {
        self.groups.iter().find(|g| g.group == name)
    }

    /// One-line digest for logs and exports.
    pub fn summary(&self) -> String {
        let groups = self
            .groups
            .iter()
            .map(|g| format!("{} {:.2}", g.group, g.health))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "{} rows ({} fully complete), {:.1}% overall completeness; group health: {}",
            self.row_count,
            self.complete_rows,
            self.overall_completeness * 100.0,
            groups
        )
    }
}

// ============================================================================
// Assessor
// ============================================================================

#[derive(Debug, Clone)]
pub struct DataQualityAssessor {
    iqr_multiplier: f64,
}

impl DataQualityAssessor {
    pub fn new(config: &QualityConfig) -> Self {
        Self {
            iqr_multiplier: config.iqr_multiplier,
        }
    }

    /// Score a table against the configured feature groups.
    pub fn assess(&self, table: &LogTable, groups: &[FeatureGroup]) -> QualityReport {
        let mut columns = vec![self.assess_column(channels::DEPTH, table.depth())];
        for name in table.channel_names() {
            if let Some(values) = table.channel(name) {
                columns.push(self.assess_column(name, values));
            }
        }

        let group_reports: Vec<GroupQuality> = groups
            .iter()
            .map(|group| score_group(group, &columns))
            .collect();

        #[allow(clippy::cast_precision_loss)]
        let overall_completeness = if columns.is_empty() {
            0.0
        } else {
            columns.iter().map(|c| c.completeness).sum::<f64>() / columns.len() as f64
        };

        let report = QualityReport {
            row_count: table.row_count(),
            overall_completeness,
            complete_rows: count_complete_rows(table),
            columns,
            groups: group_reports,
        };
        info!(summary = %report.summary(), "data quality assessed");
        report
    }

    #[allow(clippy::cast_precision_loss)]
    fn assess_column(&self, name: &str, values: &[f64]) -> ColumnQuality {
        let rows = values.len();
        let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let missing_count = rows - finite.len();
        let completeness = if rows == 0 {
            0.0
        } else {
            1.0 - missing_count as f64 / rows as f64
        };

        if finite.is_empty() {
            return ColumnQuality {
                channel: name.to_string(),
                completeness,
                missing_count,
                outlier_fraction: 0.0,
                outlier_count: 0,
                lower_bound: f64::NAN,
                upper_bound: f64::NAN,
            };
        }

        finite.sort_by(f64::total_cmp);
        let q1 = quantile(&finite, 0.25);
        let q3 = quantile(&finite, 0.75);
        let iqr = q3 - q1;
        let lower_bound = q1 - self.iqr_multiplier * iqr;
        let upper_bound = q3 + self.iqr_multiplier * iqr;

        let outlier_count = finite
            .iter()
            .filter(|&&v| v < lower_bound || v > upper_bound)
            .count();
        ColumnQuality {
            channel: name.to_string(),
            completeness,
            missing_count,
            outlier_fraction: outlier_count as f64 / finite.len() as f64,
            outlier_count,
            lower_bound,
            upper_bound,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn score_group(group: &FeatureGroup, columns: &[ColumnQuality]) -> GroupQuality {
    let mut completeness_sum = 0.0;
    let mut outlier_sum = 0.0;
    let mut absent_channels = Vec::new();

    for channel in &group.channels {
        match columns.iter().find(|c| &c.channel == channel) {
            Some(column) => {
                completeness_sum += column.completeness;
                outlier_sum += column.outlier_fraction;
            }
            // An expected channel the table never carried: zero completeness,
            // no outlier evidence
            None => absent_channels.push(channel.clone()),
        }
    }

    let n = group.channels.len() as f64;
    let (completeness, outlier_fraction) = if group.channels.is_empty() {
        (0.0, 0.0)
    } else {
        (completeness_sum / n, outlier_sum / n)
    };
    GroupQuality {
        group: group.name.clone(),
        completeness,
        outlier_fraction,
        health: completeness * (1.0 - outlier_fraction),
        absent_channels,
    }
}

fn count_complete_rows(table: &LogTable) -> usize {
    let names: Vec<&str> = table.channel_names().collect();
    (0..table.row_count())
        .filter(|&row| {
            names
                .iter()
                .all(|name| table.channel(name).is_some_and(|c| c[row].is_finite()))
        })
        .count()
}

/// Linear-interpolation quantile over an ascending slice (the convention
/// spreadsheet and dataframe libraries default to). Callers guarantee the
/// slice is non-empty.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

// ============================================================================
// Tests
// ============================================================================
