//! Ensemble-stability confidence scoring and prediction intervals.
//!
//! A boosted chain that converges early is trusted more than one still
//! correcting itself at the last tree. The estimator re-queries the
//! regressor at increasing tree-count prefixes (quarters of the chain),
//! measures how much the partial predictions move per row, and maps that
//! spread to a `[0, 1]` confidence score:
//!
//! Formula: confidence = clip(1 - std(partials) / (|mean(partials)| + 1e-6), 0, 1)
//!
//! The interval then ties its width directly to the score:
//!
//! Formula: margin = z × (1 - confidence) × |prediction|
//!
//! Where z is the standard normal quantile for the configured two-sided
//! interval level (0.95 → z ≈ 1.96). A zero-magnitude prediction therefore
//! gets a zero-width interval regardless of confidence; that is a known
//! limitation of magnitude-scaled intervals, logged but never an error.

use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;
use tracing::debug;

use crate::models::{FeatureFrame, GbtRegressor};

#[derive(Debug, Error)]
pub enum ConfidenceError {
    #[error("confidence interval level {level} must be strictly between 0 and 1")]
    InvalidLevel { level: f64 },
}

/// Per-row confidence and interval bounds, parallel to the prediction
/// vector they describe.
#[derive(Debug, Clone)]
pub struct ConfidenceBands {
    pub confidence: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

/// Tree-count prefixes to query: quarters of the chain, at least one tree,
/// deduplicated for short chains.
pub fn truncation_ladder(n_trees: usize) -> Vec<usize> {
    let mut ladder: Vec<usize> = [1, 2, 3, 4]
        .iter()
        .map(|&quarter| (n_trees * quarter / 4).max(1))
        .collect();
    ladder.dedup();
    ladder
}

// ============================================================================
// Estimator
// ============================================================================

#[derive(Debug, Clone)]
pub struct ConfidenceEstimator {
    interval_level: f64,
    z: f64,
}

impl ConfidenceEstimator {
    /// Build an estimator for a two-sided interval at `interval_level`.
    pub fn new(interval_level: f64) -> Result<Self, ConfidenceError> {
        if !(interval_level > 0.0 && interval_level < 1.0) {
            return Err(ConfidenceError::InvalidLevel {
                level: interval_level,
            });
        }

        let z = match Normal::new(0.0, 1.0) {
            Ok(normal) => normal.inverse_cdf(0.5 + interval_level / 2.0),
            Err(_) => 1.96, // Fallback if distribution creation fails
        };
        Ok(Self { interval_level, z })
    }

    pub fn interval_level(&self) -> f64 {
        self.interval_level
    }

    pub fn z_score(&self) -> f64 {
        self.z
    }

    /// Score one regression pass.
    ///
    /// `predictions` are the full-chain values already computed for
    /// `frame`; the estimator re-queries the prefix ladder on the same
    /// frame. Missing (NaN) predictions get missing bands.
    pub fn estimate(
        &self,
        model: &GbtRegressor,
        frame: &FeatureFrame,
        predictions: &[f64],
    ) -> ConfidenceBands {
        let ladder = truncation_ladder(model.n_trees());
        let partials: Vec<Vec<f64>> = ladder
            .iter()
            .map(|&k| model.predict_rows_truncated(&frame.rows, k))
            .collect();

        let n = predictions.len();
        let mut confidence = Vec::with_capacity(n);
        let mut lower = Vec::with_capacity(n);
        let mut upper = Vec::with_capacity(n);
        let mut zero_width = 0usize;

        for (row, &prediction) in predictions.iter().enumerate() {
            if prediction.is_nan() {
                confidence.push(f64::NAN);
                lower.push(f64::NAN);
                upper.push(f64::NAN);
                continue;
            }

            let samples: Vec<f64> = partials.iter().map(|p| p[row]).collect();
            let score = confidence_from_samples(&samples);
            let margin = self.z * (1.0 - score) * prediction.abs();
            if prediction == 0.0 {
                zero_width += 1;
            }
            confidence.push(score);
            lower.push(prediction - margin);
            upper.push(prediction + margin);
        }

        if zero_width > 0 {
            debug!(
                rows = zero_width,
                "zero-magnitude predictions collapse to zero-width intervals"
            );
        }
        ConfidenceBands {
            confidence,
            lower,
            upper,
        }
    }
}

/// Map the spread of partial predictions to `[0, 1]`.
///
/// A single sample carries no variance evidence against the point
/// estimate and scores full confidence.
fn confidence_from_samples(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 1.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    let spread = variance.sqrt() / (mean.abs() + 1e-6);
    (1.0 - spread).clamp(0.0, 1.0)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RegressionTree, TreeNode};

    fn leaf_tree(value: f64) -> RegressionTree {
        RegressionTree {
            nodes: vec![TreeNode {
                feature: -1,
                threshold: 0.0,
                left: -1,
                right: -1,
                default_left: true,
                value,
            }],
        }
    }

    fn make_regressor(leaf_values: &[f64], base_score: f64) -> GbtRegressor {
        GbtRegressor {
            feature_names: vec!["DEPTH".to_string()],
            base_score,
            learning_rate: 1.0,
            trees: leaf_values.iter().map(|&v| leaf_tree(v)).collect(),
        }
    }

    fn one_row_frame() -> FeatureFrame {
        FeatureFrame {
            feature_names: vec!["DEPTH".to_string()],
            rows: vec![vec![1000.0]],
        }
    }

    #[test]
    fn test_ladder_quarters_for_eight_trees() {
        assert_eq!(truncation_ladder(8), vec![2, 4, 6, 8]);
    }

    #[test]
    fn test_ladder_deduplicates_short_chains() {
        assert_eq!(truncation_ladder(3), vec![1, 2, 3]);
        assert_eq!(truncation_ladder(1), vec![1]);
    }

    #[test]
    fn test_z_score_for_95_percent_level() {
        let estimator = ConfidenceEstimator::new(0.95).unwrap();
        assert!((estimator.z_score() - 1.959_964).abs() < 1e-4);
    }

    #[test]
    fn test_invalid_levels_rejected() {
        assert!(ConfidenceEstimator::new(0.0).is_err());
        assert!(ConfidenceEstimator::new(1.0).is_err());
        assert!(ConfidenceEstimator::new(-0.5).is_err());
    }

    #[test]
    fn test_stable_chain_scores_full_confidence() {
        // First tree does all the work; later trees add nothing, so every
        // prefix predicts the same value
        let model = make_regressor(&[5.0, 0.0, 0.0, 0.0], 0.0);
        let estimator = ConfidenceEstimator::new(0.95).unwrap();
        let frame = one_row_frame();
        let predictions = model.predict_rows(&frame.rows);

        let bands = estimator.estimate(&model, &frame, &predictions);
        assert!((bands.confidence[0] - 1.0).abs() < 1e-9);
        // Full confidence collapses the interval onto the prediction
        assert!((bands.lower[0] - predictions[0]).abs() < 1e-6);
        assert!((bands.upper[0] - predictions[0]).abs() < 1e-6);
    }

    #[test]
    fn test_wandering_chain_scores_lower_confidence() {
        let stable = make_regressor(&[5.0, 0.0, 0.0, 0.0], 0.0);
        let wandering = make_regressor(&[5.0, -4.0, 6.0, -3.0], 0.0);
        let estimator = ConfidenceEstimator::new(0.95).unwrap();
        let frame = one_row_frame();

        let stable_bands =
            estimator.estimate(&stable, &frame, &stable.predict_rows(&frame.rows));
        let wandering_bands =
            estimator.estimate(&wandering, &frame, &wandering.predict_rows(&frame.rows));

        assert!(wandering_bands.confidence[0] < stable_bands.confidence[0]);
    }

    #[test]
    fn test_interval_width_matches_margin_formula() {
        let model = make_regressor(&[5.0, -4.0, 6.0, -3.0], 0.0);
        let estimator = ConfidenceEstimator::new(0.95).unwrap();
        let frame = one_row_frame();
        let predictions = model.predict_rows(&frame.rows);

        let bands = estimator.estimate(&model, &frame, &predictions);
        let width = bands.upper[0] - bands.lower[0];
        let expected =
            2.0 * estimator.z_score() * (1.0 - bands.confidence[0]) * predictions[0].abs();
        assert!((width - expected).abs() < 1e-9);
    }

    #[test]
    fn test_lower_confidence_never_narrows_interval() {
        let stable = make_regressor(&[4.0, 0.0, 0.0, 0.0], 0.0);
        let wandering = make_regressor(&[5.0, -4.0, 6.0, -3.0], 0.0);
        let estimator = ConfidenceEstimator::new(0.95).unwrap();
        let frame = one_row_frame();

        // Both chains end at the same full prediction (leaves sum to 4)
        let stable_pred = stable.predict_rows(&frame.rows);
        let wandering_pred = wandering.predict_rows(&frame.rows);
        assert!((stable_pred[0] - 4.0).abs() < 1e-12);
        assert!((wandering_pred[0] - 4.0).abs() < 1e-12);

        let stable_bands = estimator.estimate(&stable, &frame, &stable_pred);
        let wandering_bands = estimator.estimate(&wandering, &frame, &wandering_pred);
        let stable_width = stable_bands.upper[0] - stable_bands.lower[0];
        let wandering_width = wandering_bands.upper[0] - wandering_bands.lower[0];
        assert!(wandering_width >= stable_width);
    }

    #[test]
    fn test_single_tree_scores_full_confidence() {
        let model = make_regressor(&[2.5], 0.0);
        let estimator = ConfidenceEstimator::new(0.95).unwrap();
        let frame = one_row_frame();
        let predictions = model.predict_rows(&frame.rows);

        let bands = estimator.estimate(&model, &frame, &predictions);
        assert!((bands.confidence[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_prediction_zero_width_interval() {
        let model = make_regressor(&[3.0, -3.0, 2.0, -2.0], 0.0);
        let estimator = ConfidenceEstimator::new(0.95).unwrap();
        let frame = one_row_frame();
        let predictions = model.predict_rows(&frame.rows);
        assert_eq!(predictions[0], 0.0);

        let bands = estimator.estimate(&model, &frame, &predictions);
        assert_eq!(bands.lower[0], 0.0);
        assert_eq!(bands.upper[0], 0.0);
    }

    #[test]
    fn test_missing_prediction_gets_missing_bands() {
        let model = make_regressor(&[5.0], 0.0);
        let estimator = ConfidenceEstimator::new(0.95).unwrap();
        let frame = one_row_frame();

        let bands = estimator.estimate(&model, &frame, &[f64::NAN]);
        assert!(bands.confidence[0].is_nan());
        assert!(bands.lower[0].is_nan());
        assert!(bands.upper[0].is_nan());
    }
}
