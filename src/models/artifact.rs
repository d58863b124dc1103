//! Gradient-boosted tree artifacts.
//!
//! Pre-trained ensembles are stored as JSON: a flat node array per tree,
//! a trained feature-name order, and the boosting constants. Inference is
//! a plain traversal — no training code lives here.
//!
//! Missing feature values (NaN) are not imputed at this layer: every
//! split node carries a `default_left` direction and a NaN simply follows
//! it, matching how the trees handled missing values during training.
//!
//! The regressor supports prediction truncated to the first k trees. The
//! confidence estimator queries increasing prefixes of the chain and
//! measures how early the ensemble stabilizes.

use serde::{Deserialize, Serialize};

use super::ModelError;

// ============================================================================
// Tree Structure
// ============================================================================

/// One node in a flattened regression tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    /// Feature index to split on; negative marks a leaf
    pub feature: i32,
    /// Split threshold; values <= threshold go left
    pub threshold: f64,
    /// Left child index into the node array
    pub left: i32,
    /// Right child index into the node array
    pub right: i32,
    /// Direction a missing (NaN) feature value takes
    pub default_left: bool,
    /// Leaf output; meaningful only when `feature` is negative
    pub value: f64,
}

impl TreeNode {
    fn is_leaf(&self) -> bool {
        self.feature < 0
    }
}

/// A single regression tree as a flat node array, root at index 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Walk one sample from the root to a leaf.
    ///
    /// Traversal is total: validation guarantees child indices only move
    /// forward through the array, and any index outside it ends the walk
    /// with NaN instead of panicking.
    #[allow(clippy::cast_sign_loss)]
    pub fn predict_row(&self, features: &[f64]) -> f64 {
        let mut idx = 0usize;
        loop {
            let Some(node) = self.nodes.get(idx) else {
                return f64::NAN;
            };
            if node.is_leaf() {
                return node.value;
            }
            let value = features.get(node.feature as usize).copied().unwrap_or(f64::NAN);
            let go_left = if value.is_nan() {
                node.default_left
            } else {
                value <= node.threshold
            };
            let next = if go_left { node.left } else { node.right };
            if next < 0 {
                return f64::NAN;
            }
            idx = next as usize;
        }
    }

    /// Structural checks run once at load time.
    ///
    /// Split nodes must reference a feature inside the declared count and
    /// children strictly after themselves (forward-only, so traversal
    /// terminates); leaf values and thresholds must be finite.
    fn validate(&self, artifact: &str, tree: usize, n_features: usize) -> Result<(), ModelError> {
        let invalid = |reason: String| ModelError::Invalid {
            artifact: artifact.to_string(),
            reason,
        };

        if self.nodes.is_empty() {
            return Err(invalid(format!("tree {tree} has no nodes")));
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if node.is_leaf() {
                if !node.value.is_finite() {
                    return Err(invalid(format!(
                        "tree {tree} node {i} has non-finite leaf value"
                    )));
                }
                continue;
            }

            // Split nodes have feature >= 0, so the conversion cannot fail
            let feature = usize::try_from(node.feature).unwrap_or(usize::MAX);
            if feature >= n_features {
                return Err(invalid(format!(
                    "tree {tree} node {i} splits on feature {feature} but only {n_features} are declared"
                )));
            }
            if !node.threshold.is_finite() {
                return Err(invalid(format!(
                    "tree {tree} node {i} has non-finite threshold"
                )));
            }
            for child in [node.left, node.right] {
                let Ok(child) = usize::try_from(child) else {
                    return Err(invalid(format!(
                        "tree {tree} node {i} has a negative child index"
                    )));
                };
                if child <= i || child >= self.nodes.len() {
                    return Err(invalid(format!(
                        "tree {tree} node {i} references child {child} out of order"
                    )));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Regressor
// ============================================================================

/// Boosted regression ensemble: `base_score + learning_rate * Σ tree(x)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbtRegressor {
    /// Channel names in trained column order; rows must be built to match
    pub feature_names: Vec<String>,
    /// Baseline prediction before any tree correction
    pub base_score: f64,
    /// Shrinkage applied to every tree's contribution
    pub learning_rate: f64,
    pub trees: Vec<RegressionTree>,
}

impl GbtRegressor {
    pub fn validate(&self, artifact: &str) -> Result<(), ModelError> {
        let invalid = |reason: &str| ModelError::Invalid {
            artifact: artifact.to_string(),
            reason: reason.to_string(),
        };

        if self.feature_names.is_empty() {
            return Err(invalid("no feature names declared"));
        }
        if self.trees.is_empty() {
            return Err(invalid("no trees"));
        }
        if !self.base_score.is_finite() {
            return Err(invalid("non-finite base score"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(invalid("learning rate must be finite and positive"));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(artifact, i, self.feature_names.len())?;
        }
        Ok(())
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Predict one sample with the full chain.
    pub fn predict_row(&self, features: &[f64]) -> f64 {
        self.predict_row_truncated(features, self.trees.len())
    }

    /// Predict one sample using only the first `n_trees` trees.
    pub fn predict_row_truncated(&self, features: &[f64], n_trees: usize) -> f64 {
        let mut score = self.base_score;
        for tree in self.trees.iter().take(n_trees) {
            score += self.learning_rate * tree.predict_row(features);
        }
        score
    }

    pub fn predict_rows(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        self.predict_rows_truncated(rows, self.trees.len())
    }

    pub fn predict_rows_truncated(&self, rows: &[Vec<f64>], n_trees: usize) -> Vec<f64> {
        rows.iter()
            .map(|row| self.predict_row_truncated(row, n_trees))
            .collect()
    }
}

// ============================================================================
// Classifier
// ============================================================================

/// Boosted one-vs-rest classifier: one tree chain per class, softmax over
/// the accumulated class scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbtClassifier {
    /// Channel names in trained column order
    pub feature_names: Vec<String>,
    /// Shrinkage applied to every tree's contribution
    pub learning_rate: f64,
    /// Per-class log-odds baselines
    pub base_scores: Vec<f64>,
    /// `class_trees[k]` is the boosting chain for class k
    pub class_trees: Vec<Vec<RegressionTree>>,
}

impl GbtClassifier {
    pub fn validate(&self, artifact: &str) -> Result<(), ModelError> {
        let invalid = |reason: String| ModelError::Invalid {
            artifact: artifact.to_string(),
            reason,
        };

        if self.feature_names.is_empty() {
            return Err(invalid("no feature names declared".to_string()));
        }
        if self.class_trees.len() < 2 {
            return Err(invalid(format!(
                "need at least 2 classes, found {}",
                self.class_trees.len()
            )));
        }
        if self.base_scores.len() != self.class_trees.len() {
            return Err(invalid(format!(
                "{} base scores for {} classes",
                self.base_scores.len(),
                self.class_trees.len()
            )));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(invalid("learning rate must be finite and positive".to_string()));
        }
        for (k, (chain, base)) in self.class_trees.iter().zip(&self.base_scores).enumerate() {
            if chain.is_empty() {
                return Err(invalid(format!("class {k} has an empty tree chain")));
            }
            if !base.is_finite() {
                return Err(invalid(format!("class {k} has a non-finite base score")));
            }
            for (i, tree) in chain.iter().enumerate() {
                tree.validate(artifact, i, self.feature_names.len())?;
            }
        }
        Ok(())
    }

    pub fn n_classes(&self) -> usize {
        self.class_trees.len()
    }

    /// Per-class probabilities for one sample.
    pub fn predict_proba_row(&self, features: &[f64]) -> Vec<f64> {
        let mut scores = self.base_scores.clone();
        for (k, chain) in self.class_trees.iter().enumerate() {
            for tree in chain {
                scores[k] += self.learning_rate * tree.predict_row(features);
            }
        }
        softmax(&scores)
    }

    /// Predicted class id and its probability for one sample.
    pub fn predict_row(&self, features: &[f64]) -> (usize, f64) {
        let probabilities = self.predict_proba_row(features);
        let mut best = (0usize, 0.0f64);
        for (k, &p) in probabilities.iter().enumerate() {
            if p > best.1 {
                best = (k, p);
            }
        }
        best
    }
}

/// Numerically stable softmax (max-shifted before exponentiation).
fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = scores.iter().map(|&s| (s - max).exp()).collect();
    let sum: f64 = exp.iter().sum();
    exp.iter().map(|&e| e / sum).collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Single split on `feature`: <= threshold → left leaf, else right leaf.
    fn stump(feature: i32, threshold: f64, left: f64, right: f64, default_left: bool) -> RegressionTree {
        RegressionTree {
            nodes: vec![
                TreeNode {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                    default_left,
                    value: 0.0,
                },
                leaf(left),
                leaf(right),
            ],
        }
    }

    fn leaf(value: f64) -> TreeNode {
        TreeNode {
            feature: -1,
            threshold: 0.0,
            left: -1,
            right: -1,
            default_left: true,
            value,
        }
    }

    fn make_regressor(trees: Vec<RegressionTree>) -> GbtRegressor {
        GbtRegressor {
            feature_names: vec!["DEPTH".to_string(), "GR".to_string()],
            base_score: 0.5,
            learning_rate: 0.1,
            trees,
        }
    }

    #[test]
    fn test_stump_routes_by_threshold() {
        let tree = stump(0, 10.0, -1.0, 1.0, true);
        assert_eq!(tree.predict_row(&[5.0]), -1.0);
        assert_eq!(tree.predict_row(&[10.0]), -1.0); // boundary goes left
        assert_eq!(tree.predict_row(&[15.0]), 1.0);
    }

    #[test]
    fn test_nan_follows_default_direction() {
        let via_left = stump(0, 10.0, -1.0, 1.0, true);
        let via_right = stump(0, 10.0, -1.0, 1.0, false);
        assert_eq!(via_left.predict_row(&[f64::NAN]), -1.0);
        assert_eq!(via_right.predict_row(&[f64::NAN]), 1.0);
    }

    #[test]
    fn test_short_feature_row_treated_as_missing() {
        let tree = stump(1, 0.0, -1.0, 1.0, false);
        // feature index 1 is out of range for a 1-wide row
        assert_eq!(tree.predict_row(&[5.0]), 1.0);
    }

    #[test]
    fn test_regressor_sums_scaled_tree_outputs() {
        let regressor = make_regressor(vec![
            stump(0, 10.0, -1.0, 1.0, true),
            stump(0, 20.0, -2.0, 2.0, true),
        ]);
        // 0.5 + 0.1*1.0 + 0.1*(-2.0)
        let y = regressor.predict_row(&[15.0, 0.0]);
        assert!((y - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_truncated_prediction_uses_prefix_only() {
        let regressor = make_regressor(vec![
            stump(0, 10.0, -1.0, 1.0, true),
            stump(0, 20.0, -2.0, 2.0, true),
        ]);
        let first_only = regressor.predict_row_truncated(&[15.0, 0.0], 1);
        assert!((first_only - 0.6).abs() < 1e-12); // 0.5 + 0.1*1.0

        // Truncation beyond the chain is the full prediction
        let all = regressor.predict_row_truncated(&[15.0, 0.0], 99);
        assert!((all - regressor.predict_row(&[15.0, 0.0])).abs() < 1e-12);
    }

    #[test]
    fn test_batch_prediction_matches_rowwise() {
        let regressor = make_regressor(vec![stump(0, 10.0, -1.0, 1.0, true)]);
        let rows = vec![vec![5.0, 0.0], vec![15.0, 0.0]];
        let batch = regressor.predict_rows(&rows);
        assert_eq!(batch.len(), 2);
        assert!((batch[0] - regressor.predict_row(&rows[0])).abs() < 1e-12);
        assert!((batch[1] - regressor.predict_row(&rows[1])).abs() < 1e-12);
    }

    #[test]
    fn test_validation_accepts_well_formed_regressor() {
        let regressor = make_regressor(vec![stump(1, 50.0, 0.1, 0.2, true)]);
        assert!(regressor.validate("porosity").is_ok());
    }

    #[test]
    fn test_validation_rejects_backward_child_reference() {
        let mut tree = stump(0, 10.0, -1.0, 1.0, true);
        tree.nodes[0].left = 0; // self reference would loop forever
        let regressor = make_regressor(vec![tree]);
        assert!(regressor.validate("porosity").is_err());
    }

    #[test]
    fn test_validation_rejects_out_of_range_feature() {
        let regressor = make_regressor(vec![stump(7, 10.0, -1.0, 1.0, true)]);
        let err = regressor.validate("porosity").unwrap_err();
        assert!(err.to_string().contains("feature 7"));
    }

    #[test]
    fn test_validation_rejects_empty_chain() {
        let regressor = make_regressor(vec![]);
        assert!(regressor.validate("porosity").is_err());
    }

    fn make_classifier() -> GbtClassifier {
        GbtClassifier {
            feature_names: vec!["DEPTH".to_string(), "GR".to_string()],
            learning_rate: 1.0,
            base_scores: vec![0.0, 0.0, 0.0],
            class_trees: vec![
                // class 0 favored when f0 <= 10
                vec![stump(0, 10.0, 2.0, -1.0, true)],
                // class 1 favored when f0 > 10
                vec![stump(0, 10.0, -1.0, 2.0, true)],
                // class 2 favored when f1 > 100
                vec![stump(1, 100.0, -1.0, 2.0, true)],
            ],
        }
    }

    #[test]
    fn test_classifier_probabilities_sum_to_one() {
        let classifier = make_classifier();
        let probabilities = classifier.predict_proba_row(&[5.0, 50.0]);
        assert_eq!(probabilities.len(), 3);
        let sum: f64 = probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_classifier_argmax_and_confidence() {
        let classifier = make_classifier();
        let (class, confidence) = classifier.predict_row(&[5.0, 50.0]);
        assert_eq!(class, 0);
        assert!(confidence > 1.0 / 3.0);

        let (class, _) = classifier.predict_row(&[50.0, 50.0]);
        assert_eq!(class, 1);

        let (class, _) = classifier.predict_row(&[5.0, 500.0]);
        // f0 pushes class 0 and f1 pushes class 2 equally; tie breaks low
        assert!(class == 0 || class == 2);
    }

    #[test]
    fn test_classifier_rejects_base_score_mismatch() {
        let mut classifier = make_classifier();
        classifier.base_scores.pop();
        assert!(classifier.validate("fluid").is_err());
    }

    #[test]
    fn test_classifier_rejects_single_class() {
        let mut classifier = make_classifier();
        classifier.class_trees.truncate(1);
        classifier.base_scores.truncate(1);
        assert!(classifier.validate("fluid").is_err());
    }

    #[test]
    fn test_artifact_json_wire_format() {
        let json = r#"{
            "feature_names": ["DEPTH", "GR"],
            "base_score": 0.5,
            "learning_rate": 0.1,
            "trees": [
                { "nodes": [
                    { "feature": 0, "threshold": 10.0, "left": 1, "right": 2,
                      "default_left": true, "value": 0.0 },
                    { "feature": -1, "threshold": 0.0, "left": -1, "right": -1,
                      "default_left": true, "value": -1.0 },
                    { "feature": -1, "threshold": 0.0, "left": -1, "right": -1,
                      "default_left": true, "value": 1.0 }
                ] }
            ]
        }"#;
        let regressor: GbtRegressor = serde_json::from_str(json).unwrap();
        assert!(regressor.validate("porosity").is_ok());
        assert!((regressor.predict_row(&[5.0, 0.0]) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_regressor_round_trips_through_json() {
        let regressor = make_regressor(vec![stump(0, 10.0, -1.0, 1.0, false)]);
        let json = serde_json::to_string(&regressor).unwrap();
        let back: GbtRegressor = serde_json::from_str(&json).unwrap();
        assert!((back.predict_row(&[25.0, 0.0]) - regressor.predict_row(&[25.0, 0.0])).abs() < 1e-12);
    }
}
