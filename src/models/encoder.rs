//! Fluid-class label codec.
//!
//! The classifier was trained against integer class ids; the mapping back
//! to fluid labels travels with the model bundle as `label_encoder.json`.
//! Raw label strings are parsed into the fixed [`FluidClass`] domain once
//! at load time, after which the mapping is an immutable value object —
//! decoding is a slice index, never a lookup that can drift.

use serde::Deserialize;

use super::ModelError;
use crate::types::FluidClass;

/// On-disk form: an ordered list of class label strings, index = class id.
#[derive(Debug, Clone, Deserialize)]
pub struct RawLabelEncoder {
    pub classes: Vec<String>,
}

/// Bidirectional mapping between classifier class ids and fluid labels.
#[derive(Debug, Clone)]
pub struct LabelEncoder {
    classes: Vec<FluidClass>,
}

impl LabelEncoder {
    /// Parse and validate raw label strings.
    ///
    /// Every label must name one of the three fluid classes and no class
    /// may appear twice; the id order is preserved exactly as stored.
    pub fn from_labels(labels: &[String]) -> Result<Self, ModelError> {
        if labels.is_empty() {
            return Err(ModelError::Invalid {
                artifact: "label encoder".to_string(),
                reason: "no classes listed".to_string(),
            });
        }

        let mut classes = Vec::with_capacity(labels.len());
        for label in labels {
            let class = FluidClass::from_label(label).ok_or_else(|| ModelError::UnknownLabel {
                label: label.clone(),
            })?;
            if classes.contains(&class) {
                return Err(ModelError::Invalid {
                    artifact: "label encoder".to_string(),
                    reason: format!("class '{class}' listed twice"),
                });
            }
            classes.push(class);
        }
        Ok(Self { classes })
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Class id → fluid label.
    pub fn decode(&self, class_id: usize) -> Option<FluidClass> {
        self.classes.get(class_id).copied()
    }

    /// Fluid label → class id.
    pub fn encode(&self, class: FluidClass) -> Option<usize> {
        self.classes.iter().position(|&c| c == class)
    }

    pub fn classes(&self) -> &[FluidClass] {
        &self.classes
    }
}
