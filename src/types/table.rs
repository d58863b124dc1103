//! Depth-indexed log table: the validated column store every stage works on
//!
//! A [`LogTable`] holds one depth column plus an open set of named float
//! channels (NaN = missing) and named categorical class columns. Construction
//! enforces the table invariants, so any `LogTable` handed to a pipeline
//! stage is already known-good:
//!
//! - depth is present and non-empty
//! - every depth value is finite and non-negative
//! - depth values are unique and sorted ascending (construction sorts all
//!   columns by the depth permutation)
//! - every column has exactly one value per depth sample

use crate::types::fluid::FluidClass;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Fatal table-shape problems, surfaced at construction time.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("required column 'DEPTH' is missing")]
    MissingDepthColumn,

    #[error("table has zero rows")]
    EmptyTable,

    #[error("depth at row {row} is not finite")]
    NonFiniteDepth { row: usize },

    #[error("depth at row {row} is negative ({value} ft)")]
    NegativeDepth { row: usize, value: f64 },

    #[error("duplicate depth value {value} ft")]
    DuplicateDepth { value: f64 },

    #[error("column '{column}' has {len} values but the table has {rows} rows")]
    ColumnLengthMismatch {
        column: String,
        len: usize,
        rows: usize,
    },
}

// ============================================================================
// LogTable
// ============================================================================

/// Validated, depth-sorted table of well-log samples.
#[derive(Debug, Clone, Serialize)]
pub struct LogTable {
    /// Measured depth (ft), sorted ascending, unique
    depth: Vec<f64>,
    /// Float sensor/derived channels; NaN marks a missing sample
    channels: BTreeMap<String, Vec<f64>>,
    /// Categorical class columns (fluid labels); None marks a missing sample
    classes: BTreeMap<String, Vec<Option<FluidClass>>>,
}

impl LogTable {
    /// Build a table from a depth column and float channels.
    ///
    /// Rows are reordered so depth is ascending; all channels follow the
    /// same permutation.
    pub fn from_columns(
        depth: Vec<f64>,
        channels: BTreeMap<String, Vec<f64>>,
    ) -> Result<Self, TableError> {
        Self::from_parts(depth, channels, BTreeMap::new())
    }

    /// Build a table from depth, float channels, and categorical columns.
    pub fn from_parts(
        depth: Vec<f64>,
        channels: BTreeMap<String, Vec<f64>>,
        classes: BTreeMap<String, Vec<Option<FluidClass>>>,
    ) -> Result<Self, TableError> {
        if depth.is_empty() {
            return Err(TableError::EmptyTable);
        }
        for (row, &value) in depth.iter().enumerate() {
            if !value.is_finite() {
                return Err(TableError::NonFiniteDepth { row });
            }
            if value < 0.0 {
                return Err(TableError::NegativeDepth { row, value });
            }
        }

        let rows = depth.len();
        for (column, values) in &channels {
            if values.len() != rows {
                return Err(TableError::ColumnLengthMismatch {
                    column: column.clone(),
                    len: values.len(),
                    rows,
                });
            }
        }
        for (column, values) in &classes {
            if values.len() != rows {
                return Err(TableError::ColumnLengthMismatch {
                    column: column.clone(),
                    len: values.len(),
                    rows,
                });
            }
        }

        let mut table = Self {
            depth,
            channels,
            classes,
        };
        table.sort_by_depth()?;
        Ok(table)
    }

    /// Sort every column by ascending depth and reject duplicates.
    fn sort_by_depth(&mut self) -> Result<(), TableError> {
        let already_sorted = self.depth.windows(2).all(|w| w[0] < w[1]);
        if already_sorted {
            return Ok(());
        }

        let mut order: Vec<usize> = (0..self.depth.len()).collect();
        order.sort_by(|&a, &b| self.depth[a].total_cmp(&self.depth[b]));

        self.depth = permute(&self.depth, &order);
        if let Some(w) = self.depth.windows(2).find(|w| w[0] >= w[1]) {
            return Err(TableError::DuplicateDepth { value: w[0] });
        }

        for values in self.channels.values_mut() {
            *values = permute(values, &order);
        }
        for values in self.classes.values_mut() {
            *values = permute(values, &order);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Shape
    // ------------------------------------------------------------------

    /// Number of depth samples
    pub fn row_count(&self) -> usize {
        self.depth.len()
    }

    /// The sorted depth column (ft)
    pub fn depth(&self) -> &[f64] {
        &self.depth
    }

    /// Names of all float channels, in deterministic (sorted) order
    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    /// Names of all categorical columns, in deterministic (sorted) order
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    // ------------------------------------------------------------------
    // Column access
    // ------------------------------------------------------------------

    /// A float channel by name, if present. `DEPTH` is not addressable here;
    /// use [`LogTable::depth`].
    pub fn channel(&self, name: &str) -> Option<&[f64]> {
        self.channels.get(name).map(Vec::as_slice)
    }

    /// A categorical column by name, if present.
    pub fn class_column(&self, name: &str) -> Option<&[Option<FluidClass>]> {
        self.classes.get(name).map(Vec::as_slice)
    }

    /// True when the name refers to the depth column, a float channel, or a
    /// categorical column.
    pub fn has_column(&self, name: &str) -> bool {
        name == super::channels::DEPTH
            || self.channels.contains_key(name)
            || self.classes.contains_key(name)
    }

    /// True when the channel can feed a model: it is the depth column, or a
    /// float channel with at least one finite value.
    pub fn is_usable(&self, name: &str) -> bool {
        if name == super::channels::DEPTH {
            return true;
        }
        self.channels
            .get(name)
            .is_some_and(|values| values.iter().any(|v| v.is_finite()))
    }

    /// Values for a feature channel, resolving `DEPTH` to the depth column.
    pub fn feature_values(&self, name: &str) -> Option<&[f64]> {
        if name == super::channels::DEPTH {
            Some(&self.depth)
        } else {
            self.channel(name)
        }
    }

    // ------------------------------------------------------------------
    // Column statistics
    // ------------------------------------------------------------------

    /// Median over the finite values of a feature channel. None when the
    /// channel is absent or has no finite values.
    pub fn column_median(&self, name: &str) -> Option<f64> {
        let values = self.feature_values(name)?;
        let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return None;
        }
        finite.sort_by(f64::total_cmp);
        let mid = finite.len() / 2;
        if finite.len() % 2 == 0 {
            Some((finite[mid - 1] + finite[mid]) / 2.0)
        } else {
            Some(finite[mid])
        }
    }

    /// Count of missing (non-finite) samples in a float channel.
    pub fn missing_count(&self, name: &str) -> Option<usize> {
        self.channels
            .get(name)
            .map(|values| values.iter().filter(|v| !v.is_finite()).count())
    }

    // ------------------------------------------------------------------
    // Mutation (column insertion only - rows are fixed at construction)
    // ------------------------------------------------------------------

    /// Insert or replace a float channel. The table is already depth-sorted,
    /// so values must be supplied in table row order.
    pub fn insert_channel(&mut self, name: &str, values: Vec<f64>) -> Result<(), TableError> {
        if values.len() != self.row_count() {
            return Err(TableError::ColumnLengthMismatch {
                column: name.to_string(),
                len: values.len(),
                rows: self.row_count(),
            });
        }
        self.channels.insert(name.to_string(), values);
        Ok(())
    }

    /// Insert or replace a categorical column, in table row order.
    pub fn insert_class_column(
        &mut self,
        name: &str,
        values: Vec<Option<FluidClass>>,
    ) -> Result<(), TableError> {
        if values.len() != self.row_count() {
            return Err(TableError::ColumnLengthMismatch {
                column: name.to_string(),
                len: values.len(),
                rows: self.row_count(),
            });
        }
        self.classes.insert(name.to_string(), values);
        Ok(())
    }
}

/// Apply a row permutation to one column.
fn permute<T: Clone>(values: &[T], order: &[usize]) -> Vec<T> {
    order.iter().map(|&i| values[i].clone()).collect()
}

// ============================================================================
// Tests
// ============================================================================
