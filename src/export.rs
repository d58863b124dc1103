//! Run output writers.
//!
//! Two formats: a flat CSV of the augmented table (one row per depth,
//! missing values as empty cells) and a JSON envelope carrying the full
//! [`PipelineRun`] — table, target/model/quality reports — plus export
//! metadata. Non-finite floats serialize as `null` in JSON, so missing
//! stays missing on the wire in both formats.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::types::{LogTable, PipelineRun};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize run output")]
    Serialize(#[from] serde_json::Error),
}

// ============================================================================
// CSV
// ============================================================================

/// Write the table as CSV: `DEPTH`, then float channels, then class
/// columns, in stored (alphabetical) order. Missing values become empty
/// cells, which [`crate::loader::read_csv`] reads back as missing.
pub fn write_csv(table: &LogTable, path: &Path) -> Result<(), ExportError> {
    let channel_names: Vec<&str> = table.channel_names().collect();
    let class_names: Vec<&str> = table.class_names().collect();

    let mut out = String::new();
    out.push_str("DEPTH");
    for name in channel_names.iter().chain(&class_names) {
        out.push(',');
        out.push_str(&csv_field(name));
    }
    out.push('\n');

    for row in 0..table.row_count() {
        let _ = write!(out, "{}", table.depth()[row]);
        for name in &channel_names {
            out.push(',');
            if let Some(values) = table.channel(name) {
                let value = values[row];
                if value.is_finite() {
                    let _ = write!(out, "{value}");
                }
            }
        }
        for name in &class_names {
            out.push(',');
            if let Some(Some(class)) = table.class_column(name).map(|labels| labels[row]) {
                out.push_str(&csv_field(class.as_str()));
            }
        }
        out.push('\n');
    }

    fs::write(path, out).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(file = %path.display(), rows = table.row_count(), "wrote CSV");
    Ok(())
}

/// Quote a field when it contains a comma, quote, or newline.
fn csv_field(raw: &str) -> String {
    if raw.contains(',') || raw.contains('"') || raw.contains('\n') {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

// ============================================================================
// JSON
// ============================================================================

#[derive(Serialize)]
struct JsonEnvelope<'a> {
    exported_at: DateTime<Utc>,
    rows: usize,
    channels: usize,
    run: &'a PipelineRun,
}

/// Write the full run — augmented table plus every report — as pretty
/// JSON with an export timestamp and size metadata up front.
pub fn write_json(run: &PipelineRun, path: &Path) -> Result<(), ExportError> {
    let envelope = JsonEnvelope {
        exported_at: Utc::now(),
        rows: run.table.row_count(),
        channels: run.table.channel_names().count(),
        run,
    };
    let body = serde_json::to_string_pretty(&envelope)?;

    fs::write(path, body).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(file = %path.display(), rows = envelope.rows, "wrote JSON run output");
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
