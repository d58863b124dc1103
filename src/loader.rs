//! CSV log ingestion.
//!
//! Reads a depth-indexed CSV export into a [`LogTable`]. The header row
//! names the channels; `DEPTH` is required, everything else is optional.
//! Cells holding `NA`, `NaN`, `N/A`, `null`, or nothing parse as missing.
//! A `FLUID_CLASS` (or `FLUID_CLASS_PRED`) column is read as fluid labels
//! rather than numbers, so externally supplied ground truth survives a
//! round trip through export and re-import.
//!
//! Parsing is tolerant per row: a row with the wrong field count or an
//! unreadable depth is skipped with a warning, and a malformed numeric
//! cell degrades to missing. Structural problems — no header, no `DEPTH`
//! column, zero usable rows — are fatal.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::types::{channels, FluidClass, LogTable, TableError};

/// Cap on per-row warnings so a broken file cannot flood the log.
const MAX_ROW_WARNINGS: usize = 10;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is empty; expected a CSV header row", path.display())]
    Empty { path: PathBuf },

    #[error("{} has no {} column", path.display(), channels::DEPTH)]
    MissingDepth { path: PathBuf },

    #[error("no usable data rows in {} ({skipped} skipped)", path.display())]
    NoRows { path: PathBuf, skipped: usize },

    #[error("{} does not form a valid log table", path.display())]
    Table {
        path: PathBuf,
        #[source]
        source: TableError,
    },
}

// ============================================================================
// Column Layout
// ============================================================================

/// What each CSV position feeds into.
enum Slot {
    Depth,
    /// Index into the float channel buffers.
    Channel(usize),
    /// Index into the class column buffers.
    Class(usize),
    /// Duplicate or unnamed header; cells are discarded.
    Ignore,
}

struct Layout {
    slots: Vec<Slot>,
    channel_names: Vec<String>,
    class_names: Vec<String>,
}

impl Layout {
    fn from_header(header: &str) -> Option<Self> {
        let names: Vec<String> = csv_split(header)
            .iter()
            .map(|raw| raw.trim().to_uppercase())
            .collect();

        let mut slots = Vec::with_capacity(names.len());
        let mut channel_names: Vec<String> = Vec::new();
        let mut class_names: Vec<String> = Vec::new();
        let mut depth_seen = false;

        for name in &names {
            if name.is_empty() {
                slots.push(Slot::Ignore);
                continue;
            }
            if name == channels::DEPTH {
                if depth_seen {
                    warn!(column = %name, "duplicate column ignored");
                    slots.push(Slot::Ignore);
                } else {
                    depth_seen = true;
                    slots.push(Slot::Depth);
                }
                continue;
            }
            if channel_names.contains(name) || class_names.contains(name) {
                warn!(column = %name, "duplicate column ignored");
                slots.push(Slot::Ignore);
                continue;
            }
            if is_label_column(name) {
                slots.push(Slot::Class(class_names.len()));
                class_names.push(name.clone());
            } else {
                slots.push(Slot::Channel(channel_names.len()));
                channel_names.push(name.clone());
            }
        }

        depth_seen.then_some(Self {
            slots,
            channel_names,
            class_names,
        })
    }

    fn width(&self) -> usize {
        self.slots.len()
    }
}

/// Columns that hold fluid labels instead of numbers.
fn is_label_column(name: &str) -> bool {
    name == channels::FLUID_CLASS || name == channels::pred_column(channels::FLUID_CLASS)
}

// ============================================================================
// Reading
// ============================================================================

/// Read a CSV file into a validated [`LogTable`].
///
/// Table construction sorts the rows by depth, so the input file does
/// not need to be depth-ordered.
pub fn read_csv(path: &Path) -> Result<LogTable, LoaderError> {
    let file = File::open(path).map_err(|source| LoaderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut lines = BufReader::new(file).lines();

    let header = match lines.next() {
        Some(result) => result.map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?,
        None => {
            return Err(LoaderError::Empty {
                path: path.to_path_buf(),
            })
        }
    };

    let layout = Layout::from_header(&header).ok_or_else(|| LoaderError::MissingDepth {
        path: path.to_path_buf(),
    })?;

    let mut depth: Vec<f64> = Vec::new();
    let mut channel_data: Vec<Vec<f64>> = vec![Vec::new(); layout.channel_names.len()];
    let mut class_data: Vec<Vec<Option<FluidClass>>> = vec![Vec::new(); layout.class_names.len()];

    let mut skipped = 0usize;
    let mut malformed_cells = 0usize;
    let mut warnings = 0usize;
    let mut line_num = 1usize;

    for line_result in lines {
        line_num += 1;
        let line = match line_result {
            Ok(line) => line,
            Err(error) => {
                row_warning(&mut warnings, line_num, &format!("read error: {error}"));
                skipped += 1;
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let fields = csv_split(&line);
        if fields.len() != layout.width() {
            row_warning(
                &mut warnings,
                line_num,
                &format!("{} fields, expected {}", fields.len(), layout.width()),
            );
            skipped += 1;
            continue;
        }

        // Depth anchors the row; an unreadable or missing depth drops it
        // outright.
        let mut row_depth = None;
        for (slot, field) in layout.slots.iter().zip(&fields) {
            if matches!(slot, Slot::Depth) {
                row_depth = parse_cell(field).filter(|d| d.is_finite());
            }
        }
        let Some(row_depth) = row_depth else {
            row_warning(&mut warnings, line_num, "unreadable depth");
            skipped += 1;
            continue;
        };

        depth.push(row_depth);
        for (slot, field) in layout.slots.iter().zip(&fields) {
            match slot {
                Slot::Channel(idx) => {
                    let value = match parse_cell(field) {
                        Some(value) => value,
                        None => {
                            malformed_cells += 1;
                            f64::NAN
                        }
                    };
                    channel_data[*idx].push(value);
                }
                Slot::Class(idx) => {
                    class_data[*idx].push(parse_label(field, &mut malformed_cells));
                }
                Slot::Depth | Slot::Ignore => {}
            }
        }
    }

    if depth.is_empty() {
        return Err(LoaderError::NoRows {
            path: path.to_path_buf(),
            skipped,
        });
    }

    let channels_map: BTreeMap<String, Vec<f64>> = layout
        .channel_names
        .iter()
        .cloned()
        .zip(channel_data)
        .collect();
    let classes_map: BTreeMap<String, Vec<Option<FluidClass>>> = layout
        .class_names
        .iter()
        .cloned()
        .zip(class_data)
        .collect();

    let table = LogTable::from_parts(depth, channels_map, classes_map).map_err(|source| {
        LoaderError::Table {
            path: path.to_path_buf(),
            source,
        }
    })?;

    info!(
        file = %path.display(),
        rows = table.row_count(),
        channels = layout.channel_names.len(),
        skipped,
        malformed_cells,
        "loaded log table"
    );
    Ok(table)
}

fn row_warning(warnings: &mut usize, line_num: usize, message: &str) {
    if *warnings < MAX_ROW_WARNINGS {
        warn!(line = line_num, "skipping row: {message}");
    }
    *warnings += 1;
}

// ============================================================================
// Cell Parsing
// ============================================================================

/// Parse a numeric cell. `None` means the cell held something that is
/// neither a number nor a recognized missing-value marker.
fn parse_cell(raw: &str) -> Option<f64> {
    let cell = raw.trim();
    if is_missing_marker(cell) {
        return Some(f64::NAN);
    }
    cell.parse::<f64>().ok()
}

fn is_missing_marker(cell: &str) -> bool {
    cell.is_empty()
        || cell.eq_ignore_ascii_case("na")
        || cell.eq_ignore_ascii_case("n/a")
        || cell.eq_ignore_ascii_case("nan")
        || cell.eq_ignore_ascii_case("null")
}

fn parse_label(raw: &str, malformed: &mut usize) -> Option<FluidClass> {
    let cell = raw.trim();
    if is_missing_marker(cell) {
        return None;
    }
    let class = FluidClass::from_label(cell);
    if class.is_none() {
        *malformed += 1;
    }
    class
}

/// Split a CSV line respecting quoted fields (commas inside quotes stay
/// inside the field, doubled quotes unescape).
fn csv_split(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    if chars.peek() == Some(&'"') {
                        current.push('"');
                        chars.next();
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            ',' if !in_quotes => {
                fields.push(current.clone());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_csv(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("well.csv");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_read_basic_csv() {
        let (_dir, path) = write_csv("DEPTH,GR,RT\n2000.0,85.0,12.5\n2000.5,90.0,14.0\n");
        let table = read_csv(&path).unwrap();

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.depth(), &[2000.0, 2000.5]);
        assert_eq!(table.channel("GR").unwrap(), &[85.0, 90.0]);
        assert_eq!(table.channel("RT").unwrap(), &[12.5, 14.0]);
    }

    #[test]
    fn test_headers_normalized() {
        let (_dir, path) = write_csv(" depth , gr \n2000.0,85.0\n");
        let table = read_csv(&path).unwrap();
        assert!(table.has_column("GR"));
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_missing_markers_parse_as_nan() {
        let (_dir, path) = write_csv(
            "DEPTH,GR\n2000.0,NA\n2000.5,\n2001.0,NaN\n2001.5,null\n2002.0,n/a\n2002.5,42.0\n",
        );
        let table = read_csv(&path).unwrap();
        let gr = table.channel("GR").unwrap();
        assert!(gr[..5].iter().all(|v| v.is_nan()));
        assert!((gr[5] - 42.0).abs() < 1e-12);
    }

    #[test]
    fn test_malformed_cell_degrades_to_missing() {
        let (_dir, path) = write_csv("DEPTH,GR\n2000.0,bogus\n2000.5,50.0\n");
        let table = read_csv(&path).unwrap();
        let gr = table.channel("GR").unwrap();
        assert_eq!(table.row_count(), 2);
        assert!(gr[0].is_nan());
        assert!((gr[1] - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_bad_depth_row_skipped() {
        let (_dir, path) = write_csv("DEPTH,GR\nxx,10.0\nNA,15.0\n2000.0,20.0\n");
        let table = read_csv(&path).unwrap();
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.channel("GR").unwrap(), &[20.0]);
    }

    #[test]
    fn test_ragged_row_skipped() {
        let (_dir, path) = write_csv("DEPTH,GR,RT\n2000.0,10.0\n2000.5,20.0,5.0\n");
        let table = read_csv(&path).unwrap();
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.depth(), &[2000.5]);
    }

    #[test]
    fn test_unsorted_input_sorted_by_depth() {
        let (_dir, path) = write_csv("DEPTH,GR\n2002.0,30.0\n2000.0,10.0\n2001.0,20.0\n");
        let table = read_csv(&path).unwrap();
        assert_eq!(table.depth(), &[2000.0, 2001.0, 2002.0]);
        assert_eq!(table.channel("GR").unwrap(), &[10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_fluid_class_column_restored() {
        let (_dir, path) = write_csv(
            "DEPTH,RT,FLUID_CLASS\n2000.0,150.0,Potential Reservoir\n2000.5,50.0,pay_zone\n2001.0,5.0,\n2001.5,3.0,swamp\n",
        );
        let table = read_csv(&path).unwrap();
        let labels = table.class_column("FLUID_CLASS").unwrap();

        assert_eq!(labels[0], Some(FluidClass::PotentialReservoir));
        assert_eq!(labels[1], Some(FluidClass::PayZone));
        assert_eq!(labels[2], None);
        assert_eq!(labels[3], None);
        // The labels live in a class column, not a float channel.
        assert!(table.channel("FLUID_CLASS").is_none());
    }

    #[test]
    fn test_quoted_fields() {
        let (_dir, path) = write_csv("DEPTH,GR,FLUID_CLASS\n\"2000.0\",\"85.0\",\"Pay Zone\"\n");
        let table = read_csv(&path).unwrap();
        assert_eq!(table.channel("GR").unwrap(), &[85.0]);
        assert_eq!(
            table.class_column("FLUID_CLASS").unwrap()[0],
            Some(FluidClass::PayZone)
        );
    }

    #[test]
    fn test_duplicate_column_keeps_first() {
        let (_dir, path) = write_csv("DEPTH,GR,GR\n2000.0,10.0,99.0\n");
        let table = read_csv(&path).unwrap();
        assert_eq!(table.channel("GR").unwrap(), &[10.0]);
    }

    #[test]
    fn test_empty_file_rejected() {
        let (_dir, path) = write_csv("");
        assert!(matches!(read_csv(&path), Err(LoaderError::Empty { .. })));
    }

    #[test]
    fn test_depthless_file_rejected() {
        let (_dir, path) = write_csv("GR,RT\n10.0,5.0\n");
        assert!(matches!(
            read_csv(&path),
            Err(LoaderError::MissingDepth { .. })
        ));
    }

    #[test]
    fn test_header_only_file_rejected() {
        let (_dir, path) = write_csv("DEPTH,GR\n");
        assert!(matches!(read_csv(&path), Err(LoaderError::NoRows { .. })));
    }

    #[test]
    fn test_duplicate_depths_rejected() {
        let (_dir, path) = write_csv("DEPTH,GR\n2000.0,10.0\n2000.0,20.0\n");
        assert!(matches!(read_csv(&path), Err(LoaderError::Table { .. })));
    }
}
