//! Domain models for the refiner pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`Cell`] - A single spreadsheet value: text, number or empty
//! - [`Table`] - Named columns plus rectangular rows of cells
//! - [`SourceFormat`] - The file format a table was loaded from

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::TableError;

// =============================================================================
// Cell
// =============================================================================

/// A single cell value.
///
/// Serialises untagged: `null`, a JSON number or a JSON string.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    /// No value.
    #[default]
    Empty,
    /// Numeric value (always finite when produced by the loader).
    Number(f64),
    /// Text value.
    Text(String),
}

impl Cell {
    /// Build a text cell; an empty string becomes [`Cell::Empty`].
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s)
        }
    }

    /// Build a numeric cell.
    pub fn number(n: f64) -> Self {
        Cell::Number(n)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Cell::Number(_))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// JSON scalar for previews.
    pub fn to_json(&self) -> Value {
        match self {
            Cell::Empty => Value::Null,
            Cell::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Cell::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Number(n) => f.write_str(&format_number(*n)),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::text(s)
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::text(s)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Number(n as f64)
    }
}

/// Integers print without decimals.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

// =============================================================================
// Table
// =============================================================================

/// An in-memory spreadsheet: ordered named columns and rows of cells.
///
/// Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Create a table, rejecting rows whose length differs from the header.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self, TableError> {
        let expected = columns.len();
        if let Some((row, found)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != expected)
            .map(|(i, r)| (i, r.len()))
        {
            return Err(TableError::RaggedRow { row, expected, found });
        }
        Ok(Self { columns, rows })
    }

    /// A table with headers and no rows.
    pub fn empty(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Number of data rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// True when there are no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first column with this name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().filter_map(move |r| r.get(idx))
    }

    pub fn row(&self, idx: usize) -> Option<&[Cell]> {
        self.rows.get(idx).map(|r| r.as_slice())
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<Cell>>) {
        (self.columns, self.rows)
    }

    /// Keep rows matching the predicate, in order.
    pub fn retain_rows(&self, mut keep: impl FnMut(&[Cell]) -> bool) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Apply a function to every cell, keeping the shape.
    pub fn map_cells(&self, mut f: impl FnMut(&Cell) -> Cell) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .map(|r| r.iter().map(&mut f).collect())
                .collect(),
        }
    }

    /// First `n` rows as a new table.
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }
}

// =============================================================================
// Source Format
// =============================================================================

/// File format of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Xlsx,
    Xls,
    Xlsb,
    Ods,
    Csv,
}

impl SourceFormat {
    /// Format from a file name's extension.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" | "xlsm" => Some(SourceFormat::Xlsx),
            "xls" => Some(SourceFormat::Xls),
            "xlsb" => Some(SourceFormat::Xlsb),
            "ods" => Some(SourceFormat::Ods),
            "csv" | "tsv" | "txt" => Some(SourceFormat::Csv),
            _ => None,
        }
    }

    /// Format from leading magic bytes (zip → xlsx, OLE → xls).
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"PK\x03\x04") {
            Some(SourceFormat::Xlsx)
        } else if bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]) {
            Some(SourceFormat::Xls)
        } else {
            None
        }
    }

    pub fn is_workbook(&self) -> bool {
        !matches!(self, SourceFormat::Csv)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SourceFormat::Xlsx => "xlsx",
            SourceFormat::Xls => "xls",
            SourceFormat::Xlsb => "xlsb",
            SourceFormat::Ods => "ods",
            SourceFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn people() -> Table {
        Table::new(
            vec!["Name".into(), "Age".into()],
            vec![
                vec![Cell::text("alice"), Cell::from(30i64)],
                vec![Cell::Empty, Cell::Empty],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = Table::new(
            vec!["a".into(), "b".into()],
            vec![vec![Cell::Empty, Cell::Empty], vec![Cell::Empty]],
        )
        .unwrap_err();
        assert_eq!(err, TableError::RaggedRow { row: 1, expected: 2, found: 1 });
    }

    #[test]
    fn test_empty_string_is_empty_cell() {
        assert!(Cell::text("").is_empty());
        assert!(!Cell::text(" ").is_empty());
    }

    #[test]
    fn test_number_display() {
        assert_eq!(Cell::Number(30.0).to_string(), "30");
        assert_eq!(Cell::Number(2.5).to_string(), "2.5");
        assert_eq!(Cell::Empty.to_string(), "");
    }

    #[test]
    fn test_cell_json() {
        assert_eq!(Cell::Number(30.0).to_json(), json!(30.0));
        assert_eq!(Cell::text("x").to_json(), json!("x"));
        assert_eq!(Cell::Empty.to_json(), Value::Null);
    }

    #[test]
    fn test_column_access() {
        let t = people();
        assert_eq!(t.width(), 2);
        assert_eq!(t.height(), 2);
        assert_eq!(t.column_index("Age"), Some(1));
        let ages: Vec<_> = t.column(1).cloned().collect();
        assert_eq!(ages, vec![Cell::Number(30.0), Cell::Empty]);
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(SourceFormat::from_file_name("Report.XLSX"), Some(SourceFormat::Xlsx));
        assert_eq!(SourceFormat::from_file_name("data.csv"), Some(SourceFormat::Csv));
        assert_eq!(SourceFormat::from_file_name("noext"), None);
        assert_eq!(SourceFormat::from_magic(b"PK\x03\x04rest"), Some(SourceFormat::Xlsx));
        assert_eq!(SourceFormat::from_magic(b"a,b\n1,2"), None);
    }
}
