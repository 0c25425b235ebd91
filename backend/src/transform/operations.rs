//! Tabular operations.
//!
//! The fixed set of transformations a user can choose from. Everything
//! except [`Operation::AiCustom`] is deterministic and runs locally.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{TransformError, TransformResult};
use crate::models::{Cell, Table};

/// Case rule for [`Operation::NormalizeTextCase`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextCase {
    #[default]
    Upper,
    Lower,
    /// First letter of each word upper-cased, the rest lower-cased
    Title,
}

impl TextCase {
    pub fn apply(&self, s: &str) -> String {
        match self {
            TextCase::Upper => s.to_uppercase(),
            TextCase::Lower => s.to_lowercase(),
            TextCase::Title => title_case(s),
        }
    }
}

impl FromStr for TextCase {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "upper" | "uppercase" => Ok(TextCase::Upper),
            "lower" | "lowercase" => Ok(TextCase::Lower),
            "title" | "titlecase" => Ok(TextCase::Title),
            other => Err(TransformError::UnknownCase(other.to_string())),
        }
    }
}

impl fmt::Display for TextCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextCase::Upper => f.write_str("upper"),
            TextCase::Lower => f.write_str("lower"),
            TextCase::Title => f.write_str("title"),
        }
    }
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_whitespace() {
            at_word_start = true;
            out.push(c);
        } else if at_word_start {
            out.extend(c.to_uppercase());
            at_word_start = false;
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// All available operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Operation {
    /// Drop rows whose cells are all empty
    RemoveEmptyRows,

    /// Change the case of every text cell
    NormalizeTextCase {
        #[serde(default)]
        case: TextCase,
    },

    /// Descriptive statistics per numeric column
    Summarize,

    /// Free-text instruction sent to the local model
    AiCustom { instruction: String },
}

impl Operation {
    /// Kebab-case name
    pub fn name(&self) -> &'static str {
        match self {
            Operation::RemoveEmptyRows => "remove-empty-rows",
            Operation::NormalizeTextCase { .. } => "normalize-text-case",
            Operation::Summarize => "summarize",
            Operation::AiCustom { .. } => "ai-custom",
        }
    }

    pub fn is_tabular(&self) -> bool {
        !matches!(self, Operation::AiCustom { .. })
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::NormalizeTextCase { case } => write!(f, "normalize-text-case ({})", case),
            other => f.write_str(other.name()),
        }
    }
}

/// Parse an operation name. `ai-custom` gets an empty instruction here;
/// use [`crate::transform::selector::resolve`] to attach one.
impl FromStr for Operation {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase().replace('_', "-");
        match name.as_str() {
            "remove-empty-rows" | "remove-empty" => Ok(Operation::RemoveEmptyRows),
            "normalize-text-case" | "uppercase" | "upper" => Ok(Operation::NormalizeTextCase {
                case: TextCase::Upper,
            }),
            "lowercase" | "lower" => Ok(Operation::NormalizeTextCase {
                case: TextCase::Lower,
            }),
            "titlecase" | "title-case" | "title" => Ok(Operation::NormalizeTextCase {
                case: TextCase::Title,
            }),
            "summarize" | "summarise" | "describe" => Ok(Operation::Summarize),
            "ai-custom" | "ai" => Ok(Operation::AiCustom {
                instruction: String::new(),
            }),
            _ => Err(TransformError::UnknownOperation(s.trim().to_string())),
        }
    }
}

/// Apply a deterministic operation.
///
/// `AiCustom` is routed by the pipeline and is rejected here.
pub fn apply(table: &Table, op: &Operation) -> TransformResult<Table> {
    match op {
        Operation::RemoveEmptyRows => Ok(remove_empty_rows(table)),
        Operation::NormalizeTextCase { case } => Ok(normalize_text_case(table, *case)),
        Operation::Summarize => summarize(table),
        Operation::AiCustom { .. } => Err(TransformError::NotTabular(op.name().to_string())),
    }
}

/// Keep rows with at least one non-empty cell, in original order.
pub fn remove_empty_rows(table: &Table) -> Table {
    table.retain_rows(|row| row.iter().any(|c| !c.is_empty()))
}

/// Re-case text cells; numbers and empty cells are untouched.
pub fn normalize_text_case(table: &Table, case: TextCase) -> Table {
    table.map_cells(|cell| match cell {
        Cell::Text(s) => Cell::Text(case.apply(s)),
        other => other.clone(),
    })
}

/// Columns of the summary table.
pub const SUMMARY_COLUMNS: [&str; 9] = ["column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"];

/// Descriptive statistics, one row per numeric column.
///
/// A column is numeric when it has at least one number and every
/// non-empty cell is a number.
pub fn summarize(table: &Table) -> TransformResult<Table> {
    let columns: Vec<String> = SUMMARY_COLUMNS.iter().map(|c| c.to_string()).collect();
    let mut rows = Vec::new();

    for (idx, name) in table.columns().iter().enumerate() {
        let Some(mut values) = numeric_values(table, idx) else {
            continue;
        };
        values.sort_by(|a, b| a.total_cmp(b));

        let stats = ColumnStats::from_sorted(&values);
        rows.push(vec![
            Cell::text(name.clone()),
            Cell::Number(stats.count as f64),
            Cell::Number(stats.mean),
            stats.std.map(Cell::Number).unwrap_or(Cell::Empty),
            Cell::Number(stats.min),
            Cell::Number(stats.q1),
            Cell::Number(stats.median),
            Cell::Number(stats.q3),
            Cell::Number(stats.max),
        ]);
    }

    Ok(Table::new(columns, rows)?)
}

fn numeric_values(table: &Table, idx: usize) -> Option<Vec<f64>> {
    let mut values = Vec::new();
    for cell in table.column(idx) {
        match cell {
            Cell::Empty => {}
            Cell::Number(n) => values.push(*n),
            Cell::Text(_) => return None,
        }
    }
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

/// Statistics over a non-empty sorted sample
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` below two values
    pub std: Option<f64>,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl ColumnStats {
    pub fn from_sorted(sorted: &[f64]) -> Self {
        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let std = (count > 1).then(|| {
            let var = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
            var.sqrt()
        });

        Self {
            count,
            mean,
            std,
            min: sorted[0],
            q1: quantile(sorted, 0.25),
            median: quantile(sorted, 0.5),
            q3: quantile(sorted, 0.75),
            max: sorted[count - 1],
        }
    }
}

/// Linear interpolation between order statistics.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Human-readable list of operations (for `refiner operations`)
pub fn operations_description() -> String {
    [
        ("remove-empty-rows", "Drop rows where every cell is empty (order preserved)"),
        ("uppercase", "Upper-case every text cell (normalize-text-case)"),
        ("lowercase", "Lower-case every text cell (normalize-text-case)"),
        ("titlecase", "Title-case every text cell (normalize-text-case)"),
        ("summarize", "count / mean / std / min / quartiles / max per numeric column"),
        ("ai-custom", "Send the table and a free-text instruction to the local model"),
    ]
    .iter()
    .map(|(name, desc)| format!("  {:<20} {}", name, desc))
    .collect::<Vec<_>>()
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(
            vec!["Name".into(), "Age".into()],
            vec![
                vec![Cell::text("alice"), Cell::Number(30.0)],
                vec![Cell::Empty, Cell::Empty],
                vec![Cell::text("BOB"), Cell::Number(25.0)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_remove_empty_rows_keeps_order() {
        let out = remove_empty_rows(&sample());
        assert_eq!(out.height(), 2);
        assert_eq!(out.cell(0, 0), Some(&Cell::text("alice")));
        assert_eq!(out.cell(1, 0), Some(&Cell::text("BOB")));
        assert_eq!(out.columns(), sample().columns());
    }

    #[test]
    fn test_whitespace_text_is_not_empty() {
        let table = Table::new(vec!["a".into()], vec![vec![Cell::text(" ")], vec![Cell::Empty]]).unwrap();
        assert_eq!(remove_empty_rows(&table).height(), 1);
    }

    #[test]
    fn test_uppercase_leaves_numbers() {
        let out = normalize_text_case(&sample(), TextCase::Upper);
        assert_eq!(out.cell(0, 0), Some(&Cell::text("ALICE")));
        assert_eq!(out.cell(0, 1), Some(&Cell::Number(30.0)));
        assert_eq!(out.cell(1, 0), Some(&Cell::Empty));
    }

    #[test]
    fn test_lower_and_title_case() {
        let table = Table::new(vec!["a".into()], vec![vec![Cell::text("hELLO wORLD")]]).unwrap();
        let lower = normalize_text_case(&table, TextCase::Lower);
        assert_eq!(lower.cell(0, 0), Some(&Cell::text("hello world")));
        let title = normalize_text_case(&table, TextCase::Title);
        assert_eq!(title.cell(0, 0), Some(&Cell::text("Hello World")));
    }

    #[test]
    fn test_summarize_numeric_columns_only() {
        let out = summarize(&sample()).unwrap();
        assert_eq!(out.columns()[..3], ["column", "count", "mean"]);
        assert_eq!(out.height(), 1);
        assert_eq!(out.cell(0, 0), Some(&Cell::text("Age")));
        assert_eq!(out.cell(0, 1), Some(&Cell::Number(2.0)));
        assert_eq!(out.cell(0, 2), Some(&Cell::Number(27.5)));
        assert_eq!(out.cell(0, 4), Some(&Cell::Number(25.0)));
        assert_eq!(out.cell(0, 8), Some(&Cell::Number(30.0)));
    }

    #[test]
    fn test_summary_statistics() {
        let stats = ColumnStats::from_sorted(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(stats.count, 4);
        assert!((stats.mean - 2.5).abs() < 1e-9);
        assert!((stats.std.unwrap() - 1.2909944487).abs() < 1e-9);
        assert!((stats.q1 - 1.75).abs() < 1e-9);
        assert!((stats.median - 2.5).abs() < 1e-9);
        assert!((stats.q3 - 3.25).abs() < 1e-9);

        let single = ColumnStats::from_sorted(&[7.0]);
        assert_eq!(single.std, None);
        assert_eq!(single.median, 7.0);
    }

    #[test]
    fn test_summarize_without_numeric_columns() {
        let table = Table::new(vec!["a".into()], vec![vec![Cell::text("x")]]).unwrap();
        let out = summarize(&table).unwrap();
        assert_eq!(out.width(), SUMMARY_COLUMNS.len());
        assert!(out.is_empty());
    }

    #[test]
    fn test_parse_operation_names() {
        assert_eq!("remove-empty-rows".parse::<Operation>().unwrap(), Operation::RemoveEmptyRows);
        assert_eq!(
            "lowercase".parse::<Operation>().unwrap(),
            Operation::NormalizeTextCase { case: TextCase::Lower }
        );
        assert_eq!("Summarize".parse::<Operation>().unwrap(), Operation::Summarize);
        assert!("shuffle".parse::<Operation>().is_err());
    }

    #[test]
    fn test_ai_custom_is_not_tabular() {
        let op = Operation::AiCustom { instruction: "fix dates".into() };
        assert!(matches!(apply(&sample(), &op), Err(TransformError::NotTabular(_))));
    }

    #[test]
    fn test_operation_serde_tag() {
        let json = serde_json::to_value(Operation::NormalizeTextCase { case: TextCase::Title }).unwrap();
        assert_eq!(json["type"], "normalize-text-case");
        assert_eq!(json["case"], "title");
    }
}
