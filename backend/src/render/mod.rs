//! Output of refined tables: xlsx/csv export and text previews.

use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::fs;
use std::path::Path;

use crate::error::{ExportError, ExportResult};
use crate::models::{Cell, Table};

/// File name offered for downloads
pub const DEFAULT_DOWNLOAD_NAME: &str = "processed_data.xlsx";

/// Default worksheet name for exports
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Widest column in a text preview before values are cut
const PREVIEW_MAX_WIDTH: usize = 32;

/// Serialise a table as an xlsx workbook with one sheet.
pub fn to_xlsx_bytes(table: &Table, sheet_name: &str) -> ExportResult<Vec<u8>> {
    let mut workbook = build_workbook(table, sheet_name)?;
    Ok(workbook.save_to_buffer()?)
}

pub fn write_xlsx(table: &Table, path: &Path) -> ExportResult<()> {
    let mut workbook = build_workbook(table, DEFAULT_SHEET_NAME)?;
    workbook.save(path)?;
    Ok(())
}

fn build_workbook(table: &Table, sheet_name: &str) -> ExportResult<Workbook> {
    let mut workbook = Workbook::new();
    let worksheet = workbook
        .add_worksheet()
        .set_name(sanitize_sheet_name(sheet_name))?;
    write_sheet(table, worksheet)?;
    Ok(workbook)
}

fn write_sheet(table: &Table, worksheet: &mut Worksheet) -> ExportResult<()> {
    let header = Format::new().set_bold();

    for (col, name) in table.columns().iter().enumerate() {
        worksheet.write_string_with_format(0, col_index(col)?, name, &header)?;
    }

    for (r, row) in table.rows().iter().enumerate() {
        let row32 = u32::try_from(r + 1)
            .map_err(|_| ExportError::Xlsx(format!("row {} out of range", r + 1)))?;
        for (c, cell) in row.iter().enumerate() {
            let col16 = col_index(c)?;
            match cell {
                Cell::Empty => {}
                Cell::Number(n) => {
                    worksheet.write_number(row32, col16, *n)?;
                }
                Cell::Text(s) => {
                    worksheet.write_string(row32, col16, s)?;
                }
            }
        }
    }
    Ok(())
}

fn col_index(col: usize) -> ExportResult<u16> {
    u16::try_from(col).map_err(|_| ExportError::Xlsx(format!("column {} out of range", col)))
}

/// Excel sheet names: at most 31 characters, none of `[]:*?/\`.
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(31)
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'').to_string();
    if cleaned.is_empty() {
        DEFAULT_SHEET_NAME.to_string()
    } else {
        cleaned
    }
}

/// Serialise a table as comma-separated CSV with a header line.
pub fn to_csv_string(table: &Table) -> ExportResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(table.columns())
        .map_err(|e| ExportError::Csv(e.to_string()))?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(|c| c.to_string()))
            .map_err(|e| ExportError::Csv(e.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Csv(e.to_string()))
}

/// Write xlsx or csv depending on the extension (xlsx when unknown).
pub fn write_file(table: &Table, path: &Path) -> ExportResult<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("csv") => {
            fs::write(path, to_csv_string(table)?)?;
            Ok(())
        }
        _ => write_xlsx(table, path),
    }
}

/// Plain-text grid of the first `max_rows` rows for the terminal.
pub fn preview_text(table: &Table, max_rows: usize) -> String {
    let shown = table.height().min(max_rows);

    let mut grid: Vec<Vec<String>> = Vec::with_capacity(shown + 1);
    grid.push(table.columns().iter().map(|c| clip(c)).collect());
    for row in table.rows().iter().take(shown) {
        grid.push(row.iter().map(|c| clip(&c.to_string())).collect());
    }

    let widths: Vec<usize> = (0..table.width())
        .map(|col| {
            grid.iter()
                .map(|r| r[col].chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_row = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(grid.len() + 2);
    lines.push(format_row(&grid[0]));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in &grid[1..] {
        lines.push(format_row(row));
    }

    let hidden = table.height() - shown;
    if hidden > 0 {
        lines.push(format!("… {} more rows", hidden));
    }
    lines.join("\n")
}

fn clip(value: &str) -> String {
    if value.chars().count() <= PREVIEW_MAX_WIDTH {
        value.to_string()
    } else {
        let mut cut: String = value.chars().take(PREVIEW_MAX_WIDTH - 1).collect();
        cut.push('…');
        cut
    }
}
