//! Spreadsheet loader with format, encoding and delimiter auto-detection.
//!
//! Workbooks (xlsx, xls, xlsb, ods) are read with calamine; CSV text is
//! decoded with chardet + encoding_rs and parsed with the csv crate.
//! The first row is always the header row.

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use std::io::Cursor;
use std::path::Path;

use crate::error::LoadError;
use crate::models::{Cell, SourceFormat, Table};

/// A loaded table with metadata about where it came from
#[derive(Debug, Clone)]
pub struct LoadResult {
    /// Parsed table
    pub table: Table,
    /// Detected format
    pub format: SourceFormat,
    /// Worksheet that was read (workbooks only)
    pub sheet_name: Option<String>,
    /// Detected encoding (CSV only)
    pub encoding: Option<String>,
    /// Detected delimiter (CSV only)
    pub delimiter: Option<char>,
}

/// Detect the format from the file name, falling back to magic bytes, then CSV.
pub fn detect_format(bytes: &[u8], file_name: Option<&str>) -> SourceFormat {
    file_name
        .and_then(SourceFormat::from_file_name)
        .or_else(|| SourceFormat::from_magic(bytes))
        .unwrap_or(SourceFormat::Csv)
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to string using the specified encoding
///
/// Fails on bytes that are invalid in that encoding and on text holding
/// control characters other than tab, CR and LF: such input is binary.
pub fn decode_content(bytes: &[u8], encoding: &str) -> Result<String, LoadError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let label = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" | "utf-8-sig" => "utf-8".to_string(),
        "iso-8859-1" | "latin-1" | "latin1" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    };
    // Labels encoding_rs does not know are read as strict UTF-8
    let enc = encoding_rs::Encoding::for_label(label.as_bytes()).unwrap_or(encoding_rs::UTF_8);

    let (decoded, _, had_errors) = enc.decode(bytes);
    if had_errors {
        return Err(LoadError::Encoding(format!("content is not valid {}", enc.name())));
    }
    if let Some(c) = decoded
        .chars()
        .find(|c| c.is_ascii_control() && !matches!(c, '\t' | '\r' | '\n'))
    {
        return Err(LoadError::Encoding(format!(
            "binary content (control character U+{:04X})",
            c as u32
        )));
    }

    Ok(decoded.into_owned())
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Load a file from disk.
pub fn load_file(path: impl AsRef<Path>, sheet: Option<&str>) -> Result<LoadResult, LoadError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let name = path.file_name().and_then(|n| n.to_str());
    load_bytes(&bytes, name, sheet)
}

/// Load uploaded bytes into a table.
///
/// `file_name` drives format detection; `sheet` selects a worksheet
/// (the first one when `None`).
pub fn load_bytes(
    bytes: &[u8],
    file_name: Option<&str>,
    sheet: Option<&str>,
) -> Result<LoadResult, LoadError> {
    if bytes.is_empty() {
        return Err(LoadError::EmptyFile);
    }

    let format = detect_format(bytes, file_name);
    if format.is_workbook() {
        load_workbook(bytes, format, sheet)
    } else {
        load_csv_bytes(bytes)
    }
}

/// Load CSV bytes with encoding and delimiter detection.
pub fn load_csv_bytes(bytes: &[u8]) -> Result<LoadResult, LoadError> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);
    let table = parse_csv_str(&content, delimiter)?;

    Ok(LoadResult {
        table,
        format: SourceFormat::Csv,
        sheet_name: None,
        encoding: Some(encoding),
        delimiter: Some(delimiter),
    })
}

/// Parse CSV text with an explicit delimiter.
///
/// Short rows are padded with empty cells, long rows truncated, and
/// blank lines skipped.
///
/// # Example
/// ```ignore
/// let table = parse_csv_str("name;age\nAlice;30", ';')?;
/// assert_eq!(table.columns(), ["name", "age"]);
/// ```
pub fn parse_csv_str(content: &str, delimiter: char) -> Result<Table, LoadError> {
    if content.trim().is_empty() {
        return Err(LoadError::EmptyFile);
    }
    if !delimiter.is_ascii() {
        return Err(LoadError::Csv(format!("unsupported delimiter '{}'", delimiter)));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();

    let header_record = records
        .next()
        .ok_or(LoadError::NoHeaders)?
        .map_err(|e| LoadError::Csv(e.to_string()))?;
    let columns = header_names(header_record.iter().map(|s| s.trim().to_string()).collect());
    if columns.is_empty() {
        return Err(LoadError::NoHeaders);
    }

    let width = columns.len();
    let mut rows = Vec::new();

    for record in records {
        let record = record.map_err(|e| LoadError::Csv(e.to_string()))?;
        if record.iter().all(|f| f.is_empty()) && record.len() <= 1 {
            continue;
        }

        let mut row: Vec<Cell> = record.iter().take(width).map(infer_cell).collect();
        row.resize(width, Cell::Empty);
        rows.push(row);
    }

    Ok(Table::new(columns, rows)?)
}

/// Typed cell from a raw CSV field.
pub fn infer_cell(raw: &str) -> Cell {
    let value = raw.trim();
    if value.is_empty() {
        return Cell::Empty;
    }
    match value.parse::<f64>() {
        Ok(n) if n.is_finite() && looks_numeric(value) => Cell::Number(n),
        _ => Cell::Text(value.to_string()),
    }
}

/// Rejects words f64 parsing accepts ("inf", "NaN", "infinity").
fn looks_numeric(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
}

/// Blank headers become `Unnamed: <index>`.
fn header_names(raw: Vec<String>) -> Vec<String> {
    raw.into_iter()
        .enumerate()
        .map(|(i, h)| {
            if h.trim().is_empty() {
                format!("Unnamed: {}", i)
            } else {
                h
            }
        })
        .collect()
}

fn load_workbook(
    bytes: &[u8],
    format: SourceFormat,
    sheet: Option<&str>,
) -> Result<LoadResult, LoadError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| LoadError::Workbook(e.to_string()))?;

    let sheet_names = workbook.sheet_names();
    let sheet_name = match sheet {
        Some(name) => sheet_names
            .iter()
            .find(|s| s.as_str() == name)
            .cloned()
            .ok_or_else(|| LoadError::SheetNotFound(name.to_string()))?,
        None => sheet_names.first().cloned().ok_or(LoadError::NoSheets)?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| LoadError::Workbook(format!("sheet '{}': {}", sheet_name, e)))?;

    let table = range_to_table(&range)?;

    Ok(LoadResult {
        table,
        format,
        sheet_name: Some(sheet_name),
        encoding: None,
        delimiter: None,
    })
}

/// First row of the used range is the header.
fn range_to_table(range: &Range<Data>) -> Result<Table, LoadError> {
    let mut rows = range.rows();

    let header_row = rows.next().ok_or(LoadError::NoHeaders)?;
    let columns = header_names(
        header_row
            .iter()
            .map(|d| data_to_cell(d).to_string().trim().to_string())
            .collect(),
    );
    if columns.is_empty() {
        return Err(LoadError::NoHeaders);
    }

    let width = columns.len();
    let body = rows
        .map(|row| {
            let mut cells: Vec<Cell> = row.iter().take(width).map(data_to_cell).collect();
            cells.resize(width, Cell::Empty);
            cells
        })
        .collect();

    Ok(Table::new(columns, body)?)
}

/// Map a calamine value onto text / number / empty.
fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::text(s.clone()),
        Data::Float(n) if n.is_finite() => Cell::Number(*n),
        Data::Float(n) => Cell::Text(n.to_string()),
        Data::Int(n) => Cell::Number(*n as f64),
        Data::Bool(b) => Cell::text(if *b { "TRUE" } else { "FALSE" }),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s.clone()),
        Data::Error(e) => Cell::Text(format!("#{:?}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let table = parse_csv_str("name;age\nAlice;30\nBob;25", ';').unwrap();

        assert_eq!(table.columns(), ["name", "age"]);
        assert_eq!(table.height(), 2);
        assert_eq!(table.cell(0, 0), Some(&Cell::text("Alice")));
        assert_eq!(table.cell(0, 1), Some(&Cell::Number(30.0)));
        assert_eq!(table.cell(1, 1), Some(&Cell::Number(25.0)));
    }

    #[test]
    fn test_quoted_values() {
        let csv = "name,value\n\"Smith, Alice\",\"Hello World\"";
        let table = parse_csv_str(csv, ',').unwrap();

        assert_eq!(table.cell(0, 0), Some(&Cell::text("Smith, Alice")));
        assert_eq!(table.cell(0, 1), Some(&Cell::text("Hello World")));
    }

    #[test]
    fn test_missing_values_are_empty() {
        let table = parse_csv_str("a;b;c\n1;;3\n4", ';').unwrap();

        assert_eq!(table.row(0).unwrap(), &[Cell::Number(1.0), Cell::Empty, Cell::Number(3.0)]);
        assert_eq!(table.row(1).unwrap(), &[Cell::Number(4.0), Cell::Empty, Cell::Empty]);
    }

    #[test]
    fn test_all_empty_row_is_kept() {
        let table = parse_csv_str("a,b\n1,2\n,\n3,4", ',').unwrap();
        assert_eq!(table.height(), 3);
        assert!(table.row(1).unwrap().iter().all(Cell::is_empty));
    }

    #[test]
    fn test_extra_columns_ignored() {
        let table = parse_csv_str("a;b\n1;2;3;4", ';').unwrap();
        assert_eq!(table.row(0).unwrap().len(), 2);
    }

    #[test]
    fn test_blank_header_named() {
        let table = parse_csv_str("a,,c\n1,2,3", ',').unwrap();
        assert_eq!(table.columns(), ["a", "Unnamed: 1", "c"]);
    }

    #[test]
    fn test_infer_cell() {
        assert_eq!(infer_cell("  "), Cell::Empty);
        assert_eq!(infer_cell("-1.5e3"), Cell::Number(-1500.0));
        assert_eq!(infer_cell("NaN"), Cell::text("NaN"));
        assert_eq!(infer_cell("inf"), Cell::text("inf"));
        assert_eq!(infer_cell(" bob "), Cell::text("bob"));
    }

    #[test]
    fn test_empty_csv_error() {
        assert!(matches!(parse_csv_str("", ';'), Err(LoadError::EmptyFile)));
        assert!(matches!(load_bytes(b"", Some("x.csv"), None), Err(LoadError::EmptyFile)));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
        assert_eq!(detect_delimiter("single"), ',');
    }

    #[test]
    fn test_auto_load_csv() {
        let result = load_bytes(b"name;age\nAlice;30\nBob;25", Some("people.csv"), None).unwrap();

        assert_eq!(result.format, SourceFormat::Csv);
        assert_eq!(result.delimiter, Some(';'));
        assert_eq!(result.table.height(), 2);
        assert_eq!(result.table.columns(), ["name", "age"]);
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_bom_stripped() {
        let decoded = decode_content(b"\xEF\xBB\xBFa,b", "utf-8").unwrap();
        assert_eq!(decoded, "a,b");
    }

    #[test]
    fn test_binary_upload_rejected() {
        let junk: Vec<u8> = (0..2000).map(|i| (i % 256) as u8).collect();
        assert!(matches!(load_bytes(&junk, Some("junk.csv"), None), Err(LoadError::Encoding(_))));
        assert!(matches!(load_bytes(&junk, None, None), Err(LoadError::Encoding(_))));

        let png: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR\x00\x00\x00\x10";
        assert!(matches!(load_bytes(png, Some("picture.csv"), None), Err(LoadError::Encoding(_))));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        assert!(matches!(decode_content(b"a,b\n\xFF\xFE,1", "utf-8"), Err(LoadError::Encoding(_))));
        assert_eq!(decode_content(b"a\tb\r\n1\t2", "utf-8").unwrap(), "a\tb\r\n1\t2");
    }

    #[test]
    fn test_malformed_workbook_is_error() {
        let result = load_bytes(b"PK\x03\x04 definitely not a zip archive", Some("broken.xlsx"), None);
        assert!(matches!(result, Err(LoadError::Workbook(_))));

        let result = load_bytes(b"plain text pretending", Some("fake.xls"), None);
        assert!(matches!(result, Err(LoadError::Workbook(_))));
    }

    #[test]
    fn test_detect_format_falls_back_to_csv() {
        assert_eq!(detect_format(b"a,b", None), SourceFormat::Csv);
        assert_eq!(detect_format(b"PK\x03\x04", None), SourceFormat::Xlsx);
        assert_eq!(detect_format(b"PK\x03\x04", Some("data.ods")), SourceFormat::Ods);
    }
}
