//! High-level refine pipeline: load → transform (AI or tabular) → result.
//!
//! # Example
//!
//! ```rust,ignore
//! use refiner::ai::OllamaClient;
//! use refiner::transform::{refine_file, Operation, RefineOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OllamaClient::from_config(&Default::default());
//!     let result = refine_file(
//!         "sales.xlsx".as_ref(),
//!         &Operation::RemoveEmptyRows,
//!         &RefineOptions::default(),
//!         &client,
//!     ).await?;
//!
//!     println!("{} rows left", result.outcome.table.height());
//!     Ok(())
//! }
//! ```
//!
//! ## ai-custom fallback
//!
//! When AI is disabled, Ollama is unreachable, the call fails or the reply
//! is not a CSV table, the instruction is matched against the keyword
//! selector and the matching deterministic operation is applied. With no
//! match the table is returned unchanged. `strict_ai` turns all of these
//! into an [`AiError`] instead. A partial model reply is never used.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use super::operations::{apply, Operation};
use super::selector;
use crate::ai::OllamaClient;
use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::config::DEFAULT_PREVIEW_ROWS;
use crate::error::{AiError, PipelineError, PipelineResult};
use crate::models::{SourceFormat, Table};
use crate::parser::{load_bytes, load_file, LoadResult};

/// Options for one refine run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineOptions {
    /// Send ai-custom requests to the model
    pub use_ai: bool,

    /// Fail instead of falling back when the model cannot be used
    pub strict_ai: bool,

    /// Worksheet to read (first sheet when unset)
    pub sheet: Option<String>,

    /// Rows to show in previews
    pub preview_rows: usize,
}

impl Default for RefineOptions {
    fn default() -> Self {
        Self {
            use_ai: false,
            strict_ai: false,
            sheet: None,
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

/// How the output table was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefineMode {
    /// A deterministic operation ran
    Tabular,
    /// The model's table was used
    Ai,
    /// Nothing applied; the input is returned as-is
    Passthrough,
}

impl fmt::Display for RefineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefineMode::Tabular => f.write_str("tabular"),
            RefineMode::Ai => f.write_str("ai"),
            RefineMode::Passthrough => f.write_str("passthrough"),
        }
    }
}

/// Why an ai-custom request did not use the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "kebab-case")]
pub enum FallbackReason {
    Disabled,
    Unavailable,
    RequestFailed(String),
    InvalidResponse(String),
}

impl FallbackReason {
    fn from_error(err: &AiError) -> Self {
        match err {
            AiError::Disabled => FallbackReason::Disabled,
            AiError::Unavailable(_) => FallbackReason::Unavailable,
            AiError::InvalidResponse(msg) => FallbackReason::InvalidResponse(msg.clone()),
            other => FallbackReason::RequestFailed(other.to_string()),
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::Disabled => f.write_str("AI processing is disabled"),
            FallbackReason::Unavailable => f.write_str("Ollama is not running"),
            FallbackReason::RequestFailed(msg) => write!(f, "Ollama request failed: {}", msg),
            FallbackReason::InvalidResponse(msg) => write!(f, "AI response was not valid CSV: {}", msg),
        }
    }
}

/// The transformed table and how it was obtained
#[derive(Debug, Clone, Serialize)]
pub struct RefineOutcome {
    pub table: Table,
    pub mode: RefineMode,
    /// Operation that produced `table` (`None` for passthrough)
    pub applied: Option<Operation>,
    /// Set when an ai-custom request fell back
    pub fallback: Option<FallbackReason>,
}

impl RefineOutcome {
    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

/// Where the input came from
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub file_name: Option<String>,
    pub format: SourceFormat,
    pub sheet: Option<String>,
    pub encoding: Option<String>,
    pub delimiter: Option<char>,
    pub row_count: usize,
    pub columns: Vec<String>,
}

/// Result of a complete refine run
#[derive(Debug, Clone, Serialize)]
pub struct RefineResult {
    pub source: SourceInfo,
    pub outcome: RefineOutcome,
}

/// Load a file from disk and refine it.
pub async fn refine_file(
    path: &Path,
    op: &Operation,
    options: &RefineOptions,
    client: &OllamaClient,
) -> PipelineResult<RefineResult> {
    log_info(format!("📖 Reading {}...", path.display()));
    let loaded = load_file(path, options.sheet.as_deref())?;
    let file_name = path.file_name().and_then(|n| n.to_str()).map(str::to_string);
    refine_loaded(loaded, file_name, op, options, client).await
}

/// Refine an uploaded file.
///
/// Same as [`refine_file`] but accepts raw bytes instead of a path.
pub async fn refine_bytes(
    bytes: &[u8],
    file_name: Option<&str>,
    op: &Operation,
    options: &RefineOptions,
    client: &OllamaClient,
) -> PipelineResult<RefineResult> {
    log_info(format!(
        "📖 Reading {} ({} bytes)...",
        file_name.unwrap_or("upload"),
        bytes.len()
    ));
    let loaded = load_bytes(bytes, file_name, options.sheet.as_deref())?;
    refine_loaded(loaded, file_name.map(str::to_string), op, options, client).await
}

async fn refine_loaded(
    loaded: LoadResult,
    file_name: Option<String>,
    op: &Operation,
    options: &RefineOptions,
    client: &OllamaClient,
) -> PipelineResult<RefineResult> {
    log_success(format!("Detected format: {}", loaded.format));
    if let Some(sheet) = &loaded.sheet_name {
        log_success(format!("Sheet: {}", sheet));
    }
    if let (Some(encoding), Some(delimiter)) = (&loaded.encoding, loaded.delimiter) {
        log_success(format!("Encoding: {}, separator: '{}'", encoding, format_delimiter(delimiter)));
    }
    log_success(format!(
        "Read {} rows × {} columns",
        loaded.table.height(),
        loaded.table.width()
    ));

    let source = SourceInfo {
        file_name,
        format: loaded.format,
        sheet: loaded.sheet_name,
        encoding: loaded.encoding,
        delimiter: loaded.delimiter,
        row_count: loaded.table.height(),
        columns: loaded.table.columns().to_vec(),
    };

    let outcome = refine_table(&loaded.table, op, options, client).await?;
    Ok(RefineResult { source, outcome })
}

/// Apply one operation to an in-memory table.
pub async fn refine_table(
    table: &Table,
    op: &Operation,
    options: &RefineOptions,
    client: &OllamaClient,
) -> PipelineResult<RefineOutcome> {
    if table.is_empty() {
        log_warning("Uploaded file is empty!");
        return Err(PipelineError::EmptyTable);
    }

    match op {
        Operation::AiCustom { instruction } => refine_with_ai(table, instruction, op, options, client).await,
        _ => {
            log_info(format!("⚙️  Applying {}...", op));
            let refined = apply(table, op)?;
            log_success(format!("{} → {} rows", op.name(), refined.height()));
            Ok(RefineOutcome {
                table: refined,
                mode: RefineMode::Tabular,
                applied: Some(op.clone()),
                fallback: None,
            })
        }
    }
}

async fn refine_with_ai(
    table: &Table,
    instruction: &str,
    op: &Operation,
    options: &RefineOptions,
    client: &OllamaClient,
) -> PipelineResult<RefineOutcome> {
    if !options.use_ai {
        return fall_back(table, instruction, AiError::Disabled, options);
    }

    log_info("🤖 Checking Ollama...");
    if !client.is_available().await {
        let err = AiError::Unavailable(client.base_url().to_string());
        return fall_back(table, instruction, err, options);
    }

    log_info(format!("Using Ollama AI ({}) for processing...", client.model()));
    log_info_indent(format!("Sending {} rows as CSV", table.height()), 1);

    match client.refine_table(table, instruction).await {
        Ok(refined) => {
            log_success(format!(
                "AI processing complete: {} rows × {} columns",
                refined.height(),
                refined.width()
            ));
            Ok(RefineOutcome {
                table: refined,
                mode: RefineMode::Ai,
                applied: Some(op.clone()),
                fallback: None,
            })
        }
        Err(err) => fall_back(table, instruction, err, options),
    }
}

/// Keyword-selected tabular operation, or the table unchanged.
fn fall_back(
    table: &Table,
    instruction: &str,
    err: AiError,
    options: &RefineOptions,
) -> PipelineResult<RefineOutcome> {
    if options.strict_ai {
        return Err(err.into());
    }

    let reason = FallbackReason::from_error(&err);
    log_warning(format!("{}. Falling back to tabular operations.", reason));

    match selector::from_instruction(instruction) {
        Some(op) => {
            log_info(format!("⚙️  Instruction matched {}", op));
            let refined = apply(table, &op)?;
            log_success(format!("{} → {} rows", op.name(), refined.height()));
            Ok(RefineOutcome {
                table: refined,
                mode: RefineMode::Tabular,
                applied: Some(op),
                fallback: Some(reason),
            })
        }
        None => {
            log_warning("No tabular operation matches the instruction; returning data unchanged");
            Ok(RefineOutcome {
                table: table.clone(),
                mode: RefineMode::Passthrough,
                applied: None,
                fallback: Some(reason),
            })
        }
    }
}

/// Format delimiter for display
fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cell;
    use crate::transform::operations::TextCase;

    fn people() -> Table {
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

    fn offline_client() -> OllamaClient {
        OllamaClient::new("http://127.0.0.1:1", "llama2").with_max_retries(0)
    }

    #[test]
    fn test_default_options() {
        let opts = RefineOptions::default();
        assert!(!opts.use_ai);
        assert!(!opts.strict_ai);
        assert_eq!(opts.preview_rows, DEFAULT_PREVIEW_ROWS);
    }

    #[tokio::test]
    async fn test_remove_then_uppercase() {
        let client = offline_client();
        let opts = RefineOptions::default();

        let step1 = refine_table(&people(), &Operation::RemoveEmptyRows, &opts, &client)
            .await
            .unwrap();
        assert_eq!(step1.mode, RefineMode::Tabular);

        let upper = Operation::NormalizeTextCase { case: TextCase::Upper };
        let step2 = refine_table(&step1.table, &upper, &opts, &client).await.unwrap();

        let expected = Table::new(
            vec!["Name".into(), "Age".into()],
            vec![
                vec![Cell::text("ALICE"), Cell::Number(30.0)],
                vec![Cell::text("BOB"), Cell::Number(25.0)],
            ],
        )
        .unwrap();
        assert_eq!(step2.table, expected);
        assert!(!step2.is_fallback());
    }

    #[tokio::test]
    async fn test_ai_disabled_uses_keyword_fallback() {
        let op = Operation::AiCustom { instruction: "Remove empty rows please".into() };
        let outcome = refine_table(&people(), &op, &RefineOptions::default(), &offline_client())
            .await
            .unwrap();
        assert_eq!(outcome.mode, RefineMode::Tabular);
        assert_eq!(outcome.applied, Some(Operation::RemoveEmptyRows));
        assert_eq!(outcome.fallback, Some(FallbackReason::Disabled));
        assert_eq!(outcome.table.height(), 2);
    }

    #[tokio::test]
    async fn test_unmatched_instruction_passes_through() {
        let op = Operation::AiCustom { instruction: "translate to German".into() };
        let outcome = refine_table(&people(), &op, &RefineOptions::default(), &offline_client())
            .await
            .unwrap();
        assert_eq!(outcome.mode, RefineMode::Passthrough);
        assert_eq!(outcome.applied, None);
        assert_eq!(outcome.table, people());
    }

    #[tokio::test]
    async fn test_strict_disabled_is_error() {
        let op = Operation::AiCustom { instruction: "anything".into() };
        let opts = RefineOptions { strict_ai: true, ..Default::default() };
        let err = refine_table(&people(), &op, &opts, &offline_client()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Ai(AiError::Disabled)));
    }

    #[tokio::test]
    async fn test_empty_table_rejected() {
        let table = Table::empty(vec!["a".into()]);
        let err = refine_table(&table, &Operation::Summarize, &RefineOptions::default(), &offline_client())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::EmptyTable));
    }

    #[tokio::test]
    async fn test_refine_bytes_source_info() {
        let result = refine_bytes(
            b"Name;Age\nalice;30\n;\nBOB;25\n",
            Some("people.csv"),
            &Operation::Summarize,
            &RefineOptions::default(),
            &offline_client(),
        )
        .await
        .unwrap();

        assert_eq!(result.source.format, SourceFormat::Csv);
        assert_eq!(result.source.delimiter, Some(';'));
        assert_eq!(result.source.row_count, 3);
        assert_eq!(result.outcome.table.height(), 1);
    }

    #[test]
    fn test_fallback_reason_json() {
        let json = serde_json::to_value(FallbackReason::InvalidResponse("no csv".into())).unwrap();
        assert_eq!(json["kind"], "invalid-response");
        assert_eq!(json["detail"], "no csv");
        let json = serde_json::to_value(FallbackReason::Unavailable).unwrap();
        assert_eq!(json["kind"], "unavailable");
    }
}
