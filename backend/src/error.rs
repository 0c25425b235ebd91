//! Error types for the refiner pipeline.
//!
//! One enum per layer:
//!
//! - [`TableError`] - Table shape errors
//! - [`LoadError`] - Spreadsheet / CSV loading errors
//! - [`TransformError`] - Operation selection and tabular transform errors
//! - [`AiError`] - Local model (Ollama) client errors
//! - [`ExportError`] - xlsx / csv export errors
//! - [`PipelineError`] - Top-level orchestration errors
//! - [`ServerError`] - HTTP layer errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Table Errors
// =============================================================================

/// Errors raised when a table would not be rectangular.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    /// A row does not have one cell per column.
    #[error("Row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
}

// =============================================================================
// Load Errors
// =============================================================================

/// Errors while loading an uploaded file into a table.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Zero-byte upload.
    #[error("File is empty")]
    EmptyFile,

    /// Workbook has no worksheets.
    #[error("Workbook contains no sheets")]
    NoSheets,

    /// Requested worksheet does not exist.
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// No header row could be read.
    #[error("No header row found")]
    NoHeaders,

    /// The workbook could not be opened or read (malformed file).
    #[error("Unreadable workbook: {0}")]
    Workbook(String),

    /// Invalid CSV content.
    #[error("Invalid CSV: {0}")]
    Csv(String),

    /// The bytes could not be decoded as text.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Loaded rows did not form a rectangular table.
    #[error("Malformed table: {0}")]
    Table(#[from] TableError),
}

// =============================================================================
// Transformation Errors
// =============================================================================

/// Errors during operation selection or tabular transformation.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Operation name not recognised.
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Case rule not recognised.
    #[error("Unknown text case: {0}")]
    UnknownCase(String),

    /// Neither an operation nor an instruction was supplied.
    #[error("No operation or instruction given")]
    MissingOperation,

    /// ai-custom requires a free-text instruction.
    #[error("ai-custom requires an instruction")]
    MissingInstruction,

    /// ai-custom cannot be applied as a tabular operation.
    #[error("Operation '{0}' is not a tabular operation")]
    NotTabular(String),

    /// Transform produced a malformed table.
    #[error("Transform produced a malformed table: {0}")]
    Table(#[from] TableError),
}

// =============================================================================
// AI Client Errors
// =============================================================================

/// Errors from the local model client.
#[derive(Debug, Error)]
pub enum AiError {
    /// AI processing was not enabled for this request.
    #[error("AI processing is disabled")]
    Disabled,

    /// The model service could not be reached.
    #[error("Ollama is not reachable: {0}")]
    Unavailable(String),

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// Transport-level failure.
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// The service answered with an error status.
    #[error("Ollama error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The reply could not be turned into a table.
    #[error("Invalid model response: {0}")]
    InvalidResponse(String),
}

impl AiError {
    /// Whether a retry could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AiError::Unavailable(_) | AiError::Timeout | AiError::RequestFailed(_)
        ) || matches!(self, AiError::Api { status, .. } if *status >= 500)
    }
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while writing a table out.
#[derive(Debug, Error)]
pub enum ExportError {
    /// rust_xlsxwriter failure.
    #[error("Failed to write xlsx: {0}")]
    Xlsx(String),

    /// csv writer failure.
    #[error("Failed to write csv: {0}")]
    Csv(String),

    /// IO error.
    #[error("Export IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rust_xlsxwriter::XlsxError> for ExportError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        ExportError::Xlsx(e.to_string())
    }
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the main error type returned by [`crate::transform::pipeline`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Loading error.
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Transformation error.
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// AI client error (strict mode only).
    #[error("AI error: {0}")]
    Ai(#[from] AiError),

    /// Export error.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// The uploaded sheet has no data rows.
    #[error("Uploaded file is empty")]
    EmptyTable,
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Unknown resource.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ServerError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::BadRequest(_) => 400,
            ServerError::NotFound(_) => 404,
            ServerError::Internal(_) => 500,
            ServerError::Pipeline(e) => match e {
                PipelineError::Load(_) | PipelineError::EmptyTable | PipelineError::Transform(_) => 400,
                PipelineError::Ai(_) => 503,
                PipelineError::Export(_) => 500,
            },
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transformation operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for AI operations.
pub type AiResult<T> = Result<T, AiError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // LoadError -> PipelineError
        let load_err = LoadError::EmptyFile;
        let pipeline_err: PipelineError = load_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        // TransformError -> PipelineError
        let transform_err = TransformError::UnknownOperation("shuffle".into());
        let pipeline_err: PipelineError = transform_err.into();
        assert!(pipeline_err.to_string().contains("shuffle"));
    }

    #[test]
    fn test_ragged_row_format() {
        let err = TableError::RaggedRow { row: 3, expected: 2, found: 5 };
        let msg = err.to_string();
        assert!(msg.contains("Row 3"));
        assert!(msg.contains("expected 2"));
    }

    #[test]
    fn test_server_status_codes() {
        let bad: ServerError = PipelineError::Load(LoadError::NoHeaders).into();
        assert_eq!(bad.status_code(), 400);

        let ai: ServerError = PipelineError::Ai(AiError::Timeout).into();
        assert_eq!(ai.status_code(), 503);

        assert_eq!(ServerError::NotFound("job".into()).status_code(), 404);
    }

    #[test]
    fn test_transient_errors() {
        assert!(AiError::Timeout.is_transient());
        assert!(AiError::Api { status: 502, message: "bad gateway".into() }.is_transient());
        assert!(!AiError::Api { status: 404, message: "model not found".into() }.is_transient());
        assert!(!AiError::InvalidResponse("no csv".into()).is_transient());
    }
}
