//! Common types used across the frontend application.
//!
//! # Categories
//!
//! - **Operation Types** - What the user can ask for
//! - **Log Types** - Real-time log streaming
//! - **API Types** - Backend response structures
//! - **Error Types** - Frontend error handling

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// =============================================================================
// Operation Types
// =============================================================================

/// Operations offered in the selector: (value sent to the backend, label).
pub const OPERATIONS: &[(&str, &str)] = &[
    ("ai-custom", "Custom instruction"),
    ("remove-empty-rows", "Remove empty rows"),
    ("normalize-text-case", "Normalize text case"),
    ("summarize", "Summarize numeric columns"),
];

/// Case rules for normalize-text-case.
pub const TEXT_CASES: &[(&str, &str)] = &[
    ("upper", "UPPERCASE"),
    ("lower", "lowercase"),
    ("title", "Title Case"),
];

/// Form state sent to `POST /api/refine`.
#[derive(Clone, Debug, PartialEq)]
pub struct RefineRequest {
    pub operation: String,
    pub case: String,
    pub instruction: String,
    pub use_ai: bool,
    /// Error out instead of falling back when the model cannot be used
    pub strict: bool,
    /// Worksheet to read; blank means the first one
    pub sheet: String,
}

impl Default for RefineRequest {
    fn default() -> Self {
        Self {
            operation: "ai-custom".to_string(),
            case: "upper".to_string(),
            instruction: String::new(),
            use_ai: false,
            strict: false,
            sheet: String::new(),
        }
    }
}

impl RefineRequest {
    pub fn needs_instruction(&self) -> bool {
        self.operation == "ai-custom"
    }

    pub fn needs_case(&self) -> bool {
        self.operation == "normalize-text-case"
    }

    /// Multipart text fields for `POST /api/refine` (the file goes first).
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let flag = |b: bool| String::from(if b { "true" } else { "false" });

        let mut fields = vec![("operation", self.operation.clone())];
        if self.needs_instruction() {
            fields.push(("instruction", self.instruction.trim().to_string()));
            fields.push(("useAi", flag(self.use_ai)));
            fields.push(("strict", flag(self.use_ai && self.strict)));
        }
        if self.needs_case() {
            fields.push(("case", self.case.clone()));
        }
        let sheet = self.sheet.trim();
        if !sheet.is_empty() {
            fields.push(("sheet", sheet.to_string()));
        }
        fields
    }

    /// Client-side check before uploading.
    pub fn validate(&self) -> AppResult<()> {
        if self.needs_instruction() && self.instruction.trim().is_empty() {
            return Err(AppError::Validation(
                "Tell the refiner what to do with your data".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Log Types
// =============================================================================

/// Log severity level.
///
/// Matches the backend's log levels for SSE streaming.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    /// Get CSS class for styling.
    pub fn css_class(&self) -> &'static str {
        match self {
            LogLevel::Info => "log-info",
            LogLevel::Success => "log-success",
            LogLevel::Warning => "log-warning",
            LogLevel::Error => "log-error",
        }
    }
}

/// A single displayed log line.
#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting depth sent by the backend
    pub indent: u8,
    /// Local time (HH:MM:SS)
    pub timestamp: String,
}

// =============================================================================
// API Response Types
// =============================================================================

/// How the backend produced the table.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefineMode {
    Tabular,
    Ai,
    Passthrough,
}

impl RefineMode {
    pub fn label(&self) -> &'static str {
        match self {
            RefineMode::Tabular => "Tabular operation",
            RefineMode::Ai => "Ollama AI",
            RefineMode::Passthrough => "Unchanged",
        }
    }
}

/// Response from `POST /api/refine`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineResponse {
    pub job_id: String,
    /// "ready" or "fallback"
    pub status: String,
    pub mode: RefineMode,
    pub operation: Option<String>,
    #[serde(default)]
    pub fallback_reason: Option<String>,
    pub preview: TablePreview,
    pub source: SourceMetadata,
    /// Path relative to the backend URL
    pub download_url: String,
}

impl RefineResponse {
    pub fn is_fallback(&self) -> bool {
        self.status == "fallback"
    }
}

/// First rows of the refined table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePreview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub total_rows: usize,
    pub truncated: bool,
}

/// Uploaded file metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMetadata {
    pub file_name: Option<String>,
    pub format: String,
    pub sheet: Option<String>,
    pub row_count: usize,
    pub columns: Vec<String>,
}

/// Response from `GET /api/ai/status`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiStatus {
    pub available: bool,
    pub host: String,
    pub model: String,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub model_installed: bool,
}

/// Display form of a preview cell.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

// =============================================================================
// Error Types
// =============================================================================

/// Frontend application errors.
#[derive(Clone, Debug, PartialEq)]
pub enum AppError {
    /// File upload failed.
    Upload(String),
    /// Network/HTTP error.
    Network(String),
    /// Invalid input.
    Validation(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Upload(msg) => write!(f, "Upload error: {}", msg),
            AppError::Network(msg) => write!(f, "Network error: {}", msg),
            AppError::Validation(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Result type alias for frontend operations.
pub type AppResult<T> = Result<T, AppError>;
