//! REST API types for frontend integration.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::Table;
use crate::transform::pipeline::{FallbackReason, RefineMode, RefineResult};

/// Response to `POST /api/refine`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineResponse {
    /// Id for `GET /api/download/{job_id}`
    pub job_id: String,

    /// "ready", or "fallback" when ai-custom could not use the model
    pub status: String,

    pub mode: RefineMode,

    /// Name of the operation that produced the table (`None` for passthrough)
    pub operation: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,

    pub preview: TablePreview,

    pub source: SourceMetadata,

    pub download_url: String,
}

/// First rows of a table as JSON scalars
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePreview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub total_rows: usize,
    pub truncated: bool,
}

impl TablePreview {
    pub fn from_table(table: &Table, max_rows: usize) -> Self {
        Self {
            columns: table.columns().to_vec(),
            rows: table
                .rows()
                .iter()
                .take(max_rows)
                .map(|row| row.iter().map(|c| c.to_json()).collect())
                .collect(),
            total_rows: table.height(),
            truncated: table.height() > max_rows,
        }
    }
}

/// Uploaded file metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMetadata {
    pub file_name: Option<String>,
    pub format: String,
    pub sheet: Option<String>,
    pub row_count: usize,
    pub columns: Vec<String>,
}

impl RefineResponse {
    pub fn new(job_id: String, result: &RefineResult, preview_rows: usize) -> Self {
        let outcome = &result.outcome;
        let status = if outcome.is_fallback() { "fallback" } else { "ready" };

        Self {
            download_url: format!("/api/download/{}", job_id),
            job_id,
            status: status.to_string(),
            mode: outcome.mode,
            operation: outcome.applied.as_ref().map(|op| op.name().to_string()),
            fallback_reason: outcome.fallback.as_ref().map(FallbackReason::to_string),
            preview: TablePreview::from_table(&outcome.table, preview_rows),
            source: SourceMetadata {
                file_name: result.source.file_name.clone(),
                format: result.source.format.to_string(),
                sheet: result.source.sheet.clone(),
                row_count: result.source.row_count,
                columns: result.source.columns.clone(),
            },
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cell, SourceFormat};
    use crate::transform::operations::Operation;
    use crate::transform::pipeline::{RefineOutcome, SourceInfo};

    fn result(fallback: Option<FallbackReason>) -> RefineResult {
        let table = Table::new(
            vec!["Name".into(), "Age".into()],
            vec![
                vec![Cell::text("ALICE"), Cell::Number(30.0)],
                vec![Cell::text("BOB"), Cell::Empty],
            ],
        )
        .unwrap();
        RefineResult {
            source: SourceInfo {
                file_name: Some("people.xlsx".into()),
                format: SourceFormat::Xlsx,
                sheet: Some("Sheet1".into()),
                encoding: None,
                delimiter: None,
                row_count: 3,
                columns: vec!["Name".into(), "Age".into()],
            },
            outcome: RefineOutcome {
                table,
                mode: RefineMode::Tabular,
                applied: Some(Operation::RemoveEmptyRows),
                fallback,
            },
        }
    }

    #[test]
    fn test_refine_response_json() {
        let response = RefineResponse::new("job-1".into(), &result(None), 1);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["jobId"], "job-1");
        assert_eq!(json["status"], "ready");
        assert_eq!(json["mode"], "tabular");
        assert_eq!(json["operation"], "remove-empty-rows");
        assert!(json.get("fallbackReason").is_none());
        assert_eq!(json["downloadUrl"], "/api/download/job-1");
        assert_eq!(json["preview"]["rows"], json!([["ALICE", 30.0]]));
        assert_eq!(json["preview"]["totalRows"], 2);
        assert_eq!(json["preview"]["truncated"], true);
        assert_eq!(json["source"]["format"], "xlsx");
        assert_eq!(json["source"]["rowCount"], 3);
    }

    #[test]
    fn test_fallback_status() {
        let response = RefineResponse::new("job-2".into(), &result(Some(FallbackReason::Unavailable)), 10);
        assert_eq!(response.status, "fallback");
        assert_eq!(response.fallback_reason.as_deref(), Some("Ollama is not running"));
        assert!(!response.preview.truncated);
    }

    #[test]
    fn test_error_response() {
        let body = error_response("File is empty");
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "File is empty");
    }
}
