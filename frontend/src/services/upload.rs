//! HTTP calls to the refiner backend.

use gloo_net::http::Request;
use serde::Deserialize;
use web_sys::{File, FormData};

use crate::config::{ACCEPTED_EXTENSIONS, MAX_FILE_SIZE};
use crate::types::{AiStatus, AppError, AppResult, RefineRequest, RefineResponse};

/// Backend error body: `{"status": "error", "error": "..."}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Reject files the backend would refuse before sending them.
pub fn validate_file(name: &str, size: f64) -> AppResult<()> {
    if size <= 0.0 {
        return Err(AppError::Validation(format!("{} is empty", name)));
    }
    if size > MAX_FILE_SIZE {
        return Err(AppError::Validation(format!(
            "{} is larger than {} MB",
            name,
            MAX_FILE_SIZE / (1024.0 * 1024.0)
        )));
    }

    let extension = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match extension {
        Some(ext) if ACCEPTED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(AppError::Validation(format!(
            "Unsupported file type. Use one of: {}",
            ACCEPTED_EXTENSIONS.join(", ")
        ))),
    }
}

/// Value for the `accept` attribute of the file input.
pub fn accept_attribute() -> String {
    ACCEPTED_EXTENSIONS
        .iter()
        .map(|ext| format!(".{}", ext))
        .collect::<Vec<_>>()
        .join(",")
}

/// Upload a spreadsheet with the requested operation to `POST /api/refine`.
pub async fn refine_upload(
    file: File,
    request: &RefineRequest,
    backend_url: &str,
) -> AppResult<RefineResponse> {
    let form_data = FormData::new()
        .map_err(|e| AppError::Upload(format!("Failed to create FormData: {:?}", e)))?;

    form_data
        .append_with_blob_and_filename("file", &file, &file.name())
        .map_err(|e| AppError::Upload(format!("Failed to append file: {:?}", e)))?;
    for (key, value) in request.form_fields() {
        form_data
            .append_with_str(key, &value)
            .map_err(|e| AppError::Upload(format!("Failed to append {}: {:?}", key, e)))?;
    }

    let url = format!("{}/api/refine", backend_url);
    let response = Request::post(&url)
        .body(form_data)
        .map_err(|e| AppError::Upload(format!("Failed to build request: {}", e)))?
        .send()
        .await
        .map_err(|e| AppError::Network(e.to_string()))?;

    if !response.ok() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or(text);
        return Err(AppError::Upload(format!("{} (HTTP {})", message, status)));
    }

    response
        .json::<RefineResponse>()
        .await
        .map_err(|e| AppError::Network(format!("Failed to parse response: {}", e)))
}

/// Query `GET /api/ai/status`.
pub async fn fetch_ai_status(backend_url: &str) -> AppResult<AiStatus> {
    let response = Request::get(&format!("{}/api/ai/status", backend_url))
        .send()
        .await
        .map_err(|e| AppError::Network(e.to_string()))?;

    if !response.ok() {
        return Err(AppError::Network(format!("HTTP {}", response.status())));
    }

    response
        .json::<AiStatus>()
        .await
        .map_err(|e| AppError::Network(e.to_string()))
}

/// Absolute download link for a job.
pub fn download_url(backend_url: &str, path: &str) -> String {
    format!("{}{}", backend_url.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_file() {
        assert!(validate_file("sales.xlsx", 2048.0).is_ok());
        assert!(validate_file("EXPORT.CSV", 10.0).is_ok());
        assert!(validate_file("notes.txt", 10.0).is_err());
        assert!(validate_file("noextension", 10.0).is_err());
        assert!(validate_file("empty.csv", 0.0).is_err());
        assert!(validate_file("huge.xlsx", MAX_FILE_SIZE + 1.0).is_err());
    }

    #[test]
    fn test_accept_attribute() {
        assert_eq!(accept_attribute(), ".xlsx,.xls,.xlsb,.ods,.csv");
    }

    #[test]
    fn test_download_url() {
        assert_eq!(
            download_url("http://localhost:3000/", "/api/download/abc"),
            "http://localhost:3000/api/download/abc"
        );
    }

    #[test]
    fn test_ai_status_deserialization() {
        let json = r#"{"available":true,"host":"http://localhost:11434","model":"llama2","models":["llama2:latest"],"modelInstalled":true}"#;
        let status: AiStatus = serde_json::from_str(json).unwrap();
        assert!(status.available);
        assert!(status.model_installed);
        assert_eq!(status.models.len(), 1);
    }
}
