//! HTTP server for the refiner API.
//!
//! # API Endpoints
//!
//! | Method | Path                     | Description                          |
//! |--------|--------------------------|--------------------------------------|
//! | GET    | `/health`                | Health check + AI availability       |
//! | GET    | `/api/ai/status`         | Ollama reachability and models       |
//! | POST   | `/api/refine`            | Upload a spreadsheet and refine it   |
//! | GET    | `/api/download/{job_id}` | xlsx of a previous refine            |
//! | GET    | `/api/logs`              | SSE stream for real-time logs        |

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::jobs::JobStore;
use super::logs::{log_error, LOG_BROADCASTER};
use super::types::{error_response, RefineResponse};
use crate::ai::{AiStatus, OllamaClient};
use crate::config::{RefinerConfig, DEFAULT_PREVIEW_ROWS};
use crate::error::{ServerError, ServerResult};
use crate::render::{sanitize_sheet_name, to_xlsx_bytes, DEFAULT_DOWNLOAD_NAME, DEFAULT_SHEET_NAME, XLSX_MIME};
use crate::transform::pipeline::{refine_bytes, RefineOptions};
use crate::transform::selector;

/// Largest accepted upload
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

type ApiError = (StatusCode, Json<Value>);

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub config: RefinerConfig,
    pub client: OllamaClient,
    pub jobs: Arc<JobStore>,
}

impl AppState {
    pub fn new(config: RefinerConfig) -> Self {
        let client = OllamaClient::from_config(&config);
        Self::with_client(config, client)
    }

    pub fn with_client(config: RefinerConfig, client: OllamaClient) -> Self {
        Self {
            config,
            client,
            jobs: Arc::new(JobStore::default()),
        }
    }
}

/// All routes, with CORS and the upload size limit.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/ai/status", get(ai_status))
        .route("/api/refine", post(refine))
        .route("/api/download/{job_id}", get(download))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(config: RefinerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let port = config.port;
    let state = AppState::new(config);
    let model = state.client.model().to_string();
    let host = state.client.base_url().to_string();

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Refiner server running on http://localhost:{}", port);
    println!("   POST /api/refine             - Upload and refine a spreadsheet");
    println!("   GET  /api/download/{{job_id}}  - Download the refined xlsx");
    println!("   GET  /api/ai/status          - Ollama status");
    println!("   GET  /api/logs               - SSE log stream");
    println!("   GET  /health                 - Health check");
    println!();
    println!("🤖 Ollama: {} (model: {})", host, model);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

/// Health check endpoint
async fn health(State(state): State<AppState>) -> Json<Value> {
    let ai_available = state.client.is_available().await;
    Json(json!({
        "status": "ok",
        "service": "refiner",
        "version": env!("CARGO_PKG_VERSION"),
        "ai": {
            "available": ai_available,
            "host": state.client.base_url(),
            "model": state.client.model(),
        },
        "endpoints": {
            "refine": "POST /api/refine",
            "download": "GET /api/download/{job_id}",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

async fn ai_status(State(state): State<AppState>) -> Json<AiStatus> {
    Json(state.client.status().await)
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        // Lagged receivers skip missed entries
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Multipart fields of a refine request
#[derive(Debug, Default)]
struct RefineForm {
    file: Option<Vec<u8>>,
    file_name: Option<String>,
    operation: Option<String>,
    instruction: Option<String>,
    case: Option<String>,
    sheet: Option<String>,
    use_ai: bool,
    strict: bool,
}

impl RefineForm {
    async fn read(mut multipart: Multipart) -> ServerResult<Self> {
        let mut form = RefineForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();

            if name == "file" {
                form.file_name = field.file_name().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                form.file = Some(bytes.to_vec());
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
            match name.as_str() {
                "operation" => form.operation = Some(value),
                "instruction" => form.instruction = Some(value),
                "case" => form.case = Some(value),
                "sheet" => form.sheet = Some(value).filter(|s| !s.trim().is_empty()),
                "useAi" => form.use_ai = parse_flag(&value),
                "strict" => form.strict = parse_flag(&value),
                _ => {}
            }
        }

        Ok(form)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "on" | "yes")
}

/// Upload and refine endpoint
async fn refine(State(state): State<AppState>, multipart: Multipart) -> Result<Json<RefineResponse>, ApiError> {
    run_refine(&state, multipart).await.map(Json).map_err(reject)
}

async fn run_refine(state: &AppState, multipart: Multipart) -> ServerResult<RefineResponse> {
    let form = RefineForm::read(multipart).await?;
    let bytes = form
        .file
        .ok_or_else(|| ServerError::BadRequest("No file provided".to_string()))?;

    let op = selector::resolve(
        form.operation.as_deref(),
        form.case.as_deref(),
        form.instruction.as_deref(),
    )
    .map_err(|e| ServerError::BadRequest(e.to_string()))?;

    println!("\n{}", "=".repeat(70));
    println!(
        "📄 NEW UPLOAD: {} ({} bytes) → {}",
        form.file_name.as_deref().unwrap_or("unknown"),
        bytes.len(),
        op
    );
    println!("{}\n", "=".repeat(70));

    let options = RefineOptions {
        use_ai: form.use_ai,
        strict_ai: form.strict,
        sheet: form.sheet,
        preview_rows: DEFAULT_PREVIEW_ROWS,
    };

    let result = refine_bytes(&bytes, form.file_name.as_deref(), &op, &options, &state.client).await?;

    let sheet_name = result
        .source
        .sheet
        .as_deref()
        .map(sanitize_sheet_name)
        .unwrap_or_else(|| DEFAULT_SHEET_NAME.to_string());
    let job_id = state
        .jobs
        .insert(result.outcome.table.clone(), result.source.file_name.clone(), sheet_name);

    Ok(RefineResponse::new(job_id, &result, options.preview_rows))
}

/// xlsx download of a stored job
async fn download(State(state): State<AppState>, Path(job_id): Path<String>) -> Result<Response, ApiError> {
    let job = state
        .jobs
        .get(&job_id)
        .ok_or_else(|| reject(ServerError::NotFound(format!("job {}", job_id))))?;

    let bytes = to_xlsx_bytes(&job.table, &job.sheet_name)
        .map_err(|e| reject(ServerError::Internal(e.to_string())))?;

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_MIME.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", DEFAULT_DOWNLOAD_NAME),
            ),
        ],
        bytes,
    )
        .into_response())
}

fn reject(err: ServerError) -> ApiError {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        log_error(err.to_string());
    } else {
        eprintln!("❌ {}", err);
    }
    (status, Json(error_response(&err.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" ON "));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_reject_status() {
        let (status, Json(body)) = reject(ServerError::NotFound("job x".into()));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "error");
    }
}
