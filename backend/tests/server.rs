//! HTTP API round trips against a server bound on an ephemeral port.

use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::Value;

use refiner::server::{router, AppState};
use refiner::{load_bytes, Cell, OllamaClient, RefinerConfig};

const PEOPLE_CSV: &[u8] = b"Name,Age\nalice,30\n,\nBOB,25\n";

async fn spawn_server() -> String {
    let config = RefinerConfig::default();
    let client = OllamaClient::new("http://127.0.0.1:1", "llama2").with_max_retries(0);
    let app = router(AppState::with_client(config, client));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn upload(bytes: &'static [u8], name: &str) -> Form {
    Form::new().part("file", Part::bytes(bytes).file_name(name.to_string()))
}

#[tokio::test]
async fn refine_then_download() {
    let base = spawn_server().await;
    let http = reqwest::Client::new();

    let form = upload(PEOPLE_CSV, "people.csv").text("operation", "remove-empty-rows");
    let response = http
        .post(format!("{}/api/refine", base))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ready");
    assert_eq!(body["mode"], "tabular");
    assert_eq!(body["operation"], "remove-empty-rows");
    assert_eq!(body["preview"]["totalRows"], 2);
    assert_eq!(body["source"]["fileName"], "people.csv");
    assert_eq!(body["source"]["rowCount"], 3);

    let url = body["downloadUrl"].as_str().unwrap();
    let download = http.get(format!("{}{}", base, url)).send().await.unwrap();
    assert_eq!(download.status(), StatusCode::OK);
    assert!(download
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .contains("processed_data.xlsx"));

    let bytes = download.bytes().await.unwrap();
    let loaded = load_bytes(&bytes, Some("processed_data.xlsx"), None).unwrap();
    assert_eq!(loaded.table.height(), 2);
    assert_eq!(loaded.table.cell(1, 0), Some(&Cell::text("BOB")));
}

#[tokio::test]
async fn instruction_without_ai_falls_back() {
    let base = spawn_server().await;

    let form = upload(PEOPLE_CSV, "people.csv")
        .text("operation", "ai-custom")
        .text("instruction", "Convert names to uppercase")
        .text("useAi", "false");
    let body: Value = reqwest::Client::new()
        .post(format!("{}/api/refine", base))
        .multipart(form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "fallback");
    assert_eq!(body["mode"], "tabular");
    assert_eq!(body["fallbackReason"], "AI processing is disabled");
    assert_eq!(body["preview"]["rows"][0][0], "ALICE");
}

#[tokio::test]
async fn strict_ai_unavailable_is_503() {
    let base = spawn_server().await;

    let form = upload(PEOPLE_CSV, "people.csv")
        .text("instruction", "reorder columns")
        .text("useAi", "true")
        .text("strict", "true");
    let response = reqwest::Client::new()
        .post(format!("{}/api/refine", base))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn bad_requests() {
    let base = spawn_server().await;
    let http = reqwest::Client::new();

    // No file
    let response = http
        .post(format!("{}/api/refine", base))
        .multipart(Form::new().text("operation", "summarize"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Empty file
    let response = http
        .post(format!("{}/api/refine", base))
        .multipart(upload(b"", "empty.csv").text("operation", "summarize"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "error");

    // Header only
    let response = http
        .post(format!("{}/api/refine", base))
        .multipart(upload(b"Name,Age\n", "headers.csv").text("operation", "summarize"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Unknown operation
    let response = http
        .post(format!("{}/api/refine", base))
        .multipart(upload(PEOPLE_CSV, "people.csv").text("operation", "shuffle"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Unknown job
    let response = http
        .get(format!("{}/api/download/does-not-exist", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ai_status_reports_unreachable() {
    let base = spawn_server().await;
    let body: Value = reqwest::get(format!("{}/api/ai/status", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["available"], false);
    assert_eq!(body["model"], "llama2");

    let health: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["ai"]["available"], false);
}
