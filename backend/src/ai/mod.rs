//! Local model client (Ollama).
//!
//! Sends the table as CSV plus the user's instruction to a locally running
//! Ollama service and parses the CSV it answers with.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use refiner::ai::OllamaClient;
//! use refiner::config::RefinerConfig;
//!
//! let client = OllamaClient::from_config(&RefinerConfig::from_env());
//! if client.is_available().await {
//!     let refined = client.refine_table(&table, "merge first and last name").await?;
//! }
//! ```

pub mod prompt;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::api::logs::{log_info_indent, log_success, log_warning};
use crate::cache::{shared_cache, ResponseCache};
use crate::config::RefinerConfig;
use crate::error::{AiError, AiResult};
use crate::models::Table;
use crate::parser::parse_csv_str;
use crate::render::to_csv_string;

pub use prompt::{build_prompt, extract_csv, is_preamble, system_prompt};

/// Timeout for the availability probe
const AVAILABILITY_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay between retries in milliseconds
const RETRY_DELAY_MS: u64 = 1000;

/// Client for the Ollama HTTP API
#[derive(Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
    max_retries: u32,
    cache: Option<Arc<ResponseCache>>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Ollama error body: `{"error": "..."}`
#[derive(Debug, Deserialize)]
struct OllamaError {
    error: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

/// Reachability report for the status endpoint and `refiner ai-status`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiStatus {
    pub available: bool,
    pub host: String,
    pub model: String,
    /// Models installed on the service (empty when unreachable)
    pub models: Vec<String>,
    /// Whether the configured model is among them
    pub model_installed: bool,
}

impl OllamaClient {
    /// Client without a response cache.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            timeout: Duration::from_secs(crate::config::DEFAULT_AI_TIMEOUT_SECS),
            max_retries: crate::config::DEFAULT_MAX_RETRIES,
            cache: None,
        }
    }

    /// Client from config, sharing the process-wide response cache.
    pub fn from_config(config: &RefinerConfig) -> Self {
        Self::new(&config.ollama_host, &config.model)
            .with_timeout(config.ai_timeout())
            .with_max_retries(config.max_retries)
            .with_cache(Some(shared_cache()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_cache(mut self, cache: Option<Arc<ResponseCache>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// True when the service answers `GET /api/tags`.
    pub async fn is_available(&self) -> bool {
        self.http
            .get(format!("{}/api/tags", self.base_url))
            .timeout(AVAILABILITY_TIMEOUT)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    /// Names of the installed models.
    pub async fn list_models(&self) -> AiResult<Vec<String>> {
        let response = self
            .http
            .get(format!("{}/api/tags", self.base_url))
            .timeout(AVAILABILITY_TIMEOUT)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AiError::Api {
                status: status.as_u16(),
                message: format!("HTTP {}", status),
            });
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| AiError::InvalidResponse(e.to_string()))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Reachability, installed models and whether ours is one of them.
    pub async fn status(&self) -> AiStatus {
        let models = self.list_models().await;
        let available = models.is_ok();
        let models = models.unwrap_or_default();
        let model_installed = models
            .iter()
            .any(|m| m == &self.model || m.split(':').next() == Some(self.model.as_str()));

        AiStatus {
            available,
            host: self.base_url.clone(),
            model: self.model.clone(),
            models,
            model_installed,
        }
    }

    /// Generate a completion (with cache and retries).
    pub async fn generate(&self, prompt: &str) -> AiResult<String> {
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&self.model, prompt) {
                log_success("Using cached model response");
                return Ok(hit.response);
            }
        }

        let attempts = self.max_retries + 1;
        let mut attempt = 1;
        let text = loop {
            match self.try_generate(prompt).await {
                Ok(text) => break text,
                Err(e) if e.is_transient() && attempt < attempts => {
                    log_warning(format!("Attempt {}/{} failed: {}", attempt, attempts, e));
                    log_info_indent(format!("↻ Retrying in {}ms...", RETRY_DELAY_MS), 1);
                    tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        if let Some(cache) = &self.cache {
            cache.insert(&self.model, prompt, text.clone());
        }
        Ok(text)
    }

    /// Single generate call
    async fn try_generate(&self, prompt: &str) -> AiResult<String> {
        log_info_indent(format!("📡 Calling Ollama ({}) at {}", self.model, self.base_url), 1);

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            system: system_prompt(),
            stream: false,
            options: GenerateOptions { temperature: 0.0 },
        };

        let response = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            let message = serde_json::from_str::<OllamaError>(&body)
                .map(|e| e.error)
                .unwrap_or_else(|_| body.chars().take(200).collect());
            return Err(AiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let reply: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| AiError::InvalidResponse(e.to_string()))?;

        if reply.response.trim().is_empty() {
            return Err(AiError::InvalidResponse("empty response".to_string()));
        }

        log_info_indent(format!("Received {} bytes", reply.response.len()), 1);
        Ok(reply.response)
    }

    /// Apply a free-text instruction to a table through the model.
    ///
    /// The reply must be a well-formed CSV table; anything else is an
    /// [`AiError::InvalidResponse`] and no table is returned.
    pub async fn refine_table(&self, table: &Table, instruction: &str) -> AiResult<Table> {
        let csv = to_csv_string(table).map_err(|e| AiError::RequestFailed(e.to_string()))?;
        let prompt = build_prompt(instruction, &csv);
        let reply = self.generate(&prompt).await?;
        parse_reply(&reply)
    }
}

/// Parse a model reply into a table.
///
/// Ragged CSV, a header made of prose ("here is the table:"), or a reply
/// with a header but no data rows (usually a sentence of prose) is
/// rejected.
pub fn parse_reply(reply: &str) -> AiResult<Table> {
    let body = extract_csv(reply);
    if body.trim().is_empty() {
        return Err(AiError::InvalidResponse("reply contains no CSV".to_string()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(false)
        .from_reader(body.as_bytes());
    for record in reader.records() {
        record.map_err(|e| AiError::InvalidResponse(e.to_string()))?;
    }

    let table = parse_csv_str(&body, ',').map_err(|e| AiError::InvalidResponse(e.to_string()))?;
    if let Some(column) = table.columns().iter().find(|c| c.contains(' ') && is_preamble(c)) {
        return Err(AiError::InvalidResponse(format!("header looks like prose: '{}'", column)));
    }
    if table.is_empty() {
        return Err(AiError::InvalidResponse("reply has no data rows".to_string()));
    }
    Ok(table)
}

fn map_transport_error(e: reqwest::Error) -> AiError {
    if e.is_timeout() {
        AiError::Timeout
    } else if e.is_connect() {
        AiError::Unavailable(e.to_string())
    } else {
        AiError::RequestFailed(e.to_string())
    }
}
