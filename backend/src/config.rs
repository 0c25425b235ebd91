//! Runtime configuration.
//!
//! Values come from the environment (a `.env` file is loaded first when
//! present). CLI flags override individual fields.
//!
//! | Variable                  | Default                  |
//! |---------------------------|--------------------------|
//! | `OLLAMA_HOST`             | `http://localhost:11434` |
//! | `REFINER_MODEL`           | `llama2`                 |
//! | `REFINER_AI_TIMEOUT_SECS` | `60`                     |
//! | `REFINER_MAX_RETRIES`     | `2`                      |
//! | `REFINER_PORT`            | `3000`                   |

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Default model name.
pub const DEFAULT_MODEL: &str = "llama2";

/// Model call timeout.
pub const DEFAULT_AI_TIMEOUT_SECS: u64 = 60;

/// Retries after the first failed model call.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// HTTP server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Rows shown in previews.
pub const DEFAULT_PREVIEW_ROWS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinerConfig {
    /// Base URL of the Ollama service
    pub ollama_host: String,
    /// Model used for ai-custom requests
    pub model: String,
    /// Timeout for one generate call, in seconds
    pub ai_timeout_secs: u64,
    /// Extra attempts on transient failures
    pub max_retries: u32,
    /// Port for `refiner serve`
    pub port: u16,
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            model: DEFAULT_MODEL.to_string(),
            ai_timeout_secs: DEFAULT_AI_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            port: DEFAULT_PORT,
        }
    }
}

impl RefinerConfig {
    /// Load from the process environment (and `.env`).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Unparseable values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            ollama_host: non_empty("OLLAMA_HOST")
                .map(|h| normalize_host(&h))
                .unwrap_or(defaults.ollama_host),
            model: non_empty("REFINER_MODEL").unwrap_or(defaults.model),
            ai_timeout_secs: non_empty("REFINER_AI_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.ai_timeout_secs),
            max_retries: non_empty("REFINER_MAX_RETRIES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_retries),
            port: non_empty("REFINER_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_host(mut self, host: &str) -> Self {
        self.ollama_host = normalize_host(host);
        self
    }

    pub fn ai_timeout(&self) -> Duration {
        Duration::from_secs(self.ai_timeout_secs)
    }
}

/// `OLLAMA_HOST` may be given as `host:port`; add a scheme and drop the trailing slash.
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}
