//! # Refiner - spreadsheet cleaning with a local model or plain tabular operations
//!
//! Refiner loads a spreadsheet (xlsx, xls, xlsb, ods or CSV), applies one
//! operation and hands back the result as a preview and an xlsx download.
//! Free-text instructions go to a locally running Ollama model; when that
//! is not possible the instruction is mapped onto a deterministic operation.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────────┐     ┌─────────────┐
//! │ Spreadsheet │────▶│   Parser    │────▶│    Transform     │────▶│   Render    │
//! │ (xlsx/csv)  │     │ (auto-fmt)  │     │ (Ollama/tabular) │     │ (xlsx/text) │
//! └─────────────┘     └─────────────┘     └──────────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use refiner::{refine_file, OllamaClient, Operation, RefineOptions, RefinerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = OllamaClient::from_config(&RefinerConfig::from_env());
//!     let result = refine_file("input.xlsx".as_ref(), &Operation::Summarize, &RefineOptions::default(), &client)
//!         .await
//!         .unwrap();
//!     println!("{}", refiner::render::preview_text(&result.outcome.table, 20));
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per layer
//! - [`models`] - Table, Cell, SourceFormat
//! - [`config`] - Environment configuration
//! - [`parser`] - Spreadsheet / CSV loading with auto-detection
//! - [`transform`] - Operations, selector and pipeline
//! - [`ai`] - Ollama client
//! - [`cache`] - Model response cache
//! - [`render`] - xlsx / csv export and text previews
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Loading
pub mod parser;

// Transformation
pub mod transform;

// AI
pub mod ai;
pub mod cache;

// Output
pub mod render;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::RefinerConfig;

pub use error::{
    AiError, ExportError, LoadError, PipelineError, ServerError, TableError, TransformError,
};

pub use models::{Cell, SourceFormat, Table};

pub use parser::{load_bytes, load_file, LoadResult};

pub use transform::{
    apply, operations_description, refine_bytes, refine_file, refine_table, FallbackReason,
    Operation, RefineMode, RefineOptions, RefineOutcome, RefineResult, SourceInfo, TextCase,
};

pub use ai::{AiStatus, OllamaClient};

pub use cache::ResponseCache;

pub use render::{preview_text, to_csv_string, to_xlsx_bytes, write_file};

pub use api::types::{error_response, RefineResponse, TablePreview};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server, AppState};
}
