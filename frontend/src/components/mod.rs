//! UI Components for the Excel Refiner application.
//!
//! # Layout Components
//! - [`Header`] - Top bar with the Ollama status badge
//! - [`Hero`] - Main title and description
//! - [`Footer`] - Page footer
//!
//! # Feature Components
//! - [`UploadSection`] - File picker and operation form
//! - [`PreviewSection`] - Refined table preview and download
//! - [`LogsPanel`] - Real-time processing logs (SSE)

mod header;
mod hero;
mod upload;
mod preview;
mod footer;
mod logs;

pub use header::*;
pub use hero::*;
pub use upload::*;
pub use preview::*;
pub use footer::*;
pub use logs::*;
