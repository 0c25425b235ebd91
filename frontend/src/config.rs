//! Application configuration.
//!
//! Compile-time constants for the refiner frontend.

/// Backend API base URL.
pub const BACKEND_URL: &str = "http://localhost:3000";

/// Maximum file size for upload (in bytes).
///
/// 50 MB limit, same as the backend's body limit.
pub const MAX_FILE_SIZE: f64 = 50.0 * 1024.0 * 1024.0;

/// Maximum logs to keep in memory.
pub const MAX_LOG_ENTRIES: usize = 100;

/// File types accepted by the upload input.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["xlsx", "xls", "xlsb", "ods", "csv"];
