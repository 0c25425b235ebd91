//! Backend communication.
//!
//! - [`upload`] - Spreadsheet upload, AI status and download links

pub mod upload;

pub use upload::*;
