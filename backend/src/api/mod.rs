//! HTTP API module.
//!
//! Server, request/response types, SSE logging and the download job store.

pub mod jobs;
pub mod logs;
pub mod server;
pub mod types;

pub use jobs::{Job, JobStore};
pub use logs::*;
pub use server::{router, start_server, AppState};
pub use types::*;
