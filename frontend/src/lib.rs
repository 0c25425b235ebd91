//! Excel Refiner - Frontend Rust/Leptos Application
//!
//! A WebAssembly frontend for uploading spreadsheets, describing the
//! cleanup in plain language, and downloading the refined workbook.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        App                                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Header (Ollama status)                                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  MainContent                                                 │
//! │  ├── Hero (title, description)                              │
//! │  ├── UploadSection (until a result arrives)                 │
//! │  ├── LogsPanel (while logs exist)                           │
//! │  └── PreviewSection (when a result is ready)                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Footer                                                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`types`] - Common types (LogEntry, RefineResponse, etc.)
//! - [`components`] - UI components (Header, Upload, Preview, etc.)
//! - [`services`] - Backend communication

use leptos::*;
use leptos_router::*;
use wasm_bindgen::prelude::*;

// =============================================================================
// Module declarations
// =============================================================================

pub mod config;
pub mod types;
pub mod components;
pub mod services;

// =============================================================================
// Re-exports
// =============================================================================

// Configuration
pub use config::*;

// Types
pub use types::{
    // Logs
    LogEntry, LogLevel,
    // API
    AiStatus, RefineMode, RefineRequest, RefineResponse, SourceMetadata, TablePreview,
    // Errors
    AppError, AppResult,
};

// Components
pub use components::*;

// Services
pub use services::*;

// =============================================================================
// Application Entry Point
// =============================================================================

/// WASM entry point - called automatically by trunk.
#[wasm_bindgen(start)]
pub fn main() {
    // Setup panic hook for better error messages
    console_error_panic_hook::set_once();
    
    // Setup console logging
    _ = console_log::init_with_level(log::Level::Debug);
    
    log::info!("🦀 Excel Refiner - Starting Leptos App");
    
    // Mount the application
    mount_to_body(|| view! { <App/> });
}

#[component]
pub fn App() -> impl IntoView {
    view! {
        <Router>
            <main>
                <Routes>
                    <Route path="/" view=MainContent/>
                </Routes>
            </main>
        </Router>
    }
}

#[component]
fn MainContent() -> impl IntoView {
    let (ai_status, set_ai_status) = create_signal(None::<AiStatus>);
    let (result, set_result) = create_signal(None::<RefineResponse>);
    let (logs, set_logs) = create_signal(Vec::<LogEntry>::new());

    // Initialize SSE connection ONCE at app startup
    init_sse_logs(set_logs);

    view! {
        <Header ai_status=ai_status set_ai_status=set_ai_status/>

        <div class="container">
            <Hero/>

            // Form until a result arrives
            <Show
                when=move || result.get().is_none()
                fallback=|| view! { }
            >
                <UploadSection
                    set_result=set_result
                    set_logs=set_logs
                    ai_status=ai_status
                />
            </Show>

            <Show
                when=move || !logs.get().is_empty()
                fallback=|| view! { }
            >
                <LogsPanel logs=logs set_logs=set_logs/>
            </Show>

            <PreviewSection result=result set_result=set_result set_logs=set_logs/>
        </div>

        <Footer/>
    }
}
