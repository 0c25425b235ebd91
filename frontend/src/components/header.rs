//! Top bar with the Ollama status badge.

use leptos::*;

use crate::services::fetch_ai_status;
use crate::types::AiStatus;
use crate::BACKEND_URL;

#[component]
pub fn Header(
    ai_status: ReadSignal<Option<AiStatus>>,
    set_ai_status: WriteSignal<Option<AiStatus>>,
) -> impl IntoView {
    let refresh = move || {
        spawn_local(async move {
            match fetch_ai_status(BACKEND_URL).await {
                Ok(status) => {
                    log::info!("🤖 Ollama available: {} ({})", status.available, status.model);
                    set_ai_status.set(Some(status));
                }
                Err(e) => {
                    log::warn!("Could not fetch AI status: {}", e);
                    set_ai_status.set(None);
                }
            }
        });
    };

    refresh();

    let label = move || match ai_status.get() {
        Some(status) if status.available && status.model_installed => {
            format!("{} ready", status.model)
        }
        Some(status) if status.available => format!("{} not installed", status.model),
        Some(_) => "Ollama offline".to_string(),
        None => "Backend unreachable".to_string(),
    };
    let online = move || {
        ai_status
            .get()
            .map(|s| s.available && s.model_installed)
            .unwrap_or(false)
    };

    view! {
        <header>
            <div class="header-left">
                <a href="#" class="logo">"EXCEL REFINER"</a>
            </div>
            <div class="header-right">
                <div
                    class="ai-status"
                    class:connected=online
                    title="Click to refresh"
                    on:click=move |_| refresh()
                    style="cursor: pointer;"
                >
                    <span class="ai-dot" class:connected=online></span>
                    <span>{label}</span>
                </div>
            </div>
        </header>
    }
}
