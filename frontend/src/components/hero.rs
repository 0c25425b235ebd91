//! Hero section component

use leptos::*;

#[component]
pub fn Hero() -> impl IntoView {
    view! {
        <div class="hero">
            <h1>"Excel Refiner"</h1>
            <p class="subtitle">
                "Upload a spreadsheet, describe what you want, download a clean workbook. "
                "Instructions run on a local Ollama model, with built-in operations as a fallback."
            </p>
        </div>
    }
}
