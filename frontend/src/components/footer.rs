//! Footer component

use leptos::*;

#[component]
pub fn Footer() -> impl IntoView {
    view! {
        <footer>
            <div>"Excel Refiner • Powered by " <span class="rust-badge">"🦀 Rust + Leptos"</span></div>
            <div class="footer-links">
                <a href="https://ollama.com" class="footer-link" target="_blank">
                    "Ollama"
                </a>
            </div>
        </footer>
    }
}
