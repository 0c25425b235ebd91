//! Refine form: file picker, operation selector and instruction box.
//!
//! Submits to the backend and hands the response to the preview.

use leptos::*;
use web_sys::HtmlInputElement;

use crate::services::{accept_attribute, refine_upload, validate_file};
use crate::types::{AiStatus, RefineRequest, RefineResponse, OPERATIONS, TEXT_CASES};
use crate::{LogEntry, LogLevel, BACKEND_URL};

#[component]
pub fn UploadSection(
    set_result: WriteSignal<Option<RefineResponse>>,
    set_logs: WriteSignal<Vec<LogEntry>>,
    ai_status: ReadSignal<Option<AiStatus>>,
) -> impl IntoView {
    let (request, set_request) = create_signal(RefineRequest::default());
    let (is_uploading, set_is_uploading) = create_signal(false);
    let (error, set_error) = create_signal(None::<String>);
    let (file_name, set_file_name) = create_signal(None::<String>);
    let file_input = create_node_ref::<leptos::html::Input>();

    let ai_ready = move || {
        ai_status
            .get()
            .map(|s| s.available && s.model_installed)
            .unwrap_or(false)
    };

    let on_file_change = move |ev: ev::Event| {
        let input: HtmlInputElement = event_target(&ev);
        let name = input
            .files()
            .and_then(|files| files.get(0))
            .map(|file| file.name());
        set_error.set(None);
        set_file_name.set(name);
    };

    let on_submit = move |ev: ev::SubmitEvent| {
        ev.prevent_default();

        let Some(file) = file_input
            .get()
            .and_then(|input| input.files())
            .and_then(|files| files.get(0))
        else {
            set_error.set(Some("Choose a spreadsheet first".to_string()));
            return;
        };

        let request = request.get();
        if let Err(e) = validate_file(&file.name(), file.size()).and_then(|_| request.validate()) {
            set_error.set(Some(e.to_string()));
            return;
        }

        set_error.set(None);
        set_result.set(None);
        set_logs.set(Vec::new());

        spawn_local(async move {
            set_is_uploading.set(true);
            add_log(set_logs, LogLevel::Info, &format!("📤 Uploading {}...", file.name()));

            match refine_upload(file, &request, BACKEND_URL).await {
                Ok(response) => {
                    let level = if response.is_fallback() {
                        LogLevel::Warning
                    } else {
                        LogLevel::Success
                    };
                    add_log(
                        set_logs,
                        level,
                        &format!(
                            "✅ {} rows ready ({})",
                            response.preview.total_rows,
                            response.mode.label()
                        ),
                    );
                    set_result.set(Some(response));
                }
                Err(e) => {
                    add_log(set_logs, LogLevel::Error, &format!("❌ {}", e));
                    set_error.set(Some(e.to_string()));
                }
            }

            set_is_uploading.set(false);
        });
    };

    view! {
        <form class="upload-section" on:submit=on_submit>
            <div class="upload-icon">"📊"</div>

            <label class="upload-button" for="fileInput">
                {move || file_name.get().unwrap_or_else(|| "Choose a spreadsheet".to_string())}
            </label>
            <input
                type="file"
                id="fileInput"
                accept=accept_attribute()
                style="display:none"
                node_ref=file_input
                on:change=on_file_change
            />
            <div class="upload-hint">"Excel (.xlsx, .xls, .xlsb), OpenDocument (.ods) or CSV"</div>

            <div class="form-row">
                <label for="sheet">"Sheet"</label>
                <input
                    type="text"
                    id="sheet"
                    placeholder="First sheet"
                    prop:value=move || request.get().sheet
                    on:input=move |ev| {
                        let value = event_target_value(&ev);
                        set_request.update(|r| r.sheet = value);
                    }
                />
            </div>

            <div class="form-row">
                <label for="operation">"Operation"</label>
                <select
                    id="operation"
                    on:change=move |ev| {
                        let value = event_target_value(&ev);
                        set_request.update(|r| r.operation = value);
                    }
                >
                    {OPERATIONS
                        .iter()
                        .map(|(value, label)| view! { <option value=*value>{*label}</option> })
                        .collect_view()}
                </select>
            </div>

            <Show when=move || request.get().needs_case() fallback=|| view! {}>
                <div class="form-row">
                    <label for="case">"Case"</label>
                    <select
                        id="case"
                        on:change=move |ev| {
                            let value = event_target_value(&ev);
                            set_request.update(|r| r.case = value);
                        }
                    >
                        {TEXT_CASES
                            .iter()
                            .map(|(value, label)| view! { <option value=*value>{*label}</option> })
                            .collect_view()}
                    </select>
                </div>
            </Show>

            <Show when=move || request.get().needs_instruction() fallback=|| view! {}>
                <div class="form-row">
                    <textarea
                        id="instruction"
                        rows="3"
                        placeholder="e.g. Remove empty rows, convert names to uppercase"
                        prop:value=move || request.get().instruction
                        on:input=move |ev| {
                            let value = event_target_value(&ev);
                            set_request.update(|r| r.instruction = value);
                        }
                    ></textarea>
                </div>
                <div class="form-row">
                    <label class="checkbox">
                        <input
                            type="checkbox"
                            prop:checked=move || request.get().use_ai
                            on:change=move |ev| {
                                let checked = event_target_checked(&ev);
                                set_request.update(|r| r.use_ai = checked);
                            }
                        />
                        " Use local AI (Ollama)"
                    </label>
                    <Show when=move || request.get().use_ai fallback=|| view! {}>
                        <label class="checkbox">
                            <input
                                type="checkbox"
                                prop:checked=move || request.get().strict
                                on:change=move |ev| {
                                    let checked = event_target_checked(&ev);
                                    set_request.update(|r| r.strict = checked);
                                }
                            />
                            " Fail instead of falling back"
                        </label>
                    </Show>
                    <Show when=move || request.get().use_ai && !ai_ready() fallback=|| view! {}>
                        <span class="upload-hint">
                            "Ollama is not ready; a built-in operation will be used if one matches."
                        </span>
                    </Show>
                </div>
            </Show>

            <Show when=move || error.get().is_some() fallback=|| view! {}>
                <div class="error-message">{move || error.get().unwrap_or_default()}</div>
            </Show>

            <button class="btn btn-primary" type="submit" disabled=move || is_uploading.get()>
                {move || if is_uploading.get() { "⏳ Processing..." } else { "Refine" }}
            </button>
        </form>
    }
}

/// Append a local log line (timestamped with the browser clock).
pub fn add_log(set_logs: WriteSignal<Vec<LogEntry>>, level: LogLevel, message: &str) {
    let timestamp = chrono::Local::now().format("%H:%M:%S").to_string();

    set_logs.update(|logs| {
        logs.push(LogEntry {
            level,
            message: message.to_string(),
            indent: 0,
            timestamp,
        });
    });

    log::info!("{}", message);
}
