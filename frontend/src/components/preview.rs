//! Result preview with download link.

use leptos::*;

use crate::services::download_url;
use crate::types::{cell_text, RefineResponse};
use crate::{LogEntry, BACKEND_URL};

#[component]
pub fn PreviewSection(
    result: ReadSignal<Option<RefineResponse>>,
    set_result: WriteSignal<Option<RefineResponse>>,
    set_logs: WriteSignal<Vec<LogEntry>>,
) -> impl IntoView {
    // Back to the form
    let on_reset = move |_| {
        set_result.set(None);
        set_logs.set(vec![]);
    };

    move || {
        result.get().map(|response| {
            let href = download_url(BACKEND_URL, &response.download_url);
            let preview = response.preview.clone();
            let shown = preview.rows.len();
            let notice = response.fallback_reason.clone().map(|reason| {
                format!("⚠️ {}; used {} instead", reason, response.mode.label().to_lowercase())
            });
            let operation = response
                .operation
                .clone()
                .unwrap_or_else(|| "none".to_string());

            view! {
                <div class="preview-section show">
                    <div class="preview-header">
                        <div class="preview-title">"📋 Refined data"</div>
                        <button class="btn btn-secondary" on:click=on_reset>"Start over"</button>
                    </div>

                    <div class="preview-meta">
                        {response.source.file_name.clone().unwrap_or_default()}
                        " • " {response.source.format.clone()}
                        {response.source.sheet.clone().map(|s| format!(" • sheet {}", s))}
                        " • " {response.mode.label()} " (" {operation} ")"
                    </div>

                    {notice.map(|text| view! { <div class="fallback-notice">{text}</div> })}

                    <div class="preview-table-wrapper">
                        <table class="preview-table">
                            <thead>
                                <tr>
                                    {preview
                                        .columns
                                        .iter()
                                        .map(|c| view! { <th>{c.clone()}</th> })
                                        .collect_view()}
                                </tr>
                            </thead>
                            <tbody>
                                {preview
                                    .rows
                                    .iter()
                                    .map(|row| {
                                        view! {
                                            <tr>
                                                {row
                                                    .iter()
                                                    .map(|v| view! { <td>{cell_text(v)}</td> })
                                                    .collect_view()}
                                            </tr>
                                        }
                                    })
                                    .collect_view()}
                            </tbody>
                        </table>
                    </div>

                    <div class="preview-footer">
                        <div class="preview-cost">
                            {if preview.truncated {
                                format!("Showing {} of {} rows", shown, preview.total_rows)
                            } else {
                                format!("{} rows", preview.total_rows)
                            }}
                        </div>
                        <a class="btn btn-primary" href=href download="processed_data.xlsx">
                            "⬇ Download .xlsx"
                        </a>
                    </div>
                </div>
            }
        })
    }
}
