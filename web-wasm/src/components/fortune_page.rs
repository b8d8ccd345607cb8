//! お題とアップロードのページ
//!
//! 写真を選ぶとアップロード→選択→シードのパイプラインを実行し、
//! 確定したらチャットへ移る。

use gloo::file::futures::read_as_bytes;
use leptos::prelude::*;
use leptos::task::spawn_local;
use photo_chat_common::{fortune, PipelineState, UploadFile, FORTUNES};
use web_sys::File;

use crate::app::{use_app, Page};
use crate::components::review_panel::ReviewPanel;
use crate::components::stage_indicator::StageIndicator;
use crate::components::upload_area::UploadArea;

fn random_index() -> usize {
    (js_sys::Math::random() * FORTUNES.len() as f64) as usize
}

/// ブラウザのFileを読み込んでアップロード用に変換
async fn read_upload_file(file: File) -> Result<UploadFile, String> {
    let file = gloo::file::File::from(file);
    let name = file.name();
    let mime_type = file.raw_mime_type();
    let bytes = read_as_bytes(&file)
        .await
        .map_err(|e| format!("Could not read {}: {}", name, e))?;
    let mime_type = Some(mime_type.as_str()).filter(|m| !m.is_empty());
    Ok(UploadFile::new(name.clone(), mime_type, bytes))
}

#[component]
pub fn FortunePage() -> impl IntoView {
    let app = use_app();
    let index = RwSignal::new(random_index());
    let state = RwSignal::new(PipelineState::Idle);
    let running = Signal::derive(move || matches!(state.get(), PipelineState::Running(_)));

    let on_file = move |file: File| {
        let coordinator = app.coordinator();
        app.clear_error();
        state.set(PipelineState::Idle);
        spawn_local(async move {
            let upload = match read_upload_file(file).await {
                Ok(upload) => upload,
                Err(message) => {
                    app.report(message);
                    return;
                }
            };

            let result = coordinator
                .upload_and_select(&upload, |s| state.set(*s))
                .await;
            app.sync_session();
            match result {
                Ok(photo) => {
                    tracing::debug!(filename = %photo.filename, "moving to chat");
                    app.navigate(Page::Chat);
                }
                Err(e) => app.report(format!("Photo could not be prepared ({})", e)),
            }
        });
    };

    view! {
        <section class="fortune-page">
            <div class="fortune-card">
                <p class="fortune-theme">{move || fortune(index.get()).theme}</p>
                <p class="fortune-message">{move || fortune(index.get()).message}</p>
                <button
                    class="btn btn-secondary btn-small"
                    disabled=running
                    on:click=move |_| index.update(|i| *i += 1)
                >
                    "Another fortune"
                </button>
            </div>

            <UploadArea disabled=running on_file=on_file />

            <StageIndicator state=state.read_only() />

            <p class="text-muted">
                "Or "
                <a href="#" on:click=move |ev| {
                    ev.prevent_default();
                    app.navigate(Page::Photos);
                }>"pick a photo you uploaded before"</a>
            </p>

            <ReviewPanel revision=Signal::derive(|| 0u64) />
        </section>
    }
}
