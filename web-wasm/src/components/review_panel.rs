//! 年間レビューのサマリー
//!
//! プロフィール・確定した写真・会話のrevisionのどれかが変わるたびに
//! 取得し直す。失敗した場合は再試行ボタンを出す。

use leptos::prelude::*;
use leptos::task::spawn_local;
use photo_chat_common::chat::REVIEW_EMPTY_NOTICE;
use photo_chat_common::{SummaryKey, SummaryTracker};

use crate::app::use_app;

#[component]
pub fn ReviewPanel(#[prop(into)] revision: Signal<u64>) -> impl IntoView {
    let app = use_app();
    let summary = RwSignal::new(None::<String>);
    let loading = RwSignal::new(false);
    let failed = RwSignal::new(false);
    let attempt = RwSignal::new(0u32);
    let tracker = StoredValue::new(SummaryTracker::default());

    Effect::new(move |_| {
        attempt.track();
        let revision = revision.get();
        let key = app.session.with(|s| {
            s.active_profile
                .as_ref()
                .map(|profile| SummaryKey::new(profile.clone(), s.active_photo.as_ref(), revision))
        });
        let Some(key) = key else {
            return;
        };
        if !tracker.try_update_value(|t| t.begin(&key)).unwrap_or(false) {
            return;
        }

        let coordinator = app.coordinator();
        loading.set(true);
        failed.set(false);
        spawn_local(async move {
            let result = coordinator.year_in_review().await;
            tracker.update_value(|t| t.finish(&key, result.is_ok()));

            if app.active_profile().as_deref() == Some(key.profile()) {
                match result {
                    Ok(text) => summary.set(Some(text.unwrap_or_else(|| REVIEW_EMPTY_NOTICE.to_string()))),
                    Err(e) => {
                        tracing::warn!(error = %e, "summary refresh failed");
                        failed.set(true);
                    }
                }
            }
            loading.set(false);
        });
    });

    view! {
        <aside class="review-panel">
            <h3>"📅 Your year so far"</h3>
            <Show
                when=move || summary.with(|s| s.is_some())
                fallback=move || view! {
                    <p class="text-muted">
                        {move || if loading.get() { "Summarizing..." } else { "No summary yet." }}
                    </p>
                }
            >
                <p class="review-summary">{move || summary.get().unwrap_or_default()}</p>
            </Show>
            <Show when=move || failed.get() && !loading.get()>
                <p class="text-muted">
                    "Could not load your summary. "
                    <button class="btn btn-secondary btn-small" on:click=move |_| attempt.update(|n| *n += 1)>
                        "Retry"
                    </button>
                </p>
            </Show>
        </aside>
    }
}
