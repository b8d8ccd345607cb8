//! エラー表示

use leptos::prelude::*;

use crate::app::use_app;

#[component]
pub fn ErrorBanner() -> impl IntoView {
    let app = use_app();

    view! {
        <Show when=move || app.error.with(|e| e.is_some())>
            <div class="error-banner" role="alert">
                <span>{move || app.error.get().unwrap_or_default()}</span>
                <button class="btn btn-tertiary btn-small" on:click=move |_| app.clear_error()>
                    "×"
                </button>
            </div>
        </Show>
    }
}
