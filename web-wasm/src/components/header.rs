//! ヘッダーコンポーネント（ナビゲーションとセッション表示）

use leptos::prelude::*;

use crate::app::{use_app, Page};

#[component]
pub fn Header() -> impl IntoView {
    let app = use_app();

    let nav_button = move |page: Page| {
        view! {
            <button
                class=move || if app.page.get() == page { "nav-btn active" } else { "nav-btn" }
                disabled=move || page.needs_profile() && app.session.with(|s| s.active_profile.is_none())
                on:click=move |_| app.navigate(page)
            >
                {page.label()}
            </button>
        }
    };

    view! {
        <header class="header">
            <h1>"Photo Chat"</h1>
            <nav class="nav">
                {nav_button(Page::Profiles)}
                {nav_button(Page::Fortune)}
                {nav_button(Page::Photos)}
                {nav_button(Page::Chat)}
                {nav_button(Page::Graph)}
            </nav>
            <p class="session-status">
                {move || app.session.with(|s| {
                    let profile = s.active_profile.as_deref().unwrap_or("no profile");
                    match &s.active_photo {
                        Some(photo) if !photo.filename.is_empty() => format!("{} / {}", profile, photo.filename),
                        Some(_) => format!("{} / photo selected", profile),
                        None => profile.to_string(),
                    }
                })}
            </p>
        </header>
    }
}
