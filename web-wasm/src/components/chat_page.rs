//! チャットページ
//!
//! マウント時にメールボックスからシードを一度だけ受け取る。

use leptos::prelude::*;
use leptos::task::spawn_local;
use photo_chat_common::{BackendGateway, ChatSession};

use crate::app::{use_app, Page};
use crate::components::review_panel::ReviewPanel;

#[component]
pub fn ChatPage() -> impl IntoView {
    let app = use_app();
    let seed = app.coordinator().mailbox().take();
    let chat = RwSignal::new(ChatSession::from_seed(seed));
    let draft = RwSignal::new(String::new());
    let sending = RwSignal::new(false);

    let on_send = move || {
        let Some(profile) = app.active_profile() else {
            return;
        };
        let text = draft.get_untracked();
        let Some(text) = chat.try_update(|c| c.begin_send(&text)).flatten() else {
            return;
        };
        draft.set(String::new());
        sending.set(true);

        let coordinator = app.coordinator();
        spawn_local(async move {
            let result = coordinator.gateway().chat(&profile, &text).await;
            chat.update(|c| {
                if let Err(e) = c.finish_send(result) {
                    tracing::debug!(error = %e, "reply replaced with notice");
                }
            });
            sending.set(false);
        });
    };

    let on_review = move |_| {
        let Some(profile) = app.active_profile() else {
            return;
        };
        chat.update(|c| c.begin_review());
        sending.set(true);

        let coordinator = app.coordinator();
        spawn_local(async move {
            let result = coordinator.gateway().year_in_review(&profile).await;
            chat.update(|c| {
                if let Err(e) = c.finish_review(result) {
                    tracing::debug!(error = %e, "review replaced with notice");
                }
            });
            sending.set(false);
        });
    };

    view! {
        <section class="chat-page">
            {move || app.session.with(|s| s.active_photo.clone()).map(|photo| view! {
                <img class="chat-photo" src=photo.display_url alt=photo.filename />
            })}

            <Show when=move || app.session.with(|s| s.active_photo.is_none())>
                <p class="text-muted">
                    "No photo selected. "
                    <a href="#" on:click=move |ev| {
                        ev.prevent_default();
                        app.navigate(Page::Fortune);
                    }>"Upload one"</a>
                </p>
            </Show>

            <div class="chat-log">
                {move || chat.with(|c| {
                    c.messages()
                        .iter()
                        .map(|m| view! {
                            <div class=format!("message {}", m.role.as_str())>{m.content.clone()}</div>
                        })
                        .collect_view()
                })}
                <Show when=move || sending.get()>
                    <div class="message assistant typing">"..."</div>
                </Show>
            </div>

            <div class="chat-input">
                <input
                    type="text"
                    placeholder="Say something about the photo..."
                    prop:value=move || draft.get()
                    on:input=move |ev| draft.set(event_target_value(&ev))
                    on:keydown=move |ev| {
                        if ev.key() == "Enter" {
                            on_send();
                        }
                    }
                />
                <button
                    class="btn btn-primary"
                    disabled=move || sending.get() || draft.with(|d| d.trim().is_empty())
                    on:click=move |_| on_send()
                >
                    "Send"
                </button>
                <button class="btn btn-secondary" disabled=move || sending.get() on:click=on_review>
                    "✨ Year in review"
                </button>
            </div>

            <ReviewPanel revision=Signal::derive(move || chat.with(|c| c.revision())) />
        </section>
    }
}
