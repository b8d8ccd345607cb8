//! プロフィール選択ページ

use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::app::{use_app, AppContext, Page};

fn load_profiles(app: AppContext, profiles: RwSignal<Vec<String>>, loading: RwSignal<bool>) {
    let coordinator = app.coordinator();
    loading.set(true);
    spawn_local(async move {
        match coordinator.list_profiles().await {
            Ok(list) => profiles.set(list),
            Err(e) => app.report(format!("Could not load profiles: {}", e)),
        }
        loading.set(false);
    });
}

#[component]
pub fn ProfilesPage() -> impl IntoView {
    let app = use_app();
    let profiles = RwSignal::new(Vec::<String>::new());
    let loading = RwSignal::new(false);
    let new_name = RwSignal::new(String::new());

    load_profiles(app, profiles, loading);

    let on_create = move || {
        let name = new_name.get_untracked();
        if name.trim().is_empty() {
            app.report("Enter a profile name first.");
            return;
        }
        let coordinator = app.coordinator();
        spawn_local(async move {
            match coordinator.create_profile(&name).await {
                Ok(created) => {
                    tracing::info!(profile = %created, "profile created");
                    new_name.set(String::new());
                    app.sync_session();
                    app.navigate(Page::Fortune);
                }
                Err(e) => app.report(format!("Could not create profile: {}", e)),
            }
        });
    };

    let on_select = move |name: String| {
        let coordinator = app.coordinator();
        spawn_local(async move {
            match coordinator.select_profile(&name).await {
                Ok(()) => {
                    app.sync_session();
                    app.navigate(Page::Fortune);
                }
                Err(e) => app.report(format!("Could not select {}: {}", name, e)),
            }
        });
    };

    let on_delete = move |name: String| {
        if !gloo::dialogs::confirm(&format!("Delete profile \"{}\" and its photos?", name)) {
            return;
        }
        let coordinator = app.coordinator();
        spawn_local(async move {
            match coordinator.delete_profile(&name).await {
                Ok(()) => {
                    app.sync_session();
                    load_profiles(app, profiles, loading);
                }
                Err(e) => app.report(format!("Could not delete {}: {}", name, e)),
            }
        });
    };

    let on_deselect = move |_| {
        app.coordinator().deselect_profile();
        app.sync_session();
    };

    view! {
        <section class="profiles-page">
            <h2>"Who's chatting?"</h2>

            <Show when=move || loading.get()>
                <p class="text-muted">"Loading profiles..."</p>
            </Show>

            <ul class="profile-list">
                <For
                    each=move || profiles.get()
                    key=|name| name.clone()
                    children=move |name| {
                        let is_active = {
                            let name = name.clone();
                            move || app.session.with(|s| s.active_profile.as_deref() == Some(name.as_str()))
                        };
                        let select_name = name.clone();
                        let delete_name = name.clone();
                        view! {
                            <li class=move || if is_active() { "profile active" } else { "profile" }>
                                <span class="profile-name">{name.clone()}</span>
                                <button
                                    class="btn btn-primary btn-small"
                                    on:click=move |_| on_select(select_name.clone())
                                >
                                    "Select"
                                </button>
                                <button
                                    class="btn btn-tertiary btn-small"
                                    on:click=move |_| on_delete(delete_name.clone())
                                >
                                    "Delete"
                                </button>
                            </li>
                        }
                    }
                />
            </ul>

            <Show when=move || !loading.get() && profiles.with(|p| p.is_empty())>
                <p class="text-muted">"No profiles yet. Create one below."</p>
            </Show>

            <div class="form-group">
                <label for="new-profile">"New profile"</label>
                <input
                    type="text"
                    id="new-profile"
                    placeholder="Name..."
                    prop:value=move || new_name.get()
                    on:input=move |ev| new_name.set(event_target_value(&ev))
                    on:keydown=move |ev| {
                        if ev.key() == "Enter" {
                            on_create();
                        }
                    }
                />
                <button class="btn btn-primary" on:click=move |_| on_create()>
                    "Create"
                </button>
            </div>

            <Show when=move || app.session.with(|s| s.active_profile.is_some())>
                <button class="btn btn-secondary" on:click=on_deselect>
                    "Sign out of profile"
                </button>
            </Show>
        </section>
    }
}
