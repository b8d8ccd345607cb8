//! アップロード済み写真の一覧と選択

use leptos::prelude::*;
use leptos::task::spawn_local;
use photo_chat_common::{Photo, PipelineState};

use crate::app::{use_app, Page};
use crate::components::stage_indicator::StageIndicator;

#[component]
pub fn PhotosPage() -> impl IntoView {
    let app = use_app();
    let photos = RwSignal::new(Vec::<Photo>::new());
    let selected = RwSignal::new(None::<String>);
    let loading = RwSignal::new(true);
    let state = RwSignal::new(PipelineState::Idle);

    {
        let coordinator = app.coordinator();
        spawn_local(async move {
            match coordinator.list_photos().await {
                Ok(listing) => {
                    selected.set(listing.selected_image.map(|p| p.filename));
                    photos.set(listing.uploaded_images);
                }
                Err(e) => app.report(format!("Could not load photos: {}", e)),
            }
            loading.set(false);
        });
    }

    let on_choose = move |photo: Photo| {
        let coordinator = app.coordinator();
        app.clear_error();
        spawn_local(async move {
            let result = coordinator
                .select_existing_photo(&photo.filename, Some(photo.public_url.as_str()), |s| state.set(*s))
                .await;
            app.sync_session();
            match result {
                Ok(_) => app.navigate(Page::Chat),
                Err(e) => app.report(format!("Could not select {} ({})", photo.filename, e)),
            }
        });
    };

    view! {
        <section class="photos-page">
            <h2>"Your photos"</h2>

            <StageIndicator state=state.read_only() />

            <Show
                when=move || !loading.get()
                fallback=|| view! { <p class="text-muted">"Loading photos..."</p> }
            >
                <Show
                    when=move || photos.with(|p| !p.is_empty())
                    fallback=move || view! {
                        <p class="text-muted">"Nothing uploaded yet."</p>
                        <button class="btn btn-primary" on:click=move |_| app.navigate(Page::Fortune)>
                            "Upload a photo"
                        </button>
                    }
                >
                    <div class="photo-gallery">
                        <For
                            each=move || photos.get()
                            key=|photo| photo.filename.clone()
                            children=move |photo| {
                                let is_selected = {
                                    let filename = photo.filename.clone();
                                    move || selected.get().as_deref() == Some(filename.as_str())
                                };
                                let chosen = photo.clone();
                                view! {
                                    <div class=move || if is_selected() { "photo-card selected" } else { "photo-card" }>
                                        <img src=photo.public_url.clone() alt=photo.filename.clone() />
                                        <p class="photo-name">{photo.filename.clone()}</p>
                                        <button
                                            class="btn btn-primary btn-small"
                                            disabled=move || matches!(state.get(), PipelineState::Running(_))
                                            on:click=move |_| on_choose(chosen.clone())
                                        >
                                            "Chat about this"
                                        </button>
                                    </div>
                                }
                            }
                        />
                    </div>
                </Show>
            </Show>
        </section>
    }
}
