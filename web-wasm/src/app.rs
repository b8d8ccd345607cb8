//! メインアプリケーションコンポーネント

use leptos::prelude::*;
use photo_chat_common::{
    ApiRoutes, HttpGateway, ProfileSession, ProfileSessionStore, SeedMailbox, WorkflowCoordinator,
};
use std::sync::Arc;

use crate::components::{
    chat_page::ChatPage,
    error_banner::ErrorBanner,
    fortune_page::FortunePage,
    graph_page::GraphPage,
    header::Header,
    photos_page::PhotosPage,
    profiles_page::ProfilesPage,
};
use crate::local_storage::BrowserStorage;

/// ページの取得元がURLを持たない場合のバックエンド
const FALLBACK_BACKEND_URL: &str = "http://127.0.0.1:8000";

pub type Coordinator = WorkflowCoordinator<HttpGateway>;

/// 表示中のページ（永続化しない）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Profiles,
    Fortune,
    Photos,
    Chat,
    Graph,
}

impl Page {
    pub fn label(&self) -> &'static str {
        match self {
            Page::Profiles => "Profiles",
            Page::Fortune => "Upload",
            Page::Photos => "Photos",
            Page::Chat => "Chat",
            Page::Graph => "Graph",
        }
    }

    /// アクティブなプロフィールが必要なページか
    pub fn needs_profile(&self) -> bool {
        !matches!(self, Page::Profiles)
    }
}

/// 全ページで共有するハンドル
///
/// コーディネーターはブラウザのスレッド専用なのでローカルストレージに置く。
/// `session` はストアのスナップショットで、ストアを変更したら `sync_session` で更新する。
#[derive(Clone, Copy)]
pub struct AppContext {
    coordinator: StoredValue<Coordinator, LocalStorage>,
    pub session: RwSignal<ProfileSession>,
    pub page: RwSignal<Page>,
    pub error: RwSignal<Option<String>>,
}

impl AppContext {
    pub fn coordinator(&self) -> Coordinator {
        self.coordinator.get_value()
    }

    pub fn sync_session(&self) {
        let snapshot = self.coordinator.with_value(|c| c.store().snapshot());
        self.session.set(snapshot);
    }

    pub fn active_profile(&self) -> Option<String> {
        self.session.with(|s| s.active_profile.clone())
    }

    pub fn navigate(&self, page: Page) {
        self.error.set(None);
        self.page.set(page);
    }

    pub fn report(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(message = %message, "shown to user");
        self.error.set(Some(message));
    }

    pub fn clear_error(&self) {
        self.error.set(None);
    }
}

pub fn use_app() -> AppContext {
    expect_context::<AppContext>()
}

fn backend_url() -> String {
    web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .filter(|origin| origin.starts_with("http"))
        .unwrap_or_else(|| FALLBACK_BACKEND_URL.to_string())
}

fn build_coordinator() -> Coordinator {
    let storage = BrowserStorage::open();
    let store = ProfileSessionStore::open(storage.clone());
    let mailbox = SeedMailbox::new(storage);
    let gateway = HttpGateway::new(backend_url(), ApiRoutes::default());
    tracing::info!(backend = gateway.base_url(), "photo chat started");
    WorkflowCoordinator::new(Arc::new(gateway), store, mailbox)
}

/// メインアプリケーションコンポーネント
#[component]
pub fn App() -> impl IntoView {
    let coordinator = build_coordinator();
    let session = RwSignal::new(coordinator.store().snapshot());
    let initial_page = if session.get_untracked().active_profile.is_some() {
        Page::Fortune
    } else {
        Page::Profiles
    };

    let app = AppContext {
        coordinator: StoredValue::new_local(coordinator),
        session,
        page: RwSignal::new(initial_page),
        error: RwSignal::new(None),
    };
    provide_context(app);

    // プロフィールが外れたらプロフィール選択へ戻す
    Effect::new(move |_| {
        let has_profile = app.session.with(|s| s.active_profile.is_some());
        if !has_profile && app.page.get_untracked().needs_profile() {
            app.page.set(Page::Profiles);
        }
    });

    view! {
        <div class="container">
            <Header />
            <ErrorBanner />
            {move || match app.page.get() {
                Page::Profiles => view! { <ProfilesPage /> }.into_any(),
                Page::Fortune => view! { <FortunePage /> }.into_any(),
                Page::Photos => view! { <PhotosPage /> }.into_any(),
                Page::Chat => view! { <ChatPage /> }.into_any(),
                Page::Graph => view! { <GraphPage /> }.into_any(),
            }}
        </div>
    }
}
