//! アップロード→選択→シード→確定 パイプライン
//!
//! 1回の実行ごとに状態機械を1つ作り、終端状態で破棄する:
//!
//! `Idle → Uploading → Selecting → SeedingContext → Ready`
//! （どの段階からでも `Failed(stage, cause)`）
//!
//! ストアへの書き込みは全てのネットワーク段階が成功した後に一度だけ行う。
//! 同じプロフィールで新しい実行が始まった場合は新しい方が優先され、
//! 古い実行は確定せずに `Superseded` で終わる。

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use crate::error::GatewayError;
use crate::gateway::BackendGateway;
use crate::mailbox::SeedMailbox;
use crate::session::ProfileSessionStore;
use crate::types::{ChatSeed, KnowledgeGraph, PhotoListing, PhotoRef, UploadFile};

/// パイプラインの段階
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Precondition,
    Uploading,
    Selecting,
    SeedingContext,
    Ready,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Precondition => "precondition",
            PipelineStage::Uploading => "uploading",
            PipelineStage::Selecting => "selecting",
            PipelineStage::SeedingContext => "seeding",
            PipelineStage::Ready => "ready",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 実行中の状態（進捗表示用に通知される）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running(PipelineStage),
    Ready,
    Failed(PipelineStage),
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Ready | PipelineState::Failed(_))
    }
}

/// 失敗の原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineCause {
    #[error("{0}")]
    Precondition(String),

    #[error(transparent)]
    Network(#[from] GatewayError),

    #[error("a newer photo selection for this profile replaced this one")]
    Superseded,

    #[error("the active profile changed before the photo could be committed")]
    ProfileChanged,
}

/// 段階付きの失敗
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{stage}: {cause}")]
pub struct PipelineError {
    pub stage: PipelineStage,
    pub cause: PipelineCause,
}

impl PipelineError {
    pub fn precondition(message: impl Into<String>) -> Self {
        Self {
            stage: PipelineStage::Precondition,
            cause: PipelineCause::Precondition(message.into()),
        }
    }
}

/// プロフィールごとの実行トークン
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunToken {
    pub profile: String,
    pub id: u64,
}

/// プロフィールごとに「最新の実行」を記録する
#[derive(Debug, Default)]
pub struct RunRegistry {
    next_id: AtomicU64,
    current: Mutex<HashMap<String, u64>>,
}

impl RunRegistry {
    /// 新しい実行を登録（同じプロフィールの保留中の実行は置き換えられる）
    pub fn begin(&self, profile: &str) -> RunToken {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let replaced = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(profile.to_string(), id);

        if let Some(previous) = replaced {
            tracing::warn!(profile, previous, run = id, "pending pipeline run superseded");
        }
        RunToken { profile: profile.to_string(), id }
    }

    pub fn is_current(&self, token: &RunToken) -> bool {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&token.profile)
            == Some(&token.id)
    }

    /// 終端状態でトークンを解放（自分が最新の場合のみ）
    pub fn finish(&self, token: &RunToken) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current.get(&token.profile) == Some(&token.id) {
            current.remove(&token.profile);
        }
    }

    /// 保留中の実行があるか
    pub fn is_pending(&self, profile: &str) -> bool {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(profile)
    }
}

/// 1回の実行（状態機械）。ドロップ時にトークンを解放する。
struct PipelineRun<'a> {
    token: RunToken,
    registry: &'a RunRegistry,
    state: PipelineState,
    observer: &'a dyn Fn(&PipelineState),
}

impl<'a> PipelineRun<'a> {
    fn start(registry: &'a RunRegistry, profile: &str, observer: &'a dyn Fn(&PipelineState)) -> Self {
        Self {
            token: registry.begin(profile),
            registry,
            state: PipelineState::Idle,
            observer,
        }
    }

    fn enter(&mut self, stage: PipelineStage) {
        self.state = if stage == PipelineStage::Ready {
            PipelineState::Ready
        } else {
            PipelineState::Running(stage)
        };
        tracing::debug!(profile = %self.token.profile, run = self.token.id, %stage, "pipeline stage");
        (self.observer)(&self.state);
    }

    /// 現在の段階で失敗させる
    fn fail(&mut self, stage: PipelineStage, cause: PipelineCause) -> PipelineError {
        self.state = PipelineState::Failed(stage);
        tracing::warn!(profile = %self.token.profile, run = self.token.id, %stage, %cause, "pipeline failed");
        (self.observer)(&self.state);
        PipelineError { stage, cause }
    }
}

impl Drop for PipelineRun<'_> {
    fn drop(&mut self) {
        self.registry.finish(&self.token);
    }
}

/// ワークフローの調整役
///
/// ゲートウェイ呼び出しを順序付けし、結果をストアへ確定する。
pub struct WorkflowCoordinator<G> {
    gateway: Arc<G>,
    store: ProfileSessionStore,
    mailbox: SeedMailbox,
    runs: Arc<RunRegistry>,
}

impl<G> Clone for WorkflowCoordinator<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            store: self.store.clone(),
            mailbox: self.mailbox.clone(),
            runs: self.runs.clone(),
        }
    }
}

impl<G: BackendGateway> WorkflowCoordinator<G> {
    pub fn new(gateway: Arc<G>, store: ProfileSessionStore, mailbox: SeedMailbox) -> Self {
        Self {
            gateway,
            store,
            mailbox,
            runs: Arc::new(RunRegistry::default()),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn store(&self) -> &ProfileSessionStore {
        &self.store
    }

    pub fn mailbox(&self) -> &SeedMailbox {
        &self.mailbox
    }

    // =============================================
    // アップロード→チャット パイプライン
    // =============================================

    /// ローカルファイルをアップロードし、会話用の写真として確定する
    ///
    /// 成功時は確定した `PhotoRef` を返し、シードをメールボックスへ置く。
    /// 画面遷移は呼び出し側の責任。失敗時はストアもメールボックスも変更しない。
    pub async fn upload_and_select(
        &self,
        file: &UploadFile,
        on_state: impl Fn(&PipelineState),
    ) -> Result<PhotoRef, PipelineError> {
        let profile = self.require_profile(&on_state)?;
        if file.is_empty() {
            on_state(&PipelineState::Failed(PipelineStage::Precondition));
            return Err(PipelineError::precondition("select a non-empty image file first"));
        }

        let mut run = PipelineRun::start(&self.runs, &profile, &on_state);

        run.enter(PipelineStage::Uploading);
        let receipt = match self.gateway.upload_photo(&profile, file).await {
            Ok(receipt) => receipt,
            Err(e) => return Err(run.fail(PipelineStage::Uploading, e.into())),
        };

        run.enter(PipelineStage::Selecting);
        let selection = match self.gateway.select_photo(&profile, &receipt.filename).await {
            Ok(selection) => selection,
            Err(e) => return Err(run.fail(PipelineStage::Selecting, e.into())),
        };

        run.enter(PipelineStage::SeedingContext);
        let seed = ChatSeed::from_auto_reply(selection.auto_reply.as_deref());
        let display_url = first_non_empty([selection.url, receipt.public_url])
            .unwrap_or_else(|| file.data_url());
        let photo = PhotoRef::new(receipt.filename, display_url);

        self.commit(&mut run, photo, seed)
    }

    /// サーバー上の既存写真を選択する（アップロード段階なし）
    ///
    /// 一覧の `public_url` は選択レスポンスにURLが無い場合の表示用。
    pub async fn select_existing_photo(
        &self,
        filename: &str,
        listed_url: Option<&str>,
        on_state: impl Fn(&PipelineState),
    ) -> Result<PhotoRef, PipelineError> {
        let profile = self.require_profile(&on_state)?;

        let mut run = PipelineRun::start(&self.runs, &profile, &on_state);

        run.enter(PipelineStage::Selecting);
        let selection = match self.gateway.select_photo(&profile, filename).await {
            Ok(selection) => selection,
            Err(e) => return Err(run.fail(PipelineStage::Selecting, e.into())),
        };

        run.enter(PipelineStage::SeedingContext);
        let seed = ChatSeed::from_auto_reply(selection.auto_reply.as_deref());
        let display_url =
            first_non_empty([selection.url, listed_url.map(str::to_string)]).unwrap_or_default();
        let photo = PhotoRef::new(filename, display_url);

        self.commit(&mut run, photo, seed)
    }

    fn require_profile(&self, on_state: &impl Fn(&PipelineState)) -> Result<String, PipelineError> {
        match self.store.active_profile() {
            Some(profile) => Ok(profile),
            None => {
                on_state(&PipelineState::Failed(PipelineStage::Precondition));
                Err(PipelineError::precondition("select a profile first"))
            }
        }
    }

    /// 全段階の成功後に一度だけストアへ確定
    fn commit(&self, run: &mut PipelineRun<'_>, photo: PhotoRef, seed: ChatSeed) -> Result<PhotoRef, PipelineError> {
        if !self.runs.is_current(&run.token) {
            return Err(run.fail(PipelineStage::Ready, PipelineCause::Superseded));
        }
        if self.store.active_profile().as_deref() != Some(run.token.profile.as_str()) {
            return Err(run.fail(PipelineStage::Ready, PipelineCause::ProfileChanged));
        }

        self.store.set_active_photo(Some(photo.clone()));
        self.mailbox.post(seed);
        run.enter(PipelineStage::Ready);

        tracing::info!(profile = %run.token.profile, filename = %photo.filename, "photo committed");
        Ok(photo)
    }

    // =============================================
    // プロフィール/写真の操作
    // =============================================

    pub async fn list_profiles(&self) -> Result<Vec<String>, GatewayError> {
        let profiles = self.gateway.list_profiles().await?;
        Ok(profiles.into_iter().map(|p| p.name).collect())
    }

    /// プロフィールを作成してアクティブにする
    pub async fn create_profile(&self, name: &str) -> Result<String, GatewayError> {
        let name = name.trim();
        self.gateway.create_profile(name).await?;
        self.switch_profile(Some(name.to_string()));
        Ok(name.to_string())
    }

    /// バックエンドで確認してからアクティブにする
    pub async fn select_profile(&self, name: &str) -> Result<(), GatewayError> {
        self.gateway.select_profile(name).await?;
        self.switch_profile(Some(name.to_string()));
        Ok(())
    }

    /// プロフィールを削除（アクティブだった場合はセッションもクリア）
    pub async fn delete_profile(&self, name: &str) -> Result<(), GatewayError> {
        self.gateway.delete_profile(name).await?;
        if self.store.active_profile().as_deref() == Some(name) {
            self.switch_profile(None);
        }
        Ok(())
    }

    pub fn deselect_profile(&self) {
        self.switch_profile(None);
    }

    /// プロフィールが変わったら、前のプロフィール向けの未読シードも捨てる
    fn switch_profile(&self, profile: Option<String>) {
        if self.store.set_active_profile(profile) {
            self.mailbox.discard();
        }
    }

    /// アクティブなプロフィールの写真一覧
    pub async fn list_photos(&self) -> Result<PhotoListing, GatewayError> {
        let profile = self.store.active_profile().unwrap_or_default();
        self.gateway.list_photos(&profile).await
    }

    /// アクティブなプロフィールの年間レビュー
    pub async fn year_in_review(&self) -> Result<Option<String>, GatewayError> {
        let profile = self.store.active_profile().unwrap_or_default();
        Ok(self.gateway.year_in_review(&profile).await?.into_text())
    }

    /// アクティブなプロフィールの知識グラフ
    pub async fn knowledge_graph(&self) -> Result<KnowledgeGraph, GatewayError> {
        let profile = self.store.active_profile().unwrap_or_default();
        self.gateway.fetch_graph(&profile).await
    }
}

fn first_non_empty<const N: usize>(candidates: [Option<String>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayErrorKind;
    use crate::gateway::op;
    use crate::storage::{MemoryStorage, SEED_SLOT};
    use crate::testing::ScriptedGateway;
    use crate::types::ChatMessage;
    use std::cell::RefCell;

    struct Fixture {
        storage: Arc<MemoryStorage>,
        gateway: Arc<ScriptedGateway>,
        coordinator: WorkflowCoordinator<ScriptedGateway>,
    }

    fn fixture(gateway: ScriptedGateway) -> Fixture {
        let storage = Arc::new(MemoryStorage::new());
        let gateway = Arc::new(gateway);
        let store = ProfileSessionStore::open(storage.clone());
        let mailbox = SeedMailbox::new(storage.clone());
        let coordinator = WorkflowCoordinator::new(gateway.clone(), store, mailbox);
        Fixture { storage, gateway, coordinator }
    }

    fn alice() -> Fixture {
        let f = fixture(ScriptedGateway::with_profiles(&["alice", "bob"]));
        f.coordinator.store().set_active_profile(Some("alice".into()));
        f
    }

    fn cat_png() -> UploadFile {
        UploadFile::new("cat.png", None, b"\x89PNG fake".to_vec())
    }

    #[tokio::test]
    async fn test_cat_scenario_end_state() {
        let f = alice();
        f.gateway.set_auto_reply(Some("What a cute cat!"));

        let photo = f.coordinator.upload_and_select(&cat_png(), |_| {}).await.expect("パイプライン失敗");

        let session = f.coordinator.store().snapshot();
        assert_eq!(session.active_profile.as_deref(), Some("alice"));
        assert_eq!(session.active_photo.as_ref().map(|p| p.filename.as_str()), Some("cat.png"));
        assert_eq!(photo.filename, "cat.png");

        let seed = f.coordinator.mailbox().take().expect("シードが無い");
        assert_eq!(seed.messages[1].content, "What a cute cat!");
        assert_eq!(f.coordinator.mailbox().take(), None);
    }

    #[tokio::test]
    async fn test_seed_has_two_messages_in_order() {
        let f = alice();
        f.gateway.set_auto_reply(Some("Nice sunset!"));

        f.coordinator.upload_and_select(&cat_png(), |_| {}).await.unwrap();

        let seed = f.coordinator.mailbox().take().unwrap();
        assert_eq!(
            seed.messages,
            vec![
                ChatMessage::user("let's talk about this photo."),
                ChatMessage::assistant("Nice sunset!"),
            ]
        );
    }

    #[tokio::test]
    async fn test_stages_run_in_order() {
        let f = alice();
        let states = RefCell::new(Vec::new());

        f.coordinator
            .upload_and_select(&cat_png(), |s| states.borrow_mut().push(*s))
            .await
            .unwrap();

        assert_eq!(
            states.into_inner(),
            vec![
                PipelineState::Running(PipelineStage::Uploading),
                PipelineState::Running(PipelineStage::Selecting),
                PipelineState::Running(PipelineStage::SeedingContext),
                PipelineState::Ready,
            ]
        );
        assert_eq!(f.gateway.calls(), vec!["upload_photo:alice:cat.png", "select_photo:alice:cat.png"]);
    }

    #[tokio::test]
    async fn test_failure_at_selecting_leaves_store_untouched() {
        let f = alice();
        let before = PhotoRef::new("old.png", "http://host/old.png");
        f.coordinator.store().set_active_photo(Some(before.clone()));
        f.gateway.set_auto_reply(Some("never seen"));
        f.gateway.fail_on(op::SELECT_PHOTO);

        let err = f.coordinator.upload_and_select(&cat_png(), |_| {}).await.unwrap_err();

        assert_eq!(err.stage, PipelineStage::Selecting);
        assert!(matches!(err.cause, PipelineCause::Network(ref e) if e.http_status() == Some(500)));
        assert_eq!(f.coordinator.store().active_photo(), Some(before));
        assert_eq!(f.coordinator.mailbox().take(), None);
        assert_eq!(f.storage.raw(SEED_SLOT), None);
    }

    #[tokio::test]
    async fn test_failure_at_uploading_skips_select() {
        let f = alice();
        f.gateway.fail_on(op::UPLOAD_PHOTO);

        let err = f.coordinator.upload_and_select(&cat_png(), |_| {}).await.unwrap_err();

        assert_eq!(err.stage, PipelineStage::Uploading);
        assert_eq!(f.gateway.calls(), vec!["upload_photo:alice:cat.png"]);
        assert_eq!(f.coordinator.store().active_photo(), None);
        assert!(format!("{}", err).starts_with("uploading: upload_photo failed"));
    }

    #[tokio::test]
    async fn test_precondition_without_profile_never_calls_backend() {
        let f = fixture(ScriptedGateway::with_profiles(&["alice"]));
        let states = RefCell::new(Vec::new());

        let err = f
            .coordinator
            .upload_and_select(&cat_png(), |s| states.borrow_mut().push(*s))
            .await
            .unwrap_err();

        assert_eq!(err.stage, PipelineStage::Precondition);
        assert!(f.gateway.calls().is_empty());
        assert_eq!(states.into_inner(), vec![PipelineState::Failed(PipelineStage::Precondition)]);
    }

    #[tokio::test]
    async fn test_precondition_empty_file() {
        let f = alice();
        let empty = UploadFile::new("cat.png", None, vec![]);

        let err = f.coordinator.upload_and_select(&empty, |_| {}).await.unwrap_err();

        assert!(matches!(err.cause, PipelineCause::Precondition(_)));
        assert!(f.gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_without_auto_reply_seed_is_empty() {
        let f = alice();
        f.gateway.set_auto_reply(None);

        f.coordinator.upload_and_select(&cat_png(), |_| {}).await.unwrap();

        assert!(f.coordinator.store().active_photo().is_some());
        assert_eq!(f.coordinator.mailbox().take(), None);
    }

    #[tokio::test]
    async fn test_display_url_prefers_select_url_then_upload_url() {
        let f = alice();
        f.gateway.set_select_url(Some("http://host/selected/cat.png"));
        let photo = f.coordinator.upload_and_select(&cat_png(), |_| {}).await.unwrap();
        assert_eq!(photo.display_url, "http://host/selected/cat.png");

        let f = alice();
        let photo = f.coordinator.upload_and_select(&cat_png(), |_| {}).await.unwrap();
        assert!(photo.display_url.ends_with("/static/alice/uploads/cat.png"));
    }

    #[tokio::test]
    async fn test_display_url_falls_back_to_data_url() {
        let f = fixture(ScriptedGateway::with_profiles(&["alice"]).without_public_urls());
        f.coordinator.store().set_active_profile(Some("alice".into()));

        let photo = f.coordinator.upload_and_select(&cat_png(), |_| {}).await.unwrap();
        assert!(photo.display_url.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_newer_run_supersedes_pending_run() {
        let f = alice();
        f.gateway.enable_yielding();
        let dog = UploadFile::new("dog.png", None, b"dog".to_vec());

        let cat = cat_png();

        let (first, second) = tokio::join!(
            f.coordinator.upload_and_select(&cat, |_| {}),
            f.coordinator.upload_and_select(&dog, |_| {}),
        );

        let err = first.unwrap_err();
        assert_eq!(err.stage, PipelineStage::Ready);
        assert_eq!(err.cause, PipelineCause::Superseded);
        assert_eq!(second.unwrap().filename, "dog.png");
        assert_eq!(f.coordinator.store().active_photo().unwrap().filename, "dog.png");
        assert!(!f.coordinator.runs.is_pending("alice"));
    }

    #[tokio::test]
    async fn test_profile_switch_during_run_prevents_commit() {
        let f = alice();
        let store = f.coordinator.store().clone();
        f.gateway.on_select(move || {
            store.set_active_profile(Some("bob".into()));
        });

        let err = f.coordinator.upload_and_select(&cat_png(), |_| {}).await.unwrap_err();

        assert_eq!(err.cause, PipelineCause::ProfileChanged);
        assert_eq!(f.coordinator.store().active_profile().as_deref(), Some("bob"));
        assert_eq!(f.coordinator.store().active_photo(), None);
    }

    #[tokio::test]
    async fn test_token_released_after_failure() {
        let f = alice();
        f.gateway.fail_on(op::UPLOAD_PHOTO);
        let _ = f.coordinator.upload_and_select(&cat_png(), |_| {}).await;
        assert!(!f.coordinator.runs.is_pending("alice"));
    }

    #[tokio::test]
    async fn test_select_existing_photo_uses_listing_url() {
        let f = alice();
        f.coordinator.upload_and_select(&cat_png(), |_| {}).await.unwrap();
        f.coordinator.mailbox().take();
        f.gateway.set_auto_reply(Some("Back to the cat"));

        let photo = f
            .coordinator
            .select_existing_photo("cat.png", Some("http://host/listed/cat.png"), |_| {})
            .await
            .unwrap();

        assert_eq!(photo.display_url, "http://host/listed/cat.png");
        assert_eq!(f.coordinator.store().active_photo(), Some(photo));
        assert!(f.coordinator.mailbox().take().is_some());
    }

    #[tokio::test]
    async fn test_select_missing_photo_fails_with_404() {
        let f = alice();
        let err = f.coordinator.select_existing_photo("ghost.png", None, |_| {}).await.unwrap_err();
        assert_eq!(err.stage, PipelineStage::Selecting);
        assert!(matches!(err.cause, PipelineCause::Network(ref e) if e.http_status() == Some(404)));
    }

    #[tokio::test]
    async fn test_create_profile_becomes_active() {
        let f = fixture(ScriptedGateway::with_profiles(&[]));
        let name = f.coordinator.create_profile("  carol ").await.unwrap();
        assert_eq!(name, "carol");
        assert_eq!(f.coordinator.store().active_profile().as_deref(), Some("carol"));
        assert_eq!(f.coordinator.list_profiles().await.unwrap(), vec!["carol"]);
    }

    #[tokio::test]
    async fn test_create_blank_profile_is_rejected() {
        let f = fixture(ScriptedGateway::with_profiles(&[]));
        let err = f.coordinator.create_profile("   ").await.unwrap_err();
        assert_eq!(err.kind, GatewayErrorKind::InvalidArgument("name"));
        assert_eq!(f.coordinator.store().active_profile(), None);
    }

    #[tokio::test]
    async fn test_select_unknown_profile_keeps_session() {
        let f = alice();
        let err = f.coordinator.select_profile("mallory").await.unwrap_err();
        assert_eq!(err.http_status(), Some(404));
        assert_eq!(f.coordinator.store().active_profile().as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_delete_active_profile_clears_session() {
        let f = alice();
        f.coordinator.upload_and_select(&cat_png(), |_| {}).await.unwrap();

        f.coordinator.delete_profile("alice").await.unwrap();

        assert_eq!(f.coordinator.store().snapshot(), Default::default());
    }

    #[tokio::test]
    async fn test_switching_profile_discards_unread_seed() {
        let f = alice();
        f.gateway.set_auto_reply(Some("What a cute cat!"));
        f.coordinator.upload_and_select(&cat_png(), |_| {}).await.unwrap();

        f.coordinator.select_profile("bob").await.unwrap();

        assert_eq!(f.coordinator.store().active_profile().as_deref(), Some("bob"));
        assert_eq!(f.coordinator.store().active_photo(), None);
        assert_eq!(f.coordinator.mailbox().take(), None);
        assert_eq!(f.storage.raw(SEED_SLOT), None);
    }

    #[tokio::test]
    async fn test_reselecting_same_profile_keeps_seed() {
        let f = alice();
        f.gateway.set_auto_reply(Some("What a cute cat!"));
        f.coordinator.upload_and_select(&cat_png(), |_| {}).await.unwrap();

        f.coordinator.select_profile("alice").await.unwrap();

        assert!(f.coordinator.store().active_photo().is_some());
        assert!(f.coordinator.mailbox().take().is_some());
    }

    #[tokio::test]
    async fn test_deselect_and_delete_discard_unread_seed() {
        let f = alice();
        f.gateway.set_auto_reply(Some("What a cute cat!"));
        f.coordinator.upload_and_select(&cat_png(), |_| {}).await.unwrap();
        f.coordinator.deselect_profile();
        assert_eq!(f.coordinator.mailbox().take(), None);

        let f = alice();
        f.gateway.set_auto_reply(Some("What a cute cat!"));
        f.coordinator.upload_and_select(&cat_png(), |_| {}).await.unwrap();
        f.coordinator.delete_profile("alice").await.unwrap();
        assert_eq!(f.coordinator.mailbox().take(), None);
        assert_eq!(f.storage.raw(SEED_SLOT), None);
    }

    #[tokio::test]
    async fn test_delete_other_profile_keeps_session() {
        let f = alice();
        f.coordinator.delete_profile("bob").await.unwrap();
        assert_eq!(f.coordinator.store().active_profile().as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_list_photos_requires_profile() {
        let f = fixture(ScriptedGateway::with_profiles(&["alice"]));
        let err = f.coordinator.list_photos().await.unwrap_err();
        assert_eq!(err.kind, GatewayErrorKind::InvalidArgument("profile"));
    }

    #[tokio::test]
    async fn test_year_in_review_text() {
        let f = alice();
        f.gateway.set_review(Some("A year of small lights."));
        assert_eq!(
            f.coordinator.year_in_review().await.unwrap().as_deref(),
            Some("A year of small lights.")
        );
    }

    #[tokio::test]
    async fn test_knowledge_graph_for_active_profile() {
        let f = alice();
        let graph: KnowledgeGraph = serde_json::from_str(
            r#"{"nodes":[{"id":"0","label":"cat"},{"id":"1","label":"sun"}],"edges":[{"from":"0","to":"1","label":"likes"}]}"#,
        )
        .unwrap();
        f.gateway.set_graph("alice", graph.clone());

        assert_eq!(f.coordinator.knowledge_graph().await.unwrap(), graph);
        assert_eq!(f.gateway.calls(), vec!["fetch_graph:alice"]);
    }

    #[tokio::test]
    async fn test_knowledge_graph_requires_profile() {
        let f = fixture(ScriptedGateway::with_profiles(&["alice"]));
        let err = f.coordinator.knowledge_graph().await.unwrap_err();
        assert_eq!(err.kind, GatewayErrorKind::InvalidArgument("profile"));
        assert!(f.gateway.calls().is_empty());
    }
}
