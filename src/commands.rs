//! サブコマンドの実行
//!
//! どのコマンドも同じ `WorkflowCoordinator` を通してバックエンドと
//! セッションスロットに触れる。表示用の整形関数はテストできるよう分けてある。

use crate::error::{PhotoChatError, Result};
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use photo_chat_common::chat::REVIEW_EMPTY_NOTICE;
use photo_chat_common::gateway::find_photo;
use photo_chat_common::media::{
    extract_base64_from_data_url, extract_mime_type_from_data_url, guess_mime_type,
};
use photo_chat_common::{
    fortune, BackendGateway, ChatMessage, ChatSession, DurableStorage, Fortune, KnowledgeGraph,
    PhotoListing, PhotoRef, PipelineStage, PipelineState, ProfileSession, ProfileSessionStore,
    Role, SeedMailbox, SummaryKey, SummaryTracker, UploadFile, WorkflowCoordinator, FORTUNES,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// 対話モードで年間レビューを要求するコマンド
pub const REVIEW_COMMAND: &str = "/review";
/// 対話モードの終了コマンド
pub const QUIT_COMMAND: &str = "/quit";

/// 永続スロットからセッションを復元してコーディネーターを組み立てる
pub fn open_session<G: BackendGateway>(
    gateway: Arc<G>,
    storage: Arc<dyn DurableStorage>,
) -> WorkflowCoordinator<G> {
    let store = ProfileSessionStore::open(storage.clone());
    let mailbox = SeedMailbox::new(storage);
    WorkflowCoordinator::new(gateway, store, mailbox)
}

fn require_profile<G: BackendGateway>(coordinator: &WorkflowCoordinator<G>) -> Result<String> {
    coordinator
        .store()
        .active_profile()
        .ok_or(PhotoChatError::NoActiveProfile)
}

// =============================================
// プロフィール
// =============================================

pub async fn list_profiles<G: BackendGateway>(coordinator: &WorkflowCoordinator<G>) -> Result<()> {
    let profiles = coordinator.list_profiles().await?;
    let active = coordinator.store().active_profile();

    if profiles.is_empty() {
        println!("プロフィールがありません。`photo-chat profiles create` で作成してください");
        return Ok(());
    }
    for line in format_profiles(&profiles, active.as_deref()) {
        println!("{}", line);
    }
    Ok(())
}

pub async fn create_profile<G: BackendGateway>(
    coordinator: &WorkflowCoordinator<G>,
    name: Option<String>,
) -> Result<()> {
    let name = match name {
        Some(name) => name,
        None => Input::<String>::new().with_prompt("プロフィール名").interact_text()?,
    };
    let name = coordinator.create_profile(&name).await?;
    println!("✔ プロフィールを作成しました: {}", name);
    Ok(())
}

pub async fn select_profile<G: BackendGateway>(
    coordinator: &WorkflowCoordinator<G>,
    name: Option<String>,
) -> Result<()> {
    let name = match name {
        Some(name) => name,
        None => pick_profile(coordinator, "アクティブにするプロフィール").await?,
    };
    coordinator.select_profile(&name).await?;
    println!("✔ アクティブなプロフィール: {}", name);
    Ok(())
}

pub async fn delete_profile<G: BackendGateway>(
    coordinator: &WorkflowCoordinator<G>,
    name: Option<String>,
    yes: bool,
) -> Result<()> {
    let name = match name {
        Some(name) => name,
        None => pick_profile(coordinator, "削除するプロフィール").await?,
    };

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("{} を削除しますか？写真も削除されます", name))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("中止しました");
            return Ok(());
        }
    }

    coordinator.delete_profile(&name).await?;
    println!("✔ プロフィールを削除しました: {}", name);
    Ok(())
}

pub fn deselect_profile<G: BackendGateway>(coordinator: &WorkflowCoordinator<G>) {
    coordinator.deselect_profile();
    println!("✔ アクティブなプロフィールを解除しました");
}

async fn pick_profile<G: BackendGateway>(
    coordinator: &WorkflowCoordinator<G>,
    prompt: &str,
) -> Result<String> {
    let profiles = coordinator.list_profiles().await?;
    if profiles.is_empty() {
        return Err(PhotoChatError::UnknownProfile("(一覧が空です)".into()));
    }
    let active = coordinator.store().active_profile();
    let default = active
        .and_then(|a| profiles.iter().position(|p| *p == a))
        .unwrap_or(0);

    let index = Select::new()
        .with_prompt(prompt)
        .items(&profiles)
        .default(default)
        .interact()?;
    profiles
        .get(index)
        .cloned()
        .ok_or_else(|| PhotoChatError::UnknownProfile(index.to_string()))
}

// =============================================
// 写真
// =============================================

pub async fn list_photos<G: BackendGateway>(coordinator: &WorkflowCoordinator<G>) -> Result<()> {
    let profile = require_profile(coordinator)?;
    let listing = coordinator.list_photos().await?;

    println!("📷 {} の写真: {}枚", profile, listing.uploaded_images.len());
    for line in format_photos(&listing) {
        println!("{}", line);
    }
    Ok(())
}

pub async fn select_photo<G: BackendGateway>(
    coordinator: &WorkflowCoordinator<G>,
    filename: Option<String>,
) -> Result<()> {
    require_profile(coordinator)?;
    let listing = coordinator.list_photos().await?;

    let filename = match filename {
        Some(filename) => filename,
        None => {
            let names: Vec<&str> = listing
                .uploaded_images
                .iter()
                .map(|p| p.filename.as_str())
                .collect();
            if names.is_empty() {
                return Err(PhotoChatError::UnknownPhoto("(一覧が空です)".into()));
            }
            let index = Select::new()
                .with_prompt("会話する写真")
                .items(&names)
                .default(0)
                .interact()?;
            names[index].to_string()
        }
    };

    let listed_url = find_photo(&listing, &filename).map(|p| p.public_url.clone());
    if listed_url.is_none() {
        tracing::debug!(filename = %filename, "photo not in listing; asking backend anyway");
    }

    let spinner = stage_spinner();
    let result = coordinator
        .select_existing_photo(&filename, listed_url.as_deref(), |state| {
            report_stage(&spinner, state)
        })
        .await;
    spinner.finish_and_clear();

    let photo = result?;
    print_committed(&photo);
    Ok(())
}

/// ローカルファイルをアップロードして会話用に選択
pub async fn upload<G: BackendGateway>(coordinator: &WorkflowCoordinator<G>, path: &Path) -> Result<PhotoRef> {
    require_profile(coordinator)?;
    let file = read_upload_file(path)?;

    let spinner = stage_spinner();
    let result = coordinator
        .upload_and_select(&file, |state| report_stage(&spinner, state))
        .await;
    spinner.finish_and_clear();

    let photo = result?;
    print_committed(&photo);
    Ok(photo)
}

/// 画像ファイルを読み込む（MIMEタイプは拡張子から推定）
pub fn read_upload_file(path: &Path) -> Result<UploadFile> {
    if !path.is_file() {
        return Err(PhotoChatError::FileNotFound(path.display().to_string()));
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| PhotoChatError::FileNotFound(path.display().to_string()))?;
    let bytes = std::fs::read(path)?;
    let mime_type = guess_mime_type(&name);
    Ok(UploadFile::new(name, Some(mime_type), bytes))
}

fn stage_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn report_stage(spinner: &ProgressBar, state: &PipelineState) {
    match state {
        PipelineState::Running(stage) => spinner.set_message(stage_label(*stage)),
        PipelineState::Failed(stage) => spinner.set_message(format!("✖ {}", stage_label(*stage))),
        PipelineState::Ready | PipelineState::Idle => {}
    }
}

/// 段階の表示名
pub fn stage_label(stage: PipelineStage) -> &'static str {
    match stage {
        PipelineStage::Precondition => "準備中...",
        PipelineStage::Uploading => "アップロード中...",
        PipelineStage::Selecting => "写真を選択中...",
        PipelineStage::SeedingContext => "会話を準備中...",
        PipelineStage::Ready => "完了",
    }
}

fn print_committed(photo: &PhotoRef) {
    println!("✔ 会話用の写真: {}", photo.filename);
    println!("  表示URL: {}", describe_display_url(&photo.display_url));
    println!("  `photo-chat chat` で会話を始められます");
}

// =============================================
// チャット
// =============================================

/// シードを受け取って会話する（メッセージ省略時は対話モード）
pub async fn chat<G: BackendGateway>(
    coordinator: &WorkflowCoordinator<G>,
    message: Option<String>,
    with_review: bool,
) -> Result<()> {
    let profile = require_profile(coordinator)?;
    let mut session = ChatSession::from_seed(coordinator.mailbox().take());
    for message in session.messages() {
        print_message(message);
    }

    if let Some(message) = message {
        let before = session.messages().len();
        let result = session.send(coordinator.gateway(), &profile, &message).await;
        print_new_messages(&session, before);
        return result.map_err(Into::into);
    }

    println!("---");
    println!("{} で年間レビュー、{} または空行で終了", REVIEW_COMMAND, QUIT_COMMAND);
    println!("---");

    let mut tracker = SummaryTracker::default();
    loop {
        let line: String = Input::new()
            .with_prompt("you")
            .allow_empty(true)
            .interact_text()?;

        let before = session.messages().len();
        let result = match parse_repl_line(&line) {
            ReplLine::Quit => break,
            ReplLine::Review => session.request_year_in_review(coordinator.gateway(), &profile).await,
            ReplLine::Message(text) => session.send(coordinator.gateway(), &profile, text).await,
        };
        print_new_messages(&session, before);
        if let Err(e) = result {
            tracing::debug!(error = %e, "chat turn failed");
        }

        let photo = coordinator.store().active_photo();
        let key = SummaryKey::new(&profile, photo.as_ref(), session.revision());
        if with_review && tracker.begin(&key) {
            let result = coordinator.year_in_review().await;
            tracker.finish(&key, result.is_ok());
            match result {
                Ok(summary) => println!("📅 {}", summary.as_deref().unwrap_or(REVIEW_EMPTY_NOTICE)),
                Err(e) => tracing::warn!(error = %e, "summary refresh failed"),
            }
        }
    }
    Ok(())
}

/// 対話モードの1行
#[derive(Debug, PartialEq, Eq)]
pub enum ReplLine<'a> {
    Quit,
    Review,
    Message(&'a str),
}

pub fn parse_repl_line(line: &str) -> ReplLine<'_> {
    match line.trim() {
        "" | QUIT_COMMAND => ReplLine::Quit,
        REVIEW_COMMAND => ReplLine::Review,
        text => ReplLine::Message(text),
    }
}

fn print_new_messages(session: &ChatSession, from: usize) {
    for message in session.messages().iter().skip(from) {
        if message.role == Role::Assistant {
            print_message(message);
        }
    }
}

fn print_message(message: &ChatMessage) {
    let label = match message.role {
        Role::User => "you",
        Role::Assistant => "ai ",
    };
    println!("{}: {}", label, message.content);
}

pub async fn review<G: BackendGateway>(coordinator: &WorkflowCoordinator<G>) -> Result<()> {
    let profile = require_profile(coordinator)?;
    let summary = coordinator.year_in_review().await?;
    println!("📅 {} の年間レビュー\n", profile);
    println!("{}", summary.as_deref().unwrap_or(REVIEW_EMPTY_NOTICE));
    Ok(())
}

/// 会話から蓄積された知識グラフを表示
pub async fn graph<G: BackendGateway>(coordinator: &WorkflowCoordinator<G>) -> Result<()> {
    let profile = require_profile(coordinator)?;
    let graph = coordinator.knowledge_graph().await?;
    println!("🕸  {} の知識グラフ\n", profile);
    for line in format_graph(&graph) {
        println!("{}", line);
    }
    Ok(())
}

// =============================================
// その他
// =============================================

pub fn status<G: BackendGateway>(coordinator: &WorkflowCoordinator<G>, backend_url: &str) {
    println!("セッション:");
    println!("  バックエンド: {}", backend_url);
    for line in format_status(&coordinator.store().snapshot()) {
        println!("  {}", line);
    }
}

pub fn show_fortune(index: Option<usize>) {
    let index = index.unwrap_or_else(clock_index);
    let Fortune { theme, message } = fortune(index);
    println!("🥠 {} ({}/{})\n", theme, index % FORTUNES.len() + 1, FORTUNES.len());
    println!("{}", message);
}

/// 時刻からお題の番号を選ぶ
fn clock_index() -> usize {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as usize)
        .unwrap_or(0)
}

pub async fn ping<G: BackendGateway + ?Sized>(gateway: &G) -> Result<()> {
    let ping = gateway.ping().await?;
    println!("✔ {}: {}", ping.status, ping.message);
    Ok(())
}

// =============================================
// 表示の整形
// =============================================

pub fn format_profiles(profiles: &[String], active: Option<&str>) -> Vec<String> {
    profiles
        .iter()
        .map(|name| {
            let marker = if Some(name.as_str()) == active { "*" } else { " " };
            format!("{} {}", marker, name)
        })
        .collect()
}

pub fn format_photos(listing: &PhotoListing) -> Vec<String> {
    let selected = listing.selected_image.as_ref().map(|p| p.filename.as_str());
    listing
        .uploaded_images
        .iter()
        .map(|photo| {
            let marker = if Some(photo.filename.as_str()) == selected { "*" } else { " " };
            format!("{} {}  {}", marker, photo.filename, photo.public_url)
        })
        .collect()
}

pub fn format_graph(graph: &KnowledgeGraph) -> Vec<String> {
    if graph.is_empty() {
        return vec!["まだデータがありません。チャットすると蓄積されます。".to_string()];
    }
    let mut lines = vec![format!("ノード ({}):", graph.nodes.len())];
    lines.extend(graph.nodes.iter().map(|node| match node.kind.as_deref() {
        Some(kind) => format!("  {} [{}]", node.display_name(), kind),
        None => format!("  {}", node.display_name()),
    }));
    lines.push(format!("関係 ({}):", graph.edges.len()));
    lines.extend(graph.describe_edges().into_iter().map(|edge| format!("  {}", edge)));
    lines
}

pub fn format_status(session: &ProfileSession) -> Vec<String> {
    let profile = session.active_profile.as_deref().unwrap_or("(未選択)");
    let mut lines = vec![format!("プロフィール: {}", profile)];
    match &session.active_photo {
        Some(photo) => {
            let name = if photo.filename.is_empty() { "(名前なし)" } else { &photo.filename };
            lines.push(format!("写真: {}", name));
            lines.push(format!("表示URL: {}", describe_display_url(&photo.display_url)));
        }
        None => lines.push("写真: (未選択)".to_string()),
    }
    lines
}

/// Data URLは中身を出さずに種類とサイズだけ示す
pub fn describe_display_url(url: &str) -> String {
    match extract_base64_from_data_url(url) {
        Some(data) if url.starts_with("data:") => format!(
            "<埋め込み画像 {} 約{}KB>",
            extract_mime_type_from_data_url(url),
            data.len() * 3 / 4 / 1024
        ),
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use photo_chat_common::Photo;

    #[test]
    fn test_format_profiles_marks_active() {
        let profiles = vec!["alice".to_string(), "bob".to_string()];
        assert_eq!(format_profiles(&profiles, Some("bob")), vec!["  alice", "* bob"]);
        assert_eq!(format_profiles(&profiles, None), vec!["  alice", "  bob"]);
    }

    #[test]
    fn test_format_photos_marks_selected() {
        let photo = |name: &str| Photo {
            filename: name.into(),
            public_url: format!("http://b/{}", name),
            ..Default::default()
        };
        let listing = PhotoListing {
            uploaded_images: vec![photo("a.png"), photo("b.png")],
            selected_image: Some(photo("b.png")),
        };
        assert_eq!(
            format_photos(&listing),
            vec!["  a.png  http://b/a.png", "* b.png  http://b/b.png"]
        );
    }

    #[test]
    fn test_format_graph() {
        let graph: KnowledgeGraph = serde_json::from_str(
            r#"{"nodes":[{"id":"0","label":"cat"},{"id":"1","label":"window","type":"place"}],
                "edges":[{"from":"0","to":"1","label":"sits by"}]}"#,
        )
        .unwrap();
        assert_eq!(
            format_graph(&graph),
            vec!["ノード (2):", "  cat", "  window [place]", "関係 (1):", "  cat -[sits by]-> window"]
        );
        assert_eq!(format_graph(&KnowledgeGraph::default()).len(), 1);
    }

    #[test]
    fn test_format_status_without_selection() {
        let lines = format_status(&ProfileSession::default());
        assert_eq!(lines, vec!["プロフィール: (未選択)", "写真: (未選択)"]);
    }

    #[test]
    fn test_describe_data_url_hides_payload() {
        let data_url = format!("data:image/jpeg;base64,{}", "A".repeat(4096));
        let described = describe_display_url(&data_url);
        assert_eq!(described, "<埋め込み画像 image/jpeg 約3KB>");
        assert_eq!(describe_display_url("http://b/cat.png"), "http://b/cat.png");
    }

    #[test]
    fn test_parse_repl_line() {
        assert_eq!(parse_repl_line("  "), ReplLine::Quit);
        assert_eq!(parse_repl_line("/quit"), ReplLine::Quit);
        assert_eq!(parse_repl_line(" /review "), ReplLine::Review);
        assert_eq!(parse_repl_line(" hi there "), ReplLine::Message("hi there"));
    }

    #[test]
    fn test_stage_labels_are_distinct() {
        let stages = [
            PipelineStage::Precondition,
            PipelineStage::Uploading,
            PipelineStage::Selecting,
            PipelineStage::SeedingContext,
            PipelineStage::Ready,
        ];
        let mut labels: Vec<_> = stages.iter().map(|s| stage_label(*s)).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), stages.len());
    }
}
