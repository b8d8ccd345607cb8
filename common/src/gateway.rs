//! バックエンドとの境界
//!
//! 型付きの最小APIだけを公開する。状態を持たず、リトライもキャッシュもしない。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::types::{
    ChatReply, KnowledgeGraph, Photo, PhotoListing, Ping, ProfileEntry, ReviewReply,
    SelectionReceipt, UploadFile, UploadReceipt,
};

/// 操作名（エラーに含める）
pub mod op {
    pub const LIST_PROFILES: &str = "list_profiles";
    pub const CREATE_PROFILE: &str = "create_profile";
    pub const DELETE_PROFILE: &str = "delete_profile";
    pub const SELECT_PROFILE: &str = "select_profile";
    pub const LIST_PHOTOS: &str = "list_photos";
    pub const UPLOAD_PHOTO: &str = "upload_photo";
    pub const SELECT_PHOTO: &str = "select_photo";
    pub const CHAT: &str = "chat";
    pub const YEAR_IN_REVIEW: &str = "year_in_review";
    pub const FETCH_GRAPH: &str = "fetch_graph";
    pub const PING: &str = "ping";
}

/// リモート呼び出しの境界
///
/// wasmの `fetch` はSendでないため、futureは `?Send`。
#[async_trait(?Send)]
pub trait BackendGateway {
    async fn list_profiles(&self) -> Result<Vec<ProfileEntry>, GatewayError>;

    async fn create_profile(&self, name: &str) -> Result<(), GatewayError>;

    async fn delete_profile(&self, name: &str) -> Result<(), GatewayError>;

    /// プロフィールの存在確認を兼ねた選択
    async fn select_profile(&self, name: &str) -> Result<(), GatewayError>;

    async fn list_photos(&self, profile: &str) -> Result<PhotoListing, GatewayError>;

    async fn upload_photo(&self, profile: &str, file: &UploadFile) -> Result<UploadReceipt, GatewayError>;

    /// アップロード済み画像を会話コンテキストに結び付ける
    async fn select_photo(&self, profile: &str, filename: &str) -> Result<SelectionReceipt, GatewayError>;

    async fn chat(&self, profile: &str, message: &str) -> Result<ChatReply, GatewayError>;

    async fn year_in_review(&self, profile: &str) -> Result<ReviewReply, GatewayError>;

    /// 会話から蓄積された知識グラフ
    async fn fetch_graph(&self, profile: &str) -> Result<KnowledgeGraph, GatewayError>;

    async fn ping(&self) -> Result<Ping, GatewayError>;
}

/// 必須の識別子が空でないことを確認
pub fn require(operation: &'static str, field: &'static str, value: &str) -> Result<(), GatewayError> {
    if value.trim().is_empty() {
        return Err(GatewayError::invalid_argument(operation, field));
    }
    Ok(())
}

/// エンドポイントのパス設定
///
/// プレフィックスはデプロイ依存なので設定で差し替えられる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiRoutes {
    /// プロフィールCRUD（`/list`, `/create`, `/delete`, `/select`）
    pub profiles: String,
    /// 写真一覧（`/list`）
    pub photos: String,
    /// アップロード/選択/チャット/年間レビュー/ping
    pub assistant: String,
    /// 知識グラフ（`/{profile}`）
    pub graph: String,
}

impl Default for ApiRoutes {
    fn default() -> Self {
        Self {
            profiles: "/api/profiles".into(),
            photos: "/api/photo".into(),
            assistant: "/api/gpt4v".into(),
            graph: "/api/graph".into(),
        }
    }
}

impl ApiRoutes {
    /// ベースURLとプレフィックスとパスを連結
    pub fn join(base_url: &str, prefix: &str, path: &str) -> String {
        format!(
            "{}/{}/{}",
            base_url.trim_end_matches('/'),
            prefix.trim_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// 一覧から写真を名前で探す
pub fn find_photo<'a>(listing: &'a PhotoListing, filename: &str) -> Option<&'a Photo> {
    listing.uploaded_images.iter().find(|p| p.filename == filename)
}
