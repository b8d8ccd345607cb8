//! セッションとバックエンド境界の型定義
//!
//! CLIとWeb(WASM)で共有される型:
//! - ProfileSession / PhotoRef: アクティブなプロフィールと写真
//! - ChatMessage / ChatSeed: チャット画面へ渡す初期トランスクリプト
//! - UploadFile: パイプラインに渡すローカルファイル
//! - Photo / PhotoListing / *Receipt: バックエンドのレスポンス

use serde::{Deserialize, Serialize};

use crate::media::{guess_mime_type, to_data_url};

/// シード生成時に挿入するユーザー発話
pub const SEED_OPENING_MESSAGE: &str = "let's talk about this photo.";

/// 会話対象として選択された画像へのハンドル
///
/// アップロード+選択パイプラインが生成する。生成後は変更しない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRef {
    pub filename: String,
    pub display_url: String,
}

impl PhotoRef {
    pub fn new(filename: impl Into<String>, display_url: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            display_url: display_url.into(),
        }
    }

    /// URL（またはData URL）だけが保存されていた場合の復元
    ///
    /// ファイル名はURLパス末尾から推定する。Data URLでは空文字。
    pub fn from_display_url(display_url: &str) -> Self {
        let filename = if display_url.starts_with("data:") {
            String::new()
        } else {
            let path = display_url.split(['?', '#']).next().unwrap_or_default();
            path.rsplit('/').next().unwrap_or_default().to_string()
        };
        Self::new(filename, display_url)
    }
}

/// タブ（プロセス）単位のセッション状態
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSession {
    pub active_profile: Option<String>,
    pub active_photo: Option<PhotoRef>,
}

/// メッセージ送信者
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// チャットメッセージ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// パイプライン成功時にチャット画面へ一度だけ渡す初期トランスクリプト
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatSeed {
    pub messages: Vec<ChatMessage>,
}

impl ChatSeed {
    /// 選択時の自動応答からシードを組み立てる
    ///
    /// 応答が無い（または空白のみ）の場合は空のシード。
    pub fn from_auto_reply(auto_reply: Option<&str>) -> Self {
        match auto_reply.map(str::trim).filter(|r| !r.is_empty()) {
            Some(reply) => Self {
                messages: vec![
                    ChatMessage::user(SEED_OPENING_MESSAGE),
                    ChatMessage::assistant(reply),
                ],
            },
            None => Self::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// アップロード対象のローカルファイル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// MIMEタイプが不明な場合は拡張子から推定する
    pub fn new(name: impl Into<String>, mime_type: Option<&str>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = match mime_type.filter(|m| !m.is_empty()) {
            Some(m) => m.to_string(),
            None => guess_mime_type(&name).to_string(),
        };
        Self { name, mime_type, bytes }
    }

    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty() || self.bytes.is_empty()
    }

    /// サーバーURLが得られなかった場合の表示用Data URL
    pub fn data_url(&self) -> String {
        to_data_url(&self.mime_type, &self.bytes)
    }
}

// =============================================
// バックエンドのレスポンス
// =============================================

/// `GET /profiles/list` の要素
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub name: String,
}

/// サーバー上の写真
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Photo {
    pub filename: String,
    pub uploaded_path: String,
    pub processed_path: String,
    pub public_url: String,
}

/// `GET /photo/list` のレスポンス
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoListing {
    pub uploaded_images: Vec<Photo>,
    pub selected_image: Option<Photo>,
}

/// `POST /photo/upload` のレスポンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub filename: String,
    #[serde(default)]
    pub public_url: Option<String>,
}

/// `POST /photo/select` のレスポンス
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionReceipt {
    pub url: Option<String>,
    pub auto_reply: Option<String>,
}

/// `POST /chat` のレスポンス
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatReply {
    pub reply: String,
}

/// `POST /year_in_review` のレスポンス（`reply` または `summary`）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewReply {
    pub reply: Option<String>,
    pub summary: Option<String>,
}

impl ReviewReply {
    pub fn into_text(self) -> Option<String> {
        self.reply
            .or(self.summary)
            .filter(|text| !text.trim().is_empty())
    }
}

/// `GET /ping` のレスポンス
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ping {
    pub status: String,
    pub message: String,
}

/// 知識グラフのノード
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl GraphNode {
    /// 表示名（ラベルが無ければID）
    pub fn display_name(&self) -> &str {
        self.label
            .as_deref()
            .filter(|label| !label.trim().is_empty())
            .unwrap_or(&self.id)
    }
}

/// 知識グラフのエッジ（サーバーは関係名を `label` で返す）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    #[serde(default, alias = "label")]
    pub relation: Option<String>,
}

/// `GET /graph/{profile}` のレスポンス
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl KnowledgeGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// エッジを `from -[relation]-> to` 形式の行にする（ノード名はラベル優先）
    pub fn describe_edges(&self) -> Vec<String> {
        self.edges
            .iter()
            .map(|edge| {
                let from = self.node(&edge.from).map_or(edge.from.as_str(), GraphNode::display_name);
                let to = self.node(&edge.to).map_or(edge.to.as_str(), GraphNode::display_name);
                match edge.relation.as_deref().filter(|r| !r.trim().is_empty()) {
                    Some(relation) => format!("{} -[{}]-> {}", from, relation, to),
                    None => format!("{} --> {}", from, to),
                }
            })
            .collect()
    }
}
