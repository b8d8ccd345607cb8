use photo_chat_common::{GatewayError, PipelineError, StorageError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhotoChatError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("プロフィールが選択されていません。`photo-chat profiles select` で選択してください")]
    NoActiveProfile,

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("プロフィールが見つかりません: {0}")]
    UnknownProfile(String),

    #[error("写真が見つかりません: {0}")]
    UnknownPhoto(String),

    #[error("バックエンドエラー: {0}")]
    Gateway(#[from] GatewayError),

    #[error("パイプライン失敗 ({0})")]
    Pipeline(#[from] PipelineError),

    #[error("セッション保存エラー: {0}")]
    Storage(#[from] StorageError),

    #[error("入力エラー: {0}")]
    Prompt(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),
}

impl From<dialoguer::Error> for PhotoChatError {
    fn from(e: dialoguer::Error) -> Self {
        PhotoChatError::Prompt(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PhotoChatError>;
