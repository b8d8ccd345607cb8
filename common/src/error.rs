//! エラー型定義
//!
//! - GatewayError: バックエンド呼び出しの失敗（操作名 + 原因）
//! - StorageError: 永続スロットの読み書き失敗（ストア境界で警告として握りつぶす）

use thiserror::Error;

/// バックエンド呼び出しの失敗理由
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayErrorKind {
    #[error("required argument `{0}` is empty")]
    InvalidArgument(&'static str),

    #[error("status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response body: {0}")]
    Decode(String),
}

/// バックエンド呼び出しエラー
///
/// どの操作で失敗したかを必ず保持する。リトライはしない。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{operation} failed: {kind}")]
pub struct GatewayError {
    pub operation: &'static str,
    pub kind: GatewayErrorKind,
}

impl GatewayError {
    pub fn invalid_argument(operation: &'static str, field: &'static str) -> Self {
        Self { operation, kind: GatewayErrorKind::InvalidArgument(field) }
    }

    pub fn status(operation: &'static str, status: u16, body: impl Into<String>) -> Self {
        Self {
            operation,
            kind: GatewayErrorKind::Status { status, body: body.into() },
        }
    }

    pub fn transport(operation: &'static str, message: impl Into<String>) -> Self {
        Self { operation, kind: GatewayErrorKind::Transport(message.into()) }
    }

    pub fn decode(operation: &'static str, message: impl Into<String>) -> Self {
        Self { operation, kind: GatewayErrorKind::Decode(message.into()) }
    }

    /// HTTPステータス（ステータスエラーの場合のみ）
    pub fn http_status(&self) -> Option<u16> {
        match &self.kind {
            GatewayErrorKind::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// 永続スロットのエラー
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("write rejected: {0}")]
    Rejected(String),
}
