//! チャットのトランスクリプト
//!
//! シードから開始し、送信ごとにユーザー発話と応答（または失敗の通知）を
//! 追加する。追加のたびに `revision` が進み、年間レビューの再取得の
//! 判断に使う。

use crate::error::GatewayError;
use crate::gateway::BackendGateway;
use crate::types::{ChatMessage, ChatReply, ChatSeed, PhotoRef, ReviewReply};

pub const NO_REPLY_NOTICE: &str = "\u{26a0}\u{fe0f} No reply received from the assistant.";
pub const SEND_FAILED_NOTICE: &str =
    "\u{26a0}\u{fe0f} There was an error sending your message. Please try again.";
pub const REVIEW_REQUEST: &str = "\u{2728} Show me my year in review!";
pub const REVIEW_FAILED_NOTICE: &str =
    "\u{26a0}\u{fe0f} Failed to generate year in review. Please try again later.";
pub const REVIEW_EMPTY_NOTICE: &str = "No highlights yet. Keep chatting!";

/// チャット画面1回分の会話
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    revision: u64,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// メールボックスから受け取ったシードで開始
    pub fn from_seed(seed: Option<ChatSeed>) -> Self {
        let messages = seed.map(|s| s.messages).unwrap_or_default();
        let revision = messages.len() as u64;
        Self { messages, revision }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.revision += 1;
    }

    /// ユーザー発話を追加して送信内容を返す（空白のみなら何もしない）
    pub fn begin_send(&mut self, text: &str) -> Option<String> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        self.push(ChatMessage::user(text));
        Some(text.to_string())
    }

    /// 応答（または失敗の通知）を追加
    pub fn finish_send(&mut self, result: Result<ChatReply, GatewayError>) -> Result<(), GatewayError> {
        match result {
            Ok(reply) if reply.reply.trim().is_empty() => {
                self.push(ChatMessage::assistant(NO_REPLY_NOTICE));
                Ok(())
            }
            Ok(reply) => {
                self.push(ChatMessage::assistant(reply.reply));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "chat message failed");
                self.push(ChatMessage::assistant(SEND_FAILED_NOTICE));
                Err(e)
            }
        }
    }

    /// 1往復を実行
    pub async fn send<G: BackendGateway + ?Sized>(
        &mut self,
        gateway: &G,
        profile: &str,
        text: &str,
    ) -> Result<(), GatewayError> {
        let Some(text) = self.begin_send(text) else {
            return Ok(());
        };
        let result = gateway.chat(profile, &text).await;
        self.finish_send(result)
    }

    pub fn begin_review(&mut self) {
        self.push(ChatMessage::user(REVIEW_REQUEST));
    }

    pub fn finish_review(&mut self, result: Result<ReviewReply, GatewayError>) -> Result<(), GatewayError> {
        match result {
            Ok(review) => {
                let text = review.into_text().unwrap_or_else(|| REVIEW_EMPTY_NOTICE.to_string());
                self.push(ChatMessage::assistant(text));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "year in review failed");
                self.push(ChatMessage::assistant(REVIEW_FAILED_NOTICE));
                Err(e)
            }
        }
    }

    /// 年間レビューを会話に追加
    pub async fn request_year_in_review<G: BackendGateway + ?Sized>(
        &mut self,
        gateway: &G,
        profile: &str,
    ) -> Result<(), GatewayError> {
        self.begin_review();
        let result = gateway.year_in_review(profile).await;
        self.finish_review(result)
    }
}

/// サマリーが対象とする状態（プロフィール、確定した写真、会話の進み具合）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryKey {
    profile: String,
    photo: Option<String>,
    revision: u64,
}

impl SummaryKey {
    pub fn new(profile: impl Into<String>, photo: Option<&PhotoRef>, revision: u64) -> Self {
        Self {
            profile: profile.into(),
            photo: photo.map(|p| p.filename.clone()),
            revision,
        }
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }
}

/// 年間レビューのサマリーを再取得すべきかを判断する
///
/// 最後に取得に成功したキーと異なれば再取得。取得中のキーは重複させない。
/// 失敗したキーは成功扱いにしないので、次の機会に再取得される。
#[derive(Debug, Clone, Default)]
pub struct SummaryTracker {
    seen: Option<SummaryKey>,
    in_flight: Option<SummaryKey>,
}

impl SummaryTracker {
    pub fn needs_refresh(&self, key: &SummaryKey) -> bool {
        self.seen.as_ref() != Some(key) && self.in_flight.as_ref() != Some(key)
    }

    /// 取得を開始する（不要なら `false`）
    pub fn begin(&mut self, key: &SummaryKey) -> bool {
        if !self.needs_refresh(key) {
            return false;
        }
        self.in_flight = Some(key.clone());
        true
    }

    /// 取得の結果を記録
    pub fn finish(&mut self, key: &SummaryKey, succeeded: bool) {
        if self.in_flight.as_ref() == Some(key) {
            self.in_flight = None;
        }
        if succeeded {
            self.seen = Some(key.clone());
        }
    }
}
