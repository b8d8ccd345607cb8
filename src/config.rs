use crate::error::{PhotoChatError, Result};
use photo_chat_common::ApiRoutes;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// バックエンドURLを上書きする環境変数
pub const BACKEND_URL_ENV: &str = "PHOTO_CHAT_BACKEND_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend_url: String,
    pub routes: ApiRoutes,
    pub timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:8000".into(),
            routes: ApiRoutes::default(),
            timeout_seconds: 120,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// 指定パスから読み込み（存在しなければデフォルト）
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// 設定ディレクトリ（`~/.config/photo-chat`）
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| PhotoChatError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("photo-chat"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// セッションスロットの保存先
    pub fn session_dir() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("session"))
    }

    /// 実際に使うバックエンドURL（環境変数を優先）
    pub fn backend_url(&self) -> String {
        self.backend_url_with(std::env::var(BACKEND_URL_ENV).ok())
    }

    fn backend_url_with(&self, env_value: Option<String>) -> String {
        env_value
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| self.backend_url.clone())
    }

    pub fn set_backend_url(&mut self, url: String) -> Result<()> {
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(PhotoChatError::Config(format!(
                "バックエンドURLは http:// または https:// で始まる必要があります: {}",
                url
            )));
        }
        self.backend_url = url.trim_end_matches('/').to_string();
        self.save()
    }
}
