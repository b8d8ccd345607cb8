//! 設定ファイルの統合テスト

use photo_chat::config::Config;
use photo_chat::error::PhotoChatError;
use photo_chat_common::ApiRoutes;
use tempfile::tempdir;

/// 存在しない設定ファイルはデフォルト
#[test]
fn test_missing_config_is_default() {
    let dir = tempdir().expect("Failed to create temp dir");
    let config = Config::load_from(&dir.path().join("config.json")).expect("読み込み失敗");
    assert_eq!(config, Config::default());
    assert_eq!(config.routes, ApiRoutes::default());
}

/// 保存と読み込み
#[test]
fn test_config_save_and_load() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("nested").join("config.json");

    let config = Config {
        backend_url: "https://photos.example.com".into(),
        routes: ApiRoutes {
            assistant: "/v2/assistant".into(),
            ..ApiRoutes::default()
        },
        timeout_seconds: 30,
    };
    config.save_to(&path).expect("保存失敗");

    let loaded = Config::load_from(&path).expect("読み込み失敗");
    assert_eq!(loaded, config);
}

/// 壊れた設定ファイルはエラー
#[test]
fn test_broken_config_is_error() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(matches!(
        Config::load_from(&path),
        Err(PhotoChatError::JsonParse(_))
    ));
}
