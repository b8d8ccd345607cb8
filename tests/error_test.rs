//! エラーケーステスト
//!
//! 各種エラー条件でのエラーハンドリングを検証

use photo_chat::commands::read_upload_file;
use photo_chat::error::PhotoChatError;
use photo_chat_common::{GatewayError, PipelineError, StorageError};
use tempfile::tempdir;

/// 存在しないファイルをアップロードしようとした場合
#[test]
fn test_upload_nonexistent_file() {
    let result = read_upload_file(std::path::Path::new("/nonexistent/path/12345.png"));
    assert!(matches!(result, Err(PhotoChatError::FileNotFound(_))));
}

/// フォルダを指定した場合
#[test]
fn test_upload_directory() {
    let dir = tempdir().expect("Failed to create temp dir");
    let result = read_upload_file(dir.path());
    assert!(matches!(result, Err(PhotoChatError::FileNotFound(_))));
}

/// 拡張子からMIMEタイプを推定
#[test]
fn test_upload_file_mime_type() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("sunset.JPG");
    std::fs::write(&path, [0xff, 0xd8, 0xff]).unwrap();

    let file = read_upload_file(&path).expect("読み込み失敗");
    assert_eq!(file.name, "sunset.JPG");
    assert_eq!(file.mime_type, "image/jpeg");
    assert_eq!(file.bytes.len(), 3);
}

/// PhotoChatErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        PhotoChatError::Config("テスト設定エラー".to_string()),
        PhotoChatError::NoActiveProfile,
        PhotoChatError::FileNotFound("cat.png".to_string()),
        PhotoChatError::UnknownProfile("alice".to_string()),
        PhotoChatError::UnknownPhoto("cat.png".to_string()),
        PhotoChatError::Prompt("入力中断".to_string()),
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty(), "エラーメッセージが空: {:?}", err);
    }
}

/// NoActiveProfileエラーのメッセージ確認
#[test]
fn test_no_active_profile_message() {
    let display = format!("{}", PhotoChatError::NoActiveProfile);

    assert!(display.contains("プロフィール"));
    assert!(display.contains("photo-chat profiles select"));
}

/// バックエンドエラーからの変換
#[test]
fn test_gateway_error_conversion() {
    let err: PhotoChatError = GatewayError::status("chat", 503, "busy").into();

    assert!(matches!(err, PhotoChatError::Gateway(_)));
    assert!(format!("{}", err).contains("503"));
}

/// パイプラインエラーは段階名を含む
#[test]
fn test_pipeline_error_conversion() {
    let err: PhotoChatError = PipelineError::precondition("select a profile first").into();

    assert!(matches!(err, PhotoChatError::Pipeline(_)));
    let display = format!("{}", err);
    assert!(display.contains("precondition"));
    assert!(display.contains("select a profile first"));
}

/// IOエラーからの変換
#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: PhotoChatError = io_err.into();

    assert!(matches!(err, PhotoChatError::Io(_)));
    assert!(format!("{}", err).contains("IO"));
}

/// JSONエラーからの変換
#[test]
fn test_json_error_conversion() {
    let json_err = serde_json::from_str::<serde_json::Value>("{ invalid }").unwrap_err();
    let err: PhotoChatError = json_err.into();

    assert!(matches!(err, PhotoChatError::JsonParse(_)));
}

/// 永続スロットのエラーからの変換
#[test]
fn test_storage_error_conversion() {
    let err: PhotoChatError = StorageError::Unavailable("disabled".into()).into();

    assert!(matches!(err, PhotoChatError::Storage(_)));
    assert!(format!("{}", err).contains("disabled"));
}
