//! Photo Chat CLI
//!
//! プロフィールの管理、写真のアップロードと選択、写真についてのチャットを
//! 端末から行う。セッション状態は設定ディレクトリ配下のスロットファイルに残る。

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod file_storage;
