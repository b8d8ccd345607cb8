//! 永続スロット
//!
//! リロードをまたいで残るキー/値の保存先。ブラウザでは localStorage、
//! CLIではスロットごとのファイル。スロット同士は独立しており、
//! 片方の破損がもう片方の復元を妨げることはない。

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::error::StorageError;

/// アクティブなプロフィールID
pub const PROFILE_SLOT: &str = "activeProfile";
/// アクティブな写真（PhotoRefのJSON、旧形式はURL文字列）
pub const PHOTO_SLOT: &str = "uploadedPhoto";
/// チャット画面へ一度だけ渡すシード
pub const SEED_SLOT: &str = "initialChat";

/// 永続化バックエンド
///
/// 実装は失敗を `StorageError` で返す。呼び出し側（ストア）は
/// これを警告として記録し、処理を継続する。
pub trait DurableStorage: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// メモリ上のスロット（テストとストレージ無効時のフォールバック用）
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: Mutex<HashMap<String, String>>,
    /// trueの間は書き込みを拒否する（quota超過のシミュレーション）
    reject_writes: Mutex<bool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 書き込み拒否を切り替える
    pub fn set_reject_writes(&self, reject: bool) {
        *self.reject_writes.lock().unwrap_or_else(PoisonError::into_inner) = reject;
    }

    /// スロットの生の値を取得（テスト用の覗き見）
    pub fn raw(&self, key: &str) -> Option<String> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn rejecting(&self) -> bool {
        *self.reject_writes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DurableStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.raw(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.rejecting() {
            return Err(StorageError::Rejected(format!("quota exceeded writing {}", key)));
        }
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        if self.rejecting() {
            return Err(StorageError::Rejected(format!("storage locked removing {}", key)));
        }
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.read(PROFILE_SLOT).unwrap(), None);

        storage.write(PROFILE_SLOT, "alice").unwrap();
        assert_eq!(storage.read(PROFILE_SLOT).unwrap().as_deref(), Some("alice"));

        storage.remove(PROFILE_SLOT).unwrap();
        assert_eq!(storage.read(PROFILE_SLOT).unwrap(), None);
    }

    #[test]
    fn test_memory_storage_rejects_writes() {
        let storage = MemoryStorage::new();
        storage.write(PHOTO_SLOT, "x").unwrap();
        storage.set_reject_writes(true);

        assert!(matches!(storage.write(PHOTO_SLOT, "y"), Err(StorageError::Rejected(_))));
        assert!(storage.remove(PHOTO_SLOT).is_err());
        // 読み込みは可能で、値は変わらない
        assert_eq!(storage.read(PHOTO_SLOT).unwrap().as_deref(), Some("x"));
    }
}
