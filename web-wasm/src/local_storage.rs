//! localStorageによる永続スロット
//!
//! プライベートモードや容量超過でlocalStorageが使えない場合もパニックせず
//! `StorageError` を返す。ストア側はそれを警告として扱う。

use std::sync::Arc;

use photo_chat_common::{DurableStorage, MemoryStorage, StorageError};

/// `window.localStorage` のスロット
///
/// `web_sys::Storage` はスレッド間で共有できないため、呼び出しのたびに取得する。
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserStorage;

impl BrowserStorage {
    /// localStorageが使えなければメモリ上のスロットで代替する
    pub fn open() -> Arc<dyn DurableStorage> {
        match local_storage() {
            Ok(_) => Arc::new(BrowserStorage),
            Err(e) => {
                tracing::warn!(error = %e, "localStorage unavailable; session will not survive reloads");
                Arc::new(MemoryStorage::new())
            }
        }
    }
}

fn local_storage() -> Result<web_sys::Storage, StorageError> {
    let window = web_sys::window().ok_or_else(|| StorageError::Unavailable("no window".into()))?;
    window
        .local_storage()
        .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))?
        .ok_or_else(|| StorageError::Unavailable("localStorage disabled".into()))
}

impl DurableStorage for BrowserStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        local_storage()?
            .get_item(key)
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        local_storage()?
            .set_item(key, value)
            .map_err(|e| StorageError::Rejected(format!("{:?}", e)))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        local_storage()?
            .remove_item(key)
            .map_err(|e| StorageError::Rejected(format!("{:?}", e)))
    }
}
