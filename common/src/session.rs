//! プロフィールセッションストア
//!
//! 「どのプロフィールと、どの写真がアクティブか」の唯一の情報源。
//! 変更は2つのセッターのみで行い、セッターが永続スロットへミラーする。
//! 永続化の失敗は警告ログに留め、メモリ上の状態を正とする。

use std::sync::{Arc, PoisonError, RwLock};

use crate::storage::{DurableStorage, PHOTO_SLOT, PROFILE_SLOT};
use crate::types::{PhotoRef, ProfileSession};

/// アクティブなプロフィール/写真を保持するストア
///
/// `Clone` は同じ状態を共有するハンドルを返す。
#[derive(Clone)]
pub struct ProfileSessionStore {
    state: Arc<RwLock<ProfileSession>>,
    storage: Arc<dyn DurableStorage>,
}

impl ProfileSessionStore {
    /// 空のストアを作成（永続スロットは読まない）
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self {
            state: Arc::new(RwLock::new(ProfileSession::default())),
            storage,
        }
    }

    /// 作成して直ちにハイドレートする
    pub fn open(storage: Arc<dyn DurableStorage>) -> Self {
        let store = Self::new(storage);
        store.hydrate();
        store
    }

    /// 永続スロットからメモリ上の状態を復元
    ///
    /// 2つのスロットは独立に読む。存在しないスロットはエラーではなく `None`。
    pub fn hydrate(&self) {
        let profile = self
            .read_slot(PROFILE_SLOT)
            .filter(|value| !value.trim().is_empty());
        let photo = self.read_slot(PHOTO_SLOT).and_then(|value| decode_photo_slot(&value));

        tracing::debug!(
            profile = profile.as_deref().unwrap_or("-"),
            has_photo = photo.is_some(),
            "session hydrated"
        );

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.active_profile = profile;
        state.active_photo = photo;
    }

    pub fn active_profile(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .active_profile
            .clone()
    }

    pub fn active_photo(&self) -> Option<PhotoRef> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .active_photo
            .clone()
    }

    /// 両方の値を一度に読む
    pub fn snapshot(&self) -> ProfileSession {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// アクティブなプロフィールを設定
    ///
    /// プロフィールが変わった場合、別プロフィールの写真を「選択中」と
    /// 見せないよう写真もクリアする（メモリと写真スロットの両方）。
    /// プロフィールが変わったかどうかを返す。
    pub fn set_active_profile(&self, profile: Option<String>) -> bool {
        let profile = profile.filter(|p| !p.trim().is_empty());

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let changed = state.active_profile != profile;

        self.persist(PROFILE_SLOT, profile.as_deref());
        if changed {
            state.active_photo = None;
            self.persist(PHOTO_SLOT, None);
        }
        state.active_profile = profile;
        changed
    }

    /// アクティブな写真を設定（プロフィールスロットには触れない）
    pub fn set_active_photo(&self, photo: Option<PhotoRef>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        match &photo {
            Some(photo) => match serde_json::to_string(photo) {
                Ok(json) => self.persist(PHOTO_SLOT, Some(&json)),
                Err(e) => tracing::warn!(error = %e, "photo reference could not be encoded; not persisted"),
            },
            None => self.persist(PHOTO_SLOT, None),
        }
        state.active_photo = photo;
    }

    fn read_slot(&self, key: &str) -> Option<String> {
        match self.storage.read(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(slot = key, error = %e, "persistence warning: slot unreadable");
                None
            }
        }
    }

    fn persist(&self, key: &str, value: Option<&str>) {
        let result = match value {
            Some(value) => self.storage.write(key, value),
            None => self.storage.remove(key),
        };
        if let Err(e) = result {
            tracing::warn!(slot = key, error = %e, "persistence warning: keeping in-memory state only");
        }
    }
}

/// 写真スロットの値をPhotoRefへ復元
///
/// PhotoRefのJSONを優先し、旧形式（URL/Data URLの文字列のみ）も受け付ける。
fn decode_photo_slot(value: &str) -> Option<PhotoRef> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(photo) = serde_json::from_str::<PhotoRef>(value) {
        return Some(photo);
    }
    let legacy_url = ["data:", "http://", "https://", "/"]
        .iter()
        .any(|prefix| value.starts_with(prefix));
    if legacy_url {
        return Some(PhotoRef::from_display_url(value));
    }
    tracing::warn!("persistence warning: photo slot is corrupt, ignoring it");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn store_with(storage: &Arc<MemoryStorage>) -> ProfileSessionStore {
        ProfileSessionStore::open(storage.clone())
    }

    fn cat() -> PhotoRef {
        PhotoRef::new("cat.png", "http://127.0.0.1:8000/static/alice/uploads/cat.png")
    }

    #[test]
    fn test_new_store_is_empty() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(&storage);
        assert_eq!(store.snapshot(), ProfileSession::default());
    }

    #[test]
    fn test_switching_profile_clears_photo() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(&storage);

        store.set_active_profile(Some("alice".into()));
        store.set_active_photo(Some(cat()));
        store.set_active_profile(Some("bob".into()));

        assert_eq!(store.active_profile().as_deref(), Some("bob"));
        assert_eq!(store.active_photo(), None);
        assert_eq!(storage.raw(PHOTO_SLOT), None);
    }

    #[test]
    fn test_reselecting_same_profile_keeps_photo() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(&storage);

        assert!(store.set_active_profile(Some("alice".into())));
        store.set_active_photo(Some(cat()));
        assert!(!store.set_active_profile(Some("alice".into())));

        assert_eq!(store.active_photo(), Some(cat()));
    }

    #[test]
    fn test_deselect_clears_both_slots() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(&storage);

        store.set_active_profile(Some("alice".into()));
        store.set_active_photo(Some(cat()));
        store.set_active_profile(None);

        assert_eq!(store.snapshot(), ProfileSession::default());
        assert_eq!(storage.raw(PROFILE_SLOT), None);
        assert_eq!(storage.raw(PHOTO_SLOT), None);
    }

    #[test]
    fn test_empty_profile_name_is_treated_as_none() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(&storage);
        store.set_active_profile(Some("  ".into()));
        assert_eq!(store.active_profile(), None);
        assert_eq!(storage.raw(PROFILE_SLOT), None);
    }

    #[test]
    fn test_profile_survives_reload() {
        let storage = Arc::new(MemoryStorage::new());
        for profile in ["alice", "bob", "名前付き"] {
            store_with(&storage).set_active_profile(Some(profile.to_string()));
            let reloaded = store_with(&storage);
            assert_eq!(reloaded.active_profile().as_deref(), Some(profile));
        }
    }

    #[test]
    fn test_photo_roundtrip_in_tab_and_after_reload() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(&storage);
        store.set_active_profile(Some("alice".into()));
        store.set_active_photo(Some(cat()));

        assert_eq!(store.active_photo(), Some(cat()));
        assert_eq!(store_with(&storage).active_photo(), Some(cat()));
    }

    #[test]
    fn test_set_photo_does_not_touch_profile_slot() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(&storage);
        store.set_active_profile(Some("alice".into()));
        store.set_active_photo(Some(cat()));
        store.set_active_photo(None);

        assert_eq!(storage.raw(PROFILE_SLOT).as_deref(), Some("alice"));
        assert_eq!(storage.raw(PHOTO_SLOT), None);
    }

    #[test]
    fn test_corrupt_photo_slot_does_not_block_profile() {
        let storage = Arc::new(MemoryStorage::new());
        storage.write(PROFILE_SLOT, "alice").unwrap();
        storage.write(PHOTO_SLOT, "{ not json").unwrap();

        let store = store_with(&storage);
        assert_eq!(store.active_profile().as_deref(), Some("alice"));
        assert_eq!(store.active_photo(), None);
    }

    #[test]
    fn test_photo_slot_without_profile_slot() {
        let storage = Arc::new(MemoryStorage::new());
        storage.write(PHOTO_SLOT, &serde_json::to_string(&cat()).unwrap()).unwrap();

        let store = store_with(&storage);
        assert_eq!(store.active_profile(), None);
        assert_eq!(store.active_photo(), Some(cat()));
    }

    #[test]
    fn test_legacy_url_photo_slot_is_recovered() {
        let storage = Arc::new(MemoryStorage::new());
        storage.write(PHOTO_SLOT, "http://127.0.0.1:8000/static/alice/uploads/cat_1700.png").unwrap();

        let photo = store_with(&storage).active_photo().expect("写真が復元されない");
        assert_eq!(photo.filename, "cat_1700.png");
    }

    #[test]
    fn test_failed_persistence_keeps_memory_state() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(&storage);
        storage.set_reject_writes(true);

        store.set_active_profile(Some("alice".into()));
        store.set_active_photo(Some(cat()));

        assert_eq!(store.active_profile().as_deref(), Some("alice"));
        assert_eq!(store.active_photo(), Some(cat()));
        // 永続化はされていないのでリロード後は空
        assert_eq!(store_with(&storage).snapshot(), ProfileSession::default());
    }

    #[test]
    fn test_clones_share_state() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(&storage);
        let other = store.clone();
        other.set_active_profile(Some("alice".into()));
        assert_eq!(store.active_profile().as_deref(), Some("alice"));
    }
}
