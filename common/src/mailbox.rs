//! シードの受け渡し（一度読んだら消えるメールボックス）

use std::sync::{Arc, Mutex, PoisonError};

use crate::storage::{DurableStorage, SEED_SLOT};
use crate::types::ChatSeed;

/// パイプラインからチャット画面へシードを一度だけ渡す
///
/// メモリ上の値を優先し、永続スロットにもミラーする（ページ遷移や
/// 別プロセスのCLIからも受け取れるように）。`take` は両方を消す。
#[derive(Clone)]
pub struct SeedMailbox {
    pending: Arc<Mutex<Option<ChatSeed>>>,
    storage: Arc<dyn DurableStorage>,
}

impl SeedMailbox {
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self {
            pending: Arc::new(Mutex::new(None)),
            storage,
        }
    }

    /// シードを置く（既存のシードは置き換える）
    pub fn post(&self, seed: ChatSeed) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);

        let result = if seed.is_empty() {
            self.storage.remove(SEED_SLOT)
        } else {
            match serde_json::to_string(&seed) {
                Ok(json) => self.storage.write(SEED_SLOT, &json),
                Err(e) => {
                    tracing::warn!(error = %e, "seed could not be encoded; kept in memory only");
                    Ok(())
                }
            }
        };
        if let Err(e) = result {
            tracing::warn!(slot = SEED_SLOT, error = %e, "persistence warning: seed kept in memory only");
        }

        *pending = Some(seed);
    }

    /// シードを取り出して消す
    ///
    /// 2回目以降は `None`。空のシードも `None` として扱う。
    pub fn take(&self) -> Option<ChatSeed> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);

        let seed = pending.take().or_else(|| self.read_durable());
        if let Err(e) = self.storage.remove(SEED_SLOT) {
            tracing::warn!(slot = SEED_SLOT, error = %e, "persistence warning: seed slot not cleared");
        }

        seed.filter(|seed| !seed.is_empty())
    }

    /// 読まれていないシードを捨てる（メモリと永続スロットの両方）
    pub fn discard(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        *pending = None;
        if let Err(e) = self.storage.remove(SEED_SLOT) {
            tracing::warn!(slot = SEED_SLOT, error = %e, "persistence warning: seed slot not cleared");
        }
    }

    fn read_durable(&self) -> Option<ChatSeed> {
        let raw = match self.storage.read(SEED_SLOT) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(slot = SEED_SLOT, error = %e, "persistence warning: seed slot unreadable");
                return None;
            }
        };
        match serde_json::from_str::<ChatSeed>(&raw) {
            Ok(seed) => Some(seed),
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse staged seed, discarding it");
                None
            }
        }
    }
}
