//! プロセス内キャッシュストア（テスト・一時利用向け）

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

use super::{CacheEntry, CacheEntryInfo, CacheError, CacheKey, CacheStore};

#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put_entry(&self, entry: CacheEntry) -> Result<(), CacheError> {
        self.entries.write().insert(entry.key.clone(), entry);
        Ok(())
    }

    fn delete(&self, key: &CacheKey) -> Result<bool, CacheError> {
        Ok(self.entries.write().remove(key).is_some())
    }

    fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, CacheError> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.created_at >= cutoff);
        Ok(before - entries.len())
    }

    fn clear(&self) -> Result<usize, CacheError> {
        let mut entries = self.entries.write();
        let count = entries.len();
        entries.clear();
        Ok(count)
    }

    fn list(&self) -> Result<Vec<CacheEntryInfo>, CacheError> {
        let mut infos: Vec<CacheEntryInfo> = self.entries.read().values().map(CacheEntryInfo::from).collect();
        infos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(infos)
    }
}
