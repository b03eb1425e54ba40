use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::CacheKey;
use crate::analytics::report::CompetitiveIntelligence;

/// キャッシュエントリ（部分更新はしない）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub payload: CompetitiveIntelligence,
    pub created_at: DateTime<Utc>,
    /// 計算に要した時間（ミリ秒）
    pub duration_ms: u64,
}

impl CacheEntry {
    pub fn new(key: CacheKey, payload: CompetitiveIntelligence, duration_ms: u64) -> Self {
        Self {
            key,
            payload,
            created_at: Utc::now(),
            duration_ms,
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }

    /// 経過秒数（時計の巻き戻りは0扱い）
    pub fn age_seconds(&self, now: DateTime<Utc>) -> u64 {
        self.age(now).num_seconds().max(0) as u64
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.age(now) < window
    }
}

/// ペイロードを読まずに一覧するための要約
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntryInfo {
    pub key: CacheKey,
    pub primary_app_id: String,
    pub competitor_count: usize,
    pub created_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl From<&CacheEntry> for CacheEntryInfo {
    fn from(entry: &CacheEntry) -> Self {
        Self {
            key: entry.key.clone(),
            primary_app_id: entry.payload.primary_app.app_id.clone(),
            competitor_count: entry.payload.competitors.len(),
            created_at: entry.created_at,
            duration_ms: entry.duration_ms,
        }
    }
}
