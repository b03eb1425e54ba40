use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{CacheEntry, CacheEntryInfo, CacheError, CacheKey, CacheStore, SqliteCacheStore};

impl SqliteCacheStore {
    /// データベースの行をエントリに変換
    fn row_to_entry(row: &Row) -> rusqlite::Result<(String, String, DateTime<Utc>, i64)> {
        Ok((
            row.get("cache_key")?,
            row.get("payload")?,
            row.get("created_at")?,
            row.get("duration_ms")?,
        ))
    }

    /// データベースの行を一覧用の要約に変換
    fn row_to_info(row: &Row) -> rusqlite::Result<CacheEntryInfo> {
        Ok(CacheEntryInfo {
            key: CacheKey::from_raw(row.get::<_, String>("cache_key")?),
            primary_app_id: row.get("primary_app_id")?,
            competitor_count: row.get::<_, i64>("competitor_count")?.max(0) as usize,
            created_at: row.get("created_at")?,
            duration_ms: row.get::<_, i64>("duration_ms")?.max(0) as u64,
        })
    }
}

impl CacheStore for SqliteCacheStore {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let connection = self.connection.lock();
        let row = connection
            .query_row(
                "SELECT cache_key, payload, created_at, duration_ms
                 FROM analysis_cache WHERE cache_key = ?1",
                params![key.as_str()],
                Self::row_to_entry,
            )
            .optional()?;

        let Some((raw_key, payload, created_at, duration_ms)) = row else {
            tracing::debug!("🗃️ Cache miss: {}", key);
            return Ok(None);
        };

        Ok(Some(CacheEntry {
            key: CacheKey::from_raw(raw_key),
            payload: serde_json::from_str(&payload)?,
            created_at,
            duration_ms: duration_ms.max(0) as u64,
        }))
    }

    fn put_entry(&self, entry: CacheEntry) -> Result<(), CacheError> {
        let payload = serde_json::to_string(&entry.payload)?;

        self.connection.lock().execute(
            "INSERT OR REPLACE INTO analysis_cache
             (cache_key, primary_app_id, competitor_count, payload, created_at, duration_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.key.as_str(),
                entry.payload.primary_app.app_id,
                entry.payload.competitors.len() as i64,
                payload,
                entry.created_at,
                entry.duration_ms.min(i64::MAX as u64) as i64,
            ],
        )?;

        tracing::debug!("💾 Cached comparison {} ({} bytes)", entry.key, payload.len());
        Ok(())
    }

    fn delete(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let deleted = self.connection.lock().execute(
            "DELETE FROM analysis_cache WHERE cache_key = ?1",
            params![key.as_str()],
        )?;
        Ok(deleted > 0)
    }

    fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, CacheError> {
        let deleted = self.connection.lock().execute(
            "DELETE FROM analysis_cache WHERE created_at < ?1",
            params![cutoff],
        )?;
        if deleted > 0 {
            tracing::info!("🧹 Purged {} cached comparisons older than {}", deleted, cutoff);
        }
        Ok(deleted)
    }

    fn clear(&self) -> Result<usize, CacheError> {
        let deleted = self
            .connection
            .lock()
            .execute("DELETE FROM analysis_cache", [])?;
        tracing::info!("🧹 Cleared {} cached comparisons", deleted);
        Ok(deleted)
    }

    fn list(&self) -> Result<Vec<CacheEntryInfo>, CacheError> {
        let connection = self.connection.lock();
        let mut stmt = connection.prepare(
            "SELECT cache_key, primary_app_id, competitor_count, created_at, duration_ms
             FROM analysis_cache ORDER BY created_at DESC",
        )?;

        let info_iter = stmt.query_map([], Self::row_to_info)?;

        let mut entries = Vec::new();
        for info in info_iter {
            entries.push(info?);
        }

        Ok(entries)
    }
}
