pub mod crud;
pub mod key;
pub mod memory;
pub mod models;

pub use key::{cache_key, CacheKey};
pub use memory::MemoryCacheStore;
pub use models::*;

use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::analytics::report::CompetitiveIntelligence;

/// キャッシュストアのエラー（パイプラインではキャッシュミスとして扱う）
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cache payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache store unavailable: {0}")]
    Unavailable(String),
}

/// キー単位の get/put/delete を提供するキャッシュストア
///
/// 鮮度の判定はしない。保存されているものと作成時刻をそのまま返す。
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError>;

    /// エントリを丸ごと上書き保存
    fn put_entry(&self, entry: CacheEntry) -> Result<(), CacheError>;

    /// 現在時刻を作成時刻として保存
    fn put(
        &self,
        key: &CacheKey,
        payload: &CompetitiveIntelligence,
        duration_ms: u64,
    ) -> Result<(), CacheError> {
        self.put_entry(CacheEntry::new(key.clone(), payload.clone(), duration_ms))
    }

    /// 削除（存在した場合true）
    fn delete(&self, key: &CacheKey) -> Result<bool, CacheError>;

    /// 作成時刻が `cutoff` より古いエントリを削除し、削除件数を返す
    fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, CacheError>;

    /// 全エントリを削除
    fn clear(&self) -> Result<usize, CacheError>;

    /// 新しい順のエントリ一覧
    fn list(&self) -> Result<Vec<CacheEntryInfo>, CacheError>;
}

/// SQLiteによるキャッシュストア
pub struct SqliteCacheStore {
    connection: Mutex<rusqlite::Connection>,
    path: Option<PathBuf>,
}

impl SqliteCacheStore {
    /// データベースファイルを開く（スキーマが無ければ作成）
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let connection = rusqlite::Connection::open(&path)?;
        let store = Self {
            connection: Mutex::new(connection),
            path: Some(path),
        };

        store.initialize_schema()?;
        Ok(store)
    }

    /// インメモリデータベースを作成（テスト用）
    pub fn new_in_memory() -> Result<Self> {
        let connection = rusqlite::Connection::open_in_memory()?;
        let store = Self {
            connection: Mutex::new(connection),
            path: None,
        };

        store.initialize_schema()?;
        Ok(store)
    }

    /// XDGデータディレクトリ（または設定のパス）のデータベースを開く
    pub fn open_default(custom_path: Option<&Path>) -> Result<Self> {
        match custom_path {
            Some(path) => Self::new(path),
            None => Self::new(get_database_path()?),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// データベーススキーマを初期化
    fn initialize_schema(&self) -> Result<()> {
        self.connection
            .lock()
            .execute_batch(include_str!("schema.sql"))?;
        tracing::info!("Cache schema initialized successfully");
        Ok(())
    }
}

/// XDGデータディレクトリからデータベースパスを取得
pub fn get_database_path() -> Result<PathBuf> {
    let project_dirs = crate::config::project_dirs()?;

    let data_dir = project_dirs.data_dir();
    std::fs::create_dir_all(data_dir)?;

    Ok(data_dir.join("revscope-cache.db"))
}
