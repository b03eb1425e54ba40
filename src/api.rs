//! レビューソースとの境界
//!
//! ソースは `fetch_page(app_id, locale, page)` でページ単位にレビューを返す。
//! HTTPクライアントやファイルなど実装は差し替え可能。

pub mod fetcher; // ページング取得
pub mod http_source; // JSON over HTTP のレビューソース

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Review;

pub use fetcher::ReviewFetcher;
pub use http_source::HttpReviewSource;

/// 最初のページ番号
pub const FIRST_PAGE: u32 = 1;

/// レビュー取得エラー（アプリ単位で回復される）
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Review source failed for {app_id}: {message}")]
    Source { app_id: String, message: String },

    #[error("No reviews available for {app_id}")]
    NotFound { app_id: String },

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} while fetching {app_id}")]
    Status { app_id: String, status: u16 },

    #[error("Failed to decode review page: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid page {page} for {app_id}: {reason}")]
    InvalidPage {
        app_id: String,
        page: u32,
        reason: String,
    },
}

impl FetchError {
    pub fn source_failed(app_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Source {
            app_id: app_id.into(),
            message: message.into(),
        }
    }
}

/// レビューソースが返す1ページ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPage {
    pub reviews: Vec<Review>,
    pub has_more: bool,
    #[serde(default)]
    pub next_page: u32,
}

/// ページ単位でレビューを返すソース
#[async_trait]
pub trait ReviewSource: Send + Sync {
    async fn fetch_page(&self, app_id: &str, locale: &str, page: u32) -> Result<ReviewPage, FetchError>;

    /// ログ用の名前
    fn name(&self) -> &str {
        "review-source"
    }
}
