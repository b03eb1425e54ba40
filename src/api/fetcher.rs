//! ページング取得
//!
//! レビューページを遅延ストリームとして扱い、必要件数に達した時点で打ち切る。

use futures_util::stream::{self, Stream, TryStreamExt};
use std::sync::Arc;

use super::{FetchError, ReviewPage, ReviewSource, FIRST_PAGE};
use crate::models::Review;

/// 既定の最大ページ数
pub const DEFAULT_MAX_PAGES: u32 = 200;

/// レビューソースをページングしてアプリ単位のレビューを集める
#[derive(Clone)]
pub struct ReviewFetcher {
    source: Arc<dyn ReviewSource>,
    max_pages: u32,
}

impl ReviewFetcher {
    pub fn new(source: Arc<dyn ReviewSource>) -> Self {
        Self {
            source,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// 終わらないソース対策のページ上限
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// ページの遅延ストリーム
    ///
    /// `has_more=false`、空ページ、またはページ上限で終了する。
    /// 途中でドロップすれば以降のページは要求しない。
    pub fn pages<'a>(
        &'a self,
        app_id: &'a str,
        locale: &'a str,
    ) -> impl Stream<Item = Result<ReviewPage, FetchError>> + 'a {
        stream::try_unfold(Some((FIRST_PAGE, 0u32)), move |state| async move {
            let Some((page, fetched)) = state else {
                return Ok(None);
            };
            if fetched >= self.max_pages {
                tracing::warn!(
                    "⚠️ Page limit ({}) reached for {}, stopping pagination",
                    self.max_pages,
                    app_id
                );
                return Ok(None);
            }

            let result = self.source.fetch_page(app_id, locale, page).await?;
            tracing::debug!(
                app_id,
                page,
                reviews = result.reviews.len(),
                has_more = result.has_more,
                "📄 Review page received"
            );

            let next = if result.has_more && !result.reviews.is_empty() {
                // nextPage省略時は連番
                let next_page = match result.next_page {
                    0 => page.checked_add(1),
                    n => Some(n),
                };
                let Some(next_page) = next_page.filter(|n| *n > page) else {
                    return Err(FetchError::InvalidPage {
                        app_id: app_id.to_string(),
                        page: result.next_page,
                        reason: format!("next page does not advance past {}", page),
                    });
                };
                Some((next_page, fetched + 1))
            } else {
                None
            };

            Ok::<_, FetchError>(Some((result, next)))
        })
    }

    /// 最大 `max_reviews` 件まで取得（最終ページは切り詰める）
    pub async fn fetch(&self, app_id: &str, locale: &str, max_reviews: usize) -> Result<Vec<Review>, FetchError> {
        let mut reviews = Vec::new();
        if max_reviews == 0 {
            return Ok(reviews);
        }

        let pages = self.pages(app_id, locale);
        futures_util::pin_mut!(pages);

        while let Some(page) = pages.try_next().await? {
            reviews.extend(page.reviews);
            if reviews.len() >= max_reviews {
                reviews.truncate(max_reviews);
                break;
            }
        }

        tracing::debug!(
            "📥 Fetched {} reviews for {} from {}",
            reviews.len(),
            app_id,
            self.source.name()
        );
        Ok(reviews)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// アプリごとにレビュー一覧を持ち、固定サイズでページングするソース
    #[derive(Default)]
    pub struct ScriptedSource {
        pub reviews: HashMap<String, Vec<Review>>,
        pub failing: Vec<String>,
        pub page_size: usize,
        pub requests: Mutex<Vec<(String, u32)>>,
    }

    impl ScriptedSource {
        pub fn new(page_size: usize) -> Self {
            Self {
                page_size,
                ..Default::default()
            }
        }

        pub fn with_app(mut self, app_id: &str, items: &[(u8, &str)]) -> Self {
            let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
            let reviews = items
                .iter()
                .enumerate()
                .map(|(i, (rating, text))| {
                    Review::new(format!("{}-{}", app_id, i), *rating, *text, base + Duration::hours(i as i64))
                })
                .collect();
            self.reviews.insert(app_id.to_string(), reviews);
            self
        }

        pub fn with_failure(mut self, app_id: &str) -> Self {
            self.failing.push(app_id.to_string());
            self
        }

        pub fn request_count(&self, app_id: &str) -> usize {
            self.requests.lock().iter().filter(|(id, _)| id == app_id).count()
        }
    }

    #[async_trait]
    impl ReviewSource for ScriptedSource {
        async fn fetch_page(&self, app_id: &str, _locale: &str, page: u32) -> Result<ReviewPage, FetchError> {
            self.requests.lock().push((app_id.to_string(), page));
            if self.failing.iter().any(|id| id == app_id) {
                return Err(FetchError::source_failed(app_id, "scripted failure"));
            }

            let all = self.reviews.get(app_id).cloned().unwrap_or_default();
            let start = (page - FIRST_PAGE) as usize * self.page_size;
            let end = (start + self.page_size).min(all.len());
            let reviews = if start < all.len() {
                all[start..end].to_vec()
            } else {
                Vec::new()
            };

            Ok(ReviewPage {
                reviews,
                has_more: end < all.len(),
                next_page: page + 1,
            })
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }
}
