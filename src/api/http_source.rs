//! JSON over HTTP のレビューソース
//!
//! `GET {base}/apps/{app_id}/reviews?locale=..&page=..` が `ReviewPage` を返す前提。

use async_trait::async_trait;
use reqwest::{StatusCode, Url};

use super::{FetchError, ReviewPage, ReviewSource};

pub struct HttpReviewSource {
    pub base_url: Url,
    pub http_client: reqwest::Client,
}

impl HttpReviewSource {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let base_url = Url::parse(base_url).map_err(|e| FetchError::source_failed("-", format!("invalid base url {}: {}", base_url, e)))?;
        Ok(Self {
            base_url,
            http_client: reqwest::Client::new(),
        })
    }

    pub fn with_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = http_client;
        self
    }

    /// ページ取得URLを組み立てる（アプリIDはパスセグメントとしてエスケープ）
    pub fn page_url(&self, app_id: &str, locale: &str, page: u32) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::source_failed(app_id, format!("base url cannot have a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["apps", app_id, "reviews"]);
        url.query_pairs_mut()
            .clear()
            .append_pair("locale", locale)
            .append_pair("page", &page.to_string());
        Ok(url)
    }
}

#[async_trait]
impl ReviewSource for HttpReviewSource {
    async fn fetch_page(&self, app_id: &str, locale: &str, page: u32) -> Result<ReviewPage, FetchError> {
        let url = self.page_url(app_id, locale, page)?;
        tracing::debug!("🌐 GET {}", url);

        let response = self
            .http_client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::error!("❌ HTTP request failed: {}", e);
                e
            })?;

        let status = response.status();
        tracing::debug!("📡 Review source response status: {}", status);

        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                app_id: app_id.to_string(),
            });
        }
        if !status.is_success() {
            tracing::error!("❌ Review source returned {} for {}", status, app_id);
            return Err(FetchError::Status {
                app_id: app_id.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let page: ReviewPage = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("❌ Failed to parse review page JSON: {}", e);
            tracing::debug!("🔍 Response text preview: {}", body.chars().take(200).collect::<String>());
            e
        })?;

        Ok(page)
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_url() {
        let source = HttpReviewSource::new("https://reviews.example.com/v1/").unwrap();
        let url = source.page_url("com.example.notes", "en-US", 3).unwrap();
        assert_eq!(
            url.as_str(),
            "https://reviews.example.com/v1/apps/com.example.notes/reviews?locale=en-US&page=3"
        );
    }

    #[test]
    fn test_page_url_escapes_app_id() {
        let source = HttpReviewSource::new("http://localhost:8080").unwrap();
        let url = source.page_url("a/b c", "ja", 1).unwrap();
        assert_eq!(url.path(), "/apps/a%2Fb%20c/reviews");
        assert_eq!(url.query(), Some("locale=ja&page=1"));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(HttpReviewSource::new("not a url").is_err());
        let source = HttpReviewSource::new("mailto:someone@example.com").unwrap();
        assert!(source.page_url("app", "en", 1).is_err());
    }
}
