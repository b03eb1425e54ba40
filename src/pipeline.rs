//! 比較パイプライン
//!
//! キャッシュ確認 → アプリごとの並行取得・解析 → 集計 → 差分 → キャッシュ書き戻し。
//! アプリ単位の失敗は警告として結果に添付し、比較自体は続行する。

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::task::JoinSet;

use crate::analytics::competitive::CompetitiveEngine;
use crate::analytics::report::{CompetitiveIntelligence, SemanticInsights};
use crate::analytics::review_analyzer::{AnalysisError, ReviewAnalyzer};
use crate::analytics::ruleset::Ruleset;
use crate::api::{FetchError, ReviewFetcher, ReviewSource};
use crate::config::{AppConfig, PipelineConfig};
use crate::database::{cache_key, CacheKey, CacheStore};
use crate::models::{AnalyzedReview, AppMeta, CompetitorApp};

fn default_locale() -> String {
    "en".to_string()
}

fn default_max_reviews() -> usize {
    PipelineConfig::default().max_reviews_per_app
}

/// 比較リクエスト
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRequest {
    pub organization_id: String,
    pub primary_app_id: String,
    pub primary_app_meta: AppMeta,
    pub competitor_app_ids: Vec<String>,
    /// `competitor_app_ids` と同じ順序。空ならアプリIDを名前に使う
    #[serde(default)]
    pub competitor_app_meta: Vec<AppMeta>,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_max_reviews")]
    pub max_reviews_per_app: usize,
    #[serde(default)]
    pub force_refresh: bool,
}

/// リクエストの拒否理由（取得開始前に判定する）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComparisonError {
    #[error("At least one competitor app is required")]
    NoCompetitors,

    #[error("Primary app metadata is missing or invalid: {field}")]
    MissingPrimaryMetadata { field: String },

    #[error("Metadata is missing for competitor {app_id}")]
    MissingCompetitorMetadata { app_id: String },
}

/// 検証済みの比較対象（先頭が主アプリ）
#[derive(Debug, Clone)]
struct ResolvedApp {
    app_id: String,
    meta: AppMeta,
}

impl ComparisonRequest {
    pub fn new(
        organization_id: impl Into<String>,
        primary_app_id: impl Into<String>,
        primary_app_meta: AppMeta,
    ) -> Self {
        Self {
            organization_id: organization_id.into(),
            primary_app_id: primary_app_id.into(),
            primary_app_meta,
            competitor_app_ids: Vec::new(),
            competitor_app_meta: Vec::new(),
            locale: default_locale(),
            max_reviews_per_app: default_max_reviews(),
            force_refresh: false,
        }
    }

    pub fn with_competitor(mut self, app_id: impl Into<String>) -> Self {
        self.competitor_app_ids.push(app_id.into());
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_max_reviews(mut self, max_reviews: usize) -> Self {
        self.max_reviews_per_app = max_reviews;
        self
    }

    pub fn with_force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }

    /// キャッシュキー（競合の並び順に依存しない）
    ///
    /// `resolve` と同じ正規化（前後の空白除去・空IDと主アプリの除外）を通したIDから作る。
    pub fn cache_key(&self) -> CacheKey {
        let primary_id = self.primary_app_id.trim();
        let competitors: Vec<&str> = self
            .competitor_app_ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty() && *id != primary_id)
            .collect();
        cache_key(&self.organization_id, primary_id, &competitors, &self.locale)
    }

    /// リクエストを検証
    pub fn validate(&self) -> Result<(), ComparisonError> {
        self.resolve().map(|_| ())
    }

    fn resolve(&self) -> Result<Vec<ResolvedApp>, ComparisonError> {
        let primary_id = self.primary_app_id.trim();
        if primary_id.is_empty() {
            return Err(ComparisonError::MissingPrimaryMetadata {
                field: "app_id".to_string(),
            });
        }
        if self.primary_app_meta.name.trim().is_empty() {
            return Err(ComparisonError::MissingPrimaryMetadata {
                field: "name".to_string(),
            });
        }
        let rating = self.primary_app_meta.rating;
        if !rating.is_finite() || !(0.0..=5.0).contains(&rating) {
            return Err(ComparisonError::MissingPrimaryMetadata {
                field: "rating".to_string(),
            });
        }

        let mut apps = vec![ResolvedApp {
            app_id: primary_id.to_string(),
            meta: self.primary_app_meta.clone(),
        }];
        let mut seen: HashSet<&str> = HashSet::from([primary_id]);

        for (index, raw_id) in self.competitor_app_ids.iter().enumerate() {
            let app_id = raw_id.trim();
            if app_id.is_empty() || !seen.insert(app_id) {
                continue;
            }

            let meta = if self.competitor_app_meta.is_empty() {
                AppMeta::placeholder(app_id)
            } else {
                match self.competitor_app_meta.get(index) {
                    Some(meta) if !meta.name.trim().is_empty() => meta.clone(),
                    _ => {
                        return Err(ComparisonError::MissingCompetitorMetadata {
                            app_id: app_id.to_string(),
                        })
                    }
                }
            };
            apps.push(ResolvedApp {
                app_id: app_id.to_string(),
                meta,
            });
        }

        if apps.len() < 2 {
            return Err(ComparisonError::NoCompetitors);
        }
        Ok(apps)
    }
}

/// 回復済みの失敗（結果に添付される）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_more::Display)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    #[display("reviews for {app_id} could not be fetched: {message}")]
    FetchFailed { app_id: String, message: String },

    #[display("skipped {count} reviews of {app_id}: {first_reason}")]
    ReviewsSkipped {
        app_id: String,
        count: usize,
        first_reason: String,
    },

    #[display("worker for {app_id} did not finish: {message}")]
    TaskFailed { app_id: String, message: String },

    #[display("cache unavailable: {message}")]
    CacheUnavailable { message: String },

    #[display("semantic enrichment failed: {message}")]
    EnrichmentFailed { message: String },
}

impl PipelineWarning {
    /// アプリのレビューが取得できなかった警告か（この結果はキャッシュしない）
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            PipelineWarning::FetchFailed { .. } | PipelineWarning::TaskFailed { .. }
        )
    }
}

/// 比較結果と付帯情報
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonOutcome {
    pub intelligence: CompetitiveIntelligence,
    pub from_cache: bool,
    /// キャッシュヒット時のみ
    pub cache_age_seconds: Option<u64>,
    pub warnings: Vec<PipelineWarning>,
    /// レビューが0件のアプリ
    pub degraded_apps: Vec<String>,
}

/// キャッシュの状態（「4分前のキャッシュ」等の表示用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct CacheStatus {
    pub present: bool,
    pub age_seconds: Option<u64>,
    pub fresh: bool,
}

/// 差分結果に自然言語サマリーを付与する外部処理
#[async_trait]
pub trait InsightEnricher: Send + Sync {
    async fn enrich(&self, report: &CompetitiveIntelligence) -> anyhow::Result<SemanticInsights>;
}

/// アプリ1件分のワーカー結果
struct AppResult {
    index: usize,
    reviews: Vec<AnalyzedReview>,
    fetch_error: Option<FetchError>,
    skipped: Vec<AnalysisError>,
}

/// 競合比較サービス
pub struct CompetitiveAnalysisService {
    fetcher: ReviewFetcher,
    analyzer: Arc<ReviewAnalyzer>,
    engine: CompetitiveEngine,
    cache: Arc<dyn CacheStore>,
    freshness_window: chrono::Duration,
    enricher: Option<Arc<dyn InsightEnricher>>,
}

impl CompetitiveAnalysisService {
    pub fn new(
        fetcher: ReviewFetcher,
        analyzer: ReviewAnalyzer,
        engine: CompetitiveEngine,
        cache: Arc<dyn CacheStore>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            fetcher,
            analyzer: Arc::new(analyzer),
            engine,
            cache,
            freshness_window: config.freshness_window(),
            enricher: None,
        }
    }

    /// アプリ設定から構築（ルールセットの読み込みを含む）
    pub fn from_config(
        source: Arc<dyn ReviewSource>,
        cache: Arc<dyn CacheStore>,
        config: &AppConfig,
    ) -> anyhow::Result<Self> {
        let ruleset = Ruleset::load_or_default(config.ruleset_path.as_deref())?;
        let fetcher = ReviewFetcher::new(source).with_max_pages(config.pipeline.max_pages);
        Ok(Self::new(
            fetcher,
            ReviewAnalyzer::new(ruleset),
            CompetitiveEngine::new(config.thresholds.clone()),
            cache,
            &config.pipeline,
        ))
    }

    pub fn with_enricher(mut self, enricher: Arc<dyn InsightEnricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn freshness_window(&self) -> chrono::Duration {
        self.freshness_window
    }

    /// リクエストに対応するキャッシュの状態
    pub fn check_cache(&self, request: &ComparisonRequest) -> CacheStatus {
        self.check_cache_key(&request.cache_key())
    }

    /// キーに対応するキャッシュの状態（ストア障害は「なし」扱い）
    pub fn check_cache_key(&self, key: &CacheKey) -> CacheStatus {
        match self.cache.get(key) {
            Ok(Some(entry)) => {
                let now = Utc::now();
                CacheStatus {
                    present: true,
                    age_seconds: Some(entry.age_seconds(now)),
                    fresh: entry.is_fresh(now, self.freshness_window),
                }
            }
            Ok(None) => CacheStatus::default(),
            Err(e) => {
                tracing::warn!("⚠️ Cache lookup failed for {}: {}", key, e);
                CacheStatus::default()
            }
        }
    }

    /// 比較を実行
    pub async fn run(&self, request: &ComparisonRequest) -> Result<ComparisonOutcome, ComparisonError> {
        let apps = request.resolve().map_err(|e| {
            tracing::error!("❌ Comparison request rejected: {}", e);
            e
        })?;

        let key = request.cache_key();
        let mut warnings = Vec::new();

        if request.force_refresh {
            match self.cache.delete(&key) {
                Ok(deleted) => tracing::debug!("🔄 Force refresh for {} (cached entry removed: {})", key, deleted),
                Err(e) => {
                    tracing::warn!("⚠️ Failed to delete cache entry {}: {}", key, e);
                    warnings.push(PipelineWarning::CacheUnavailable { message: e.to_string() });
                }
            }
        } else {
            match self.cache.get(&key) {
                Ok(Some(entry)) => {
                    let now = Utc::now();
                    if entry.is_fresh(now, self.freshness_window) {
                        let age = entry.age_seconds(now);
                        tracing::info!("📦 Serving comparison {} from cache ({}s old)", key, age);
                        let degraded_apps = entry.payload.degraded_apps();
                        return Ok(ComparisonOutcome {
                            intelligence: entry.payload,
                            from_cache: true,
                            cache_age_seconds: Some(age),
                            warnings,
                            degraded_apps,
                        });
                    }
                    tracing::debug!("⌛ Cached comparison {} is stale, recomputing", key);
                }
                Ok(None) => tracing::debug!("🗃️ No cached comparison for {}", key),
                Err(e) => {
                    tracing::warn!("⚠️ Cache unavailable, recomputing {}: {}", key, e);
                    warnings.push(PipelineWarning::CacheUnavailable { message: e.to_string() });
                }
            }
        }

        let started = Instant::now();
        tracing::info!(
            primary = %apps[0].app_id,
            competitors = apps.len() - 1,
            locale = %request.locale,
            "🚀 Starting competitive comparison"
        );

        let profiles = self.collect_profiles(&apps, request, &mut warnings).await;
        let mut profiles = profiles.into_iter();
        let Some(primary) = profiles.next() else {
            return Err(ComparisonError::NoCompetitors);
        };
        let competitors: Vec<CompetitorApp> = profiles.collect();

        let mut intelligence = self.engine.compare(&primary, &competitors);

        if let Some(enricher) = &self.enricher {
            match enricher.enrich(&intelligence).await {
                Ok(insights) => intelligence.semantic_insights = Some(insights),
                Err(e) => {
                    tracing::warn!("⚠️ Semantic enrichment failed: {}", e);
                    warnings.push(PipelineWarning::EnrichmentFailed { message: e.to_string() });
                }
            }
        }

        let duration_ms = started.elapsed().as_millis().min(u64::MAX as u128) as u64;
        if warnings.iter().any(PipelineWarning::is_fetch_failure) {
            tracing::info!("⏭️ Not caching comparison {}: some apps could not be fetched", key);
        } else if let Err(e) = self.cache.put(&key, &intelligence, duration_ms) {
            tracing::warn!("⚠️ Failed to cache comparison {}: {}", key, e);
            warnings.push(PipelineWarning::CacheUnavailable { message: e.to_string() });
        }

        let degraded_apps = intelligence.degraded_apps();
        tracing::info!(
            duration_ms,
            warnings = warnings.len(),
            degraded = degraded_apps.len(),
            "✅ Comparison {} completed",
            key
        );

        Ok(ComparisonOutcome {
            intelligence,
            from_cache: false,
            cache_age_seconds: None,
            warnings,
            degraded_apps,
        })
    }

    /// 全アプリを並行に取得・解析し、リクエスト順のプロファイルを返す
    async fn collect_profiles(
        &self,
        apps: &[ResolvedApp],
        request: &ComparisonRequest,
        warnings: &mut Vec<PipelineWarning>,
    ) -> Vec<CompetitorApp> {
        let mut tasks = JoinSet::new();
        for (index, app) in apps.iter().enumerate() {
            let fetcher = self.fetcher.clone();
            let analyzer = self.analyzer.clone();
            let app_id = app.app_id.clone();
            let locale = request.locale.clone();
            let max_reviews = request.max_reviews_per_app;

            tasks.spawn(async move {
                let (reviews, fetch_error) = match fetcher.fetch(&app_id, &locale, max_reviews).await {
                    Ok(reviews) => (reviews, None),
                    Err(e) => (Vec::new(), Some(e)),
                };

                let mut analyzed = Vec::with_capacity(reviews.len());
                let mut skipped = Vec::new();
                for review in &reviews {
                    match analyzer.analyze(review) {
                        Ok(result) => analyzed.push(result),
                        Err(e) => skipped.push(e),
                    }
                }

                AppResult {
                    index,
                    reviews: analyzed,
                    fetch_error,
                    skipped,
                }
            });
        }

        let mut slots: Vec<Option<Vec<AnalyzedReview>>> = vec![None; apps.len()];
        while let Some(joined) = tasks.join_next().await {
            let result = match joined {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!("❌ Review worker failed: {}", e);
                    continue;
                }
            };
            let app_id = &apps[result.index].app_id;

            if let Some(e) = result.fetch_error {
                tracing::warn!("⚠️ Fetch failed for {}, continuing with no reviews: {}", app_id, e);
                warnings.push(PipelineWarning::FetchFailed {
                    app_id: app_id.clone(),
                    message: e.to_string(),
                });
            }
            if let Some(first) = result.skipped.first() {
                tracing::warn!("⚠️ Skipped {} unreadable reviews for {}", result.skipped.len(), app_id);
                warnings.push(PipelineWarning::ReviewsSkipped {
                    app_id: app_id.clone(),
                    count: result.skipped.len(),
                    first_reason: first.to_string(),
                });
            }
            tracing::debug!("🔍 Analyzed {} reviews for {}", result.reviews.len(), app_id);
            slots[result.index] = Some(result.reviews);
        }

        apps.iter()
            .zip(slots)
            .map(|(app, slot)| {
                let reviews = slot.unwrap_or_else(|| {
                    warnings.push(PipelineWarning::TaskFailed {
                        app_id: app.app_id.clone(),
                        message: "worker aborted before returning reviews".to_string(),
                    });
                    Vec::new()
                });
                CompetitorApp::build(app.app_id.clone(), &app.meta, reviews)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fetcher::test_support::ScriptedSource;
    use crate::database::MemoryCacheStore;

    fn request() -> ComparisonRequest {
        ComparisonRequest::new("org", "com.example.notes", AppMeta::new("Notes"))
            .with_competitor("com.rival.one")
            .with_competitor("com.rival.two")
    }

    fn service(source: ScriptedSource, cache: Arc<MemoryCacheStore>) -> CompetitiveAnalysisService {
        CompetitiveAnalysisService::new(
            ReviewFetcher::new(Arc::new(source)),
            ReviewAnalyzer::default(),
            CompetitiveEngine::default(),
            cache,
            &PipelineConfig::default(),
        )
    }

    fn reviews(rating: u8, text: &'static str, n: usize) -> Vec<(u8, &'static str)> {
        vec![(rating, text); n]
    }

    #[test]
    fn test_validate_rejects_missing_competitors() {
        let request = ComparisonRequest::new("org", "p", AppMeta::new("P"));
        assert_eq!(request.validate(), Err(ComparisonError::NoCompetitors));

        // 主アプリ自身や空IDは競合に数えない
        let request = request.with_competitor("p").with_competitor("  ");
        assert_eq!(request.validate(), Err(ComparisonError::NoCompetitors));
    }

    #[test]
    fn test_validate_primary_metadata() {
        let request = ComparisonRequest::new("org", "p", AppMeta::new("")).with_competitor("c");
        assert_eq!(
            request.validate(),
            Err(ComparisonError::MissingPrimaryMetadata {
                field: "name".to_string()
            })
        );

        let mut meta = AppMeta::new("P");
        meta.rating = f64::NAN;
        let request = ComparisonRequest::new("org", "p", meta).with_competitor("c");
        assert!(matches!(
            request.validate(),
            Err(ComparisonError::MissingPrimaryMetadata { field }) if field == "rating"
        ));
    }

    #[test]
    fn test_validate_competitor_metadata_alignment() {
        let mut request = request();
        request.competitor_app_meta = vec![AppMeta::new("Rival One")];
        assert_eq!(
            request.validate(),
            Err(ComparisonError::MissingCompetitorMetadata {
                app_id: "com.rival.two".to_string()
            })
        );

        request.competitor_app_meta.push(AppMeta::new("Rival Two"));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_resolve_dedups_competitors() {
        let request = request().with_competitor("com.rival.one");
        let apps = request.resolve().unwrap();
        assert_eq!(apps.len(), 3);
        assert_eq!(apps[2].meta.name, "com.rival.two");
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let json = r#"{
            "organizationId": "org",
            "primaryAppId": "p",
            "primaryAppMeta": {"name": "P"},
            "competitorAppIds": ["c"]
        }"#;
        let request: ComparisonRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.locale, "en");
        assert_eq!(request.max_reviews_per_app, 500);
        assert!(!request.force_refresh);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_isolated() {
        let source = ScriptedSource::new(10)
            .with_app("com.example.notes", &reviews(5, "great app", 20))
            .with_app("com.rival.one", &reviews(2, "slow and laggy", 20))
            .with_failure("com.rival.two");
        let cache = Arc::new(MemoryCacheStore::new());

        let outcome = service(source, cache.clone()).run(&request()).await.unwrap();
        assert!(!outcome.from_cache);
        assert_eq!(outcome.degraded_apps, vec!["com.rival.two".to_string()]);
        assert!(outcome.warnings.iter().any(|w| matches!(
            w,
            PipelineWarning::FetchFailed { app_id, .. } if app_id == "com.rival.two"
        )));
        assert_eq!(outcome.intelligence.competitors.len(), 2);
        assert_eq!(outcome.intelligence.competitors[1].reviews.len(), 0);
        // 取得失敗を含む結果はキャッシュしない
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_key_uses_normalized_competitors() {
        let plain = ComparisonRequest::new("org", "p", AppMeta::new("P")).with_competitor("c");
        let noisy = ComparisonRequest::new("org", "p", AppMeta::new("P"))
            .with_competitor(" c")
            .with_competitor("p")
            .with_competitor("c ");
        assert_eq!(plain.cache_key(), noisy.cache_key());

        let other = ComparisonRequest::new("org", "p", AppMeta::new("P")).with_competitor("d");
        assert_ne!(plain.cache_key(), other.cache_key());
    }

    #[tokio::test]
    async fn test_invalid_reviews_are_skipped() {
        let source = ScriptedSource::new(10)
            .with_app("com.example.notes", &[(5, "great"), (9, "broken rating"), (4, "good")])
            .with_app("com.rival.one", &reviews(3, "okay", 3))
            .with_app("com.rival.two", &reviews(3, "okay", 3));
        let cache = Arc::new(MemoryCacheStore::new());

        let outcome = service(source, cache).run(&request()).await.unwrap();
        assert_eq!(outcome.intelligence.primary_app.reviews.len(), 2);
        assert!(outcome.warnings.iter().any(|w| matches!(
            w,
            PipelineWarning::ReviewsSkipped { count: 1, .. }
        )));
    }

    #[tokio::test]
    async fn test_second_run_is_served_from_cache() {
        let source = ScriptedSource::new(10)
            .with_app("com.example.notes", &reviews(5, "great", 5))
            .with_app("com.rival.one", &reviews(2, "bad", 5))
            .with_app("com.rival.two", &reviews(3, "okay", 5));
        let cache = Arc::new(MemoryCacheStore::new());
        let service = service(source, cache);

        let first = service.run(&request()).await.unwrap();
        let second = service.run(&request()).await.unwrap();
        assert!(second.from_cache);
        assert!(second.cache_age_seconds.is_some());
        assert_eq!(second.intelligence, first.intelligence);

        let status = service.check_cache(&request());
        assert!(status.present);
        assert!(status.fresh);
    }

    #[tokio::test]
    async fn test_rejected_request_fetches_nothing() {
        let source = Arc::new(ScriptedSource::new(10));
        let service = CompetitiveAnalysisService::new(
            ReviewFetcher::new(source.clone()),
            ReviewAnalyzer::default(),
            CompetitiveEngine::default(),
            Arc::new(MemoryCacheStore::new()),
            &PipelineConfig::default(),
        );

        let request = ComparisonRequest::new("org", "p", AppMeta::new("P"));
        assert_eq!(service.run(&request).await.unwrap_err(), ComparisonError::NoCompetitors);
        assert_eq!(source.request_count("p"), 0);
    }

    struct FixedEnricher;

    #[async_trait]
    impl InsightEnricher for FixedEnricher {
        async fn enrich(&self, report: &CompetitiveIntelligence) -> anyhow::Result<SemanticInsights> {
            Ok(SemanticInsights {
                narrative: format!("{} is {}", report.primary_app.app_name, report.summary.overall_position),
                recommendations: vec![report.summary.top_priority.clone()],
            })
        }
    }

    struct FailingEnricher;

    #[async_trait]
    impl InsightEnricher for FailingEnricher {
        async fn enrich(&self, _report: &CompetitiveIntelligence) -> anyhow::Result<SemanticInsights> {
            anyhow::bail!("model offline")
        }
    }

    #[tokio::test]
    async fn test_enricher_output_is_attached() {
        let source = ScriptedSource::new(10)
            .with_app("com.example.notes", &reviews(5, "great", 5))
            .with_app("com.rival.one", &reviews(2, "bad", 5))
            .with_app("com.rival.two", &reviews(2, "bad", 5));
        let service = service(source, Arc::new(MemoryCacheStore::new())).with_enricher(Arc::new(FixedEnricher));

        let outcome = service.run(&request()).await.unwrap();
        let insights = outcome.intelligence.semantic_insights.unwrap();
        assert!(insights.narrative.starts_with("Notes is"));
    }

    #[tokio::test]
    async fn test_enricher_failure_is_a_warning() {
        let source = ScriptedSource::new(10)
            .with_app("com.example.notes", &reviews(5, "great", 5))
            .with_app("com.rival.one", &reviews(2, "bad", 5))
            .with_app("com.rival.two", &reviews(2, "bad", 5));
        let service = service(source, Arc::new(MemoryCacheStore::new())).with_enricher(Arc::new(FailingEnricher));

        let outcome = service.run(&request()).await.unwrap();
        assert!(outcome.intelligence.semantic_insights.is_none());
        assert!(outcome
            .warnings
            .iter()
            .any(|w| matches!(w, PipelineWarning::EnrichmentFailed { .. })));
    }
}
