pub mod analytics;
pub mod api;
pub mod config;
pub mod database;
pub mod io;
pub mod models;
pub mod pipeline;
pub mod utils;
pub mod view_state;

// Re-export the main error types for convenience
pub use analytics::export::ExportError;
pub use analytics::review_analyzer::AnalysisError;
pub use api::FetchError;
pub use database::CacheError;
pub use io::ReviewFileError;
pub use pipeline::ComparisonError;

// Re-export the pipeline entry points
pub use pipeline::{
    CacheStatus, ComparisonOutcome, ComparisonRequest, CompetitiveAnalysisService, InsightEnricher,
    PipelineWarning,
};

// Re-export analytics types
pub use analytics::{CompetitiveEngine, CompetitiveIntelligence, ReviewAnalyzer, Ruleset};

// Re-export review sources
pub use api::{HttpReviewSource, ReviewFetcher, ReviewPage, ReviewSource};
pub use io::FileReviewSource;

// Re-export cache stores
pub use database::{cache_key, CacheKey, CacheStore, MemoryCacheStore, SqliteCacheStore};

pub use models::{AnalyzedReview, AppMeta, CompetitorApp, Review};
pub use view_state::{ReportView, ViewState};
