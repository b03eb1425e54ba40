//! レビュー・アプリのデータモデル
//!
//! レビューソースから取得した生レビューと、抽出器が付与した派生フィールドを保持する。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::analytics::aggregator::{ReviewAnalytics, ReviewIntelligence};

/// レビューソースから取得したレビュー（取得後は不変）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    pub id: String,
    /// 星評価（1〜5）
    pub rating: u8,
    pub text: String,
    pub date: DateTime<Utc>,
    /// 開発者からの返信
    #[serde(default, alias = "replyText", skip_serializing_if = "Option::is_none")]
    pub reply_text: Option<String>,
}

impl Review {
    pub fn new(id: impl Into<String>, rating: u8, text: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            rating,
            text: text.into(),
            date,
            reply_text: None,
        }
    }

    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply_text = Some(reply.into());
        self
    }
}

/// 全体感情ラベル
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    #[display("positive")]
    Positive,
    #[display("neutral")]
    Neutral,
    #[display("negative")]
    Negative,
}

impl SentimentLabel {
    /// {-1, 0, +1} への写像
    pub fn score(self) -> f64 {
        match self {
            SentimentLabel::Positive => 1.0,
            SentimentLabel::Neutral => 0.0,
            SentimentLabel::Negative => -1.0,
        }
    }

    /// バンド番号（negative=-1, neutral=0, positive=1）
    pub(crate) fn band(self) -> i8 {
        match self {
            SentimentLabel::Positive => 1,
            SentimentLabel::Neutral => 0,
            SentimentLabel::Negative => -1,
        }
    }

    pub(crate) fn from_band(band: i8) -> Self {
        match band.clamp(-1, 1) {
            1 => SentimentLabel::Positive,
            -1 => SentimentLabel::Negative,
            _ => SentimentLabel::Neutral,
        }
    }

    /// 星評価から事前ラベルを決定
    pub fn from_rating(rating: u8) -> Self {
        match rating {
            0..=2 => SentimentLabel::Negative,
            3 => SentimentLabel::Neutral,
            _ => SentimentLabel::Positive,
        }
    }
}

/// ビジネスインパクト（星評価のみから決定）
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum BusinessImpact {
    #[display("high")]
    High,
    #[display("medium")]
    Medium,
    #[display("low")]
    Low,
}

impl BusinessImpact {
    pub fn from_rating(rating: u8) -> Self {
        match rating {
            0..=2 => BusinessImpact::High,
            3 => BusinessImpact::Medium,
            _ => BusinessImpact::Low,
        }
    }
}

/// 評価観点（固定集合）
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Aspect {
    #[display("ui_ux")]
    UiUx,
    #[display("performance")]
    Performance,
    #[display("features")]
    Features,
    #[display("pricing")]
    Pricing,
    #[display("support")]
    Support,
}

impl Aspect {
    pub const ALL: [Aspect; 5] = [
        Aspect::UiUx,
        Aspect::Performance,
        Aspect::Features,
        Aspect::Pricing,
        Aspect::Support,
    ];
}

impl std::str::FromStr for Aspect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Aspect::ALL
            .into_iter()
            .find(|aspect| aspect.to_string() == s)
            .ok_or_else(|| format!("unknown aspect: {}", s))
    }
}

/// 抽出器の解析結果が付与されたレビュー
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyzedReview {
    #[serde(flatten)]
    pub review: Review,
    pub sentiment_overall: SentimentLabel,
    /// テキストのみから算出した語彙スコア（-1.0 to 1.0）
    pub text_score: f64,
    /// 感情名 → 強度（0.0 to 1.0）
    pub emotions: BTreeMap<String, f64>,
    pub aspect_sentiment: BTreeMap<Aspect, SentimentLabel>,
    pub themes: BTreeSet<String>,
    pub mentioned_features: BTreeSet<String>,
    pub issues: BTreeSet<String>,
    pub business_impact: BusinessImpact,
}

/// アプリのメタデータ（比較リクエストで呼び出し元が渡す）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppMeta {
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review_count: u64,
}

impl AppMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// メタデータ未指定の競合アプリ用（アプリIDを名前に使う）
    pub fn placeholder(app_id: &str) -> Self {
        Self::new(app_id)
    }
}

/// 比較対象アプリ1件分のプロファイル（主アプリにも同じ型を使う）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompetitorApp {
    pub app_id: String,
    pub app_name: String,
    pub app_icon: String,
    pub rating: f64,
    pub review_count: u64,
    /// JSONエクスポートでは省略される場合がある
    #[serde(default)]
    pub reviews: Vec<AnalyzedReview>,
    pub intelligence: ReviewIntelligence,
    pub analytics: ReviewAnalytics,
}

impl CompetitorApp {
    /// 解析済みレビューからプロファイルを構築
    pub fn build(app_id: impl Into<String>, meta: &AppMeta, reviews: Vec<AnalyzedReview>) -> Self {
        let (intelligence, analytics) = crate::analytics::aggregator::aggregate(&reviews);
        Self {
            app_id: app_id.into(),
            app_name: meta.name.clone(),
            app_icon: meta.icon.clone(),
            rating: meta.rating,
            review_count: meta.review_count,
            reviews,
            intelligence,
            analytics,
        }
    }

    /// レビューが1件も無い（取得失敗などで劣化した）プロファイルか
    ///
    /// エクスポートでレビュー本体が省かれていても集計値で判定する。
    pub fn is_degraded(&self) -> bool {
        self.analytics.total_reviews == 0
    }
}
