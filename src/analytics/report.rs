//! 競合インテリジェンスレポートのデータ構造
//!
//! 差分エンジンが生成し、返却後は不変。新しい実行結果で置き換えるのみ。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::CompetitorApp;

/// 3段階レベル（需要・悪用可能性・信頼度で共通）
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    #[display("high")]
    High,
    #[display("medium")]
    Medium,
    #[display("low")]
    Low,
}

impl Level {
    /// 優先度スコア用の重み
    pub fn weight(self) -> f64 {
        match self {
            Level::High => 3.0,
            Level::Medium => 2.0,
            Level::Low => 1.0,
        }
    }
}

impl std::str::FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Level::High),
            "medium" => Ok(Level::Medium),
            "low" => Ok(Level::Low),
            other => Err(format!("unknown level: {}", other)),
        }
    }
}

/// 脅威の勢い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum Momentum {
    #[display("rising")]
    Rising,
    #[display("stable")]
    Stable,
    #[display("declining")]
    Declining,
}

impl std::str::FromStr for Momentum {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rising" => Ok(Momentum::Rising),
            "stable" => Ok(Momentum::Stable),
            "declining" => Ok(Momentum::Declining),
            other => Err(format!("unknown momentum: {}", other)),
        }
    }
}

/// 総合ポジション
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum OverallPosition {
    #[display("leading")]
    Leading,
    #[display("competitive")]
    Competitive,
    #[display("lagging")]
    Lagging,
}

/// ベンチマーク指標の種類
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkKind {
    #[display("avg_rating")]
    AvgRating,
    #[display("positive_sentiment")]
    PositiveSentiment,
    #[display("issue_frequency")]
    IssueFrequency,
    #[display("review_volume")]
    ReviewVolume,
}

impl BenchmarkKind {
    pub const ALL: [BenchmarkKind; 4] = [
        BenchmarkKind::AvgRating,
        BenchmarkKind::PositiveSentiment,
        BenchmarkKind::IssueFrequency,
        BenchmarkKind::ReviewVolume,
    ];

    /// 値が小さいほど良い指標か
    pub fn lower_is_better(self) -> bool {
        matches!(self, BenchmarkKind::IssueFrequency)
    }

    /// 総合ポジション判定に使う品質指標か（件数は品質ではない）
    pub fn is_quality_metric(self) -> bool {
        !matches!(self, BenchmarkKind::ReviewVolume)
    }
}

impl std::str::FromStr for BenchmarkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BenchmarkKind::ALL
            .into_iter()
            .find(|kind| kind.to_string() == s)
            .ok_or_else(|| format!("unknown benchmark: {}", s))
    }
}

/// 競合1件分の指標値
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompetitorValue {
    pub app_id: String,
    pub app_name: String,
    pub value: f64,
}

/// ベンチマーク1指標
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Benchmark {
    pub yours: f64,
    /// レビューのある競合の平均
    pub average: f64,
    pub competitors: Vec<CompetitorValue>,
    /// (yours - average) / average × 100（average=0は±999の番兵値）
    pub delta_percent: f64,
}

/// ベンチマーク一式
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BenchmarkMetrics {
    pub avg_rating: Benchmark,
    pub positive_sentiment: Benchmark,
    pub issue_frequency: Benchmark,
    pub review_volume: Benchmark,
}

impl BenchmarkMetrics {
    pub fn get(&self, kind: BenchmarkKind) -> &Benchmark {
        match kind {
            BenchmarkKind::AvgRating => &self.avg_rating,
            BenchmarkKind::PositiveSentiment => &self.positive_sentiment,
            BenchmarkKind::IssueFrequency => &self.issue_frequency,
            BenchmarkKind::ReviewVolume => &self.review_volume,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (BenchmarkKind, &Benchmark)> {
        BenchmarkKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }
}

/// 機能ギャップ
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureGap {
    pub feature: String,
    pub mentioned_in_competitors: Vec<String>,
    /// `mentioned_in_competitors` と同じ順序のアプリID
    #[serde(default)]
    pub mentioned_in_competitor_ids: Vec<String>,
    /// 競合全体での合計頻度
    pub frequency: usize,
    pub competitor_sentiment: f64,
    pub user_demand: Level,
    pub examples: Vec<String>,
}

/// 競合の弱点を突く機会
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Opportunity {
    pub competitor: String,
    #[serde(default)]
    pub competitor_id: String,
    /// 対象のテーマ／問題ラベル
    pub topic: String,
    pub description: String,
    pub frequency: usize,
    pub sentiment: f64,
    pub exploitability: Level,
    pub recommendation: String,
}

/// 守るべき強み
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Strength {
    pub aspect: String,
    pub your_sentiment: f64,
    pub competitor_avg_sentiment: f64,
    pub difference: f64,
    pub confidence: Level,
    pub evidence: Vec<String>,
}

/// 迫っている脅威
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Threat {
    pub competitor: String,
    #[serde(default)]
    pub competitor_id: String,
    pub feature: String,
    pub frequency: usize,
    /// 競合レビュー中の言及率（0.0 to 1.0）
    pub user_demand: f64,
    pub sentiment: f64,
    pub momentum: Momentum,
    pub recommendation: String,
}

/// エグゼクティブサマリー
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutiveSummary {
    pub overall_position: OverallPosition,
    pub key_insight: String,
    pub top_priority: String,
    /// 0.0 to 1.0
    pub confidence_score: f64,
}

/// 外部エンリッチャーが付与する自然言語サマリー
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SemanticInsights {
    pub narrative: String,
    pub recommendations: Vec<String>,
}

/// 競合インテリジェンスレポート
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompetitiveIntelligence {
    pub primary_app: CompetitorApp,
    pub competitors: Vec<CompetitorApp>,
    pub metrics: BenchmarkMetrics,
    pub feature_gaps: Vec<FeatureGap>,
    pub opportunities: Vec<Opportunity>,
    pub strengths: Vec<Strength>,
    pub threats: Vec<Threat>,
    pub summary: ExecutiveSummary,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_insights: Option<SemanticInsights>,
}

impl CompetitiveIntelligence {
    /// レビューが取得できなかったアプリのID
    pub fn degraded_apps(&self) -> Vec<String> {
        std::iter::once(&self.primary_app)
            .chain(self.competitors.iter())
            .filter(|app| app.is_degraded())
            .map(|app| app.app_id.clone())
            .collect()
    }

    /// 比較セット全体のレビュー数
    pub fn total_reviews(&self) -> usize {
        std::iter::once(&self.primary_app)
            .chain(self.competitors.iter())
            .map(|app| app.reviews.len())
            .sum()
    }
}
