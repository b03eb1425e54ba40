//! アプリ単位の集計
//!
//! レビュー単位のシグナルを `ReviewIntelligence` と `ReviewAnalytics` にまとめる。

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::models::{AnalyzedReview, Aspect, BusinessImpact};

/// critical判定: 高インパクトとの共起率
const CRITICAL_SHARE: f64 = 0.5;
/// major判定: 高インパクトとの共起率
const MAJOR_SHARE: f64 = 0.2;

/// テーマ統計
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThemeStat {
    pub theme: String,
    /// このテーマを含むレビュー数
    pub frequency: usize,
    /// 平均感情（-1.0 to 1.0）
    pub sentiment: f64,
}

/// 問題の深刻度
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    #[display("critical")]
    Critical,
    #[display("major")]
    Major,
    #[display("minor")]
    Minor,
}

/// 問題パターン
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IssuePattern {
    pub issue: String,
    pub frequency: usize,
    pub severity: IssueSeverity,
    /// 問題を含むレビューの平均感情
    pub sentiment: f64,
}

/// 観点別スコア
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct AspectScore {
    /// 平均感情（-1.0 to 1.0）
    pub sentiment: f64,
    /// 言及したレビュー数
    pub mentions: usize,
    /// 肯定的に言及したレビュー数
    #[serde(default)]
    pub positive_mentions: usize,
}

/// アプリ1件分のレビューインテリジェンス
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ReviewIntelligence {
    /// 頻度降順
    pub themes: Vec<ThemeStat>,
    pub issue_patterns: Vec<IssuePattern>,
    /// 頻度降順
    pub feature_mentions: Vec<ThemeStat>,
    pub aspect_scores: BTreeMap<Aspect, AspectScore>,
    /// 感情名 → 平均強度
    pub emotion_profile: BTreeMap<String, f64>,
}

impl ReviewIntelligence {
    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
            && self.issue_patterns.is_empty()
            && self.feature_mentions.is_empty()
            && self.aspect_scores.is_empty()
    }

    /// テーマまたは機能言及として現れる頻度
    pub fn topic_frequency(&self, topic: &str) -> usize {
        self.themes
            .iter()
            .chain(self.feature_mentions.iter())
            .filter(|stat| stat.theme == topic)
            .map(|stat| stat.frequency)
            .max()
            .unwrap_or(0)
    }
}

/// 感情分布（パーセント、合計100）
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SentimentDistribution {
    pub positive: u32,
    pub neutral: u32,
    pub negative: u32,
}

impl SentimentDistribution {
    pub fn total(&self) -> u32 {
        self.positive + self.neutral + self.negative
    }
}

/// アプリ1件分の分析サマリー
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ReviewAnalytics {
    pub total_reviews: usize,
    pub average_rating: f64,
    pub sentiment_distribution: SentimentDistribution,
    /// criticalに分類された問題の種類数
    pub critical_issues: usize,
    /// 1件以上の問題を含むレビューの割合（%）
    pub issue_frequency: f64,
    /// 開発者返信のあるレビューの割合（%）
    pub response_rate: f64,
    /// 星1〜5の件数
    pub rating_distribution: [usize; 5],
}

#[derive(Default)]
struct LabelAccumulator {
    frequency: usize,
    sentiment_sum: f64,
    high_impact: usize,
}

impl LabelAccumulator {
    fn add(&mut self, review: &AnalyzedReview) {
        self.frequency += 1;
        self.sentiment_sum += review.sentiment_overall.score();
        if review.business_impact == BusinessImpact::High {
            self.high_impact += 1;
        }
    }

    fn mean_sentiment(&self) -> f64 {
        if self.frequency == 0 {
            0.0
        } else {
            self.sentiment_sum / self.frequency as f64
        }
    }
}

/// 解析済みレビュー群を集計
pub fn aggregate(reviews: &[AnalyzedReview]) -> (ReviewIntelligence, ReviewAnalytics) {
    let intelligence = ReviewIntelligence {
        themes: rank_labels(reviews, |r| r.themes.iter()),
        issue_patterns: issue_patterns(reviews),
        feature_mentions: rank_labels(reviews, |r| r.mentioned_features.iter()),
        aspect_scores: aspect_scores(reviews),
        emotion_profile: emotion_profile(reviews),
    };
    let analytics = analytics(reviews, &intelligence);

    tracing::debug!(
        reviews = reviews.len(),
        themes = intelligence.themes.len(),
        issues = intelligence.issue_patterns.len(),
        critical_issues = analytics.critical_issues,
        "📊 Review profile aggregated"
    );

    (intelligence, analytics)
}

fn accumulate<'a, F, I>(reviews: &'a [AnalyzedReview], labels_of: F) -> HashMap<&'a str, LabelAccumulator>
where
    F: Fn(&'a AnalyzedReview) -> I,
    I: Iterator<Item = &'a String>,
{
    let mut acc: HashMap<&str, LabelAccumulator> = HashMap::new();
    for review in reviews {
        for label in labels_of(review) {
            acc.entry(label.as_str()).or_default().add(review);
        }
    }
    acc
}

/// 頻度降順・同数なら感情の絶対値降順・ラベル昇順
fn rank_labels<'a, F, I>(reviews: &'a [AnalyzedReview], labels_of: F) -> Vec<ThemeStat>
where
    F: Fn(&'a AnalyzedReview) -> I,
    I: Iterator<Item = &'a String>,
{
    let mut stats: Vec<ThemeStat> = accumulate(reviews, labels_of)
        .into_iter()
        .map(|(label, acc)| ThemeStat {
            theme: label.to_string(),
            frequency: acc.frequency,
            sentiment: acc.mean_sentiment(),
        })
        .collect();

    stats.sort_by(|a, b| {
        b.frequency
            .cmp(&a.frequency)
            .then_with(|| {
                b.sentiment
                    .abs()
                    .partial_cmp(&a.sentiment.abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.theme.cmp(&b.theme))
    });
    stats
}

/// 高インパクトとの共起率から深刻度を分類
pub fn classify_severity(frequency: usize, high_impact: usize) -> IssueSeverity {
    if frequency == 0 {
        return IssueSeverity::Minor;
    }
    let share = high_impact as f64 / frequency as f64;
    if share >= CRITICAL_SHARE {
        IssueSeverity::Critical
    } else if share >= MAJOR_SHARE {
        IssueSeverity::Major
    } else {
        IssueSeverity::Minor
    }
}

fn issue_patterns(reviews: &[AnalyzedReview]) -> Vec<IssuePattern> {
    let mut patterns: Vec<IssuePattern> = accumulate(reviews, |r| r.issues.iter())
        .into_iter()
        .map(|(issue, acc)| IssuePattern {
            issue: issue.to_string(),
            frequency: acc.frequency,
            severity: classify_severity(acc.frequency, acc.high_impact),
            sentiment: acc.mean_sentiment(),
        })
        .collect();

    patterns.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then_with(|| b.frequency.cmp(&a.frequency))
            .then_with(|| a.issue.cmp(&b.issue))
    });
    patterns
}

fn aspect_scores(reviews: &[AnalyzedReview]) -> BTreeMap<Aspect, AspectScore> {
    let mut sums: BTreeMap<Aspect, (f64, usize, usize)> = BTreeMap::new();
    for review in reviews {
        for (aspect, label) in &review.aspect_sentiment {
            let entry = sums.entry(*aspect).or_insert((0.0, 0, 0));
            entry.0 += label.score();
            entry.1 += 1;
            if label.score() > 0.0 {
                entry.2 += 1;
            }
        }
    }

    sums.into_iter()
        .map(|(aspect, (sum, mentions, positive_mentions))| {
            (
                aspect,
                AspectScore {
                    sentiment: sum / mentions as f64,
                    mentions,
                    positive_mentions,
                },
            )
        })
        .collect()
}

fn emotion_profile(reviews: &[AnalyzedReview]) -> BTreeMap<String, f64> {
    if reviews.is_empty() {
        return BTreeMap::new();
    }

    let mut sums: BTreeMap<String, f64> = BTreeMap::new();
    for review in reviews {
        for (name, intensity) in &review.emotions {
            *sums.entry(name.clone()).or_insert(0.0) += intensity;
        }
    }

    let total = reviews.len() as f64;
    sums.into_iter()
        .map(|(name, sum)| (name, (sum / total).clamp(0.0, 1.0)))
        .collect()
}

/// 件数をパーセントに丸め、丸め誤差は最大バケットに寄せる
pub fn sentiment_distribution(positive: usize, neutral: usize, negative: usize) -> SentimentDistribution {
    let total = positive + neutral + negative;
    if total == 0 {
        return SentimentDistribution::default();
    }

    let percent = |count: usize| (count as f64 / total as f64 * 100.0).round() as i64;
    let mut buckets = [
        (positive, percent(positive)),
        (neutral, percent(neutral)),
        (negative, percent(negative)),
    ];

    let remainder = 100 - buckets.iter().map(|(_, p)| p).sum::<i64>();
    if remainder != 0 {
        // 同数の場合は先頭（positive側）を優先
        let largest = (0..buckets.len())
            .max_by(|&a, &b| buckets[a].0.cmp(&buckets[b].0).then(b.cmp(&a)))
            .unwrap_or(0);
        buckets[largest].1 += remainder;
    }

    SentimentDistribution {
        positive: buckets[0].1.max(0) as u32,
        neutral: buckets[1].1.max(0) as u32,
        negative: buckets[2].1.max(0) as u32,
    }
}

fn analytics(reviews: &[AnalyzedReview], intelligence: &ReviewIntelligence) -> ReviewAnalytics {
    let total = reviews.len();
    if total == 0 {
        return ReviewAnalytics::default();
    }

    let mut rating_distribution = [0usize; 5];
    let mut rating_sum = 0u64;
    let (mut positive, mut neutral, mut negative) = (0, 0, 0);
    let mut with_issues = 0;
    let mut with_reply = 0;

    for review in reviews {
        let rating = review.review.rating.clamp(1, 5);
        rating_distribution[(rating - 1) as usize] += 1;
        rating_sum += rating as u64;

        match review.sentiment_overall {
            crate::models::SentimentLabel::Positive => positive += 1,
            crate::models::SentimentLabel::Neutral => neutral += 1,
            crate::models::SentimentLabel::Negative => negative += 1,
        }
        if !review.issues.is_empty() {
            with_issues += 1;
        }
        if review.review.reply_text.is_some() {
            with_reply += 1;
        }
    }

    ReviewAnalytics {
        total_reviews: total,
        average_rating: rating_sum as f64 / total as f64,
        sentiment_distribution: sentiment_distribution(positive, neutral, negative),
        critical_issues: intelligence
            .issue_patterns
            .iter()
            .filter(|p| p.severity == IssueSeverity::Critical)
            .count(),
        issue_frequency: with_issues as f64 / total as f64 * 100.0,
        response_rate: with_reply as f64 / total as f64 * 100.0,
        rating_distribution,
    }
}
