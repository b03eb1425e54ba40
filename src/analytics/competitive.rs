//! 競合差分エンジン
//!
//! 主アプリのプロファイルとN件の競合プロファイルを比較し、
//! ベンチマーク・機能ギャップ・機会・強み・脅威・サマリーを生成する。
//! 入力2つに対する純関数で、副作用を持たない。

use chrono::Utc;
use std::collections::BTreeMap;

use super::aggregator::ThemeStat;
use super::report::*;
use crate::config::AnalysisThresholds;
use crate::models::{Aspect, CompetitorApp, SentimentLabel};

/// average=0 かつ yours>0 の場合のデルタ番兵値（%）
pub const DELTA_SENTINEL: f64 = 999.0;

/// エビデンス例文の最大文字数
const SNIPPET_CHARS: usize = 160;

/// ベンチマークのデルタ（%）を算出
pub fn benchmark_delta(yours: f64, average: f64) -> f64 {
    if average == 0.0 {
        if yours > 0.0 {
            DELTA_SENTINEL
        } else {
            0.0
        }
    } else {
        (yours - average) / average * 100.0
    }
}

fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= SNIPPET_CHARS {
        trimmed.to_string()
    } else {
        let mut cut: String = trimmed.chars().take(SNIPPET_CHARS).collect();
        cut.push('…');
        cut
    }
}

fn mentions_topic(review: &crate::models::AnalyzedReview, topic: &str) -> bool {
    review.themes.contains(topic) || review.mentioned_features.contains(topic)
}

/// 上位テーマと機能言及を1つの候補リストにまとめる（同ラベルは頻度の大きい方）
fn topic_candidates(app: &CompetitorApp, top: usize) -> Vec<ThemeStat> {
    let mut by_label: BTreeMap<&str, &ThemeStat> = BTreeMap::new();
    for stat in app
        .intelligence
        .themes
        .iter()
        .take(top)
        .chain(app.intelligence.feature_mentions.iter().take(top))
    {
        by_label
            .entry(stat.theme.as_str())
            .and_modify(|existing| {
                if stat.frequency > existing.frequency {
                    *existing = stat;
                }
            })
            .or_insert(stat);
    }
    by_label.into_values().cloned().collect()
}

/// 最近傍順位法による分位点
fn quantile(sorted: &[usize], q: f64) -> usize {
    if sorted.is_empty() {
        return 0;
    }
    let rank = (q * sorted.len() as f64).ceil() as usize;
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}

#[derive(Default)]
struct GapAccumulator {
    frequency: usize,
    weighted_sentiment: f64,
    max_single: usize,
    mentioned_in: Vec<String>,
    mentioned_in_ids: Vec<String>,
    examples: Vec<String>,
}

/// 優先度付けされた所見
struct Finding {
    score: f64,
    insight: String,
    priority: String,
}

/// 競合差分エンジン
#[derive(Debug, Clone, Default)]
pub struct CompetitiveEngine {
    thresholds: AnalysisThresholds,
}

impl CompetitiveEngine {
    pub fn new(thresholds: AnalysisThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &AnalysisThresholds {
        &self.thresholds
    }

    /// 主アプリと競合群を比較
    pub fn compare(&self, primary: &CompetitorApp, competitors: &[CompetitorApp]) -> CompetitiveIntelligence {
        let metrics = self.benchmarks(primary, competitors);
        let feature_gaps = self.feature_gaps(primary, competitors);
        let opportunities = self.opportunities(competitors);
        let strengths = self.strengths(primary, competitors);
        let threats = self.threats(primary, competitors);

        let total_reviews = primary.reviews.len()
            + competitors.iter().map(|c| c.reviews.len()).sum::<usize>();
        let summary = self.summary(
            &metrics,
            &feature_gaps,
            &opportunities,
            &threats,
            competitors.len(),
            total_reviews,
        );

        tracing::info!(
            primary = %primary.app_id,
            competitors = competitors.len(),
            gaps = feature_gaps.len(),
            opportunities = opportunities.len(),
            strengths = strengths.len(),
            threats = threats.len(),
            position = %summary.overall_position,
            "🏁 Competitive comparison completed"
        );

        CompetitiveIntelligence {
            primary_app: primary.clone(),
            competitors: competitors.to_vec(),
            metrics,
            feature_gaps,
            opportunities,
            strengths,
            threats,
            summary,
            generated_at: Utc::now(),
            semantic_insights: None,
        }
    }

    fn metric_value(kind: BenchmarkKind, app: &CompetitorApp) -> f64 {
        let analytics = &app.analytics;
        match kind {
            BenchmarkKind::AvgRating => analytics.average_rating,
            BenchmarkKind::PositiveSentiment => analytics.sentiment_distribution.positive as f64,
            BenchmarkKind::IssueFrequency => analytics.issue_frequency,
            BenchmarkKind::ReviewVolume => analytics.total_reviews as f64,
        }
    }

    fn benchmark(kind: BenchmarkKind, primary: &CompetitorApp, competitors: &[CompetitorApp]) -> Benchmark {
        let yours = Self::metric_value(kind, primary);

        // レビュー0件の競合は平均に寄与しない
        let contributing: Vec<f64> = competitors
            .iter()
            .filter(|c| !c.is_degraded())
            .map(|c| Self::metric_value(kind, c))
            .collect();
        let average = if contributing.is_empty() {
            0.0
        } else {
            contributing.iter().sum::<f64>() / contributing.len() as f64
        };

        Benchmark {
            yours,
            average,
            competitors: competitors
                .iter()
                .map(|c| CompetitorValue {
                    app_id: c.app_id.clone(),
                    app_name: c.app_name.clone(),
                    value: Self::metric_value(kind, c),
                })
                .collect(),
            delta_percent: benchmark_delta(yours, average),
        }
    }

    /// ベンチマーク4指標
    pub fn benchmarks(&self, primary: &CompetitorApp, competitors: &[CompetitorApp]) -> BenchmarkMetrics {
        BenchmarkMetrics {
            avg_rating: Self::benchmark(BenchmarkKind::AvgRating, primary, competitors),
            positive_sentiment: Self::benchmark(BenchmarkKind::PositiveSentiment, primary, competitors),
            issue_frequency: Self::benchmark(BenchmarkKind::IssueFrequency, primary, competitors),
            review_volume: Self::benchmark(BenchmarkKind::ReviewVolume, primary, competitors),
        }
    }

    /// 競合では話題になっているが主アプリでは言及されない機能
    pub fn feature_gaps(&self, primary: &CompetitorApp, competitors: &[CompetitorApp]) -> Vec<FeatureGap> {
        let t = &self.thresholds;
        let mut gaps: BTreeMap<String, GapAccumulator> = BTreeMap::new();

        for competitor in competitors {
            for stat in topic_candidates(competitor, t.gap_top_themes) {
                if primary.intelligence.topic_frequency(&stat.theme) >= t.gap_min_primary_frequency {
                    continue;
                }

                let acc = gaps.entry(stat.theme.clone()).or_default();
                acc.frequency += stat.frequency;
                acc.weighted_sentiment += stat.sentiment * stat.frequency as f64;
                acc.max_single = acc.max_single.max(stat.frequency);
                acc.mentioned_in.push(competitor.app_name.clone());
                acc.mentioned_in_ids.push(competitor.app_id.clone());

                let room = t.max_examples.saturating_sub(acc.examples.len());
                acc.examples.extend(
                    competitor
                        .reviews
                        .iter()
                        .filter(|r| mentions_topic(r, &stat.theme) && !r.review.text.trim().is_empty())
                        .take(room)
                        .map(|r| snippet(&r.review.text)),
                );
            }
        }

        // 競合側でも閾値未満の話題はギャップとみなさない
        gaps.retain(|_, acc| acc.max_single >= t.gap_min_primary_frequency);

        let mut frequencies: Vec<usize> = gaps.values().map(|acc| acc.frequency).collect();
        frequencies.sort_unstable();
        let high_mark = quantile(&frequencies, t.gap_high_demand_quantile);
        let medium_mark = quantile(&frequencies, t.gap_medium_demand_quantile);

        let mut result: Vec<FeatureGap> = gaps
            .into_iter()
            .map(|(feature, acc)| {
                let user_demand = if acc.frequency >= high_mark {
                    Level::High
                } else if acc.frequency >= medium_mark {
                    Level::Medium
                } else {
                    Level::Low
                };
                FeatureGap {
                    feature,
                    mentioned_in_competitors: acc.mentioned_in,
                    mentioned_in_competitor_ids: acc.mentioned_in_ids,
                    frequency: acc.frequency,
                    competitor_sentiment: if acc.frequency == 0 {
                        0.0
                    } else {
                        acc.weighted_sentiment / acc.frequency as f64
                    },
                    user_demand,
                    examples: acc.examples,
                }
            })
            .collect();

        result.sort_by(|a, b| {
            a.user_demand
                .cmp(&b.user_demand)
                .then_with(|| b.frequency.cmp(&a.frequency))
                .then_with(|| a.feature.cmp(&b.feature))
        });
        result
    }

    fn exploitability(&self, sentiment: f64, frequency: usize) -> Level {
        let t = &self.thresholds;
        let very_negative = sentiment <= t.opportunity_very_negative;
        let frequent = frequency >= t.opportunity_high_frequency;
        match (very_negative, frequent) {
            (true, true) => Level::High,
            (true, false) | (false, true) => Level::Medium,
            (false, false) => Level::Low,
        }
    }

    /// 競合の強いネガティブテーマ・問題
    pub fn opportunities(&self, competitors: &[CompetitorApp]) -> Vec<Opportunity> {
        let t = &self.thresholds;
        let mut result = Vec::new();

        for competitor in competitors {
            let mut topics: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
            let themes = competitor
                .intelligence
                .themes
                .iter()
                .map(|s| (s.theme.as_str(), s.frequency, s.sentiment));
            let issues = competitor
                .intelligence
                .issue_patterns
                .iter()
                .map(|p| (p.issue.as_str(), p.frequency, p.sentiment));

            for (topic, frequency, sentiment) in themes.chain(issues) {
                let entry = topics.entry(topic).or_insert((frequency, sentiment));
                if frequency > entry.0 {
                    *entry = (frequency, sentiment);
                }
            }

            for (topic, (frequency, sentiment)) in topics {
                if sentiment >= t.opportunity_negativity || frequency < t.opportunity_noise_floor {
                    continue;
                }

                let exploitability = self.exploitability(sentiment, frequency);
                result.push(Opportunity {
                    competitor: competitor.app_name.clone(),
                    competitor_id: competitor.app_id.clone(),
                    topic: topic.to_string(),
                    description: format!(
                        "{} users complain about {} ({} reviews)",
                        competitor.app_name, topic, frequency
                    ),
                    frequency,
                    sentiment,
                    exploitability,
                    recommendation: match exploitability {
                        Level::High => format!(
                            "Lead your positioning with how your app handles {} better than {}",
                            topic, competitor.app_name
                        ),
                        Level::Medium => format!(
                            "Highlight {} in comparison messaging against {}",
                            topic, competitor.app_name
                        ),
                        Level::Low => format!(
                            "Monitor {} complaints about {}",
                            competitor.app_name, topic
                        ),
                    },
                });
            }
        }

        result.sort_by(|a, b| {
            a.exploitability
                .cmp(&b.exploitability)
                .then_with(|| b.frequency.cmp(&a.frequency))
                .then_with(|| a.competitor.cmp(&b.competitor))
                .then_with(|| a.topic.cmp(&b.topic))
        });
        result
    }

    /// 主アプリが競合平均を上回る観点
    pub fn strengths(&self, primary: &CompetitorApp, competitors: &[CompetitorApp]) -> Vec<Strength> {
        let t = &self.thresholds;
        let mut result = Vec::new();

        for (aspect, score) in &primary.intelligence.aspect_scores {
            let competitor_scores: Vec<f64> = competitors
                .iter()
                .filter_map(|c| c.intelligence.aspect_scores.get(aspect))
                .filter(|s| s.mentions > 0)
                .map(|s| s.sentiment)
                .collect();
            if competitor_scores.is_empty() {
                continue;
            }

            let competitor_avg = competitor_scores.iter().sum::<f64>() / competitor_scores.len() as f64;
            let difference = score.sentiment - competitor_avg;
            if difference <= t.strength_min_difference {
                continue;
            }

            // 裏付けは肯定的な言及のみ
            let confidence = if score.positive_mentions >= t.strength_high_evidence {
                Level::High
            } else if score.positive_mentions >= t.strength_medium_evidence {
                Level::Medium
            } else {
                Level::Low
            };

            result.push(Strength {
                aspect: aspect.to_string(),
                your_sentiment: score.sentiment,
                competitor_avg_sentiment: competitor_avg,
                difference,
                confidence,
                evidence: self.aspect_evidence(primary, *aspect),
            });
        }

        result.sort_by(|a, b| {
            b.difference
                .partial_cmp(&a.difference)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.aspect.cmp(&b.aspect))
        });
        result
    }

    fn aspect_evidence(&self, app: &CompetitorApp, aspect: Aspect) -> Vec<String> {
        app.reviews
            .iter()
            .filter(|r| r.aspect_sentiment.get(&aspect) == Some(&SentimentLabel::Positive))
            .take(self.thresholds.max_examples)
            .map(|r| snippet(&r.review.text))
            .collect()
    }

    /// 言及がレビュー期間の新しい側に偏っているか
    pub fn momentum(&self, app: &CompetitorApp, topic: &str) -> Momentum {
        let mut dates: Vec<_> = app.reviews.iter().map(|r| r.review.date).collect();
        if dates.len() < 2 {
            return Momentum::Stable;
        }
        dates.sort_unstable();
        let median = dates[dates.len() / 2];

        let recent_total = app.reviews.iter().filter(|r| r.review.date >= median).count();
        let baseline_share = recent_total as f64 / app.reviews.len() as f64;

        let mentions: Vec<_> = app
            .reviews
            .iter()
            .filter(|r| mentions_topic(r, topic))
            .collect();
        if mentions.is_empty() {
            return Momentum::Stable;
        }
        let recent_mentions = mentions.iter().filter(|r| r.review.date >= median).count();
        let share = recent_mentions as f64 / mentions.len() as f64;

        let skew = share - baseline_share;
        if skew > self.thresholds.momentum_skew {
            Momentum::Rising
        } else if skew < -self.thresholds.momentum_skew {
            Momentum::Declining
        } else {
            Momentum::Stable
        }
    }

    /// 主アプリに対応する話題がない、競合の好評かつ高頻度なテーマ
    pub fn threats(&self, primary: &CompetitorApp, competitors: &[CompetitorApp]) -> Vec<Threat> {
        let t = &self.thresholds;
        let mut result = Vec::new();

        for competitor in competitors {
            let total = competitor.reviews.len();
            if total == 0 {
                continue;
            }

            for stat in topic_candidates(competitor, usize::MAX) {
                if stat.sentiment < t.threat_positivity
                    || stat.frequency < t.threat_min_frequency
                    || primary.intelligence.topic_frequency(&stat.theme) >= t.gap_min_primary_frequency
                {
                    continue;
                }

                let momentum = self.momentum(competitor, &stat.theme);
                let recommendation = match momentum {
                    Momentum::Rising => format!(
                        "Prioritize {}: demand is growing among {} users",
                        stat.theme, competitor.app_name
                    ),
                    Momentum::Stable => format!(
                        "Plan a response to {}'s {}",
                        competitor.app_name, stat.theme
                    ),
                    Momentum::Declining => format!(
                        "Watch {}'s {}; interest is fading",
                        competitor.app_name, stat.theme
                    ),
                };

                result.push(Threat {
                    competitor: competitor.app_name.clone(),
                    competitor_id: competitor.app_id.clone(),
                    feature: stat.theme.clone(),
                    frequency: stat.frequency,
                    user_demand: (stat.frequency as f64 / total as f64).clamp(0.0, 1.0),
                    sentiment: stat.sentiment,
                    momentum,
                    recommendation,
                });
            }
        }

        result.sort_by(|a, b| {
            let score_a = a.user_demand * a.frequency as f64;
            let score_b = b.user_demand * b.frequency as f64;
            score_b
                .partial_cmp(&score_a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.competitor.cmp(&b.competitor))
                .then_with(|| a.feature.cmp(&b.feature))
        });
        result
    }

    /// 品質指標の勝ち負けから総合ポジションを決定
    pub fn overall_position(&self, metrics: &BenchmarkMetrics) -> OverallPosition {
        let margin = self.thresholds.position_margin_percent;
        let (mut wins, mut losses, mut counted) = (0, 0, 0);

        for (kind, benchmark) in metrics.iter().filter(|(kind, _)| kind.is_quality_metric()) {
            counted += 1;
            let signed = if kind.lower_is_better() {
                -benchmark.delta_percent
            } else {
                benchmark.delta_percent
            };
            if signed > margin {
                wins += 1;
            } else if signed < -margin {
                losses += 1;
            }
        }

        if wins * 2 > counted {
            OverallPosition::Leading
        } else if losses * 2 > counted {
            OverallPosition::Lagging
        } else {
            OverallPosition::Competitive
        }
    }

    fn summary(
        &self,
        metrics: &BenchmarkMetrics,
        gaps: &[FeatureGap],
        opportunities: &[Opportunity],
        threats: &[Threat],
        competitor_count: usize,
        total_reviews: usize,
    ) -> ExecutiveSummary {
        let overall_position = self.overall_position(metrics);

        let findings = gaps
            .iter()
            .map(|gap| Finding {
                score: gap.user_demand.weight() * gap.frequency as f64,
                insight: format!(
                    "Users of {} keep discussing {} ({} mentions), which your reviews never raise",
                    gap.mentioned_in_competitors.join(", "),
                    gap.feature,
                    gap.frequency
                ),
                priority: format!("Close the {} feature gap", gap.feature),
            })
            .chain(opportunities.iter().map(|opp| Finding {
                score: opp.exploitability.weight() * opp.frequency as f64,
                insight: opp.description.clone(),
                priority: opp.recommendation.clone(),
            }))
            .chain(threats.iter().map(|threat| Finding {
                score: (1.0 + 2.0 * threat.user_demand) * threat.frequency as f64,
                insight: format!(
                    "{} users praise {} ({} mentions, {})",
                    threat.competitor, threat.feature, threat.frequency, threat.momentum
                ),
                priority: threat.recommendation.clone(),
            }));

        // 同点なら先に現れた所見を優先
        let top = findings.fold(None::<Finding>, |best, finding| match best {
            Some(current) if current.score >= finding.score => Some(current),
            _ => Some(finding),
        });

        let (key_insight, top_priority) = match top {
            Some(finding) => (finding.insight, finding.priority),
            None => (
                format!(
                    "Your app is {} against {} competitor(s) with no standout gaps or threats",
                    overall_position, competitor_count
                ),
                match overall_position {
                    OverallPosition::Leading => {
                        "Defend current strengths and keep monitoring competitor reviews".to_string()
                    }
                    OverallPosition::Competitive => {
                        "Differentiate on the aspects where you already lead".to_string()
                    }
                    OverallPosition::Lagging => {
                        "Address the benchmark metrics where you trail competitors".to_string()
                    }
                },
            ),
        };

        let saturation = self.thresholds.confidence_saturation_reviews;
        let confidence_score = if saturation == 0 {
            1.0
        } else {
            (total_reviews as f64 / saturation as f64).min(1.0)
        };

        ExecutiveSummary {
            overall_position,
            key_insight,
            top_priority,
            confidence_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::review_analyzer::ReviewAnalyzer;
    use crate::models::{AppMeta, Review};
    use chrono::{Duration, TimeZone};

    fn app(id: &str, items: &[(u8, &str)]) -> CompetitorApp {
        let analyzer = ReviewAnalyzer::default();
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let reviews = items
            .iter()
            .enumerate()
            .map(|(i, (rating, text))| {
                let review = Review::new(
                    format!("{}-{}", id, i),
                    *rating,
                    *text,
                    base + Duration::days(i as i64),
                );
                analyzer.analyze(&review).unwrap()
            })
            .collect();
        CompetitorApp::build(id, &AppMeta::new(id.to_uppercase()), reviews)
    }

    fn repeat(n: usize, rating: u8, text: &'static str) -> Vec<(u8, &'static str)> {
        vec![(rating, text); n]
    }

    fn assert_finite(report: &CompetitiveIntelligence) {
        for (_, b) in report.metrics.iter() {
            assert!(b.yours.is_finite() && b.average.is_finite() && b.delta_percent.is_finite());
        }
        assert!(report.summary.confidence_score.is_finite());
    }

    #[test]
    fn test_benchmark_delta() {
        assert_eq!(benchmark_delta(4.5, 3.0), 50.0);
        assert!(benchmark_delta(3.0, 4.0) < 0.0);
        assert_eq!(benchmark_delta(5.0, 0.0), DELTA_SENTINEL);
        assert_eq!(benchmark_delta(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_identical_sets_are_competitive() {
        let mut items = repeat(20, 4, "fast and reliable, love the widgets");
        items.extend(repeat(10, 2, "it crashes and the ads are annoying"));
        let primary = app("primary", &items);
        let competitor = app("rival", &items);

        let report = CompetitiveEngine::default().compare(&primary, &[competitor]);

        assert!(report.feature_gaps.is_empty());
        assert!(report.threats.is_empty());
        assert!(report.strengths.is_empty());
        assert_eq!(report.summary.overall_position, OverallPosition::Competitive);
        for (_, benchmark) in report.metrics.iter() {
            assert_eq!(benchmark.delta_percent, 0.0);
        }
    }

    #[test]
    fn test_dark_mode_gap_and_leading_position() {
        let mut primary_items = repeat(50, 5, "Great app, works well");
        primary_items.extend(repeat(50, 4, "good app"));
        let primary = app("primary", &primary_items);

        let mut rival_items = repeat(40, 3, "I wish it had dark mode");
        rival_items.extend(repeat(60, 3, "It is okay"));
        let rival = app("rival", &rival_items);

        let report = CompetitiveEngine::default().compare(&primary, &[rival]);

        assert_eq!(report.metrics.avg_rating.yours, 4.5);
        assert_eq!(report.metrics.avg_rating.average, 3.0);
        assert_eq!(report.metrics.avg_rating.delta_percent, 50.0);

        let dark_mode: Vec<_> = report
            .feature_gaps
            .iter()
            .filter(|g| g.feature == "dark mode")
            .collect();
        assert_eq!(dark_mode.len(), 1);
        assert_eq!(dark_mode[0].frequency, 40);
        assert_eq!(dark_mode[0].user_demand, Level::High);
        assert_eq!(dark_mode[0].mentioned_in_competitors, vec!["RIVAL"]);
        assert_eq!(dark_mode[0].examples.len(), 3);

        assert_eq!(report.summary.overall_position, OverallPosition::Leading);
        assert_eq!(report.summary.top_priority, "Close the dark mode feature gap");
        assert_eq!(report.summary.confidence_score, 0.2);
    }

    #[test]
    fn test_empty_competitor_contributes_zero_weight() {
        let primary = app("primary", &repeat(10, 5, "great"));
        let rival = app("rival", &repeat(10, 3, "okay"));
        let empty = app("empty", &[]);

        let report = CompetitiveEngine::default().compare(&primary, &[rival, empty]);

        assert_eq!(report.metrics.avg_rating.average, 3.0);
        assert_eq!(report.metrics.avg_rating.competitors.len(), 2);
        assert_eq!(report.metrics.avg_rating.competitors[1].value, 0.0);
        assert_eq!(report.degraded_apps(), vec!["empty".to_string()]);
        assert_finite(&report);
    }

    #[test]
    fn test_zero_average_uses_sentinel() {
        let primary = app("primary", &repeat(10, 5, "great"));
        let empty = app("empty", &[]);

        let report = CompetitiveEngine::default().compare(&primary, &[empty]);

        assert_eq!(report.metrics.avg_rating.average, 0.0);
        assert_eq!(report.metrics.avg_rating.delta_percent, DELTA_SENTINEL);
        assert!(report.feature_gaps.is_empty());
        assert!(report.threats.is_empty());
        assert_finite(&report);
    }

    #[test]
    fn test_empty_primary_is_tolerated() {
        let primary = app("primary", &[]);
        let rival = app("rival", &repeat(10, 4, "love the widgets"));

        let report = CompetitiveEngine::default().compare(&primary, &[rival]);
        assert_eq!(report.metrics.avg_rating.yours, 0.0);
        assert!(report.metrics.avg_rating.delta_percent < 0.0);
        assert_eq!(report.summary.overall_position, OverallPosition::Lagging);
        assert_finite(&report);
    }

    #[test]
    fn test_opportunity_exploitability() {
        let mut rival_items = repeat(12, 1, "crashes all the time, terrible");
        rival_items.extend(repeat(4, 2, "too many ads everywhere"));
        let rival = app("rival", &rival_items);

        let engine = CompetitiveEngine::default();
        let opportunities = engine.opportunities(&[rival]);

        let crashes = opportunities.iter().find(|o| o.topic == "crashes").unwrap();
        assert_eq!(crashes.frequency, 12);
        assert_eq!(crashes.exploitability, Level::High);
        assert_eq!(crashes.competitor, "RIVAL");

        let ads = opportunities.iter().find(|o| o.topic == "ads").unwrap();
        assert_eq!(ads.exploitability, Level::Medium);

        // 並び順はexploitability優先
        assert_eq!(opportunities[0].exploitability, Level::High);
    }

    #[test]
    fn test_exploitability_tiers() {
        let engine = CompetitiveEngine::default();
        assert_eq!(engine.exploitability(-0.9, 20), Level::High);
        assert_eq!(engine.exploitability(-0.9, 3), Level::Medium);
        assert_eq!(engine.exploitability(-0.4, 20), Level::Medium);
        assert_eq!(engine.exploitability(-0.4, 3), Level::Low);
    }

    #[test]
    fn test_strength_confidence_scales_with_evidence() {
        let primary = app("primary", &repeat(12, 5, "fast and smooth"));
        let rival = app("rival", &repeat(12, 2, "slow and laggy"));

        let strengths = CompetitiveEngine::default().strengths(&primary, &[rival]);
        assert_eq!(strengths.len(), 1);
        assert_eq!(strengths[0].aspect, "performance");
        assert_eq!(strengths[0].difference, 2.0);
        assert_eq!(strengths[0].confidence, Level::Medium);
        assert_eq!(strengths[0].evidence.len(), 3);
    }

    #[test]
    fn test_strength_confidence_counts_only_positive_mentions() {
        let mut primary_items = repeat(20, 5, "fast");
        primary_items.extend(repeat(12, 2, "slow"));
        let primary = app("primary", &primary_items);
        let rival = app("rival", &repeat(12, 2, "slow and laggy"));

        let strengths = CompetitiveEngine::default().strengths(&primary, &[rival]);
        assert_eq!(strengths.len(), 1);
        assert_eq!(primary.intelligence.aspect_scores[&Aspect::Performance].mentions, 32);
        // 否定的な12件は裏付けに数えない
        assert_eq!(strengths[0].confidence, Level::Medium);
    }

    #[test]
    fn test_threat_with_rising_momentum() {
        let primary = app("primary", &repeat(20, 4, "nice"));
        let mut rival_items = repeat(10, 4, "nice");
        rival_items.extend(repeat(10, 5, "love the widgets"));
        let rival = app("rival", &rival_items);

        let threats = CompetitiveEngine::default().threats(&primary, &[rival]);
        assert_eq!(threats.len(), 1);
        assert_eq!(threats[0].feature, "widgets");
        assert_eq!(threats[0].momentum, Momentum::Rising);
        assert_eq!(threats[0].user_demand, 0.5);
        assert_eq!(threats[0].sentiment, 1.0);
    }

    #[test]
    fn test_momentum_declining_and_stable() {
        let engine = CompetitiveEngine::default();

        let mut items = repeat(10, 5, "love the widgets");
        items.extend(repeat(10, 4, "nice"));
        assert_eq!(engine.momentum(&app("old", &items), "widgets"), Momentum::Declining);

        let alternating: Vec<(u8, &str)> = (0..20)
            .map(|i| if i % 2 == 0 { (5, "love the widgets") } else { (4, "nice") })
            .collect();
        assert_eq!(engine.momentum(&app("even", &alternating), "widgets"), Momentum::Stable);
    }

    #[test]
    fn test_gap_demand_quantiles() {
        assert_eq!(quantile(&[], 0.75), 0);
        assert_eq!(quantile(&[5], 0.75), 5);
        assert_eq!(quantile(&[1, 2, 3, 4], 0.75), 3);
        assert_eq!(quantile(&[1, 2, 3, 4], 0.5), 2);
    }
}
