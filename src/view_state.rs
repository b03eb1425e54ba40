//! レポート表示用のフィルタ状態
//!
//! 呼び出し側が所有して明示的に渡す。グローバルな状態は持たない。

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::analytics::report::{
    Benchmark, BenchmarkKind, CompetitiveIntelligence, ExecutiveSummary, FeatureGap, Level, Opportunity,
    Strength, Threat,
};

/// 表示フィルタ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewState {
    /// 非表示にする競合のアプリID
    pub hidden_competitors: BTreeSet<String>,
    /// この需要レベル以上の機能ギャップのみ表示
    pub min_user_demand: Option<Level>,
    /// チャートに表示する指標
    pub metric: BenchmarkKind,
    /// 各セクションの最大表示件数
    pub max_items: Option<usize>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            hidden_competitors: BTreeSet::new(),
            min_user_demand: None,
            metric: BenchmarkKind::AvgRating,
            max_items: None,
        }
    }
}

/// フィルタ適用後のレポート
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportView {
    pub metric: BenchmarkKind,
    pub benchmark: Benchmark,
    pub feature_gaps: Vec<FeatureGap>,
    pub opportunities: Vec<Opportunity>,
    pub strengths: Vec<Strength>,
    pub threats: Vec<Threat>,
    pub summary: ExecutiveSummary,
}

impl ViewState {
    pub fn hide_competitor(&mut self, app_id: impl Into<String>) {
        self.hidden_competitors.insert(app_id.into());
    }

    pub fn show_competitor(&mut self, app_id: &str) {
        self.hidden_competitors.remove(app_id);
    }

    fn is_visible(&self, app_id: &str) -> bool {
        !self.hidden_competitors.contains(app_id)
    }

    /// すべてのフィルタをクリア（選択中の指標は維持）
    pub fn clear(&mut self) {
        self.hidden_competitors.clear();
        self.min_user_demand = None;
        self.max_items = None;
    }

    /// レポートにフィルタを適用（元のレポートは変更しない）
    pub fn apply(&self, report: &CompetitiveIntelligence) -> ReportView {
        let limit = self.max_items.unwrap_or(usize::MAX);

        let mut benchmark = report.metrics.get(self.metric).clone();
        benchmark.competitors.retain(|value| self.is_visible(&value.app_id));

        let feature_gaps = report
            .feature_gaps
            .iter()
            .filter(|gap| match self.min_user_demand {
                Some(min) => gap.user_demand <= min,
                None => true,
            })
            .filter_map(|gap| {
                let mut gap = gap.clone();
                // IDを持たない古いレポートは絞り込まない
                if !gap.mentioned_in_competitor_ids.is_empty() {
                    (gap.mentioned_in_competitors, gap.mentioned_in_competitor_ids) = gap
                        .mentioned_in_competitors
                        .iter()
                        .zip(&gap.mentioned_in_competitor_ids)
                        .filter(|(_, id)| self.is_visible(id))
                        .map(|(name, id)| (name.clone(), id.clone()))
                        .unzip();
                }
                (!gap.mentioned_in_competitors.is_empty()).then_some(gap)
            })
            .take(limit)
            .collect();

        ReportView {
            metric: self.metric,
            benchmark,
            feature_gaps,
            opportunities: report
                .opportunities
                .iter()
                .filter(|o| self.is_visible(&o.competitor_id))
                .take(limit)
                .cloned()
                .collect(),
            strengths: report.strengths.iter().take(limit).cloned().collect(),
            threats: report
                .threats
                .iter()
                .filter(|t| self.is_visible(&t.competitor_id))
                .take(limit)
                .cloned()
                .collect(),
            summary: report.summary.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::export::test_support::sample_report;

    #[test]
    fn test_default_view_shows_everything() {
        let report = sample_report();
        let view = ViewState::default().apply(&report);

        assert_eq!(view.metric, BenchmarkKind::AvgRating);
        assert_eq!(view.benchmark, report.metrics.avg_rating);
        assert_eq!(view.feature_gaps, report.feature_gaps);
        assert_eq!(view.opportunities, report.opportunities);
        assert_eq!(view.threats, report.threats);
    }

    #[test]
    fn test_hidden_competitor_by_id() {
        let report = sample_report();
        let mut state = ViewState::default();
        state.hide_competitor("com.rival.app");

        let view = state.apply(&report);
        assert!(view.benchmark.competitors.iter().all(|c| c.app_id != "com.rival.app"));
        assert!(view.opportunities.iter().all(|o| o.competitor_id != "com.rival.app"));
        assert!(view.threats.iter().all(|t| t.competitor_id != "com.rival.app"));
        assert!(view
            .feature_gaps
            .iter()
            .all(|g| !g.mentioned_in_competitors.contains(&"Rival|App".to_string())));

        // 元のレポートは変わらない
        assert!(!report.opportunities.is_empty());

        state.show_competitor("com.rival.app");
        assert_eq!(state.apply(&report).opportunities, report.opportunities);
    }

    #[test]
    fn test_hiding_is_keyed_on_app_id() {
        let mut report = sample_report();
        // 同名の別アプリの機会
        let mut opportunity = report.opportunities[0].clone();
        opportunity.competitor_id = "com.rival.twin".to_string();
        report.opportunities.push(opportunity);

        let mut state = ViewState::default();
        state.hide_competitor("com.rival.app");
        let view = state.apply(&report);
        assert_eq!(view.opportunities.len(), 1);
        assert_eq!(view.opportunities[0].competitor_id, "com.rival.twin");

        // 表示名では隠れない
        let mut state = ViewState::default();
        state.hide_competitor(report.opportunities[0].competitor.clone());
        assert_eq!(state.apply(&report).opportunities, report.opportunities);
    }

    #[test]
    fn test_metric_and_limit() {
        let report = sample_report();
        let state = ViewState {
            metric: BenchmarkKind::IssueFrequency,
            max_items: Some(1),
            ..Default::default()
        };

        let view = state.apply(&report);
        assert_eq!(view.benchmark, report.metrics.issue_frequency);
        assert!(view.opportunities.len() <= 1);
        assert!(view.strengths.len() <= 1);
    }

    #[test]
    fn test_min_user_demand() {
        let report = sample_report();
        let state = ViewState {
            min_user_demand: Some(Level::High),
            ..Default::default()
        };

        let view = state.apply(&report);
        assert!(view.feature_gaps.iter().all(|g| g.user_demand == Level::High));
    }

    #[test]
    fn test_clear_keeps_metric() {
        let mut state = ViewState {
            metric: BenchmarkKind::ReviewVolume,
            max_items: Some(3),
            ..Default::default()
        };
        state.hide_competitor("x");
        state.clear();
        assert_eq!(state.metric, BenchmarkKind::ReviewVolume);
        assert!(state.hidden_competitors.is_empty());
        assert!(state.max_items.is_none());
    }
}
