//! レポートの表形式射影
//!
//! ベンチマーク・ギャップ・機会・強み・脅威をそれぞれ1行に平坦化する。
//! `ReportTables::from_rows` が逆変換で、往復しても全レコードが保たれる。

use serde::{Deserialize, Serialize};

use super::ExportError;
use crate::analytics::report::*;

/// 行の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    #[display("benchmark")]
    Benchmark,
    #[display("feature_gap")]
    FeatureGap,
    #[display("opportunity")]
    Opportunity,
    #[display("strength")]
    Strength,
    #[display("threat")]
    Threat,
}

impl std::str::FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "benchmark" => Ok(RecordType::Benchmark),
            "feature_gap" => Ok(RecordType::FeatureGap),
            "opportunity" => Ok(RecordType::Opportunity),
            "strength" => Ok(RecordType::Strength),
            "threat" => Ok(RecordType::Threat),
            other => Err(format!("unknown record type: {}", other)),
        }
    }
}

/// CSVの列順
pub const COLUMNS: [&str; 16] = [
    "record_type",
    "subject",
    "competitor",
    "frequency",
    "sentiment",
    "yours",
    "average",
    "delta_percent",
    "level",
    "user_demand",
    "description",
    "recommendation",
    "app_ids",
    "app_names",
    "values",
    "examples",
];

/// 平坦化された1行
///
/// 列の意味はレコード種別ごとに異なる（strengthでは`yours`が主アプリの感情など）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub record_type: RecordType,
    pub subject: String,
    pub competitor: String,
    pub frequency: Option<usize>,
    pub sentiment: Option<f64>,
    pub yours: Option<f64>,
    pub average: Option<f64>,
    pub delta_percent: Option<f64>,
    /// demand / exploitability / confidence / momentum
    pub level: String,
    pub user_demand: Option<f64>,
    pub description: String,
    pub recommendation: String,
    pub app_ids: Vec<String>,
    pub app_names: Vec<String>,
    pub values: Vec<f64>,
    pub examples: Vec<String>,
}

impl ReportRow {
    fn new(record_type: RecordType, subject: impl Into<String>) -> Self {
        Self {
            record_type,
            subject: subject.into(),
            competitor: String::new(),
            frequency: None,
            sentiment: None,
            yours: None,
            average: None,
            delta_percent: None,
            level: String::new(),
            user_demand: None,
            description: String::new(),
            recommendation: String::new(),
            app_ids: Vec::new(),
            app_names: Vec::new(),
            values: Vec::new(),
            examples: Vec::new(),
        }
    }

    /// 列の文字列表現（`COLUMNS`と同じ順）
    pub fn to_fields(&self) -> Vec<String> {
        let number = |value: Option<f64>| value.map_or_else(String::new, |v| v.to_string());
        vec![
            self.record_type.to_string(),
            self.subject.clone(),
            self.competitor.clone(),
            self.frequency.map_or_else(String::new, |f| f.to_string()),
            number(self.sentiment),
            number(self.yours),
            number(self.average),
            number(self.delta_percent),
            self.level.clone(),
            number(self.user_demand),
            self.description.clone(),
            self.recommendation.clone(),
            join_list(&self.app_ids),
            join_list(&self.app_names),
            join_list(&self.values.iter().map(|v| v.to_string()).collect::<Vec<_>>()),
            join_list(&self.examples),
        ]
    }

    /// 列の文字列表現から復元
    pub fn from_fields(fields: &[String]) -> Result<Self, String> {
        if fields.len() != COLUMNS.len() {
            return Err(format!(
                "expected {} columns, found {}",
                COLUMNS.len(),
                fields.len()
            ));
        }

        fn opt<T: std::str::FromStr>(value: &str, column: &str) -> Result<Option<T>, String> {
            if value.is_empty() {
                return Ok(None);
            }
            value
                .parse()
                .map(Some)
                .map_err(|_| format!("invalid {}: {:?}", column, value))
        }

        let values = split_list(&fields[14])?
            .iter()
            .map(|v| v.parse::<f64>().map_err(|_| format!("invalid value: {:?}", v)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            record_type: fields[0].parse()?,
            subject: fields[1].clone(),
            competitor: fields[2].clone(),
            frequency: opt(&fields[3], "frequency")?,
            sentiment: opt(&fields[4], "sentiment")?,
            yours: opt(&fields[5], "yours")?,
            average: opt(&fields[6], "average")?,
            delta_percent: opt(&fields[7], "delta_percent")?,
            level: fields[8].clone(),
            user_demand: opt(&fields[9], "user_demand")?,
            description: fields[10].clone(),
            recommendation: fields[11].clone(),
            app_ids: split_list(&fields[12])?,
            app_names: split_list(&fields[13])?,
            values,
            examples: split_list(&fields[15])?,
        })
    }
}

/// リストを `|` 区切りで1フィールドに連結
///
/// `\` と `|` はバックスラッシュでエスケープし、空要素は `\0` で表す。
pub fn join_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| {
            if item.is_empty() {
                "\\0".to_string()
            } else {
                item.replace('\\', "\\\\").replace('|', "\\|")
            }
        })
        .collect::<Vec<_>>()
        .join("|")
}

/// `join_list` の逆変換
pub fn split_list(field: &str) -> Result<Vec<String>, String> {
    if field.is_empty() {
        return Ok(Vec::new());
    }

    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('\\') => current.push('\\'),
                Some('|') => current.push('|'),
                Some('0') => {}
                other => return Err(format!("invalid escape sequence: \\{}", other.unwrap_or(' '))),
            },
            '|' => items.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    items.push(current);
    Ok(items)
}

fn need<T>(value: Option<T>, column: &str) -> Result<T, String> {
    value.ok_or_else(|| format!("missing {}", column))
}

/// 競合1件のレコードはアプリIDを1つだけ持つ
fn single_id(app_ids: &[String]) -> Result<String, String> {
    match app_ids {
        [id] => Ok(id.clone()),
        _ => Err(format!("expected one app id, found {}", app_ids.len())),
    }
}

/// 表形式で往復可能なレポート部分
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTables {
    pub metrics: BenchmarkMetrics,
    pub feature_gaps: Vec<FeatureGap>,
    pub opportunities: Vec<Opportunity>,
    pub strengths: Vec<Strength>,
    pub threats: Vec<Threat>,
}

impl From<&CompetitiveIntelligence> for ReportTables {
    fn from(report: &CompetitiveIntelligence) -> Self {
        Self {
            metrics: report.metrics.clone(),
            feature_gaps: report.feature_gaps.clone(),
            opportunities: report.opportunities.clone(),
            strengths: report.strengths.clone(),
            threats: report.threats.clone(),
        }
    }
}

impl ReportTables {
    /// 1レコード1行に射影
    pub fn to_rows(&self) -> Vec<ReportRow> {
        let mut rows = Vec::new();

        for (kind, benchmark) in self.metrics.iter() {
            let mut row = ReportRow::new(RecordType::Benchmark, kind.to_string());
            row.yours = Some(benchmark.yours);
            row.average = Some(benchmark.average);
            row.delta_percent = Some(benchmark.delta_percent);
            row.app_ids = benchmark.competitors.iter().map(|c| c.app_id.clone()).collect();
            row.app_names = benchmark.competitors.iter().map(|c| c.app_name.clone()).collect();
            row.values = benchmark.competitors.iter().map(|c| c.value).collect();
            rows.push(row);
        }

        for gap in &self.feature_gaps {
            let mut row = ReportRow::new(RecordType::FeatureGap, &gap.feature);
            row.frequency = Some(gap.frequency);
            row.sentiment = Some(gap.competitor_sentiment);
            row.level = gap.user_demand.to_string();
            row.app_ids = gap.mentioned_in_competitor_ids.clone();
            row.app_names = gap.mentioned_in_competitors.clone();
            row.examples = gap.examples.clone();
            rows.push(row);
        }

        for opportunity in &self.opportunities {
            let mut row = ReportRow::new(RecordType::Opportunity, &opportunity.topic);
            row.competitor = opportunity.competitor.clone();
            row.app_ids = vec![opportunity.competitor_id.clone()];
            row.frequency = Some(opportunity.frequency);
            row.sentiment = Some(opportunity.sentiment);
            row.level = opportunity.exploitability.to_string();
            row.description = opportunity.description.clone();
            row.recommendation = opportunity.recommendation.clone();
            rows.push(row);
        }

        for strength in &self.strengths {
            let mut row = ReportRow::new(RecordType::Strength, &strength.aspect);
            row.yours = Some(strength.your_sentiment);
            row.average = Some(strength.competitor_avg_sentiment);
            row.delta_percent = Some(strength.difference);
            row.level = strength.confidence.to_string();
            row.examples = strength.evidence.clone();
            rows.push(row);
        }

        for threat in &self.threats {
            let mut row = ReportRow::new(RecordType::Threat, &threat.feature);
            row.competitor = threat.competitor.clone();
            row.app_ids = vec![threat.competitor_id.clone()];
            row.frequency = Some(threat.frequency);
            row.sentiment = Some(threat.sentiment);
            row.level = threat.momentum.to_string();
            row.user_demand = Some(threat.user_demand);
            row.recommendation = threat.recommendation.clone();
            rows.push(row);
        }

        rows
    }

    /// 行から復元（ベンチマーク4行は必須）
    pub fn from_rows(rows: &[ReportRow]) -> Result<Self, ExportError> {
        let mut benchmarks: [Option<Benchmark>; 4] = Default::default();
        let mut feature_gaps = Vec::new();
        let mut opportunities = Vec::new();
        let mut strengths = Vec::new();
        let mut threats = Vec::new();

        for (index, row) in rows.iter().enumerate() {
            let number = index + 1;
            let invalid = |reason: String| ExportError::InvalidRow { row: number, reason };

            match row.record_type {
                RecordType::Benchmark => {
                    let kind: BenchmarkKind = row.subject.parse().map_err(invalid)?;
                    if row.app_ids.len() != row.app_names.len() || row.app_ids.len() != row.values.len() {
                        return Err(invalid("competitor columns differ in length".to_string()));
                    }
                    let benchmark = Benchmark {
                        yours: need(row.yours, "yours").map_err(invalid)?,
                        average: need(row.average, "average").map_err(invalid)?,
                        competitors: row
                            .app_ids
                            .iter()
                            .zip(&row.app_names)
                            .zip(&row.values)
                            .map(|((app_id, app_name), value)| CompetitorValue {
                                app_id: app_id.clone(),
                                app_name: app_name.clone(),
                                value: *value,
                            })
                            .collect(),
                        delta_percent: need(row.delta_percent, "delta_percent").map_err(invalid)?,
                    };
                    let slot = BenchmarkKind::ALL
                        .iter()
                        .position(|k| *k == kind)
                        .unwrap_or_default();
                    benchmarks[slot] = Some(benchmark);
                }
                RecordType::FeatureGap => feature_gaps.push(FeatureGap {
                    feature: row.subject.clone(),
                    mentioned_in_competitors: row.app_names.clone(),
                    mentioned_in_competitor_ids: row.app_ids.clone(),
                    frequency: need(row.frequency, "frequency").map_err(invalid)?,
                    competitor_sentiment: need(row.sentiment, "sentiment").map_err(invalid)?,
                    user_demand: row.level.parse().map_err(invalid)?,
                    examples: row.examples.clone(),
                }),
                RecordType::Opportunity => opportunities.push(Opportunity {
                    competitor: row.competitor.clone(),
                    competitor_id: single_id(&row.app_ids).map_err(invalid)?,
                    topic: row.subject.clone(),
                    description: row.description.clone(),
                    frequency: need(row.frequency, "frequency").map_err(invalid)?,
                    sentiment: need(row.sentiment, "sentiment").map_err(invalid)?,
                    exploitability: row.level.parse().map_err(invalid)?,
                    recommendation: row.recommendation.clone(),
                }),
                RecordType::Strength => strengths.push(Strength {
                    aspect: row.subject.clone(),
                    your_sentiment: need(row.yours, "yours").map_err(invalid)?,
                    competitor_avg_sentiment: need(row.average, "average").map_err(invalid)?,
                    difference: need(row.delta_percent, "delta_percent").map_err(invalid)?,
                    confidence: row.level.parse().map_err(invalid)?,
                    evidence: row.examples.clone(),
                }),
                RecordType::Threat => threats.push(Threat {
                    competitor: row.competitor.clone(),
                    competitor_id: single_id(&row.app_ids).map_err(invalid)?,
                    feature: row.subject.clone(),
                    frequency: need(row.frequency, "frequency").map_err(invalid)?,
                    user_demand: need(row.user_demand, "user_demand").map_err(invalid)?,
                    sentiment: need(row.sentiment, "sentiment").map_err(invalid)?,
                    momentum: row.level.parse().map_err(invalid)?,
                    recommendation: row.recommendation.clone(),
                }),
            }
        }

        let [avg_rating, positive_sentiment, issue_frequency, review_volume] = benchmarks;
        let take = |value: Option<Benchmark>, kind: BenchmarkKind| {
            value.ok_or_else(|| ExportError::MissingBenchmark {
                kind: kind.to_string(),
            })
        };

        Ok(Self {
            metrics: BenchmarkMetrics {
                avg_rating: take(avg_rating, BenchmarkKind::AvgRating)?,
                positive_sentiment: take(positive_sentiment, BenchmarkKind::PositiveSentiment)?,
                issue_frequency: take(issue_frequency, BenchmarkKind::IssueFrequency)?,
                review_volume: take(review_volume, BenchmarkKind::ReviewVolume)?,
            },
            feature_gaps,
            opportunities,
            strengths,
            threats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::export::test_support::sample_report;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_list_escaping() {
        let items = strings(&["plain", "pipe|inside", "back\\slash", "", "\\|"]);
        let joined = join_list(&items);
        assert_eq!(split_list(&joined).unwrap(), items);

        assert_eq!(join_list(&[]), "");
        assert!(split_list("").unwrap().is_empty());
        assert_eq!(split_list("\\0").unwrap(), strings(&[""]));
        assert!(split_list("bad\\x").is_err());
    }

    #[test]
    fn test_one_row_per_record() {
        let report = sample_report();
        let tables = ReportTables::from(&report);
        let rows = tables.to_rows();

        let count = |kind: RecordType| rows.iter().filter(|r| r.record_type == kind).count();
        assert_eq!(count(RecordType::Benchmark), 4);
        assert_eq!(count(RecordType::FeatureGap), report.feature_gaps.len());
        assert_eq!(count(RecordType::Opportunity), report.opportunities.len());
        assert_eq!(count(RecordType::Strength), report.strengths.len());
        assert_eq!(count(RecordType::Threat), report.threats.len());
        assert!(!report.feature_gaps.is_empty());
        assert!(!report.opportunities.is_empty());
        assert!(!report.strengths.is_empty());
        assert!(!report.threats.is_empty());
    }

    #[test]
    fn test_rows_restore_tables() {
        let tables = ReportTables::from(&sample_report());
        let restored = ReportTables::from_rows(&tables.to_rows()).unwrap();
        assert_eq!(restored, tables);
    }

    #[test]
    fn test_fields_roundtrip_row() {
        let tables = ReportTables::from(&sample_report());
        for row in tables.to_rows() {
            let fields = row.to_fields();
            assert_eq!(fields.len(), COLUMNS.len());
            assert_eq!(ReportRow::from_fields(&fields).unwrap(), row);
        }
    }

    #[test]
    fn test_missing_benchmark_is_rejected() {
        let tables = ReportTables::from(&sample_report());
        let rows: Vec<ReportRow> = tables
            .to_rows()
            .into_iter()
            .filter(|r| r.subject != "review_volume")
            .collect();

        let err = ReportTables::from_rows(&rows).unwrap_err();
        assert!(matches!(err, ExportError::MissingBenchmark { kind } if kind == "review_volume"));
    }

    #[test]
    fn test_invalid_level_reports_row_number() {
        let tables = ReportTables::from(&sample_report());
        let mut rows = tables.to_rows();
        let index = rows
            .iter()
            .position(|r| r.record_type == RecordType::FeatureGap)
            .unwrap();
        rows[index].level = "urgent".to_string();

        let err = ReportTables::from_rows(&rows).unwrap_err();
        assert!(matches!(err, ExportError::InvalidRow { row, .. } if row == index + 1));
    }
}
