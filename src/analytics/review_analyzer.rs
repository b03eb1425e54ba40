//! レビュー単位の感情・テーマ抽出
//!
//! `(text, rating)` のみに依存する決定的な純関数として実装する。

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;

use super::ruleset::{LabelRule, Ruleset};
use crate::models::{AnalyzedReview, BusinessImpact, Review, SentimentLabel};

/// レビュー1件の解析エラー（そのレビューだけをスキップする）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Review {review_id} has rating {rating} outside 1..=5")]
    InvalidRating { review_id: String, rating: u8 },

    #[error("Review {review_id} contains malformed text")]
    MalformedText { review_id: String },
}

/// 語彙ベースのテキストスコア
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextScore {
    /// -1.0 to 1.0
    pub score: f64,
    /// 語彙ヒット数（0ならテキストに極性シグナルなし）
    pub hits: usize,
}

/// ルールセット駆動のレビュー解析エンジン
#[derive(Debug, Clone)]
pub struct ReviewAnalyzer {
    ruleset: Arc<Ruleset>,
    token_pattern: Regex,
}

impl Default for ReviewAnalyzer {
    fn default() -> Self {
        Self::new(Ruleset::default_english())
    }
}

impl ReviewAnalyzer {
    pub fn new(ruleset: Ruleset) -> Self {
        Self {
            ruleset: Arc::new(ruleset.normalized()),
            // 単語境界の判定に使う（アポストロフィを含む語をひとまとまりに）
            token_pattern: Regex::new(r"[\p{L}\p{N}']+").expect("static token pattern"),
        }
    }

    pub fn ruleset(&self) -> &Ruleset {
        &self.ruleset
    }

    /// レビューを解析
    pub fn analyze(&self, review: &Review) -> Result<AnalyzedReview, AnalysisError> {
        if !(1..=5).contains(&review.rating) {
            return Err(AnalysisError::InvalidRating {
                review_id: review.id.clone(),
                rating: review.rating,
            });
        }
        if review.text.contains('\u{FFFD}') || review.text.contains('\0') {
            return Err(AnalysisError::MalformedText {
                review_id: review.id.clone(),
            });
        }

        let lowered = review.text.to_lowercase();
        let tokens = self.tokenize(&lowered);

        let text_score = self.score_text(&lowered, &tokens);
        let sentiment_overall = self.combine_with_rating(text_score, review.rating);

        Ok(AnalyzedReview {
            review: review.clone(),
            sentiment_overall,
            text_score: text_score.score,
            emotions: self.detect_emotions(&lowered, &tokens),
            aspect_sentiment: self.detect_aspects(&lowered, &tokens),
            themes: self.match_labels(&self.ruleset.themes, &lowered, &tokens),
            mentioned_features: self.match_labels(&self.ruleset.features, &lowered, &tokens),
            issues: self.match_labels(&self.ruleset.issues, &lowered, &tokens),
            business_impact: BusinessImpact::from_rating(review.rating),
        })
    }

    fn tokenize<'a>(&self, lowered: &'a str) -> Vec<&'a str> {
        self.token_pattern
            .find_iter(lowered)
            .map(|m| m.as_str())
            .collect()
    }

    /// トリガーの出現回数
    ///
    /// 語単位で一致させる（"ads" は "downloads" に一致しない）。
    /// 語を含まない記号だけのトリガーは部分一致。
    fn count_trigger(&self, trigger: &str, lowered: &str, tokens: &[&str]) -> usize {
        let words = self.tokenize(trigger);
        if words.is_empty() {
            return lowered.matches(trigger).count();
        }
        tokens
            .windows(words.len())
            .filter(|window| *window == words.as_slice())
            .count()
    }

    /// 語彙ヒットからテキストスコアを算出
    pub fn score_text(&self, lowered: &str, tokens: &[&str]) -> TextScore {
        let lexicon = &self.ruleset.lexicon;
        let scoring = &self.ruleset.scoring;

        let mut positive = 0.0;
        let mut negative = 0.0;
        let mut hits = 0;

        // 単語エントリはトークン単位で否定・強化語を考慮
        for (index, token) in tokens.iter().enumerate() {
            let polarity = if lexicon.positive.iter().any(|w| w == token) {
                1.0
            } else if lexicon.negative.iter().any(|w| w == token) {
                -1.0
            } else {
                continue;
            };

            let window_start = index.saturating_sub(scoring.negation_window);
            let preceding = &tokens[window_start..index];
            let negated = preceding
                .iter()
                .any(|t| lexicon.negations.iter().any(|n| n == t));
            let intensified = index > 0
                && lexicon
                    .intensifiers
                    .iter()
                    .any(|w| w == tokens[index - 1]);

            let weight = if intensified {
                scoring.intensifier_weight
            } else {
                1.0
            };
            let signed = if negated { -polarity } else { polarity } * weight;

            if signed > 0.0 {
                positive += signed;
            } else {
                negative += -signed;
            }
            hits += 1;
        }

        // 複数語のエントリは連続する語の並びで一致
        for phrase in lexicon.positive.iter().filter(|w| w.contains(' ')) {
            let count = self.count_trigger(phrase, lowered, tokens);
            positive += count as f64;
            hits += count;
        }
        for phrase in lexicon.negative.iter().filter(|w| w.contains(' ')) {
            let count = self.count_trigger(phrase, lowered, tokens);
            negative += count as f64;
            hits += count;
        }

        let total = positive + negative;
        if total == 0.0 {
            return TextScore { score: 0.0, hits };
        }

        TextScore {
            score: ((positive - negative) / total).clamp(-1.0, 1.0),
            hits,
        }
    }

    /// テキストスコアを星評価の事前分布と合成
    ///
    /// テキストは事前ラベルを最大1バンドまでしか動かせない。
    pub fn combine_with_rating(&self, text: TextScore, rating: u8) -> SentimentLabel {
        let prior = SentimentLabel::from_rating(rating);
        if text.hits == 0 {
            return prior;
        }

        let band = self.ruleset.scoring.neutral_band;
        let text_label = if text.score > band {
            SentimentLabel::Positive
        } else if text.score < -band {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        };

        let shift = (text_label.band() - prior.band()).clamp(-1, 1);
        SentimentLabel::from_band(prior.band() + shift)
    }

    /// 感情ベクトル（ルールセットの全感情について0.0〜1.0）
    fn detect_emotions(&self, lowered: &str, tokens: &[&str]) -> BTreeMap<String, f64> {
        let saturation = self.ruleset.scoring.emotion_saturation.max(1.0);

        self.ruleset
            .emotions
            .iter()
            .map(|rule| {
                let hits: usize = rule
                    .triggers
                    .iter()
                    .map(|trigger| self.count_trigger(trigger, lowered, tokens))
                    .sum();
                let intensity = (hits as f64 / saturation).clamp(0.0, 1.0);
                (rule.name.clone(), intensity)
            })
            .collect()
    }

    /// 観点別感情（言及のあった観点のみ、優勢な符号で決定）
    fn detect_aspects(&self, lowered: &str, tokens: &[&str]) -> BTreeMap<crate::models::Aspect, SentimentLabel> {
        let mut result = BTreeMap::new();

        for rule in &self.ruleset.aspects {
            let positive = self.matched_triggers(&rule.positive, lowered, tokens);
            let negative = self.matched_triggers(&rule.negative, lowered, tokens);
            if positive == 0 && negative == 0 {
                continue;
            }

            let label = match positive.cmp(&negative) {
                std::cmp::Ordering::Greater => SentimentLabel::Positive,
                std::cmp::Ordering::Less => SentimentLabel::Negative,
                std::cmp::Ordering::Equal => SentimentLabel::Neutral,
            };
            result.insert(rule.aspect, label);
        }

        result
    }

    /// 1回以上出現したトリガーの種類数
    fn matched_triggers(&self, triggers: &[String], lowered: &str, tokens: &[&str]) -> usize {
        triggers
            .iter()
            .filter(|trigger| self.count_trigger(trigger, lowered, tokens) > 0)
            .count()
    }

    /// トリガー表にマッチしたラベル集合（重複なし）
    fn match_labels(&self, rules: &[LabelRule], lowered: &str, tokens: &[&str]) -> BTreeSet<String> {
        rules
            .iter()
            .filter(|rule| {
                rule.triggers
                    .iter()
                    .any(|trigger| self.count_trigger(trigger, lowered, tokens) > 0)
            })
            .map(|rule| rule.label.clone())
            .collect()
    }
}
