//! キーワードルールセット
//!
//! 抽出器が使う辞書・トリガー表・閾値をデータとして保持する。
//! ロケールやドメインを差し替える場合はTOMLファイルを読み込むだけでよく、
//! アルゴリズム側のコードには手を入れない。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::models::Aspect;

/// 感情語彙
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Lexicon {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
    /// 否定語（直後の語の極性を反転）
    pub negations: Vec<String>,
    /// 強化語（直後の語の重みを増やす）
    pub intensifiers: Vec<String>,
}

/// 感情1種類分のトリガー
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmotionRule {
    pub name: String,
    pub triggers: Vec<String>,
}

/// 評価観点1つ分のトリガー
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AspectRule {
    pub aspect: Aspect,
    pub positive: Vec<String>,
    pub negative: Vec<String>,
}

/// トリガー → 正規ラベルの対応
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabelRule {
    pub label: String,
    pub triggers: Vec<String>,
}

/// 抽出時のスコアリング定数
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoringParams {
    /// テキストスコアをneutralとみなす幅（±）
    pub neutral_band: f64,
    /// 感情強度が1.0に達するヒット数
    pub emotion_saturation: f64,
    /// 強化語の倍率
    pub intensifier_weight: f64,
    /// 否定語を探す直前トークン数
    pub negation_window: usize,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            neutral_band: 0.25,
            emotion_saturation: 3.0,
            intensifier_weight: 1.5,
            negation_window: 3,
        }
    }
}

/// 抽出器のルールセット全体
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ruleset {
    /// ロケール識別子（例: "en"）
    pub locale: String,
    #[serde(default)]
    pub scoring: ScoringParams,
    pub lexicon: Lexicon,
    #[serde(default)]
    pub emotions: Vec<EmotionRule>,
    #[serde(default)]
    pub aspects: Vec<AspectRule>,
    #[serde(default)]
    pub themes: Vec<LabelRule>,
    #[serde(default)]
    pub features: Vec<LabelRule>,
    #[serde(default)]
    pub issues: Vec<LabelRule>,
}

impl Default for Ruleset {
    fn default() -> Self {
        Self::default_english()
    }
}

fn words(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn label(label: &str, triggers: &[&str]) -> LabelRule {
    LabelRule {
        label: label.to_string(),
        triggers: words(triggers),
    }
}

impl Ruleset {
    /// TOML文字列から読み込み
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let ruleset: Ruleset = toml::from_str(content).context("Failed to parse ruleset")?;
        Ok(ruleset.normalized())
    }

    /// TOMLファイルから読み込み
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read ruleset file: {}", path.display()))?;
        let ruleset = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid ruleset file: {}", path.display()))?;

        tracing::info!(
            "📚 Ruleset loaded from {} (locale={}, themes={}, issues={})",
            path.display(),
            ruleset.locale,
            ruleset.themes.len(),
            ruleset.issues.len()
        );
        Ok(ruleset)
    }

    /// 設定にパスがあればそれを、無ければ組み込みの英語ルールセットを使う
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_toml_file(path),
            None => Ok(Self::default_english()),
        }
    }

    /// TOMLとして書き出し（カスタマイズの雛形用）
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize ruleset")
    }

    /// トリガーを小文字化・空要素除去して正規化
    pub fn normalized(mut self) -> Self {
        fn normalize(list: &mut Vec<String>) {
            *list = list
                .iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
        }

        normalize(&mut self.lexicon.positive);
        normalize(&mut self.lexicon.negative);
        normalize(&mut self.lexicon.negations);
        normalize(&mut self.lexicon.intensifiers);
        for rule in &mut self.emotions {
            normalize(&mut rule.triggers);
        }
        for rule in &mut self.aspects {
            normalize(&mut rule.positive);
            normalize(&mut rule.negative);
        }
        for rule in self
            .themes
            .iter_mut()
            .chain(self.features.iter_mut())
            .chain(self.issues.iter_mut())
        {
            normalize(&mut rule.triggers);
        }
        self
    }

    /// 組み込みの英語ルールセット
    pub fn default_english() -> Self {
        let lexicon = Lexicon {
            positive: words(&[
                "love", "great", "excellent", "amazing", "awesome", "good", "best", "fantastic",
                "perfect", "helpful", "easy", "smooth", "fast", "reliable", "intuitive",
                "beautiful", "recommend", "useful", "nice", "wonderful", "enjoy", "clean",
                "works well", "well designed",
            ]),
            negative: words(&[
                "hate", "terrible", "awful", "bad", "worst", "horrible", "useless", "slow",
                "broken", "annoying", "frustrating", "disappointing", "disappointed", "poor",
                "crash", "crashes", "crashed", "crashing", "buggy", "confusing", "expensive", "laggy", "waste",
                "unusable", "garbage", "refund",
            ]),
            negations: words(&[
                "not", "no", "never", "don't", "doesn't", "didn't", "isn't", "wasn't",
                "can't", "cannot", "won't", "hardly",
            ]),
            intensifiers: words(&[
                "very", "really", "extremely", "super", "so", "totally", "absolutely",
                "incredibly",
            ]),
        };

        let emotions = vec![
            EmotionRule {
                name: "joy".to_string(),
                triggers: words(&["love", "happy", "delighted", "enjoy", "fun", "glad"]),
            },
            EmotionRule {
                name: "anger".to_string(),
                triggers: words(&["angry", "furious", "hate", "ridiculous", "scam", "rip off"]),
            },
            EmotionRule {
                name: "frustration".to_string(),
                triggers: words(&[
                    "frustrating", "annoying", "keeps", "again and again", "still not",
                    "every time", "waste of time",
                ]),
            },
            EmotionRule {
                name: "satisfaction".to_string(),
                triggers: words(&["satisfied", "works well", "does the job", "worth", "reliable"]),
            },
            EmotionRule {
                name: "confusion".to_string(),
                triggers: words(&["confusing", "confused", "don't understand", "unclear", "how do i"]),
            },
            EmotionRule {
                name: "excitement".to_string(),
                triggers: words(&["amazing", "awesome", "can't wait", "wow", "incredible", "!!"]),
            },
        ];

        let aspects = vec![
            AspectRule {
                aspect: Aspect::UiUx,
                positive: words(&["beautiful", "intuitive", "clean design", "easy to use", "nice interface"]),
                negative: words(&["confusing", "cluttered", "ugly", "hard to use", "hard to find"]),
            },
            AspectRule {
                aspect: Aspect::Performance,
                positive: words(&["fast", "smooth", "responsive", "quick", "lightweight"]),
                negative: words(&["slow", "laggy", "crash", "crashes", "freeze", "freezes", "frozen", "battery", "loading"]),
            },
            AspectRule {
                aspect: Aspect::Features,
                positive: words(&["feature rich", "useful features", "love the feature", "has everything"]),
                negative: words(&["missing", "lacks", "wish it had", "no option", "please add"]),
            },
            AspectRule {
                aspect: Aspect::Pricing,
                positive: words(&["worth the price", "worth it", "affordable", "free", "good value"]),
                negative: words(&["expensive", "overpriced", "subscription", "paywall", "refund"]),
            },
            AspectRule {
                aspect: Aspect::Support,
                positive: words(&["support was great", "helpful support", "quick response", "responsive team"]),
                negative: words(&["no response", "support is useless", "never replied", "ignored", "customer service"]),
            },
        ];

        let themes = vec![
            label("performance issues", &["slow", "laggy", "lag", "lags", "freeze", "freezes", "takes forever", "take forever", "loading"]),
            label("stability", &["crash", "crashes", "crashed", "crashing", "keeps closing", "force close"]),
            label("ui design", &["design", "designed", "interface", "layout", "looks"]),
            label("ease of use", &["easy to use", "intuitive", "simple", "user friendly"]),
            label("pricing", &["price", "prices", "pricing", "expensive", "subscription", "paywall", "cost"]),
            label("customer support", &["support", "customer service", "help desk"]),
            label("dark mode", &["dark mode", "dark theme", "night mode"]),
            label("offline mode", &["offline", "without internet", "no connection"]),
            label("sync", &["sync", "syncing", "synced", "across devices"]),
            label("notifications", &["notification", "notifications", "reminder", "reminders"]),
            label("ads", &["ad", "ads", "advert", "adverts", "advertisement", "advertisements"]),
            label("battery usage", &["battery", "drains", "power hungry"]),
            label("updates", &["update", "updates", "updated", "new version"]),
            label("login", &["login", "log in", "sign in", "password"]),
        ];

        let features = vec![
            label("dark mode", &["dark mode", "dark theme", "night mode"]),
            label("offline mode", &["offline"]),
            label("widgets", &["widget", "widgets"]),
            label("export", &["export", "csv", "pdf"]),
            label("search", &["search", "searching"]),
            label("sync", &["sync", "cloud backup"]),
            label("integrations", &["integration", "integrates", "calendar", "zapier"]),
            label("notifications", &["notification", "notifications", "reminder", "reminders"]),
        ];

        let issues = vec![
            label("crashes", &["crash", "crashes", "crashed", "crashing", "force close", "keeps closing"]),
            label("bugs", &["bug", "bugs", "buggy", "glitch", "glitches", "glitchy", "broken"]),
            label("slow performance", &["slow", "laggy", "takes forever", "take forever"]),
            label("login problems", &["can't log in", "cannot log in", "login failed", "logged out"]),
            label("data loss", &["lost my data", "data loss", "deleted my", "disappeared"]),
            label("battery drain", &["battery drain", "drains my battery", "drains battery"]),
            label("billing problems", &["charged twice", "billing", "refund", "overcharged"]),
            label("intrusive ads", &["too many ads", "ads every", "full screen ads"]),
        ];

        Self {
            locale: "en".to_string(),
            scoring: ScoringParams::default(),
            lexicon,
            emotions,
            aspects,
            themes,
            features,
            issues,
        }
        .normalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ruleset_covers_every_aspect() {
        let ruleset = Ruleset::default_english();
        for aspect in Aspect::ALL {
            assert!(
                ruleset.aspects.iter().any(|rule| rule.aspect == aspect),
                "missing aspect {}",
                aspect
            );
        }
        assert_eq!(ruleset.emotions.len(), 6);
    }

    #[test]
    fn test_from_toml_str_normalizes_triggers() {
        let content = r#"
locale = "en-custom"

[lexicon]
positive = ["  Brilliant "]
negative = ["DREADFUL", ""]
negations = ["not"]
intensifiers = []

[[themes]]
label = "Dark Mode"
triggers = ["Dark Mode", "NIGHT THEME"]

[[aspects]]
aspect = "ui_ux"
positive = ["Slick"]
negative = []
"#;
        let ruleset = Ruleset::from_toml_str(content).unwrap();
        assert_eq!(ruleset.locale, "en-custom");
        assert_eq!(ruleset.lexicon.positive, vec!["brilliant"]);
        assert_eq!(ruleset.lexicon.negative, vec!["dreadful"]);
        // ラベルは正規化しない（表示用）
        assert_eq!(ruleset.themes[0].label, "Dark Mode");
        assert_eq!(ruleset.themes[0].triggers, vec!["dark mode", "night theme"]);
        assert_eq!(ruleset.aspects[0].aspect, Aspect::UiUx);
        assert_eq!(ruleset.scoring, ScoringParams::default());
    }

    #[test]
    fn test_toml_roundtrip_of_default_ruleset() {
        let ruleset = Ruleset::default_english();
        let content = ruleset.to_toml_string().unwrap();
        let parsed = Ruleset::from_toml_str(&content).unwrap();
        assert_eq!(parsed, ruleset);
    }

    #[test]
    fn test_from_toml_file_missing() {
        let result = Ruleset::from_toml_file("/nonexistent/ruleset.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ruleset.toml");
        std::fs::write(&path, Ruleset::default_english().to_toml_string().unwrap()).unwrap();

        let loaded = Ruleset::load_or_default(Some(&path)).unwrap();
        assert_eq!(loaded.locale, "en");
    }
}
