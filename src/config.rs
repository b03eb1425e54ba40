//! アプリケーション設定管理モジュール
//!
//! XDGディレクトリを使用した設定ファイルの永続化と管理を提供します。

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 比較パイプライン設定
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// アプリごとの最大取得レビュー数
    pub max_reviews_per_app: usize,
    /// キャッシュの鮮度期間（秒）
    pub freshness_window_secs: u64,
    /// 1アプリあたりの最大ページ数（終わらないソース対策）
    pub max_pages: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_reviews_per_app: 500,
            freshness_window_secs: 24 * 60 * 60,
            max_pages: 200,
        }
    }
}

impl PipelineConfig {
    pub fn freshness_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.freshness_window_secs.min(i64::MAX as u64) as i64)
    }
}

/// 競合差分エンジンの閾値
///
/// 元の値はヒューリスティックなので、全て設定で上書きできるようにしている。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisThresholds {
    /// 主アプリ側でこの頻度未満なら「言及なし」とみなす
    pub gap_min_primary_frequency: usize,
    /// 競合の上位テーマとして見る件数
    pub gap_top_themes: usize,
    /// userDemand=high の分位点（ギャップ頻度の上位四分位）
    pub gap_high_demand_quantile: f64,
    /// userDemand=medium の分位点
    pub gap_medium_demand_quantile: f64,

    /// この感情値未満をネガティブとみなす
    pub opportunity_negativity: f64,
    /// ノイズとして無視する頻度
    pub opportunity_noise_floor: usize,
    /// exploitability=high に必要な感情値
    pub opportunity_very_negative: f64,
    /// exploitability=high に必要な頻度
    pub opportunity_high_frequency: usize,

    /// 強みとして扱う最小差分
    pub strength_min_difference: f64,
    /// confidence=high に必要な裏付けレビュー数
    pub strength_high_evidence: usize,
    /// confidence=medium に必要な裏付けレビュー数
    pub strength_medium_evidence: usize,

    /// 脅威とみなすテーマ感情の下限
    pub threat_positivity: f64,
    /// 脅威とみなす最小頻度
    pub threat_min_frequency: usize,
    /// 勢い判定の偏り幅
    pub momentum_skew: f64,

    /// 優位・劣位判定のマージン（%）
    pub position_margin_percent: f64,
    /// confidenceScoreが1.0になる総レビュー数
    pub confidence_saturation_reviews: usize,
    /// エビデンスとして保持する例文数
    pub max_examples: usize,
}

impl Default for AnalysisThresholds {
    fn default() -> Self {
        Self {
            gap_min_primary_frequency: 2,
            gap_top_themes: 10,
            gap_high_demand_quantile: 0.75,
            gap_medium_demand_quantile: 0.5,
            opportunity_negativity: -0.3,
            opportunity_noise_floor: 3,
            opportunity_very_negative: -0.6,
            opportunity_high_frequency: 10,
            strength_min_difference: 0.2,
            strength_high_evidence: 30,
            strength_medium_evidence: 10,
            threat_positivity: 0.3,
            threat_min_frequency: 5,
            momentum_skew: 0.15,
            position_margin_percent: 5.0,
            confidence_saturation_reviews: 1000,
            max_examples: 3,
        }
    }
}

/// キャッシュ設定
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct CacheConfig {
    /// カスタムDBパス（Noneの場合はXDGデフォルト使用）
    pub database_path: Option<PathBuf>,
}

/// ログ設定
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// カスタムログディレクトリ（Noneの場合はXDGデフォルト使用）
    pub log_dir: Option<PathBuf>,
    /// ログレベル (trace/debug/info/warn/error)
    pub log_level: String,
    /// ファイル出力有効化
    pub enable_file_logging: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            log_level: "info".to_string(),
            enable_file_logging: false,
        }
    }
}

/// アプリケーション設定
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    /// 外部ルールセット（Noneの場合は組み込みの英語ルールセット）
    pub ruleset_path: Option<PathBuf>,
    pub pipeline: PipelineConfig,
    pub thresholds: AnalysisThresholds,
    pub cache: CacheConfig,
    pub log: LogConfig,
}

/// XDGプロジェクトディレクトリ
pub fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "revscope", "revscope").context("Failed to get project directories")
}

/// 設定管理マネージャー
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// XDG設定ディレクトリを使う設定マネージャーを作成
    pub fn new() -> Result<Self> {
        let config_path = project_dirs()?.config_dir().join("config.toml");
        debug!("Config file path: {}", config_path.display());
        Self::with_path(config_path)
    }

    /// 任意のパスを使う設定マネージャーを作成
    pub fn with_path(config_path: impl Into<PathBuf>) -> Result<Self> {
        let config_path = config_path.into();

        // 設定ディレクトリを作成（存在しない場合）
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        Ok(Self { config_path })
    }

    /// 設定を読み込み
    pub fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!(
                "Config file not found, using default settings: {}",
                self.config_path.display()
            );
            return Ok(AppConfig::default());
        }

        let config_content = fs::read_to_string(&self.config_path).with_context(|| {
            format!("Failed to read config file: {}", self.config_path.display())
        })?;

        let config: AppConfig = toml::from_str(&config_content).with_context(|| {
            format!(
                "Failed to parse config file: {}",
                self.config_path.display()
            )
        })?;

        info!(
            "✅ Configuration loaded from: {}",
            self.config_path.display()
        );

        Ok(config)
    }

    /// 設定を保存
    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        let config_content =
            toml::to_string_pretty(config).context("Failed to serialize config")?;

        fs::write(&self.config_path, config_content).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })?;

        info!("💾 Configuration saved to: {}", self.config_path.display());

        Ok(())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// 設定ファイルが存在するかチェック
    pub fn config_exists(&self) -> bool {
        self.config_path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.pipeline.max_reviews_per_app, 500);
        assert_eq!(config.pipeline.freshness_window(), chrono::Duration::hours(24));
        assert!(config.ruleset_path.is_none());
        assert_eq!(config.thresholds.gap_min_primary_frequency, 2);
    }

    #[test]
    fn test_missing_config_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_path(dir.path().join("config.toml")).unwrap();
        assert!(!manager.config_exists());
        assert_eq!(manager.load_config().unwrap(), AppConfig::default());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_path(dir.path().join("nested/config.toml")).unwrap();

        let mut config = AppConfig::default();
        config.pipeline.freshness_window_secs = 600;
        config.thresholds.strength_min_difference = 0.35;
        config.cache.database_path = Some(dir.path().join("cache.db"));

        manager.save_config(&config).unwrap();
        assert!(manager.config_exists());
        assert_eq!(manager.load_config().unwrap(), config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[pipeline]\nmax_reviews_per_app = 50\n\n[thresholds]\nthreat_min_frequency = 8\n",
        )
        .unwrap();

        let config = ConfigManager::with_path(&path).unwrap().load_config().unwrap();
        assert_eq!(config.pipeline.max_reviews_per_app, 50);
        assert_eq!(config.pipeline.freshness_window_secs, 86400);
        assert_eq!(config.thresholds.threat_min_frequency, 8);
        assert_eq!(config.thresholds.opportunity_noise_floor, 3);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "pipeline = \"oops\"").unwrap();

        let manager = ConfigManager::with_path(&path).unwrap();
        assert!(manager.load_config().is_err());
    }
}
