use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use super::report::CompetitiveIntelligence;

pub mod csv_exporter;
pub mod json_exporter;
pub mod report_rows;

pub use csv_exporter::CsvExporter;
pub use json_exporter::JsonExporter;
pub use report_rows::{RecordType, ReportRow, ReportTables};

/// エクスポート形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[display("csv")]
    Csv,
    #[display("json")]
    Json,
}

impl ExportFormat {
    pub fn file_extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("unsupported export format: {}", other)),
        }
    }
}

/// エクスポートエラー
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: ExportFormat },

    #[error("Malformed CSV at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("Invalid row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },

    #[error("Missing benchmark row: {kind}")]
    MissingBenchmark { kind: String },
}

/// エクスポート設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub format: ExportFormat,
    /// CSVのコメント行／JSONの生成情報
    pub include_metadata: bool,
    /// JSONにアプリごとの解析済みレビューを含める
    pub include_reviews: bool,
    pub pretty_print: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::Json,
            include_metadata: true,
            include_reviews: false,
            pretty_print: true,
        }
    }
}

/// フォーマットハンドラートレイト
pub trait FormatHandler: Send + Sync {
    fn export(
        &self,
        report: &CompetitiveIntelligence,
        config: &ExportConfig,
    ) -> Result<Vec<u8>, ExportError>;
    fn file_extension(&self) -> &str;
}

/// エクスポートマネージャー
pub struct ExportManager {
    format_handlers: HashMap<ExportFormat, Box<dyn FormatHandler>>,
}

impl ExportManager {
    /// 新しいエクスポートマネージャーを作成
    pub fn new() -> Self {
        let mut manager = Self {
            format_handlers: HashMap::new(),
        };

        // デフォルトハンドラーを登録
        manager.register_handler(ExportFormat::Csv, Box::new(CsvExporter::new()));
        manager.register_handler(ExportFormat::Json, Box::new(JsonExporter::new()));

        manager
    }

    /// フォーマットハンドラーを登録
    pub fn register_handler(&mut self, format: ExportFormat, handler: Box<dyn FormatHandler>) {
        self.format_handlers.insert(format, handler);
    }

    /// レポートをエクスポート
    pub fn export(
        &self,
        report: &CompetitiveIntelligence,
        config: &ExportConfig,
    ) -> Result<Vec<u8>, ExportError> {
        let handler = self
            .format_handlers
            .get(&config.format)
            .ok_or(ExportError::UnsupportedFormat {
                format: config.format,
            })?;

        handler.export(report, config)
    }

    /// ファイルに書き出し
    pub fn export_to_file(
        &self,
        report: &CompetitiveIntelligence,
        config: &ExportConfig,
        path: &Path,
    ) -> Result<usize, ExportError> {
        let bytes = self.export(report, config)?;
        std::fs::write(path, &bytes)?;
        tracing::info!(
            "💾 Exported {} report ({} bytes) to {}",
            config.format,
            bytes.len(),
            path.display()
        );
        Ok(bytes.len())
    }

    /// サポートされている形式を取得
    pub fn supported_formats(&self) -> Vec<ExportFormat> {
        self.format_handlers.keys().copied().collect()
    }
}

impl Default for ExportManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::analytics::competitive::CompetitiveEngine;
    use crate::analytics::report::CompetitiveIntelligence;
    use crate::analytics::review_analyzer::ReviewAnalyzer;
    use crate::models::{AppMeta, CompetitorApp, Review};
    use chrono::{Duration, TimeZone, Utc};

    fn app(id: &str, name: &str, items: &[(u8, &str)]) -> CompetitorApp {
        let analyzer = ReviewAnalyzer::default();
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let reviews = items
            .iter()
            .enumerate()
            .map(|(i, (rating, text))| {
                let review = Review::new(format!("{}-{}", id, i), *rating, *text, base + Duration::hours(i as i64));
                analyzer.analyze(&review).unwrap()
            })
            .collect();
        CompetitorApp::build(id, &AppMeta::new(name), reviews)
    }

    /// 全レコード種別を含むレポート
    pub fn sample_report() -> CompetitiveIntelligence {
        let mut primary_items = vec![(5, "Fast and smooth, \"really\" great"); 12];
        primary_items.extend(vec![(4, "good, simple | clean"); 8]);
        let primary = app("com.example.notes", "Notes, Pro", &primary_items);

        let mut rival_items = vec![(5, "love the widgets"); 6];
        rival_items.extend(vec![(1, "crashes all the time\nterrible"); 12]);
        rival_items.extend(vec![(3, "please add dark mode"); 4]);
        rival_items.extend(vec![(2, "slow and laggy"); 3]);
        let rival = app("com.rival.app", "Rival|App", &rival_items);

        CompetitiveEngine::default().compare(&primary, &[rival, app("com.empty", "Empty", &[])])
    }
}
