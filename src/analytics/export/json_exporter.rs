use super::{ExportConfig, ExportError, FormatHandler};
use crate::analytics::report::CompetitiveIntelligence;

/// JSON形式エクスポーター
pub struct JsonExporter {
    pretty_print: bool,
}

impl JsonExporter {
    pub fn new() -> Self {
        Self { pretty_print: true }
    }

    pub fn with_pretty_print(mut self, pretty: bool) -> Self {
        self.pretty_print = pretty;
        self
    }

    /// JSON構造を最適化
    fn optimize_json_structure(
        &self,
        report: &CompetitiveIntelligence,
        config: &ExportConfig,
    ) -> Result<serde_json::Value, ExportError> {
        let mut json =
            serde_json::to_value(report).map_err(|e| ExportError::Serialization(e.to_string()))?;

        if let serde_json::Value::Object(ref mut map) = json {
            // 解析済みレビューは件数が多いので既定では除外
            if !config.include_reviews {
                if let Some(serde_json::Value::Object(primary)) = map.get_mut("primary_app") {
                    primary.remove("reviews");
                }
                if let Some(serde_json::Value::Array(competitors)) = map.get_mut("competitors") {
                    for competitor in competitors {
                        if let serde_json::Value::Object(ref mut app) = competitor {
                            app.remove("reviews");
                        }
                    }
                }
            }

            if !config.include_metadata {
                map.remove("semantic_insights");
            }
        }

        Ok(json)
    }

    /// エクスポートしたJSONを読み戻す（レビュー省略時は空リストになる）
    pub fn parse(&self, bytes: &[u8]) -> Result<CompetitiveIntelligence, ExportError> {
        serde_json::from_slice(bytes).map_err(|e| ExportError::Serialization(e.to_string()))
    }
}

impl FormatHandler for JsonExporter {
    fn export(
        &self,
        report: &CompetitiveIntelligence,
        config: &ExportConfig,
    ) -> Result<Vec<u8>, ExportError> {
        let json_value = self.optimize_json_structure(report, config)?;

        let pretty = self.pretty_print && config.pretty_print;
        let json_bytes = if pretty {
            serde_json::to_vec_pretty(&json_value)
        } else {
            serde_json::to_vec(&json_value)
        }
        .map_err(|e| ExportError::Serialization(e.to_string()))?;

        Ok(json_bytes)
    }

    fn file_extension(&self) -> &str {
        "json"
    }
}

impl Default for JsonExporter {
    fn default() -> Self {
        Self::new()
    }
}
