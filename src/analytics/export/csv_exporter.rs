use super::report_rows::{ReportRow, ReportTables, COLUMNS};
use super::{ExportConfig, ExportError, FormatHandler};
use crate::analytics::report::CompetitiveIntelligence;

/// CSV形式エクスポーター
pub struct CsvExporter {
    delimiter: char,
    include_headers: bool,
}

impl CsvExporter {
    pub fn new() -> Self {
        Self {
            delimiter: ',',
            include_headers: true,
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_headers(mut self, include_headers: bool) -> Self {
        self.include_headers = include_headers;
        self
    }

    /// CSVフィールドをエスケープ
    fn escape_csv_field(&self, field: &str) -> String {
        if field.contains(self.delimiter)
            || field.contains('"')
            || field.contains('\n')
            || field.contains('\r')
        {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    /// CSVヘッダーを生成
    fn generate_headers(&self) -> String {
        COLUMNS.join(&self.delimiter.to_string())
    }

    fn row_to_csv(&self, row: &ReportRow) -> String {
        row.to_fields()
            .iter()
            .map(|field| self.escape_csv_field(field))
            .collect::<Vec<_>>()
            .join(&self.delimiter.to_string())
    }

    /// メタデータセクションを生成（`#` 始まりのコメント行）
    fn generate_metadata_section(&self, report: &CompetitiveIntelligence) -> String {
        let single_line = |value: &str| value.replace(['\n', '\r'], " ");
        let mut metadata_lines = Vec::new();

        metadata_lines.push("# Metadata".to_string());
        metadata_lines.push(format!(
            "# Primary App{}{} ({})",
            self.delimiter,
            single_line(&report.primary_app.app_name),
            report.primary_app.app_id
        ));
        metadata_lines.push(format!(
            "# Competitors{}{}",
            self.delimiter,
            report
                .competitors
                .iter()
                .map(|c| c.app_id.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        ));
        metadata_lines.push(format!(
            "# Overall Position{}{}",
            self.delimiter, report.summary.overall_position
        ));
        metadata_lines.push(format!(
            "# Key Insight{}{}",
            self.delimiter,
            single_line(&report.summary.key_insight)
        ));
        metadata_lines.push(format!(
            "# Top Priority{}{}",
            self.delimiter,
            single_line(&report.summary.top_priority)
        ));
        metadata_lines.push(format!(
            "# Confidence{}{:.2}",
            self.delimiter, report.summary.confidence_score
        ));
        let degraded = report.degraded_apps();
        if !degraded.is_empty() {
            metadata_lines.push(format!(
                "# Degraded Apps{}{}",
                self.delimiter,
                degraded.join(" ")
            ));
        }
        metadata_lines.push(format!(
            "# Generated At{}{}",
            self.delimiter,
            report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        metadata_lines.push(String::new()); // 空行

        metadata_lines.join("\n") + "\n"
    }

    /// RFC 4180 形式のテキストをレコードに分割（コメント行・空行は無視）
    fn split_records(&self, input: &str) -> Result<Vec<(usize, Vec<String>)>, ExportError> {
        let mut records = Vec::new();
        let mut fields = Vec::new();
        let mut field = String::new();
        let mut in_quotes = false;
        let mut at_record_start = true;
        let mut line = 1;
        let mut record_line = 1;

        let mut chars = input.chars().peekable();
        while let Some(c) = chars.next() {
            if at_record_start && !in_quotes {
                match c {
                    '#' => {
                        for skipped in chars.by_ref() {
                            if skipped == '\n' {
                                break;
                            }
                        }
                        line += 1;
                        continue;
                    }
                    '\n' => {
                        line += 1;
                        continue;
                    }
                    '\r' if chars.peek() == Some(&'\n') => continue,
                    _ => {
                        at_record_start = false;
                        record_line = line;
                    }
                }
            }

            if in_quotes {
                if c == '"' {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                } else {
                    if c == '\n' {
                        line += 1;
                    }
                    field.push(c);
                }
            } else if c == '"' {
                if !field.is_empty() {
                    return Err(ExportError::Parse {
                        line,
                        reason: "unexpected quote inside unquoted field".to_string(),
                    });
                }
                in_quotes = true;
            } else if c == self.delimiter {
                fields.push(std::mem::take(&mut field));
            } else if c == '\r' && chars.peek() == Some(&'\n') {
                // CRLFのCRは読み飛ばす
            } else if c == '\n' {
                fields.push(std::mem::take(&mut field));
                records.push((record_line, std::mem::take(&mut fields)));
                line += 1;
                at_record_start = true;
            } else {
                field.push(c);
            }
        }

        if in_quotes {
            return Err(ExportError::Parse {
                line,
                reason: "unterminated quoted field".to_string(),
            });
        }
        if !at_record_start {
            fields.push(field);
            records.push((record_line, fields));
        }

        Ok(records)
    }

    /// エクスポートしたCSVを行に戻す
    pub fn parse(&self, input: &str) -> Result<Vec<ReportRow>, ExportError> {
        let mut rows = Vec::new();

        for (line, fields) in self.split_records(input)? {
            if fields.iter().map(String::as_str).eq(COLUMNS.iter().copied()) {
                continue;
            }
            let row = ReportRow::from_fields(&fields)
                .map_err(|reason| ExportError::Parse { line, reason })?;
            rows.push(row);
        }

        Ok(rows)
    }

    /// エクスポートしたCSVからレポートの表部分を復元
    pub fn import(&self, input: &str) -> Result<ReportTables, ExportError> {
        let rows = self.parse(input)?;
        ReportTables::from_rows(&rows)
    }
}

impl FormatHandler for CsvExporter {
    fn export(
        &self,
        report: &CompetitiveIntelligence,
        config: &ExportConfig,
    ) -> Result<Vec<u8>, ExportError> {
        let mut csv_content = Vec::new();

        // メタデータセクション（オプション）
        if config.include_metadata {
            let metadata_section = self.generate_metadata_section(report);
            csv_content.extend_from_slice(metadata_section.as_bytes());
        }

        // ヘッダー行
        if self.include_headers {
            let headers = self.generate_headers();
            csv_content.extend_from_slice(headers.as_bytes());
            csv_content.push(b'\n');
        }

        // データ行
        for row in ReportTables::from(report).to_rows() {
            csv_content.extend_from_slice(self.row_to_csv(&row).as_bytes());
            csv_content.push(b'\n');
        }

        Ok(csv_content)
    }

    fn file_extension(&self) -> &str {
        "csv"
    }
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self::new()
    }
}
