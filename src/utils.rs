//! ログ初期化と表示用ユーティリティ

use anyhow::Context;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;

/// ログファイル名の接頭辞（日付でローテーション）
const LOG_FILE_PREFIX: &str = "revscope.log";

/// ログ出力先ディレクトリ（設定優先、なければXDGデータディレクトリ配下）
pub fn log_directory(config: &LogConfig) -> anyhow::Result<PathBuf> {
    match &config.log_dir {
        Some(dir) => Ok(dir.clone()),
        None => Ok(crate::config::project_dirs()?.data_dir().join("logs")),
    }
}

/// ログ初期化
///
/// `RUST_LOG` が設定されていればそれを優先する。コンソールは標準エラーに出力し、
/// ファイル出力が有効なら日次ローテーションのファイルにも書き込む。
/// 返されたガードはプロセス終了まで保持すること。
pub fn init_logging(config: &LogConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .with_context(|| format!("Invalid log level: {}", config.log_level))?;

    let (file_layer, guard) = if config.enable_file_logging {
        let dir = log_directory(config)?;
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

        let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

/// キャッシュ経過時間の表示（例: "4 minutes"）
pub fn format_age(seconds: u64) -> String {
    let (value, unit) = match seconds {
        0..=59 => (seconds, "second"),
        60..=3_599 => (seconds / 60, "minute"),
        3_600..=86_399 => (seconds / 3_600, "hour"),
        _ => (seconds / 86_400, "day"),
    };
    if value == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", value, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(0), "0 seconds");
        assert_eq!(format_age(1), "1 second");
        assert_eq!(format_age(245), "4 minutes");
        assert_eq!(format_age(3_600), "1 hour");
        assert_eq!(format_age(86_400 * 3), "3 days");
    }

    #[test]
    fn test_log_directory_prefers_config() {
        let config = LogConfig {
            log_dir: Some(PathBuf::from("/tmp/revscope-logs")),
            ..Default::default()
        };
        assert_eq!(log_directory(&config).unwrap(), PathBuf::from("/tmp/revscope-logs"));
    }
}
