//! revscope CLI
//!
//! 主アプリと競合アプリのレビューを比較し、競合インテリジェンスレポートを出力する。

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use revscope::{
    analytics::export::{ExportConfig, ExportFormat, ExportManager},
    api::{HttpReviewSource, ReviewSource},
    config::{AppConfig, ConfigManager},
    database::{CacheStore, SqliteCacheStore},
    io::FileReviewSource,
    models::AppMeta,
    pipeline::{ComparisonRequest, CompetitiveAnalysisService},
    utils,
};

/// Competitive review intelligence
#[derive(Parser, Debug)]
#[command(name = "revscope", version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: XDG config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare a primary app against competitors
    Compare(CompareArgs),
    /// Inspect or maintain the analysis cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Args, Debug)]
struct CompareArgs {
    /// Primary app as ID or ID:Name
    #[arg(long)]
    primary: String,

    /// Competitor app as ID or ID:Name (repeatable)
    #[arg(long = "competitor", required = true)]
    competitors: Vec<String>,

    /// Directory containing <app_id>.ndjson review files
    #[arg(long, required_unless_present = "source_url", conflicts_with = "source_url")]
    reviews_dir: Option<PathBuf>,

    /// Base URL of an HTTP review source
    #[arg(long)]
    source_url: Option<String>,

    #[arg(long, default_value = "en")]
    locale: String,

    /// Reviews per app (default: from config)
    #[arg(long)]
    max_reviews: Option<usize>,

    /// Ignore and replace any cached result
    #[arg(long)]
    force_refresh: bool,

    /// Output format (json or csv)
    #[arg(long, default_value = "json")]
    format: ExportFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Include analysed reviews in JSON output
    #[arg(long)]
    include_reviews: bool,

    #[arg(long, default_value = "default")]
    org: String,
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// List cached comparisons
    Status,
    /// Delete every cached comparison
    Clear,
    /// Delete cached comparisons older than the given number of hours
    Purge {
        #[arg(long, default_value_t = 24)]
        older_than_hours: i64,
    },
}

/// `ID` または `ID:Name` を分解
fn parse_app_arg(value: &str) -> (String, AppMeta) {
    match value.split_once(':') {
        Some((id, name)) if !name.trim().is_empty() => (id.trim().to_string(), AppMeta::new(name.trim())),
        Some((id, _)) => (id.trim().to_string(), AppMeta::placeholder(id.trim())),
        None => (value.trim().to_string(), AppMeta::placeholder(value.trim())),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<AppConfig> {
    let manager = match path {
        Some(path) => ConfigManager::with_path(path)?,
        None => ConfigManager::new()?,
    };
    // ログ初期化前なので標準エラーに直接出す
    Ok(manager.load_config().unwrap_or_else(|e| {
        eprintln!("⚠️ Failed to load config, using defaults: {:#}", e);
        AppConfig::default()
    }))
}

fn open_cache(config: &AppConfig) -> Result<SqliteCacheStore> {
    SqliteCacheStore::open_default(config.cache.database_path.as_deref()).context("Failed to open analysis cache")
}

async fn run_compare(args: CompareArgs, config: &AppConfig) -> Result<()> {
    let source: Arc<dyn ReviewSource> = match (&args.reviews_dir, &args.source_url) {
        (Some(dir), _) => Arc::new(FileReviewSource::new(dir)),
        (None, Some(url)) => Arc::new(HttpReviewSource::new(url)?),
        (None, None) => anyhow::bail!("either --reviews-dir or --source-url is required"),
    };
    let cache: Arc<dyn CacheStore> = Arc::new(open_cache(config)?);
    let service = CompetitiveAnalysisService::from_config(source, cache, config)?;

    let (primary_id, primary_meta) = parse_app_arg(&args.primary);
    let mut request = ComparisonRequest::new(&args.org, primary_id, primary_meta)
        .with_locale(&args.locale)
        .with_max_reviews(args.max_reviews.unwrap_or(config.pipeline.max_reviews_per_app))
        .with_force_refresh(args.force_refresh);
    for competitor in &args.competitors {
        let (id, meta) = parse_app_arg(competitor);
        request.competitor_app_ids.push(id);
        request.competitor_app_meta.push(meta);
    }

    let outcome = service.run(&request).await?;

    if let Some(age) = outcome.cache_age_seconds {
        eprintln!("📦 Loaded from cache, {} old", utils::format_age(age));
    }
    for warning in &outcome.warnings {
        eprintln!("⚠️ {}", warning);
    }
    if !outcome.degraded_apps.is_empty() {
        eprintln!("⚠️ No reviews for: {}", outcome.degraded_apps.join(", "));
    }

    let export_config = ExportConfig {
        format: args.format,
        include_reviews: args.include_reviews,
        ..Default::default()
    };
    let manager = ExportManager::new();
    match &args.output {
        Some(path) => {
            manager.export_to_file(&outcome.intelligence, &export_config, path)?;
        }
        None => {
            let bytes = manager.export(&outcome.intelligence, &export_config)?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.write_all(b"\n")?;
        }
    }

    eprintln!(
        "🏁 {}: {} ({})",
        outcome.intelligence.primary_app.app_name,
        outcome.intelligence.summary.overall_position,
        outcome.intelligence.summary.key_insight
    );
    Ok(())
}

fn run_cache(action: CacheAction, config: &AppConfig) -> Result<()> {
    let cache = open_cache(config)?;
    match action {
        CacheAction::Status => {
            let now = chrono::Utc::now();
            let entries = cache.list()?;
            if entries.is_empty() {
                println!("No cached comparisons");
            }
            for entry in entries {
                let age = (now - entry.created_at).num_seconds().max(0) as u64;
                println!(
                    "{}  {}  {} competitors  {} old  {} ms",
                    entry.key,
                    entry.primary_app_id,
                    entry.competitor_count,
                    utils::format_age(age),
                    entry.duration_ms
                );
            }
        }
        CacheAction::Clear => {
            let deleted = cache.clear()?;
            println!("🧹 Deleted {} cached comparisons", deleted);
        }
        CacheAction::Purge { older_than_hours } => {
            let cutoff = chrono::Utc::now() - chrono::Duration::hours(older_than_hours.max(0));
            let deleted = cache.purge_older_than(cutoff)?;
            println!("🧹 Purged {} cached comparisons", deleted);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.clone())?;
    let _log_guard = utils::init_logging(&config.log)?;

    tracing::debug!("🎬 Starting revscope");

    match cli.command {
        Command::Compare(args) => run_compare(args, &config).await,
        Command::Cache { action } => run_cache(action, &config),
    }
}
