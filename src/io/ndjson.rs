//! NDJSON (Newline Delimited JSON) review files.
//!
//! One `Review` object per line. Blank lines are skipped. This is the offline
//! review source used by the CLI and by tests.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::api::{FetchError, ReviewPage, ReviewSource, FIRST_PAGE};
use crate::models::Review;

/// Errors raised while reading or writing review files.
#[derive(Error, Debug)]
pub enum ReviewFileError {
    /// I/O error when reading files
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error at line {line}: {source}")]
    JsonParse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Serialization error when writing
    #[error("JSON serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Parse reviews from any buffered NDJSON reader.
///
/// Line numbers in errors are 1-based and count blank lines.
pub fn parse_reviews_ndjson<R: BufRead>(reader: R) -> Result<Vec<Review>, ReviewFileError> {
    let mut reviews = Vec::new();

    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;

        // Skip empty lines
        if line.trim().is_empty() {
            continue;
        }

        let review: Review = serde_json::from_str(&line).map_err(|e| ReviewFileError::JsonParse {
            line: line_number + 1,
            source: e,
        })?;
        reviews.push(review);
    }

    Ok(reviews)
}

/// Parse an NDJSON review file.
pub fn parse_reviews_file<P: AsRef<Path>>(path: P) -> Result<Vec<Review>, ReviewFileError> {
    let file = File::open(path.as_ref())?;
    parse_reviews_ndjson(BufReader::new(file))
}

/// Write reviews as NDJSON, one object per line.
pub fn write_reviews_ndjson<W: Write>(mut writer: W, reviews: &[Review]) -> Result<(), ReviewFileError> {
    for review in reviews {
        serde_json::to_writer(&mut writer, review)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Default number of reviews served per page.
pub const DEFAULT_FILE_PAGE_SIZE: usize = 100;

/// Review source backed by `<dir>/<app_id>.ndjson` files.
///
/// Each file is parsed once and then served from memory in fixed-size pages.
pub struct FileReviewSource {
    dir: PathBuf,
    page_size: usize,
    loaded: RwLock<HashMap<String, Arc<Vec<Review>>>>,
}

impl FileReviewSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            page_size: DEFAULT_FILE_PAGE_SIZE,
            loaded: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Path of the review file for an app id.
    ///
    /// Ids that could escape the directory are rejected.
    pub fn file_path(&self, app_id: &str) -> Option<PathBuf> {
        let valid = !app_id.is_empty()
            && !app_id.starts_with('.')
            && !app_id.contains(['/', '\\', '\0'])
            && !app_id.contains("..");
        valid.then(|| self.dir.join(format!("{}.ndjson", app_id)))
    }

    async fn load(&self, app_id: &str) -> Result<Arc<Vec<Review>>, FetchError> {
        let cached = self.loaded.read().get(app_id).cloned();
        if let Some(reviews) = cached {
            return Ok(reviews);
        }

        let path = self
            .file_path(app_id)
            .ok_or_else(|| FetchError::source_failed(app_id, "app id is not a valid file name"))?;

        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FetchError::NotFound {
                    app_id: app_id.to_string(),
                });
            }
            Err(e) => return Err(FetchError::source_failed(app_id, format!("{}: {}", path.display(), e))),
        };

        let reviews = parse_reviews_ndjson(content.as_slice())
            .map_err(|e| FetchError::source_failed(app_id, format!("{}: {}", path.display(), e)))?;
        tracing::debug!("📂 Loaded {} reviews from {}", reviews.len(), path.display());

        let reviews = Arc::new(reviews);
        self.loaded.write().insert(app_id.to_string(), reviews.clone());
        Ok(reviews)
    }
}

#[async_trait]
impl ReviewSource for FileReviewSource {
    async fn fetch_page(&self, app_id: &str, _locale: &str, page: u32) -> Result<ReviewPage, FetchError> {
        if page < FIRST_PAGE {
            return Err(FetchError::InvalidPage {
                app_id: app_id.to_string(),
                page,
                reason: format!("pages start at {}", FIRST_PAGE),
            });
        }

        let reviews = self.load(app_id).await?;
        let start = ((page - FIRST_PAGE) as usize).saturating_mul(self.page_size);
        let end = start.saturating_add(self.page_size).min(reviews.len());

        Ok(ReviewPage {
            reviews: reviews.get(start..end).map(<[Review]>::to_vec).unwrap_or_default(),
            has_more: end < reviews.len(),
            next_page: page + 1,
        })
    }

    fn name(&self) -> &str {
        "ndjson"
    }
}
