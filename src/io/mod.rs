//! I/O utilities for review files.
//!
//! This module provides reading and writing of NDJSON review dumps and a
//! file-backed review source.

pub mod ndjson;

// Re-export commonly used types and functions
pub use ndjson::{
    parse_reviews_file, parse_reviews_ndjson, write_reviews_ndjson, FileReviewSource, ReviewFileError,
};
