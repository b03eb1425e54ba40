//! キャッシュキー生成
//!
//! ## フォーマット
//!
//! ```text
//! CACHE_KEY = SHA1("v1" US organization US primary US locale US competitor_1 US ... )
//! ```
//!
//! 競合IDはソート・重複除去してから連結するため、指定順に依存しない。
//! USは区切り文字 U+001F。

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// キー形式のバージョン（形式を変えたら上げる）
const KEY_VERSION: &str = "v1";

const SEPARATOR: char = '\u{1f}';

/// 比較セットを一意に識別するキャッシュキー
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 保存済みのキー文字列から復元
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }
}

/// 比較セットのキャッシュキーを生成
pub fn cache_key<S: AsRef<str>>(
    organization_id: &str,
    primary_app_id: &str,
    competitor_app_ids: &[S],
    locale: &str,
) -> CacheKey {
    let mut competitors: Vec<&str> = competitor_app_ids.iter().map(|id| id.as_ref()).collect();
    competitors.sort_unstable();
    competitors.dedup();

    let mut hasher = Sha1::new();
    for part in [KEY_VERSION, organization_id, primary_app_id, locale]
        .into_iter()
        .chain(competitors)
    {
        hasher.update(part.as_bytes());
        hasher.update(SEPARATOR.to_string().as_bytes());
    }

    CacheKey(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_order_independent() {
        let a = cache_key("org", "com.primary", &["b", "a", "c"], "en");
        let b = cache_key("org", "com.primary", &["c", "b", "a"], "en");
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_ignores_duplicate_competitors() {
        let a = cache_key("org", "p", &["a", "b"], "en");
        let b = cache_key("org", "p", &["a", "b", "a"], "en");
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_distinguishes_every_component() {
        let base = cache_key("org", "p", &["a"], "en");
        assert_ne!(base, cache_key("other", "p", &["a"], "en"));
        assert_ne!(base, cache_key("org", "q", &["a"], "en"));
        assert_ne!(base, cache_key("org", "p", &["b"], "en"));
        assert_ne!(base, cache_key("org", "p", &["a"], "ja"));
        // 区切り文字で連結境界のずれを区別する
        assert_ne!(cache_key("org", "p", &["ab"], "en"), cache_key("org", "p", &["a", "b"], "en"));
    }

    #[test]
    fn test_key_format() {
        let key = cache_key("org", "p", &["a"], "en");
        assert_eq!(key.as_str().len(), 40);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key.to_string(), key.as_str());
    }
}
