//! Archive limits and record lifetimes.
//!
//! The application crate builds these from the `[limits]` and `[cache]`
//! config sections; the defaults here are the product constants.

use std::time::Duration;

pub const DEFAULT_MAX_ARTICLES_PER_USER: usize = 3;
pub const DEFAULT_MAX_ARTICLE_SIZE: usize = 50_000;
pub const DEFAULT_MAX_TITLE_LENGTH: usize = 200;
pub const DEFAULT_MIN_CONTENT_LENGTH: usize = 100;

pub const DEFAULT_USER_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_ARTICLE_TTL: Duration = Duration::from_secs(86_400);

/// Capacity and payload-size bounds applied to every save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Hard per-user capacity of the article index.
    pub max_articles_per_user: usize,
    /// Maximum content body length, in characters.
    pub max_article_size: usize,
    pub max_title_length: usize,
    /// Minimum trimmed content length, in characters.
    pub min_content_length: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_articles_per_user: DEFAULT_MAX_ARTICLES_PER_USER,
            max_article_size: DEFAULT_MAX_ARTICLE_SIZE,
            max_title_length: DEFAULT_MAX_TITLE_LENGTH,
            min_content_length: DEFAULT_MIN_CONTENT_LENGTH,
        }
    }
}

/// Expiry applied on every write of a user or article record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub user: Duration,
    pub article: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            user: DEFAULT_USER_TTL,
            article: DEFAULT_ARTICLE_TTL,
        }
    }
}
