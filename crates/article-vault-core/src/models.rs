//! Data models stored in and returned by the archive.
//!
//! Field names serialize in `snake_case`, which is also the layout of the
//! JSON records held in the [`RecordStore`](crate::store::RecordStore).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Verified identity tuple supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub external_id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Internal user record, stored under `user:<external_id>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub external_id: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    /// Count recorded at creation. The article index is authoritative.
    #[serde(default)]
    pub article_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A captured excerpt plus annotation. Opaque to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Highlight(pub serde_json::Value);

/// Full saved article, stored under `article:<id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub url: String,
    pub website: String,
    pub content: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub highlights: Vec<Highlight>,
    #[serde(default)]
    pub byline: Option<String>,
    #[serde(default)]
    pub reading_time: Option<u32>,
    #[serde(default)]
    pub last_highlighted_at: Option<DateTime<Utc>>,
    pub saved_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    pub fn highlight_count(&self) -> usize {
        self.highlights.len()
    }

    pub fn has_summary(&self) -> bool {
        self.summary.as_deref().is_some_and(|s| !s.trim().is_empty())
    }

    /// The projection kept in the owner's article index.
    pub fn index_entry(&self) -> ArticleIndexEntry {
        ArticleIndexEntry {
            id: self.id.clone(),
            title: self.title.clone(),
            url: self.url.clone(),
            website: self.website.clone(),
            saved_at: self.saved_at,
        }
    }

    /// Caller-facing projection reported by save-or-merge.
    pub fn receipt(&self, action: SaveAction) -> ArticleReceipt {
        let timestamp = match action {
            SaveAction::Created => self.saved_at,
            SaveAction::Updated => self.updated_at,
        };
        ArticleReceipt {
            id: self.id.clone(),
            title: self.title.clone(),
            url: self.url.clone(),
            website: self.website.clone(),
            highlight_count: self.highlight_count(),
            timestamp,
        }
    }

    /// Full record plus derived fields, as returned by detailed listings.
    pub fn detail(&self) -> ArticleDetail {
        ArticleDetail {
            article: self.clone(),
            highlight_count: self.highlight_count(),
            has_summary: self.has_summary(),
        }
    }
}

/// Lightweight per-user projection of an [`Article`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleIndexEntry {
    pub id: String,
    pub title: String,
    pub url: String,
    pub website: String,
    pub saved_at: DateTime<Utc>,
}

/// Incoming article payload from a client, before sanitization/validation.
///
/// Every field defaults so that missing fields surface as validation
/// violations rather than deserialization failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticleDraft {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub website: String,
    #[serde(deserialize_with = "null_as_default")]
    pub content: String,
    pub summary: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub highlights: Vec<Highlight>,
    pub byline: Option<String>,
    pub reading_time: Option<u32>,
    pub last_highlighted_at: Option<DateTime<Utc>>,
}

/// Clients send `null` for fields they never filled in; treat it like a
/// missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Partial update of an article's non-indexed fields.
///
/// Title, URL, and website are deliberately absent: they are mirrored in the
/// index, and changing them here would let the two views drift.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleUpdate {
    pub content: Option<String>,
    pub highlights: Option<Vec<Highlight>>,
    pub summary: Option<String>,
    pub byline: Option<String>,
    pub reading_time: Option<u32>,
    pub last_highlighted_at: Option<DateTime<Utc>>,
}

impl ArticleUpdate {
    pub(crate) fn apply_to(self, article: &mut Article) {
        if let Some(content) = self.content {
            article.content = content;
        }
        if let Some(highlights) = self.highlights {
            article.highlights = highlights;
        }
        if let Some(summary) = self.summary {
            article.summary = Some(summary);
        }
        if let Some(byline) = self.byline {
            article.byline = Some(byline);
        }
        if let Some(reading_time) = self.reading_time {
            article.reading_time = Some(reading_time);
        }
        if let Some(ts) = self.last_highlighted_at {
            article.last_highlighted_at = Some(ts);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleReceipt {
    pub id: String,
    pub title: String,
    pub url: String,
    pub website: String,
    pub highlight_count: usize,
    /// `saved_at` for a created article, `updated_at` for a merge.
    pub timestamp: DateTime<Utc>,
}

/// Result of a save-or-merge call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveOutcome {
    pub action: SaveAction,
    pub article: ArticleReceipt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleDetail {
    #[serde(flatten)]
    pub article: Article,
    pub highlight_count: usize,
    pub has_summary: bool,
}

/// One element of a listing: the full record when available, otherwise the
/// index entry (the full record may have expired independently).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListedArticle {
    Full(ArticleDetail),
    Entry(ArticleIndexEntry),
}

/// Per-candidate outcome of a batch sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncItemResult {
    pub url: String,
    #[serde(flatten)]
    pub status: SyncStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncStatus {
    Synced { article_id: String },
    Invalid { errors: Vec<String> },
    Error { error: String },
}

/// Result of reconciling a client article set against the server index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Server index after the sync completed.
    pub server_index: Vec<ArticleIndexEntry>,
    pub results: Vec<SyncItemResult>,
    /// Candidates turned away only because no slots were left.
    pub skipped_count: usize,
}

impl SyncReport {
    pub fn synced_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.status, SyncStatus::Synced { .. }))
            .count()
    }
}
