//! Article repository: full article records plus each user's article index.
//!
//! The index (`user_articles:<user_id>`) is the authority for capacity and
//! URL uniqueness. Every index mutation is a compare-and-swap against the
//! value read when the decision was made; a writer that loses the race
//! re-reads and decides again, so two concurrent creates for one user can
//! never both pass the capacity or uniqueness check.
//!
//! Write order on create is full record first, index last. A create that
//! ends up rejected after its record was written deletes that record again.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::error::{VaultError, VaultResult};
use crate::ids;
use crate::limits::{CacheTtls, Limits};
use crate::models::{Article, ArticleDraft, ArticleIndexEntry, ArticleUpdate, ListedArticle};
use crate::store::{get_json, keys, set_json, RecordStore};

/// Upper bound on index compare-and-swap attempts per mutation.
const MAX_INDEX_ATTEMPTS: usize = 5;

pub struct ArticleRepository {
    store: Arc<dyn RecordStore>,
    limits: Limits,
    ttls: CacheTtls,
}

impl ArticleRepository {
    pub fn new(store: Arc<dyn RecordStore>, limits: Limits, ttls: CacheTtls) -> Self {
        Self {
            store,
            limits,
            ttls,
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// The raw stored index (for compare-and-swap) and its decoded entries.
    async fn read_index(&self, user_id: &str) -> VaultResult<(Option<Value>, Vec<ArticleIndexEntry>)> {
        let raw = self.store.get(&keys::user_articles(user_id)).await?;
        let entries = match &raw {
            Some(value) => serde_json::from_value(value.clone())?,
            None => Vec::new(),
        };
        Ok((raw, entries))
    }

    async fn swap_index(
        &self,
        user_id: &str,
        expected: Option<&Value>,
        next: &[ArticleIndexEntry],
    ) -> VaultResult<bool> {
        Ok(self
            .store
            .compare_and_swap(
                &keys::user_articles(user_id),
                expected,
                serde_json::to_value(next)?,
                self.ttls.article,
            )
            .await?)
    }

    /// The user's index in save order. Empty if the user never saved anything.
    pub async fn list_index(&self, user_id: &str) -> VaultResult<Vec<ArticleIndexEntry>> {
        Ok(self.read_index(user_id).await?.1)
    }

    pub async fn get_full(&self, article_id: &str) -> VaultResult<Option<Article>> {
        Ok(get_json(self.store.as_ref(), &keys::article(article_id)).await?)
    }

    /// The index hydrated to full records, falling back to the index entry
    /// for any record that is no longer present.
    pub async fn list_detailed(&self, user_id: &str) -> VaultResult<Vec<ListedArticle>> {
        let index = self.list_index(user_id).await?;
        let mut listed = Vec::with_capacity(index.len());
        for entry in index {
            match self.get_full(&entry.id).await? {
                Some(article) => listed.push(ListedArticle::Full(article.detail())),
                None => listed.push(ListedArticle::Entry(entry)),
            }
        }
        Ok(listed)
    }

    fn check_admissible(&self, index: &[ArticleIndexEntry], url: &str) -> VaultResult<()> {
        if index.len() >= self.limits.max_articles_per_user {
            return Err(VaultError::QuotaExceeded {
                limit: self.limits.max_articles_per_user,
            });
        }
        if index.iter().any(|e| e.url == url) {
            return Err(VaultError::DuplicateUrl(url.to_string()));
        }
        Ok(())
    }

    async fn discard(&self, article_id: &str) {
        if let Err(e) = self.store.delete(&keys::article(article_id)).await {
            tracing::warn!(article_id, error = %e, "failed to remove orphaned article record");
        }
    }

    /// Store a new article for `user_id` and append it to the index.
    ///
    /// Fails with [`VaultError::QuotaExceeded`] when the index is full and
    /// with [`VaultError::DuplicateUrl`] when the URL is already indexed; in
    /// both cases nothing is left behind.
    pub async fn create(&self, user_id: &str, draft: ArticleDraft) -> VaultResult<Article> {
        let now = Utc::now();
        let article = Article {
            id: ids::generate("article"),
            user_id: user_id.to_string(),
            title: draft.title,
            url: draft.url,
            website: draft.website,
            content: draft.content,
            summary: draft.summary.filter(|s| !s.trim().is_empty()),
            highlights: draft.highlights,
            byline: draft.byline.filter(|s| !s.trim().is_empty()),
            reading_time: draft.reading_time,
            last_highlighted_at: draft.last_highlighted_at,
            saved_at: now,
            updated_at: now,
        };

        let mut record_written = false;
        for attempt in 1..=MAX_INDEX_ATTEMPTS {
            let (raw, mut index) = self.read_index(user_id).await?;
            if let Err(e) = self.check_admissible(&index, &article.url) {
                if record_written {
                    self.discard(&article.id).await;
                }
                return Err(e);
            }

            if !record_written {
                set_json(
                    self.store.as_ref(),
                    &keys::article(&article.id),
                    &article,
                    self.ttls.article,
                )
                .await?;
                record_written = true;
            }

            index.push(article.index_entry());
            if self.swap_index(user_id, raw.as_ref(), &index).await? {
                tracing::info!(user_id, article_id = %article.id, url = %article.url, "article created");
                return Ok(article);
            }
            tracing::debug!(user_id, attempt, "article index changed concurrently, retrying");
        }

        self.discard(&article.id).await;
        Err(VaultError::UpstreamUnavailable(
            "article index is being modified concurrently".to_string(),
        ))
    }

    /// Apply `changes` to a stored article and bump `updated_at`.
    ///
    /// Returns `None` if the article does not exist. The index is not
    /// touched: [`ArticleUpdate`] carries no indexed fields.
    pub async fn update(&self, article_id: &str, changes: ArticleUpdate) -> VaultResult<Option<Article>> {
        let Some(mut article) = self.get_full(article_id).await? else {
            return Ok(None);
        };
        changes.apply_to(&mut article);
        article.updated_at = Utc::now();
        set_json(
            self.store.as_ref(),
            &keys::article(article_id),
            &article,
            self.ttls.article,
        )
        .await?;
        Ok(Some(article))
    }

    /// Delete an article owned by `user_id`.
    ///
    /// An entry in the caller's own index proves ownership even when the full
    /// record has already expired, so stale entries can always be removed.
    /// Returns `false` without mutating anything when the article does not
    /// exist or belongs to someone else; the two cases are indistinguishable.
    pub async fn delete(&self, user_id: &str, article_id: &str) -> VaultResult<bool> {
        let indexed = self
            .list_index(user_id)
            .await?
            .iter()
            .any(|e| e.id == article_id);
        if !indexed {
            match self.get_full(article_id).await? {
                Some(article) if article.user_id == user_id => {}
                _ => return Ok(false),
            }
        }

        let mut removed_from_index = false;
        for attempt in 1..=MAX_INDEX_ATTEMPTS {
            let (raw, index) = self.read_index(user_id).await?;
            let next: Vec<ArticleIndexEntry> =
                index.iter().filter(|e| e.id != article_id).cloned().collect();
            if next.len() == index.len()
                || self.swap_index(user_id, raw.as_ref(), &next).await?
            {
                removed_from_index = true;
                break;
            }
            tracing::debug!(user_id, attempt, "article index changed concurrently, retrying");
        }
        if !removed_from_index {
            return Err(VaultError::UpstreamUnavailable(
                "article index is being modified concurrently".to_string(),
            ));
        }

        self.store.delete(&keys::article(article_id)).await?;
        tracing::info!(user_id, article_id, "article deleted");
        Ok(true)
    }
}
