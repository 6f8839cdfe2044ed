//! Reconciliation engine: the create/update/reject decision for a single
//! submitted article, and additive batch sync of a client's article set.
//!
//! # Save-or-merge
//!
//! ```text
//! draft ─▶ sanitize ─▶ validate ─┬─ invalid ──────────────▶ InvalidInput
//!                                ▼
//!                      URL already indexed?
//!                        │yes            │no
//!                        ▼               ▼
//!                 merge into record   index full? ─yes─▶ QuotaExceeded
//!                 (action: updated)      │no
//!                                        ▼
//!                                 create (action: created)
//! ```
//!
//! Highlights are replaced on merge, not appended: clients submit the
//! complete highlight set every time, so merging the same set twice is a
//! no-op on the stored sequence.
//!
//! # Sync
//!
//! Sync only ever adds. Articles already on the server are neither updated
//! nor removed, and at most the remaining capacity is admitted, in the
//! client's submission order.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use crate::articles::ArticleRepository;
use crate::error::{VaultError, VaultResult};
use crate::models::{
    Article, ArticleDraft, ArticleUpdate, SaveAction, SaveOutcome, SyncItemResult, SyncReport,
    SyncStatus,
};
use crate::summary::Summarizer;
use crate::validation::{sanitize_draft, sanitize_input, validate_article};

pub struct Reconciler {
    articles: Arc<ArticleRepository>,
    summarizer: Option<Arc<dyn Summarizer>>,
}

impl Reconciler {
    pub fn new(articles: Arc<ArticleRepository>) -> Self {
        Self {
            articles,
            summarizer: None,
        }
    }

    /// Enrich newly created articles that arrive without a summary.
    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn articles(&self) -> &ArticleRepository {
        &self.articles
    }

    /// Save a submitted article, merging into the existing record when the
    /// user already holds its URL.
    pub async fn save(&self, user_id: &str, draft: ArticleDraft) -> VaultResult<SaveOutcome> {
        let draft = sanitize_draft(draft);
        validate_article(&draft, self.articles.limits()).map_err(VaultError::InvalidInput)?;

        let mut index = self.articles.list_index(user_id).await?;
        if let Some(entry) = index.iter().find(|e| e.url == draft.url).cloned() {
            match self.merge(user_id, &entry.id, draft.clone()).await {
                // The full record expired before its index entry; drop the
                // entry and save the draft as new.
                Err(VaultError::NotFound(_)) => {
                    tracing::info!(user_id, article_id = %entry.id, "dropping stale index entry");
                    self.articles.delete(user_id, &entry.id).await?;
                    index.retain(|e| e.id != entry.id);
                }
                outcome => return outcome,
            }
        }

        let limit = self.articles.limits().max_articles_per_user;
        if index.len() >= limit {
            return Err(VaultError::QuotaExceeded { limit });
        }

        match self.articles.create(user_id, draft.clone()).await {
            Ok(article) => {
                let article = self.enrich(article).await;
                Ok(SaveOutcome {
                    action: SaveAction::Created,
                    article: article.receipt(SaveAction::Created),
                })
            }
            // A concurrent save of the same URL won the race; merge into it.
            Err(VaultError::DuplicateUrl(url)) => {
                let index = self.articles.list_index(user_id).await?;
                match index.iter().find(|e| e.url == url) {
                    Some(entry) => self.merge(user_id, &entry.id, draft).await,
                    None => Err(VaultError::DuplicateUrl(url)),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn merge(
        &self,
        user_id: &str,
        article_id: &str,
        draft: ArticleDraft,
    ) -> VaultResult<SaveOutcome> {
        let changes = ArticleUpdate {
            content: Some(draft.content),
            highlights: Some(draft.highlights),
            last_highlighted_at: Some(draft.last_highlighted_at.unwrap_or_else(Utc::now)),
            byline: draft.byline.filter(|b| !b.trim().is_empty()),
            reading_time: draft.reading_time.filter(|t| *t > 0),
            summary: None,
        };
        let article = self
            .articles
            .update(article_id, changes)
            .await?
            .ok_or_else(|| VaultError::NotFound("Article not found".to_string()))?;

        tracing::info!(
            user_id,
            article_id,
            highlights = article.highlight_count(),
            "article merged"
        );
        Ok(SaveOutcome {
            action: SaveAction::Updated,
            article: article.receipt(SaveAction::Updated),
        })
    }

    /// Best-effort summary for a freshly created article.
    async fn enrich(&self, article: Article) -> Article {
        let Some(summarizer) = &self.summarizer else {
            return article;
        };
        if article.has_summary() {
            return article;
        }

        let summary = match summarizer.summarize(&article.title, &article.content).await {
            Ok(s) if !s.trim().is_empty() => s.trim().to_string(),
            Ok(_) => return article,
            Err(e) => {
                tracing::warn!(article_id = %article.id, error = %e, "summary generation failed");
                return article;
            }
        };

        let changes = ArticleUpdate {
            summary: Some(summary),
            ..Default::default()
        };
        match self.articles.update(&article.id, changes).await {
            Ok(Some(updated)) => updated,
            Ok(None) => article,
            Err(e) => {
                tracing::warn!(article_id = %article.id, error = %e, "failed to store summary");
                article
            }
        }
    }

    /// Reconcile a client-held article set against the server index.
    ///
    /// Only URLs the server does not hold are considered, and only as many
    /// as there are free slots. A failure on one candidate is recorded in
    /// the report and does not stop the batch.
    pub async fn sync(&self, user_id: &str, drafts: Vec<ArticleDraft>) -> VaultResult<SyncReport> {
        let index = self.articles.list_index(user_id).await?;
        let server_urls: HashSet<&str> = index.iter().map(|e| e.url.as_str()).collect();

        let candidates: Vec<ArticleDraft> = drafts
            .into_iter()
            .filter(|d| !server_urls.contains(sanitize_input(&d.url).as_str()))
            .collect();

        let remaining = self
            .articles
            .limits()
            .max_articles_per_user
            .saturating_sub(index.len());
        let admitted = candidates.len().min(remaining);
        let skipped_count = candidates.len() - admitted;

        let mut results = Vec::with_capacity(admitted);
        for draft in candidates.into_iter().take(admitted) {
            let draft = sanitize_draft(draft);
            let url = draft.url.clone();
            let status = match validate_article(&draft, self.articles.limits()) {
                Err(errors) => SyncStatus::Invalid { errors },
                Ok(()) => match self.articles.create(user_id, draft).await {
                    Ok(article) => SyncStatus::Synced {
                        article_id: article.id,
                    },
                    Err(e) => SyncStatus::Error {
                        error: e.to_string(),
                    },
                },
            };
            results.push(SyncItemResult { url, status });
        }

        let report = SyncReport {
            server_index: self.articles.list_index(user_id).await?,
            results,
            skipped_count,
        };
        tracing::info!(
            user_id,
            synced = report.synced_count(),
            skipped = report.skipped_count,
            "sync completed"
        );
        Ok(report)
    }
}
