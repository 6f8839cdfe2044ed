//! Summarization collaborator.
//!
//! Summaries are an optional enrichment of newly created articles and have
//! no bearing on capacity or uniqueness. Concrete providers (OpenAI) live in
//! the `article-vault` app crate.

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-3.5-turbo"`).
    fn model_name(&self) -> &str;

    /// Produce a short summary of `content`.
    async fn summarize(&self, title: &str, content: &str) -> Result<String>;
}
