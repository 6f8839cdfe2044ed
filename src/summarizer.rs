//! Summary providers.
//!
//! - **`disabled`**: no enrichment; [`create_summarizer`] returns `None`.
//! - **`openai`**: [`OpenAISummarizer`] calls the chat completions API.
//!   Requires the `OPENAI_API_KEY` environment variable.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, ... (capped at 2^5)

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use article_vault_core::summary::Summarizer;

use crate::config::SummaryConfig;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Content is cut to this many characters before it is sent.
const MAX_PROMPT_CHARS: usize = 12_000;

/// Build the summarizer selected by `[summary].provider`.
pub fn create_summarizer(config: &SummaryConfig) -> Result<Option<Arc<dyn Summarizer>>> {
    match config.provider.as_str() {
        "disabled" => Ok(None),
        "openai" => Ok(Some(Arc::new(OpenAISummarizer::new(config)?))),
        other => bail!("Unknown summary provider: {}", other),
    }
}

pub struct OpenAISummarizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    word_count: u32,
    max_retries: u32,
}

impl OpenAISummarizer {
    /// # Errors
    ///
    /// Returns an error if `OPENAI_API_KEY` is not in the environment.
    pub fn new(config: &SummaryConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            word_count: config.word_count,
            max_retries: config.max_retries,
        })
    }

    fn request_body(&self, title: &str, content: &str) -> serde_json::Value {
        let content: String = content.chars().take(MAX_PROMPT_CHARS).collect();
        serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": 0.3,
            "messages": [
                {
                    "role": "system",
                    "content": format!(
                        "You summarize saved web articles in at most {} words. \
                         Reply with the summary only.",
                        self.word_count
                    ),
                },
                {
                    "role": "user",
                    "content": format!("Title: {}\n\n{}", title, content),
                }
            ]
        })
    }
}

/// Extract `choices[0].message.content` from a chat completions response.
fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing choices[0].message.content"))
}

#[async_trait]
impl Summarizer for OpenAISummarizer {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn summarize(&self, title: &str, content: &str) -> Result<String> {
        let body = self.request_body(title, content);
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(OPENAI_CHAT_URL)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_chat_response(&json);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(anyhow::anyhow!("OpenAI API error {}: {}", status, body_text));
                        continue;
                    }
                    bail!("OpenAI API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Summary failed after retries")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_provider_yields_none() {
        let config = SummaryConfig::default();
        assert!(create_summarizer(&config).unwrap().is_none());
    }

    #[test]
    fn test_parse_chat_response() {
        let json = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "  A summary.  " } }]
        });
        assert_eq!(parse_chat_response(&json).unwrap(), "A summary.");
        assert!(parse_chat_response(&serde_json::json!({ "choices": [] })).is_err());
    }
}
