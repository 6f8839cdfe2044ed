//! TOML configuration.
//!
//! Only `[db]` and `[server]` are required; every other section falls back
//! to the product defaults. See `config/vault.example.toml`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use article_vault_core::limits::{self, CacheTtls, Limits};
use article_vault_core::ratelimit;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    #[serde(default = "default_max_articles")]
    pub max_articles_per_user: usize,
    #[serde(default = "default_max_article_size")]
    pub max_article_size: usize,
    #[serde(default = "default_max_title_length")]
    pub max_title_length: usize,
    #[serde(default = "default_min_content_length")]
    pub min_content_length: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_articles_per_user: default_max_articles(),
            max_article_size: default_max_article_size(),
            max_title_length: default_max_title_length(),
            min_content_length: default_min_content_length(),
        }
    }
}

fn default_max_articles() -> usize {
    limits::DEFAULT_MAX_ARTICLES_PER_USER
}
fn default_max_article_size() -> usize {
    limits::DEFAULT_MAX_ARTICLE_SIZE
}
fn default_max_title_length() -> usize {
    limits::DEFAULT_MAX_TITLE_LENGTH
}
fn default_min_content_length() -> usize {
    limits::DEFAULT_MIN_CONTENT_LENGTH
}

impl LimitsConfig {
    pub fn to_limits(&self) -> Limits {
        Limits {
            max_articles_per_user: self.max_articles_per_user,
            max_article_size: self.max_article_size,
            max_title_length: self.max_title_length,
            min_content_length: self.min_content_length,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_user_ttl")]
    pub user_ttl_secs: u64,
    #[serde(default = "default_article_ttl")]
    pub article_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            user_ttl_secs: default_user_ttl(),
            article_ttl_secs: default_article_ttl(),
        }
    }
}

fn default_user_ttl() -> u64 {
    limits::DEFAULT_USER_TTL.as_secs()
}
fn default_article_ttl() -> u64 {
    limits::DEFAULT_ARTICLE_TTL.as_secs()
}

impl CacheConfig {
    pub fn to_ttls(&self) -> CacheTtls {
        CacheTtls {
            user: Duration::from_secs(self.user_ttl_secs),
            article: Duration::from_secs(self.article_ttl_secs),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_requests")]
    pub max_requests_per_minute: u64,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests_per_minute: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

fn default_max_requests() -> u64 {
    ratelimit::DEFAULT_MAX_REQUESTS_PER_MINUTE
}
fn default_window_secs() -> u64 {
    ratelimit::DEFAULT_WINDOW.as_secs()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
    /// Environment variable holding the token signing secret.
    #[serde(default = "default_secret_env")]
    pub secret_env: String,
    #[serde(default = "default_userinfo_url")]
    pub userinfo_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: default_token_ttl(),
            secret_env: default_secret_env(),
            userinfo_url: default_userinfo_url(),
        }
    }
}

fn default_token_ttl() -> u64 {
    86_400
}
fn default_secret_env() -> String {
    "VAULT_TOKEN_SECRET".to_string()
}
fn default_userinfo_url() -> String {
    "https://www.googleapis.com/oauth2/v2/userinfo".to_string()
}

impl AuthConfig {
    /// Read the signing secret from the configured environment variable.
    pub fn secret(&self) -> Result<String> {
        let secret = std::env::var(&self.secret_env)
            .with_context(|| format!("{} environment variable not set", self.secret_env))?;
        if secret.len() < 16 {
            anyhow::bail!("{} must be at least 16 characters", self.secret_env);
        }
        Ok(secret)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SummaryConfig {
    #[serde(default = "default_summary_provider")]
    pub provider: String,
    #[serde(default = "default_summary_model")]
    pub model: String,
    #[serde(default = "default_summary_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_summary_word_count")]
    pub word_count: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            provider: default_summary_provider(),
            model: default_summary_model(),
            max_tokens: default_summary_max_tokens(),
            word_count: default_summary_word_count(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_summary_provider() -> String {
    "disabled".to_string()
}
fn default_summary_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_summary_max_tokens() -> u32 {
    100
}
fn default_summary_word_count() -> u32 {
    60
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    2
}

impl SummaryConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.limits.max_articles_per_user == 0 {
        anyhow::bail!("limits.max_articles_per_user must be > 0");
    }
    if config.limits.min_content_length > config.limits.max_article_size {
        anyhow::bail!("limits.min_content_length must not exceed limits.max_article_size");
    }
    if config.cache.user_ttl_secs == 0 || config.cache.article_ttl_secs == 0 {
        anyhow::bail!("cache TTLs must be > 0");
    }
    if config.rate_limit.window_secs == 0 {
        anyhow::bail!("rate_limit.window_secs must be > 0");
    }
    if config.auth.token_ttl_secs == 0 {
        anyhow::bail!("auth.token_ttl_secs must be > 0");
    }

    match config.summary.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown summary provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    Ok(())
}
