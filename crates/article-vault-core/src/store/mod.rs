//! Record store abstraction for Article Vault.
//!
//! The [`RecordStore`] trait is a string-keyed JSON store with per-record
//! expiry. Everything above it (repositories, the reconciliation engine, the
//! rate limiter) talks to storage only through this trait, enabling
//! pluggable backends (SQLite in the app crate, in-memory here).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//!
//! # Key layout
//!
//! | Key | Value |
//! |-----|-------|
//! | `user:<external_id>` | [`User`](crate::models::User) |
//! | `user_email:<email>` | internal user id |
//! | `user_articles:<user_id>` | `Vec<`[`ArticleIndexEntry`](crate::models::ArticleIndexEntry)`>` |
//! | `article:<article_id>` | [`Article`](crate::models::Article) |
//! | `rate_limit:<address>` | request count |

pub mod memory;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Key builders for every record kind.
pub mod keys {
    pub fn user(external_id: &str) -> String {
        format!("user:{}", external_id)
    }

    pub fn user_email(email: &str) -> String {
        format!("user_email:{}", email)
    }

    pub fn user_articles(user_id: &str) -> String {
        format!("user_articles:{}", user_id)
    }

    pub fn article(article_id: &str) -> String {
        format!("article:{}", article_id)
    }

    pub fn rate_limit(address: &str) -> String {
        format!("rate_limit:{}", address)
    }
}

/// Abstract key-value backend with per-record expiry.
///
/// Expired records behave exactly like absent ones for every operation.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`get`](RecordStore::get) | Read a live record |
/// | [`set`](RecordStore::set) | Write a record with a fresh expiry |
/// | [`delete`](RecordStore::delete) | Remove a record |
/// | [`compare_and_swap`](RecordStore::compare_and_swap) | Conditional write against the previously read value |
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key`, expiring `ttl` from now.
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()>;

    /// Remove `key`. Returns whether a live record was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Write `new` only if the live record currently equals `expected`
    /// (`None` meaning absent or expired). Returns whether the write happened.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&Value>,
        new: Value,
        ttl: Duration,
    ) -> Result<bool>;
}

/// Read and decode a typed record.
pub async fn get_json<T: DeserializeOwned>(store: &dyn RecordStore, key: &str) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Encode and write a typed record.
pub async fn set_json<T: Serialize + ?Sized>(
    store: &dyn RecordStore,
    key: &str,
    value: &T,
    ttl: Duration,
) -> Result<()> {
    store.set(key, serde_json::to_value(value)?, ttl).await
}
