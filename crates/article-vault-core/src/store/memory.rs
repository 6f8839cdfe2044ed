//! In-memory [`RecordStore`] implementation for testing and embedding.
//!
//! Uses a `HashMap` behind `std::sync::RwLock`. Expiry is evaluated lazily
//! against a clock that tests can move forward with
//! [`InMemoryStore::advance_clock`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::RecordStore;

struct StoredRecord {
    value: Value,
    expires_at: DateTime<Utc>,
}

/// In-memory store for tests and single-process deployments.
pub struct InMemoryStore {
    records: RwLock<HashMap<String, StoredRecord>>,
    clock_offset_ms: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            clock_offset_ms: AtomicI64::new(0),
        }
    }

    /// Move this store's notion of "now" forward.
    pub fn advance_clock(&self, by: Duration) {
        self.clock_offset_ms
            .fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }

    /// Number of live (unexpired) records.
    pub fn live_len(&self) -> usize {
        let now = self.now();
        self.records
            .read()
            .map(|r| r.values().filter(|rec| rec.expires_at > now).count())
            .unwrap_or(0)
    }

    /// Drop every expired record. Returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize> {
        let now = self.now();
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let before = records.len();
        records.retain(|_, rec| rec.expires_at > now);
        Ok(before - records.len())
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now() + chrono::Duration::milliseconds(self.clock_offset_ms.load(Ordering::SeqCst))
    }

    fn expiry(&self, ttl: Duration) -> DateTime<Utc> {
        self.now() + chrono::Duration::milliseconds(ttl.as_millis() as i64)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let now = self.now();
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records
            .get(key)
            .filter(|rec| rec.expires_at > now)
            .map(|rec| rec.value.clone()))
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        let expires_at = self.expiry(ttl);
        let mut records = self.records.write().map_err(|_| poisoned())?;
        records.insert(key.to_string(), StoredRecord { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let now = self.now();
        let mut records = self.records.write().map_err(|_| poisoned())?;
        Ok(records
            .remove(key)
            .is_some_and(|rec| rec.expires_at > now))
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&Value>,
        new: Value,
        ttl: Duration,
    ) -> Result<bool> {
        let now = self.now();
        let expires_at = self.expiry(ttl);
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let current = records
            .get(key)
            .filter(|rec| rec.expires_at > now)
            .map(|rec| &rec.value);
        if current != expected {
            return Ok(false);
        }
        records.insert(
            key.to_string(),
            StoredRecord {
                value: new,
                expires_at,
            },
        );
        Ok(true)
    }
}
