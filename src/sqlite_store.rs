//! SQLite-backed [`RecordStore`] implementation.
//!
//! Every record is a row of the `records` table: the key, the JSON-encoded
//! value, and an absolute expiry in unix milliseconds. Expired rows are
//! invisible to reads and are removed by [`SqliteRecordStore::purge_expired`]
//! (`vault purge`).
//!
//! `compare_and_swap` is a single conditional statement, so it is atomic
//! across connections and across processes sharing the database file.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{Row, SqlitePool};

use article_vault_core::store::RecordStore;

/// SQLite implementation of the [`RecordStore`] trait.
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Delete every expired row. Returns the number removed.
    pub async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM records WHERE expires_at <= ?")
            .bind(now_ms())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn expiry_ms(ttl: Duration) -> i64 {
    now_ms().saturating_add(ttl.as_millis() as i64)
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let row = sqlx::query("SELECT value FROM records WHERE key = ? AND expires_at > ?")
            .bind(key)
            .bind(now_ms())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let text: String = row.get("value");
                Ok(Some(serde_json::from_str(&text)?))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO records (key, value, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(key)
        .bind(serde_json::to_string(&value)?)
        .bind(expiry_ms(ttl))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let row = sqlx::query("DELETE FROM records WHERE key = ? RETURNING expires_at")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some_and(|r| r.get::<i64, _>("expires_at") > now_ms()))
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&Value>,
        new: Value,
        ttl: Duration,
    ) -> Result<bool> {
        let now = now_ms();
        let new_text = serde_json::to_string(&new)?;

        let result = match expected {
            Some(expected) => {
                sqlx::query(
                    r#"
                    UPDATE records SET value = ?, expires_at = ?
                    WHERE key = ? AND value = ? AND expires_at > ?
                    "#,
                )
                .bind(&new_text)
                .bind(expiry_ms(ttl))
                .bind(key)
                .bind(serde_json::to_string(expected)?)
                .bind(now)
                .execute(&self.pool)
                .await?
            }
            // Absent: insert, or take over a row that has already expired.
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO records (key, value, expires_at)
                    VALUES (?, ?, ?)
                    ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        expires_at = excluded.expires_at
                    WHERE records.expires_at <= ?
                    "#,
                )
                .bind(key)
                .bind(&new_text)
                .bind(expiry_ms(ttl))
                .bind(now)
                .execute(&self.pool)
                .await?
            }
        };

        Ok(result.rows_affected() == 1)
    }
}
