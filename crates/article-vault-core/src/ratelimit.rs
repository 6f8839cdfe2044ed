//! Fixed-window request counter per caller address.
//!
//! The counter lives in the record store under `rate_limit:<address>` and
//! expires one window after the last admitted request, at which point it
//! starts again from zero. Read-then-write is not atomic; under bursts a
//! few extra requests may get through.

use std::sync::Arc;
use std::time::Duration;

use crate::error::VaultResult;
use crate::store::{get_json, keys, set_json, RecordStore};

pub const DEFAULT_MAX_REQUESTS_PER_MINUTE: u64 = 60;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

pub struct RateLimiter {
    store: Arc<dyn RecordStore>,
    max_requests: u64,
    window: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RecordStore>, max_requests: u64, window: Duration) -> Self {
        Self {
            store,
            max_requests,
            window,
        }
    }

    /// Count a request from `address`. Returns `false`, without counting,
    /// once the window's budget is spent.
    pub async fn admit(&self, address: &str) -> VaultResult<bool> {
        let key = keys::rate_limit(address);
        let current: u64 = get_json(self.store.as_ref(), &key).await?.unwrap_or(0);
        if current >= self.max_requests {
            tracing::warn!(address, count = current, "rate limit exceeded");
            return Ok(false);
        }
        set_json(self.store.as_ref(), &key, &(current + 1), self.window).await?;
        Ok(true)
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("max_requests", &self.max_requests)
            .field("window", &self.window)
            .finish()
    }
}
