//! Redis-backed nonce store.
//!
//! Records accepted nonces with `SET key 1 NX PX <ttl-ms>`. Redis executes the
//! command atomically, so concurrent verifiers sharing one Redis instance see
//! exactly one successful insert per key, and entries expire on their own once
//! the freshness window has elapsed.

use std::fmt;
use std::time::Duration;

use anyhow::Context;
use apisign_core::{ApiSignError, ApiSignResult, NonceStore, NonceStoreError};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::{info, trace};

/// Nonce store backed by a Redis server.
///
/// Cloning is cheap; clones share the same multiplexed connection, which
/// reconnects automatically after failures.
#[derive(Clone)]
pub struct RedisNonceStore {
    conn: ConnectionManager,
}

impl RedisNonceStore {
    /// Connect to `url` (e.g. `redis://127.0.0.1:6379/0`) and check the
    /// connection with `PING`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiSignError::Config`] for a malformed URL and
    /// [`ApiSignError::Internal`] when the server cannot be reached.
    pub async fn connect(url: &str) -> ApiSignResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| ApiSignError::Config(format!("invalid redis url: {e}")))?;
        let mut conn = ConnectionManager::new(client)
            .await
            .context("failed to connect to redis")?;

        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .context("redis ping failed")?;

        info!("redis nonce store connected");
        Ok(Self { conn })
    }
}

impl fmt::Debug for RedisNonceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisNonceStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl NonceStore for RedisNonceStore {
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> Result<bool, NonceStoreError> {
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let mut conn = self.conn.clone();

        // `OK` on insert, nil when the key already exists.
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(1)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(|e| NonceStoreError::Backend(e.to_string()))?;

        let inserted = reply.is_some();
        trace!(key, inserted, "redis nonce store set_if_absent");
        Ok(inserted)
    }
}
