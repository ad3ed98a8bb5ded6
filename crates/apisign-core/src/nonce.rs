//! Nonce store contract and in-memory implementation.
//!
//! Replay protection depends on exactly one primitive: insert a key with a TTL
//! only if it is not already present, and report whether the insert happened.
//! Any backend providing that primitive atomically can implement
//! [`NonceStore`]; [`MemoryNonceStore`] is the single-process implementation.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::error::NonceStoreError;

/// Atomic set-if-absent store used to record accepted nonces.
#[async_trait]
pub trait NonceStore: Send + Sync {
    /// Insert `key` with the given TTL unless it is already present.
    ///
    /// Returns `Ok(true)` when the key was inserted and `Ok(false)` when a live
    /// entry already existed. Two concurrent calls with the same key must never
    /// both return `Ok(true)`.
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> Result<bool, NonceStoreError>;
}

/// Thread-safe in-memory nonce store.
///
/// Each key maps to its expiry instant. Uses the `DashMap` entry API so the
/// check and the insert happen under the same shard lock.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use apisign_core::{MemoryNonceStore, NonceStore};
///
/// # tokio_test_block_on(async {
/// let store = MemoryNonceStore::new();
/// let ttl = Duration::from_secs(300);
/// assert!(store.set_if_absent("sign_nonce:abc", ttl).await.unwrap());
/// assert!(!store.set_if_absent("sign_nonce:abc", ttl).await.unwrap());
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryNonceStore {
    /// `None` means the entry never expires (TTL overflowed `Instant`).
    inner: DashMap<String, Option<Instant>>,
}

impl MemoryNonceStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    /// Insert `key` as of `now`. Expired entries count as absent.
    pub fn insert_at(&self, key: &str, ttl: Duration, now: Instant) -> bool {
        let expires_at = now.checked_add(ttl);
        match self.inner.entry(key.to_owned()) {
            Entry::Occupied(mut entry) => {
                if is_expired(*entry.get(), now) {
                    entry.insert(expires_at);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(expires_at);
                true
            }
        }
    }

    /// Drop every entry whose TTL has elapsed, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, expires_at| !is_expired(*expires_at, now));
        before.saturating_sub(self.inner.len())
    }

    /// Number of stored entries, including expired ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl NonceStore for MemoryNonceStore {
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> Result<bool, NonceStoreError> {
        let inserted = self.insert_at(key, ttl, Instant::now());
        tracing::trace!(key, inserted, "memory nonce store set_if_absent");
        Ok(inserted)
    }
}

fn is_expired(expires_at: Option<Instant>, now: Instant) -> bool {
    expires_at.is_some_and(|t| t <= now)
}
