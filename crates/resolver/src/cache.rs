//! Entity-statement cache.
//!
//! At most one authoritative copy of a statement is cached per
//! `(subject, issuer)` pair; for a self-signed entity configuration the two
//! are equal. Each entry lives exactly as long as the statement itself: the
//! TTL is derived from the statement's `exp` claim, so an expired statement
//! can never be served from cache.
//!
//! The cache is process-shared and safe under concurrent `get`/`insert`;
//! clones are cheap and all clones share the same store. The grace-period
//! refresh policy lives one layer up, in
//! [`StatementFetcher`](crate::fetcher::StatementFetcher) — the cache
//! itself only knows about presence and expiry.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use fedtrust_statement::EntityStatement;
use moka::{Expiry, future::Cache};

/// Default maximum number of cached statements.
pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

/// Builds the stable cache key for a `(subject, issuer)` pair.
///
/// Entity identifiers are URL-shaped and never contain an unencoded space,
/// so a space joint is unambiguous. The format is stable and suitable for
/// any key-value backend.
#[must_use]
pub fn cache_key(subject: &str, issuer: &str) -> String {
    format!("{subject} {issuer}")
}

/// Per-entry expiry: a statement lives until its `exp` claim.
struct StatementExpiry;

impl Expiry<String, Arc<EntityStatement>> for StatementExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Arc<EntityStatement>,
        _created_at: std::time::Instant,
    ) -> Option<Duration> {
        Some((value.expires_at() - Utc::now()).to_std().unwrap_or(Duration::ZERO))
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Arc<EntityStatement>,
        _updated_at: std::time::Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        // Refreshes overwrite in place; the TTL restarts from the new
        // statement's expiry, not the old entry's remainder.
        Some((value.expires_at() - Utc::now()).to_std().unwrap_or(Duration::ZERO))
    }
}

/// In-memory cache of parsed entity statements keyed by
/// `(subject, issuer)`.
///
/// # Cloning
///
/// `StatementCache` is cheaply cloneable; all clones share the same
/// underlying store.
#[derive(Clone)]
pub struct StatementCache {
    inner: Cache<String, Arc<EntityStatement>>,
}

impl StatementCache {
    /// Creates a cache with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Creates a cache bounded to `max_capacity` entries.
    #[must_use]
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .expire_after(StatementExpiry)
                .build(),
        }
    }

    /// Stores a statement under its `(subject, issuer)` key.
    ///
    /// A statement whose `exp` is already in the past is not stored; the
    /// insert is silently skipped (logged at debug).
    pub async fn insert(&self, subject: &str, issuer: &str, stmt: Arc<EntityStatement>) {
        if stmt.expires_at() <= Utc::now() {
            tracing::debug!(subject, issuer, "not caching already-expired statement");
            return;
        }
        self.inner.insert(cache_key(subject, issuer), stmt).await;
    }

    /// Returns the cached statement for `(subject, issuer)`, if present and
    /// unexpired.
    pub async fn get(&self, subject: &str, issuer: &str) -> Option<Arc<EntityStatement>> {
        self.inner.get(&cache_key(subject, issuer)).await
    }

    /// Returns current entry count.
    ///
    /// Note: this count is eventually consistent. For accurate counts in
    /// tests, call `sync` first.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Synchronizes pending cache operations.
    ///
    /// Call this before checking entry counts in tests to ensure all
    /// inserts and evictions have been processed.
    #[cfg(test)]
    #[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    pub async fn sync(&self) {
        self.inner.run_pending_tasks().await;
    }
}

impl Default for StatementCache {
    fn default() -> Self {
        Self::new()
    }
}
