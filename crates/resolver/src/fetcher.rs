//! Cached statement fetching with grace-period refresh.
//!
//! [`StatementFetcher`] is the seam between the trust-tree builder and the
//! outside world: it looks up the statement cache, falls back to the
//! obtainer, and keeps hot entries fresh.
//!
//! # Grace period
//!
//! A cached statement close to its expiry is still served synchronously —
//! resolution latency must not depend on upstream availability — but the
//! hit triggers a detached background re-fetch that overwrites the cache
//! entry on success. Refresh failures are logged and never surfaced; the
//! entry simply expires on schedule. Concurrent refreshes for the same key
//! are permitted, the overwrite is idempotent.

use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

use bytes::Bytes;
use chrono::Utc;
use fedtrust_statement::{EntityStatement, parse_entity_statement};

use crate::{
    cache::StatementCache,
    error::ResolverResult,
    obtainer::{HttpObtainer, StatementObtainer},
};

/// Default grace period: a cached statement within one hour of expiry is
/// refreshed in the background on every hit.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(3600);

/// What to ask the obtainer for; kept so the background refresh can repeat
/// the exact request that produced a cache entry.
#[derive(Clone)]
enum FetchRequest {
    Configuration { entity_id: String },
    Subordinate { endpoint: String, subject: String, issuer: String },
}

impl FetchRequest {
    fn subject(&self) -> &str {
        match self {
            FetchRequest::Configuration { entity_id } => entity_id,
            FetchRequest::Subordinate { subject, .. } => subject,
        }
    }

    fn issuer(&self) -> &str {
        match self {
            FetchRequest::Configuration { entity_id } => entity_id,
            FetchRequest::Subordinate { issuer, .. } => issuer,
        }
    }

    async fn run(&self, obtainer: &dyn StatementObtainer) -> ResolverResult<Bytes> {
        match self {
            FetchRequest::Configuration { entity_id } => {
                obtainer.entity_configuration(entity_id).await
            },
            FetchRequest::Subordinate { endpoint, subject, issuer } => {
                obtainer.subordinate_statement(endpoint, subject, issuer).await
            },
        }
    }
}

/// Obtainer plus cache, with the get-or-fetch policy resolution relies on.
///
/// # Cloning
///
/// `StatementFetcher` is cheaply cloneable; clones share the obtainer and
/// the cache. Background refresh tasks hold a clone.
#[derive(Clone)]
pub struct StatementFetcher {
    obtainer: Arc<dyn StatementObtainer>,
    cache: StatementCache,
    grace_period: Duration,
}

impl StatementFetcher {
    /// Creates a fetcher over `obtainer` with a fresh cache and the default
    /// grace period.
    #[must_use]
    pub fn new(obtainer: Arc<dyn StatementObtainer>) -> Self {
        Self::with_cache(obtainer, StatementCache::new())
    }

    /// Creates a fetcher sharing an existing cache.
    #[must_use]
    pub fn with_cache(obtainer: Arc<dyn StatementObtainer>, cache: StatementCache) -> Self {
        Self { obtainer, cache, grace_period: DEFAULT_GRACE_PERIOD }
    }

    /// Overrides the grace period.
    #[must_use]
    pub fn grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Returns the entity configuration of `entity_id`, cached or fetched.
    ///
    /// # Errors
    ///
    /// Transport or parse failure of a synchronous fetch; cache hits never
    /// fail.
    pub async fn entity_configuration(
        &self,
        entity_id: &str,
    ) -> ResolverResult<Arc<EntityStatement>> {
        self.get_or_fetch(FetchRequest::Configuration { entity_id: entity_id.to_string() }).await
    }

    /// Returns the statement `issuer` issued about `subject`, obtained from
    /// `fetch_endpoint`, cached or fetched.
    ///
    /// # Errors
    ///
    /// Transport or parse failure of a synchronous fetch; cache hits never
    /// fail.
    pub async fn subordinate_statement(
        &self,
        fetch_endpoint: &str,
        subject: &str,
        issuer: &str,
    ) -> ResolverResult<Arc<EntityStatement>> {
        self.get_or_fetch(FetchRequest::Subordinate {
            endpoint: fetch_endpoint.to_string(),
            subject: subject.to_string(),
            issuer: issuer.to_string(),
        })
        .await
    }

    async fn get_or_fetch(&self, request: FetchRequest) -> ResolverResult<Arc<EntityStatement>> {
        let (subject, issuer) = (request.subject().to_string(), request.issuer().to_string());

        if let Some(stmt) = self.cache.get(&subject, &issuer).await {
            tracing::debug!(subject = %subject, issuer = %issuer, "statement served from cache");
            let remaining =
                (stmt.expires_at() - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            if remaining <= self.grace_period {
                let fetcher = self.clone();
                tokio::spawn(async move {
                    tracing::debug!(
                        subject = %subject,
                        issuer = %issuer,
                        "within grace period, refreshing statement"
                    );
                    if let Err(error) = fetcher.obtain_and_cache(&request).await {
                        tracing::warn!(
                            subject = %subject,
                            issuer = %issuer,
                            %error,
                            "background statement refresh failed"
                        );
                    }
                });
            }
            return Ok(stmt);
        }

        self.obtain_and_cache(&request).await
    }

    async fn obtain_and_cache(
        &self,
        request: &FetchRequest,
    ) -> ResolverResult<Arc<EntityStatement>> {
        let body = request.run(self.obtainer.as_ref()).await?;
        let stmt = Arc::new(parse_entity_statement(&body)?);
        self.cache.insert(request.subject(), request.issuer(), Arc::clone(&stmt)).await;
        Ok(stmt)
    }
}

/// Returns the process-wide default fetcher, HTTP-backed.
///
/// Initialised on first use and shared by every resolver that is not given
/// an explicit fetcher. Replacing the obtainer after first use is not
/// supported — inject a [`StatementFetcher`] into the resolver instead.
pub fn default_fetcher() -> &'static StatementFetcher {
    static DEFAULT: OnceLock<StatementFetcher> = OnceLock::new();
    DEFAULT.get_or_init(|| StatementFetcher::new(Arc::new(HttpObtainer::new())))
}
