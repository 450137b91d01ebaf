//! Statement obtainers.
//!
//! An obtainer is the raw source of signed statement bytes. It knows
//! nothing of parsing, caching, or verification — those live in
//! [`parse_entity_statement`](fedtrust_statement::parse_entity_statement)
//! and [`StatementFetcher`](crate::fetcher::StatementFetcher).
//!
//! Two implementations are provided: [`HttpObtainer`] for production and
//! [`MemoryObtainer`] for testing and development.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use crate::error::{ResolverError, ResolverResult};

/// Well-known path of an entity configuration, relative to the entity
/// identifier.
pub const WELL_KNOWN_FEDERATION_PATH: &str = "/.well-known/openid-federation";

/// Default per-request timeout for the HTTP obtainer.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Abstract source of raw signed entity statements.
///
/// Both operations yield the compact-JWS bytes exactly as served; failures
/// are transport errors and prune only the branch that requested them.
#[async_trait]
pub trait StatementObtainer: Send + Sync {
    /// Retrieves the self-signed entity configuration from the well-known
    /// location of `entity_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::Transport`] when no bytes could be
    /// produced.
    async fn entity_configuration(&self, entity_id: &str) -> ResolverResult<Bytes>;

    /// Retrieves from a federation fetch endpoint the statement issued by
    /// `issuer` about `subject`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::Transport`] when no bytes could be
    /// produced.
    async fn subordinate_statement(
        &self,
        fetch_endpoint: &str,
        subject: &str,
        issuer: &str,
    ) -> ResolverResult<Bytes>;
}

/// HTTP statement obtainer.
///
/// Entity configurations are fetched from
/// `{entity_id}/.well-known/openid-federation`; subordinate statements
/// from `{endpoint}?sub={subject}&iss={issuer}`. Every request carries a
/// timeout, and a non-success status is a transport error.
pub struct HttpObtainer {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpObtainer {
    /// Creates an obtainer with the default request timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_HTTP_TIMEOUT)
    }

    /// Creates an obtainer with a custom per-request timeout.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { client: reqwest::Client::new(), timeout }
    }

    async fn get_bytes(&self, request: reqwest::RequestBuilder) -> ResolverResult<Bytes> {
        let response = request.timeout(self.timeout).send().await?;
        let response = response.error_for_status()?;
        Ok(response.bytes().await?)
    }
}

impl Default for HttpObtainer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatementObtainer for HttpObtainer {
    async fn entity_configuration(&self, entity_id: &str) -> ResolverResult<Bytes> {
        let url = format!("{}{}", entity_id.trim_end_matches('/'), WELL_KNOWN_FEDERATION_PATH);
        tracing::debug!(%url, "fetching entity configuration");
        self.get_bytes(self.client.get(url)).await
    }

    async fn subordinate_statement(
        &self,
        fetch_endpoint: &str,
        subject: &str,
        issuer: &str,
    ) -> ResolverResult<Bytes> {
        tracing::debug!(endpoint = %fetch_endpoint, subject, issuer, "fetching subordinate statement");
        self.get_bytes(
            self.client.get(fetch_endpoint).query(&[("sub", subject), ("iss", issuer)]),
        )
        .await
    }
}

/// In-memory statement obtainer for testing and development.
///
/// Responses are registered up front; anything unregistered fails with a
/// transport error, which makes "unreachable entity" scenarios trivial to
/// stage. Every lookup is counted per key so tests can observe background
/// refreshes.
///
/// # Cloning
///
/// `MemoryObtainer` is cheaply cloneable; all clones share the same
/// response table and counters.
#[derive(Clone, Default)]
pub struct MemoryObtainer {
    responses: Arc<RwLock<HashMap<String, Bytes>>>,
    fetch_counts: Arc<RwLock<HashMap<String, u64>>>,
}

impl MemoryObtainer {
    /// Creates an empty obtainer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the entity configuration served for `entity_id`.
    pub fn add_entity_configuration(&self, entity_id: &str, token: impl Into<Bytes>) {
        self.responses.write().insert(Self::configuration_key(entity_id), token.into());
    }

    /// Registers the subordinate statement served from `fetch_endpoint` for
    /// the `(subject, issuer)` query.
    pub fn add_subordinate_statement(
        &self,
        fetch_endpoint: &str,
        subject: &str,
        issuer: &str,
        token: impl Into<Bytes>,
    ) {
        self.responses
            .write()
            .insert(Self::subordinate_key(fetch_endpoint, subject, issuer), token.into());
    }

    /// Number of entity-configuration fetches performed for `entity_id`.
    #[must_use]
    pub fn configuration_fetch_count(&self, entity_id: &str) -> u64 {
        self.fetch_counts.read().get(&Self::configuration_key(entity_id)).copied().unwrap_or(0)
    }

    fn configuration_key(entity_id: &str) -> String {
        format!("config {entity_id}")
    }

    fn subordinate_key(fetch_endpoint: &str, subject: &str, issuer: &str) -> String {
        format!("fetch {fetch_endpoint} {subject} {issuer}")
    }

    fn lookup(&self, key: &str) -> ResolverResult<Bytes> {
        *self.fetch_counts.write().entry(key.to_string()).or_insert(0) += 1;
        self.responses
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| ResolverError::transport(format!("no response registered for {key}")))
    }
}

#[async_trait]
impl StatementObtainer for MemoryObtainer {
    async fn entity_configuration(&self, entity_id: &str) -> ResolverResult<Bytes> {
        self.lookup(&Self::configuration_key(entity_id))
    }

    async fn subordinate_statement(
        &self,
        fetch_endpoint: &str,
        subject: &str,
        issuer: &str,
    ) -> ResolverResult<Bytes> {
        self.lookup(&Self::subordinate_key(fetch_endpoint, subject, issuer))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_obtainer_serves_registered_configuration() {
        let obtainer = MemoryObtainer::new();
        obtainer.add_entity_configuration("https://e.example.org", "a.b.c");

        let bytes = obtainer.entity_configuration("https://e.example.org").await.unwrap();
        assert_eq!(bytes.as_ref(), b"a.b.c");
    }

    #[tokio::test]
    async fn test_memory_obtainer_unregistered_is_transport_error() {
        let obtainer = MemoryObtainer::new();
        let result = obtainer.entity_configuration("https://missing.example.org").await;
        assert!(matches!(result, Err(ResolverError::Transport { .. })));
    }

    #[tokio::test]
    async fn test_memory_obtainer_subordinate_key_includes_all_parts() {
        let obtainer = MemoryObtainer::new();
        obtainer.add_subordinate_statement(
            "https://ta.example.org/fetch",
            "https://e.example.org",
            "https://ta.example.org",
            "x.y.z",
        );

        let ok = obtainer
            .subordinate_statement(
                "https://ta.example.org/fetch",
                "https://e.example.org",
                "https://ta.example.org",
            )
            .await;
        assert!(ok.is_ok());

        let wrong_subject = obtainer
            .subordinate_statement(
                "https://ta.example.org/fetch",
                "https://other.example.org",
                "https://ta.example.org",
            )
            .await;
        assert!(wrong_subject.is_err());
    }

    #[tokio::test]
    async fn test_memory_obtainer_counts_fetches() {
        let obtainer = MemoryObtainer::new();
        obtainer.add_entity_configuration("https://e.example.org", "a.b.c");

        assert_eq!(obtainer.configuration_fetch_count("https://e.example.org"), 0);
        let _ = obtainer.entity_configuration("https://e.example.org").await;
        let _ = obtainer.entity_configuration("https://e.example.org").await;
        assert_eq!(obtainer.configuration_fetch_count("https://e.example.org"), 2);
    }

    #[test]
    fn test_clones_share_state() {
        let obtainer = MemoryObtainer::new();
        let clone = obtainer.clone();
        clone.add_entity_configuration("https://e.example.org", "a.b.c");
        assert!(obtainer.responses.read().contains_key("config https://e.example.org"));
    }
}
