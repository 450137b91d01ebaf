//! The trust-chain resolver.
//!
//! [`TrustResolver`] discovers, verifies, and returns every valid chain of
//! signed entity statements linking a starting entity to one of the
//! configured trust anchors.
//!
//! # Ordering
//!
//! `resolve` → `verify_signatures` → `chains` must run in that order:
//! verification prunes the tree in place, and `chains` reads the pruned
//! state. Concurrent use of a single resolver is not supported; distinct
//! resolvers are independent (the cache behind the shared fetcher is safe
//! under concurrency).

use std::sync::Arc;

use fedtrust_statement::Jwks;

use crate::{
    chain::{TrustChain, TrustChains},
    fetcher::{StatementFetcher, default_fetcher},
    tree::TrustTree,
};

/// A trust anchor: an entity identifier whose keys are trusted a priori.
///
/// When `jwks` is absent or empty, the anchor's own self-signed
/// configuration supplies the keys at verification time.
#[derive(Debug, Clone)]
pub struct TrustAnchor {
    /// The anchor's entity identifier.
    pub entity_id: String,
    /// Out-of-band configured keys, when any.
    pub jwks: Option<Jwks>,
}

impl TrustAnchor {
    /// An anchor whose keys come from its own entity configuration.
    #[must_use]
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self { entity_id: entity_id.into(), jwks: None }
    }

    /// An anchor with out-of-band configured keys.
    #[must_use]
    pub fn with_jwks(entity_id: impl Into<String>, jwks: Jwks) -> Self {
        Self { entity_id: entity_id.into(), jwks: Some(jwks) }
    }
}

/// Resolves trust chains from a starting entity to a set of trust anchors.
pub struct TrustResolver {
    trust_anchors: Vec<TrustAnchor>,
    starting_entity: String,
    types: Vec<String>,
    fetcher: StatementFetcher,
    tree: TrustTree,
}

impl TrustResolver {
    /// Creates a resolver over the process-wide default fetcher.
    #[must_use]
    pub fn new(trust_anchors: Vec<TrustAnchor>, starting_entity: impl Into<String>) -> Self {
        Self {
            trust_anchors,
            starting_entity: starting_entity.into(),
            types: Vec::new(),
            fetcher: default_fetcher().clone(),
            tree: TrustTree::default(),
        }
    }

    /// Uses an injected fetcher instead of the process-wide default.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: StatementFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Restricts resolution to the given entity-type tags.
    ///
    /// The starting entity's metadata is pruned to these partitions before
    /// the tree is built, so downstream policy filtering only sees relevant
    /// types. An empty list means "all types".
    #[must_use]
    pub fn entity_types(mut self, types: Vec<String>) -> Self {
        self.types = types;
        self
    }

    /// Builds the trust tree for the starting entity.
    ///
    /// Per-branch failures prune silently; a starting entity whose
    /// configuration cannot be fetched yields an empty tree (logged, no
    /// error), and subsequent calls return empty chains.
    pub async fn resolve(&mut self) {
        self.tree = TrustTree::default();

        let starting = match self.fetcher.entity_configuration(&self.starting_entity).await {
            Ok(stmt) => stmt,
            Err(error) => {
                tracing::warn!(
                    entity = %self.starting_entity,
                    %error,
                    "starting entity configuration could not be fetched"
                );
                return;
            },
        };

        // Prune to the requested entity types on a private copy; the cached
        // statement stays untouched.
        let starting = if self.types.is_empty() {
            starting
        } else {
            let mut pruned = (*starting).clone();
            if let Some(metadata) = pruned.metadata_mut() {
                metadata.retain_types(&self.types);
            }
            Arc::new(pruned)
        };

        self.tree.entity = Some(starting);
        let mut path = vec![self.starting_entity.clone()];
        self.tree.resolve(&self.fetcher, &self.trust_anchors, &mut path).await;
    }

    /// Verifies the tree's signatures, pruning untrusted branches in place.
    pub fn verify_signatures(&mut self) {
        self.tree.verify_signatures(&self.trust_anchors);
    }

    /// Flattens the (verified) tree into trust chains, each prefixed with
    /// the starting entity's configuration.
    #[must_use]
    pub fn chains(&self) -> TrustChains {
        let Some(entity) = &self.tree.entity else {
            return TrustChains::default();
        };
        let mut chains = Vec::new();
        for tail in self.tree.chains() {
            let mut chain = Vec::with_capacity(tail.len() + 1);
            chain.push(Arc::clone(entity));
            chain.extend(tail);
            chains.push(TrustChain(chain));
        }
        TrustChains(chains)
    }

    /// Runs the whole pipeline: resolve, verify, flatten, and filter by
    /// metadata-policy validity.
    pub async fn resolve_to_valid_chains(&mut self) -> TrustChains {
        self.resolve().await;
        self.verify_signatures();
        self.chains().filter_valid_metadata()
    }
}
