//! Trust chains.
//!
//! A trust chain is the flattened form of one verified path through the
//! trust tree: the starting entity's configuration first, then one
//! subordinate statement per hop, ending with a statement issued by a trust
//! anchor. Chains are what callers consume — the tree is an implementation
//! detail of resolution.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fedtrust_statement::{EntityStatement, Metadata, MetadataPolicy, PolicyError};

/// One ordered trust chain, leaf first.
///
/// `statements()[0]` is the starting entity's self-signed configuration;
/// each later statement is issued by the next superior, and the last one by
/// a trust anchor.
#[derive(Debug, Clone)]
pub struct TrustChain(pub(crate) Vec<Arc<EntityStatement>>);

impl TrustChain {
    /// The statements of the chain, leaf first.
    #[must_use]
    pub fn statements(&self) -> &[Arc<EntityStatement>] {
        &self.0
    }

    /// Number of statements in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true iff the chain holds no statements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The earliest expiry over all statements — the chain as a whole is
    /// only usable until then.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.0.iter().map(|stmt| stmt.expires_at()).min()
    }

    /// The raw signed tokens of the chain, leaf first.
    #[must_use]
    pub fn raw_tokens(&self) -> Vec<String> {
        self.0.iter().map(|stmt| stmt.raw().to_string()).collect()
    }

    /// Computes the effective metadata of the starting entity under this
    /// chain.
    ///
    /// The `metadata_policy` claims along the chain are combined from the
    /// anchor end downward, then applied to the leaf's metadata. `Ok(None)`
    /// means the leaf declared no metadata at all.
    ///
    /// # Errors
    ///
    /// Returns a [`PolicyError`] when policies conflict or the leaf's
    /// metadata violates the combined policy; such a chain is invalid.
    pub fn metadata(&self) -> Result<Option<Metadata>, PolicyError> {
        let Some(leaf) = self.0.first() else {
            return Ok(None);
        };
        let Some(metadata) = leaf.metadata() else {
            return Ok(None);
        };

        let mut combined = MetadataPolicy::default();
        for stmt in self.0.iter().skip(1).rev() {
            if let Some(policy) = stmt.metadata_policy() {
                combined = combined.combine(policy)?;
            }
        }
        combined.apply_to(metadata).map(Some)
    }
}

/// The set of chains produced by one resolution.
#[derive(Debug, Clone, Default)]
pub struct TrustChains(pub(crate) Vec<TrustChain>);

impl TrustChains {
    /// The chains as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[TrustChain] {
        &self.0
    }

    /// Number of chains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true iff no chain was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the chains.
    pub fn iter(&self) -> std::slice::Iter<'_, TrustChain> {
        self.0.iter()
    }

    /// Discards every chain whose metadata-policy merge fails.
    #[must_use]
    pub fn filter_valid_metadata(self) -> TrustChains {
        TrustChains(
            self.0
                .into_iter()
                .filter(|chain| match chain.metadata() {
                    Ok(_) => true,
                    Err(error) => {
                        tracing::debug!(%error, "discarding chain with invalid metadata");
                        false
                    },
                })
                .collect(),
        )
    }
}

impl IntoIterator for TrustChains {
    type Item = TrustChain;
    type IntoIter = std::vec::IntoIter<TrustChain>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a TrustChains {
    type Item = &'a TrustChain;
    type IntoIter = std::slice::Iter<'a, TrustChain>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
