//! Resolve response serialisation.
//!
//! When the resolver sits behind a federation resolve endpoint, its result
//! is serialised as a signed-response payload: identifiers, validity
//! window, the effective metadata, pass-through trust marks, and the chain
//! itself as raw signed tokens. Unknown claims round-trip through the
//! flattened `extra` bag — serialising then parsing a response yields a
//! semantically equal value.

use chrono::{DateTime, Utc};
use fedtrust_statement::{Metadata, TrustMarkInfo};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    chain::TrustChain,
    error::{ResolverError, ResolverResult},
};

/// The payload of a resolve response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveResponse {
    /// Issuer of the response (the resolving entity).
    pub iss: String,

    /// Subject — the starting entity the chains lead from.
    pub sub: String,

    /// Audience, when the response is addressed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// Issued-at time (Unix seconds on the wire).
    #[serde(with = "chrono::serde::ts_seconds")]
    pub iat: DateTime<Utc>,

    /// Expiration time (Unix seconds on the wire); never later than the
    /// chain's earliest statement expiry.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub exp: DateTime<Utc>,

    /// The subject's effective metadata after policy application.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,

    /// Trust marks of the subject, carried through unvalidated.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trust_marks: Vec<TrustMarkInfo>,

    /// The trust chain as raw signed tokens, starting entity first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trust_chain: Vec<String>,

    /// Every claim not enumerated above, preserved for round-tripping.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResolveResponse {
    /// Builds the response for one valid chain.
    ///
    /// `sub`, `metadata`, and `trust_marks` come from the chain's leaf;
    /// `exp` is the chain's earliest expiry; `iat` is now.
    ///
    /// # Errors
    ///
    /// [`ResolverError::EmptyChain`] for a chain without statements, or a
    /// policy error when the chain's metadata does not merge.
    pub fn for_chain(
        chain: &TrustChain,
        issuer: impl Into<String>,
        audience: Option<String>,
    ) -> ResolverResult<Self> {
        let leaf = chain.statements().first().ok_or(ResolverError::EmptyChain)?;
        let exp = chain.expires_at().ok_or(ResolverError::EmptyChain)?;
        let metadata = chain.metadata()?;

        Ok(Self {
            iss: issuer.into(),
            sub: leaf.subject().to_string(),
            aud: audience,
            iat: Utc::now(),
            exp,
            metadata,
            trust_marks: leaf.trust_marks().to_vec(),
            trust_chain: chain.raw_tokens(),
            extra: Map::new(),
        })
    }
}
