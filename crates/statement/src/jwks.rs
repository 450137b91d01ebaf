//! Verification key sets.
//!
//! Entity statements carry their verification keys as a JWK set under the
//! `jwks` claim. [`Jwks`] wraps [`jsonwebtoken::jwk::JwkSet`] and adds the
//! candidate-selection logic the signature verifier needs: when a token
//! header names a `kid` that is present in the set, only that key is tried;
//! otherwise every key in the set is a candidate.

use jsonwebtoken::{
    DecodingKey,
    jwk::{Jwk, JwkSet},
};
use serde::{Deserialize, Serialize};

use crate::error::StatementError;

/// A set of public verification keys, as carried in a `jwks` claim.
///
/// May be empty: pure subordinate statements are not required to carry keys
/// of their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwks(pub JwkSet);

impl Jwks {
    /// Creates an empty key set.
    #[must_use]
    pub fn new() -> Self {
        Jwks(JwkSet { keys: Vec::new() })
    }

    /// Returns true iff the set contains no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.keys.is_empty()
    }

    /// Returns the number of keys in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.keys.len()
    }

    /// Returns the keys to try when verifying a token.
    ///
    /// If `kid` is given and a key with that ID exists, only that key is
    /// returned. Otherwise all keys are candidates — federation peers are
    /// not required to set `kid` on their statements.
    #[must_use]
    pub fn candidates(&self, kid: Option<&str>) -> Vec<&Jwk> {
        if let Some(kid) = kid
            && let Some(jwk) = self.0.find(kid)
        {
            return vec![jwk];
        }
        self.0.keys.iter().collect()
    }

    /// Converts a JWK from the set into a [`DecodingKey`].
    ///
    /// # Errors
    ///
    /// Returns [`StatementError::InvalidKey`] if the JWK cannot be used for
    /// verification (unsupported key type, malformed parameters).
    pub fn decoding_key(jwk: &Jwk) -> Result<DecodingKey, StatementError> {
        DecodingKey::from_jwk(jwk).map_err(|e| StatementError::InvalidKey(e.to_string()))
    }
}

impl Default for Jwks {
    fn default() -> Self {
        Self::new()
    }
}
